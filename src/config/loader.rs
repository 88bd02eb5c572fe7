//! Configuration loader with search-path merging.
//!
//! Reads `{name}.{format}` from every search path in order, merges the
//! results field-by-field, decodes the merged tree into the caller's type and
//! finally applies environment overrides.

use super::env::{self, Environment, ProcessEnvironment};
use super::files::{FileSystem, OsFileSystem};
use super::format::Format;
use super::merge::{deep_merge, deep_merge_all};
use crate::error::{ConfigError, DecodeError, ReadError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of the file stages: the merged tree and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Deep merge of every file found, in search-path order.
    pub tree: Value,
    /// Files that contributed to `tree`, in merge order.
    pub sources: Vec<PathBuf>,
}

/// Layered configuration loader.
///
/// Configure it first, then call [`read_in`](Self::read_in) or
/// [`load`](Self::load). The current directory is always the first search
/// path; each added path takes precedence over the ones before it, and
/// environment variables take precedence over every file.
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use simple_config::config::ConfigLoader;
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Settings {
///     host: String,
///     port: u16,
/// }
///
/// let mut loader = ConfigLoader::new("myapp");
/// loader.add_search_path("/etc/myapp");
/// let settings: Settings = loader.load()?;
/// # Ok::<(), simple_config::error::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    name: String,
    format: Format,
    paths: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    env: Arc<dyn Environment>,
}

impl ConfigLoader {
    /// Create a loader for the logical configuration `name`.
    ///
    /// Defaults to JSON, the current directory as the only search path, the
    /// real filesystem and the process environment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: Format::default(),
            paths: vec![PathBuf::from(".")],
            fs: Arc::new(OsFileSystem),
            env: Arc::new(ProcessEnvironment),
        }
    }

    /// Set the file format. Not validated until a file is decoded.
    pub fn set_format(&mut self, format: impl Into<Format>) {
        self.format = format.into();
    }

    /// Append a search path. Order matters: later paths override earlier ones.
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.paths.push(path.as_ref().to_path_buf());
    }

    /// Append the platform user config directory (`~/.config/{name}` on Linux).
    pub fn add_user_config_dir(&mut self) {
        match dirs::config_dir() {
            Some(dir) => self.paths.push(dir.join(&self.name)),
            None => debug!("No platform config directory; skipping user search path"),
        }
    }

    pub fn with_format(mut self, format: impl Into<Format>) -> Self {
        self.set_format(format);
        self
    }

    pub fn with_search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.add_search_path(path);
        self
    }

    pub fn with_file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Prefix used for environment overrides, e.g. `MYAPP` for `myapp`.
    pub fn env_prefix(&self) -> String {
        env::env_prefix(&self.name)
    }

    /// Candidate file for every search path, in order.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let file_name = format!("{}.{}", self.name, self.format.extension());
        self.paths.iter().map(|dir| dir.join(&file_name)).collect()
    }

    /// Read and merge every candidate file, without touching a target.
    pub fn resolve(&self) -> Result<Resolved> {
        let mut trees = Vec::with_capacity(self.paths.len());
        let mut sources = Vec::new();

        for path in self.candidate_paths() {
            let tree = self.read_path(&path)?;
            if tree.is_some() {
                sources.push(path);
            }
            trees.push(tree);
        }

        info!(
            name = %self.name,
            searched = self.paths.len(),
            found = sources.len(),
            "Resolved configuration files"
        );

        Ok(Resolved {
            tree: deep_merge_all(trees),
            sources,
        })
    }

    /// Populate `target` from the merged files, then from the environment.
    ///
    /// Files are layered over the target's current values, so fields no file
    /// mentions keep whatever the caller put there. If the result does not
    /// fit `T`, the target is left untouched and the environment is not
    /// consulted. If an environment override fails, the target keeps the
    /// file-derived values.
    pub fn read_in<T>(&self, target: &mut T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let resolved = self.resolve()?;
        let current = serde_json::to_value(&*target).map_err(ConfigError::StructuralDecode)?;
        let merged = deep_merge(current, resolved.tree);
        *target = serde_json::from_value(merged).map_err(ConfigError::StructuralDecode)?;
        env::bind(&self.env_prefix(), self.env.as_ref(), target)?;
        Ok(())
    }

    /// Build a fresh `T` starting from its `Default`.
    pub fn load<T>(&self) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let mut target = T::default();
        self.read_in(&mut target)?;
        Ok(target)
    }

    /// Load and decode a single candidate file. `Ok(None)` when it does not exist.
    fn read_path(&self, path: &Path) -> Result<Option<Map<String, Value>>, ReadError> {
        let mut reader = match self.fs.open(path) {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file");
                return Ok(None);
            }
            Err(source) => {
                debug!(path = %path.display(), error = %source, "Failed to open configuration file");
                return Err(ReadError::Open {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let decode_err = |source: DecodeError| ReadError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| decode_err(e.into()))?;
        drop(reader);

        let tree = self.format.decode(&content).map_err(decode_err)?;
        debug!(path = %path.display(), keys = tree.as_ref().map_or(0, Map::len), "Loaded configuration file");
        Ok(tree)
    }
}
