//! Layered configuration resolution.
//!
//! Resolution runs in a fixed order:
//! 1. **Files** - `{name}.{format}` in each search path, current directory first
//! 2. **Merge** - Deep merge field-by-field, later search paths win
//! 3. **Decode** - The merged tree is deserialized into the caller's type
//! 4. **Environment** - `{NAME}_{FIELD}` variables override decoded values
//!
//! ## Merge Strategy
//! - Objects: merged key by key, recursively
//! - Everything else (scalars, arrays, null): replaced by the later file
//! - Missing files are skipped; other read failures abort
//!
//! ## Environment Variables
//! - `MYAPP_PORT` - overrides field `port` for a loader named `myapp`
//! - `MYAPP_SERVER_HOST` - overrides nested field `server.host`
//! - `MYAPP_TAGS=a,b` - list fields take comma-separated values

mod env;
mod files;
mod format;
mod loader;
mod merge;

pub use env::{Environment, MapEnvironment, ProcessEnvironment, bind as bind_env, env_prefix};
pub use files::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use format::Format;
pub use loader::{ConfigLoader, Resolved};
pub use merge::{deep_merge, deep_merge_all};
