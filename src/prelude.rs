//! cmdkit::prelude - grab-and-go imports for CI scripts

pub use crate::args::{build, build_json, flag_token, ArgConfig, ArgValue, FlagStyle};
pub use crate::cmd::{CommandSpec, EnvMap, RunOptions, StdinData, Stdio};
pub use crate::error::{CommandError, Result};
#[cfg(feature = "exec")]
pub use crate::exec::{async_run, run, run_bytes, run_cmd, Executor, StdExecutor, TaskHandle};
pub use crate::{args, cmd};
