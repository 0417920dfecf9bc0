mod classify;
mod core;
mod log_sink;
mod sentinel;
mod supervisor;
mod target;
mod watcher;

pub use classify::classify;
pub use core::{Orchestrator, build_args, test_args};
pub use log_sink::{BUILD_LOG, LogSink, TEST_LOG};
pub use sentinel::{SuccessDetector, ToolKind};
pub use supervisor::{Invocation, RunAccumulator, Stream, Supervisor};
pub use target::{TestTarget, resolve_target};
pub use watcher::{WatchAction, watch};
