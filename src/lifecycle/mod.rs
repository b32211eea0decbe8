//! Backend bootstrap and session front door.

pub mod controller;
pub mod diagnostics;
pub mod tool_discovery;

pub use controller::{SessionLifecycleController, TOOLS_DIR_NAME};
pub use diagnostics::{TraceLog, TRACE_FILE_NAME};
pub use tool_discovery::discover_tool_packs;
