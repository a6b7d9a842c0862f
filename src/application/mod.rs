pub mod bridge;
pub mod cookies;
pub mod format_selector;
pub mod orchestrator;
pub mod preflight;

pub use bridge::{spawn_run, LogBuffer, ProgressState, RunSlot};
pub use cookies::HostCookieResolver;
pub use orchestrator::Orchestrator;
pub use preflight::{check_tools, ToolPaths};
