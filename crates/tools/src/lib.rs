//! Tool Registry (§4.3): module manifest discovery, permission filtering,
//! and dispatch to remote tool modules over the manifest+execute HTTP
//! contract (§6.2).

pub mod cache;
pub mod registry;

pub use agentcore_traits::{ToolError, ToolExecutionResult, ToolExecutor, ToolInvocation, ToolOutcome};
pub use cache::ManifestCache;
pub use registry::{spawn_resync_loop, ToolRegistry};
