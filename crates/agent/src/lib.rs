//! Context Builder and Agent Loop (§4.4, §4.5): the bounded reason/act/observe
//! cycle that turns an incoming platform message into a model turn, with
//! tool dispatch and persisted conversation state in between.

pub mod agent_loop;
pub mod classifier;
pub mod context_builder;
pub mod repository;
pub mod token_estimate;

pub use agent_loop::{AgentLoop, AgentLoopConfig, IncomingTurn, TurnOutcome};
pub use classifier::{ContextDepthClassifier, EnglishHeuristicClassifier};
pub use context_builder::{ContextBuilder, ContextBuilderConfig, NoProjectContext, ProjectContextProvider};
pub use token_estimate::{CharHeuristicEstimator, TokenEstimator};
