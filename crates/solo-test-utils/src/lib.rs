//! Testing utilities for solo workspace
//!
//! - [`MemoryK8Client`]: in-memory cluster with resource versions
//! - [`ScriptedPrompter`]: replays prompt answers
//! - [`fixtures`]: shared targets, configs and managers

mod cluster;
pub mod fixtures;
mod prompter;

pub use cluster::MemoryK8Client;
pub use prompter::ScriptedPrompter;
