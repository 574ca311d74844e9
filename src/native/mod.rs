/// Native module contains implementations of core traits
/// that run submissions as plain OS processes, without containers,
/// inside a shared scratch workspace.
pub mod adapters;
pub mod executor;
pub mod registry;
pub mod runner;
pub mod workspace;
