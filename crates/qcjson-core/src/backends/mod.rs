//! # Backends
//!
//! Ready-made [`ComputeBackend`](crate::engine::backend::ComputeBackend)
//! implementations.
//!
//! - **[`command::CommandBackend`]** runs an external quantum-chemistry program,
//!   exchanging JSON over stdin and stdout.
//! - **[`recorded::RecordedBackend`]** replays results stored in a TOML file, for
//!   regression fixtures and offline use.
//!
//! Anything else (in-process solvers, remote services) plugs in by implementing the
//! trait directly.

pub mod command;
pub mod recorded;
