//! gitgate - convergence polling and merge gating for code-hosting APIs
//!
//! Two loosely coupled components, each consumable independently:
//!
//! - [`convergence`]: a verifier that polls an idempotent status query
//!   until a target predicate holds, an attempt budget is exhausted, or a
//!   deadline elapses - the reliable way to observe asynchronous
//!   server-side operations such as repository imports.
//! - [`gate`]: a pure rule engine that computes whether a pull request may
//!   merge given its review state, the protection rules bound to its
//!   target branch, and the repository's CODEOWNERS file - and, when it
//!   may not, which unmet conditions block it.
//!
//! The [`client`] module provides the hosting-service boundary both
//! components consume: an async trait plus a reqwest-based REST
//! implementation. The engine's verdict is advisory; the remote service
//! remains the final authority on merges.

pub mod client;
pub mod convergence;
pub mod error;
pub mod gate;
pub mod types;

pub use client::{ApiConfig, HostingService, RestHostingService};
pub use convergence::{await_convergence, await_convergence_cancellable, await_import, PollBudget};
pub use error::{Error, Result};
pub use gate::{compile_rules, evaluate_merge, CodeOwnersFile, CompiledRule};
