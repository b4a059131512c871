//! Error taxonomy for the simulation core.
//!
//! Nothing here is fatal to the process: per-tick failures (bad paths, stale
//! handles, missing targets) are logged and the affected entity is skipped
//! for that tick. `SimError` covers the API surface and AI initialization.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// No unit with the given public id exists.
    #[error("no unit with id {0}")]
    UnknownUnit(u32),
    /// An entity was set up for AI control without a required component.
    /// Its AI is disabled permanently rather than retried.
    #[error("entity is missing required component `{0}`")]
    MissingComponent(&'static str),
}
