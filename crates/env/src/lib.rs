//! Variable scopes used for `{{var}}` expansion.
//!
//! - [`environment`] loads the baseline from a Postman environment document.
//! - [`scope`] holds the process-wide and per-session bags layered on top of it.

pub mod environment;
pub mod error;
pub mod scope;

pub use environment::load_environment;
pub use error::{EnvError, Result};
pub use scope::{ScopeKind, ScopeTarget, VarUpdate, VariableScopeStore};
