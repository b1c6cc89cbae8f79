//! Tenant resolution.
//!
//! Works out which site the current execution context belongs to by trying an
//! ordered chain of sources: caller override, environment, local persistence,
//! request domain, deployment project, and finally auto-creation.

mod environment;
mod local_store;
mod resolver;

pub use environment::*;
pub use local_store::*;
pub use resolver::*;
