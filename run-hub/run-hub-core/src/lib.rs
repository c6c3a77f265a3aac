//! Typed access to a hierarchical document store of owners, projects, runs
//! and files, with session-based identity and advisory ownership checks.

pub mod access;
pub mod error;
pub mod hub;
pub mod identity;
pub mod model;
pub mod path;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use hub::RunHub;
