//! Shared domain types for the Latchkey door controller.
//!
//! This crate holds the pieces every other crate agrees on: the tag read
//! snapshot handed between the reader and its callers, the authorization
//! lookup contract, the error type for collaborator failures, and the
//! timing/geometry constants.

pub mod auth;
pub mod constants;
pub mod error;
pub mod types;

pub use auth::{AccessAuthorizer, StaticAuthorizer};
pub use error::{Error, Result};
pub use types::*;
