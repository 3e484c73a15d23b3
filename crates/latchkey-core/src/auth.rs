//! Authorization lookup contract.
//!
//! The access decision loop only needs one question answered about a tag:
//! may it open the door? Whatever keeps the member/key records answers it
//! through [`AccessAuthorizer`].

use crate::{Error, Result};
use std::collections::HashMap;
use std::future::Future;

/// Answers whether a tag may open the door.
///
/// The returned future is `Send` so implementations can be driven from a
/// spawned background task.
pub trait AccessAuthorizer: Send + Sync {
    /// Look up the lowercase hex tag identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] when the backing store cannot be queried.
    /// Unknown tags are not an error; they yield `Ok(false)`.
    fn is_access_allowed(&self, tag_id: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Fixed in-memory authorizer.
///
/// Useful for running without a database and for tests. A tag can be
/// registered as allowed, denied, or broken (the lookup itself fails).
///
/// # Examples
///
/// ```
/// use latchkey_core::{AccessAuthorizer, StaticAuthorizer};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let auth = StaticAuthorizer::new().allow("deadbeef").deny("0badf00d");
///
/// assert!(auth.is_access_allowed("deadbeef").await.unwrap());
/// assert!(!auth.is_access_allowed("0badf00d").await.unwrap());
/// assert!(!auth.is_access_allowed("unknown").await.unwrap());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    entries: HashMap<String, Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Allowed,
    Denied,
    Failing,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant access to a tag.
    pub fn allow(mut self, tag_id: impl Into<String>) -> Self {
        self.entries.insert(tag_id.into(), Entry::Allowed);
        self
    }

    /// Record a tag that is known but not allowed.
    pub fn deny(mut self, tag_id: impl Into<String>) -> Self {
        self.entries.insert(tag_id.into(), Entry::Denied);
        self
    }

    /// Make every lookup of this tag fail.
    pub fn fail(mut self, tag_id: impl Into<String>) -> Self {
        self.entries.insert(tag_id.into(), Entry::Failing);
        self
    }
}

impl AccessAuthorizer for StaticAuthorizer {
    async fn is_access_allowed(&self, tag_id: &str) -> Result<bool> {
        match self.entries.get(tag_id) {
            Some(Entry::Allowed) => Ok(true),
            Some(Entry::Denied) | None => Ok(false),
            Some(Entry::Failing) => Err(Error::lookup(format!("lookup of key {tag_id} failed"))),
        }
    }
}
