use serde::{Deserialize, Serialize};
use std::fmt;

/// Encode bytes as a lowercase hex string without separators.
///
/// # Examples
///
/// ```
/// use latchkey_core::encode_hex;
///
/// assert_eq!(encode_hex(&[0x04, 0xAB, 0x0C]), "04ab0c");
/// assert_eq!(encode_hex(&[]), "");
/// ```
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Snapshot of one attempt to read the tag in front of the reader.
///
/// Built fresh by every read and never mutated afterwards; the fields are
/// only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReadResult {
    is_tag_present: bool,
    tag_id: Option<String>,
    data: Option<String>,
}

impl TagReadResult {
    /// No tag was presented before the read gave up.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            is_tag_present: false,
            tag_id: None,
            data: None,
        }
    }

    /// A tag with the given identifier bytes was read.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_core::TagReadResult;
    ///
    /// let result = TagReadResult::present(&[0xDE, 0xAD, 0xBE, 0xEF]);
    /// assert!(result.is_tag_present());
    /// assert_eq!(result.tag_id(), Some("deadbeef"));
    /// ```
    #[must_use]
    pub fn present(uid: &[u8]) -> Self {
        Self {
            is_tag_present: true,
            tag_id: Some(encode_hex(uid)),
            data: None,
        }
    }

    #[must_use]
    pub fn is_tag_present(&self) -> bool {
        self.is_tag_present
    }

    /// Lowercase hex identifier of the tag, if one was read.
    #[must_use]
    pub fn tag_id(&self) -> Option<&str> {
        self.tag_id.as_deref()
    }

    /// Tag payload. Reads only identify the tag, so this stays empty.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

impl fmt::Display for TagReadResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.tag_id {
            Some(id) => write!(f, "tag {id}"),
            None => write!(f, "no tag"),
        }
    }
}
