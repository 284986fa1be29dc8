//! Opaque continuation tokens.
//!
//! A token is the store key of the last row of a page, as URL-safe base64 of
//! `{"partitionKey": .., "sortKey": ..}` without padding.

use crate::error::{Error, Result};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Store position a page ended at.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Partition key of the last row.
    pub partition_key: String,
    /// Sort key of the last row.
    pub sort_key: String,
}

impl Cursor {
    /// Cursor at (`partition_key`, `sort_key`).
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// Encode a cursor as a token.
///
/// ```rust
/// use dynamodb_shadow::pagination;
///
/// let token = pagination::encode("tasks", "id#1");
/// assert_eq!(
///     pagination::decode(&token).unwrap(),
///     pagination::Cursor::new("tasks", "id#1"),
/// );
/// ```
pub fn encode(partition_key: &str, sort_key: &str) -> String {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CursorRef<'a> {
        partition_key: &'a str,
        sort_key: &'a str,
    }
    let cursor = CursorRef {
        partition_key,
        sort_key,
    };
    // a struct of two strings always serializes
    let json = serde_json::to_vec(&cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a token back into its cursor.
///
/// Padded tokens and the standard base64 alphabet are accepted as well.
pub fn decode(token: &str) -> Result<Cursor> {
    let normalized: String = token
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|character| match character {
            '+' => '-',
            '/' => '_',
            character => character,
        })
        .collect();
    if normalized.is_empty() {
        return Err(Error::InvalidToken("empty token".to_string()));
    }
    let json = URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|err| Error::InvalidToken(format!("not base64: {err}")))?;
    serde_json::from_slice(&json).map_err(|err| Error::InvalidToken(format!("malformed cursor: {err}")))
}
