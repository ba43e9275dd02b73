// SPDX-License-Identifier: Apache-2.0

use crate::post::{ParseError, Slug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const COMMENT_MAX_LEN: usize = 4096;
const ID_HEX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.len() != ID_HEX_LEN || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidFormat(
                "comment id must be 24 hex characters",
            ));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let mut out = String::with_capacity(ID_HEX_LEN);
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        Self(out)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reader comment, addressed by post slug. Comments are born unapproved
/// and never escape public read paths until a moderator flips the flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comment {
    pub id: CommentId,
    pub post_slug: Slug,
    pub body: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub avatar: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for submitting a comment; id, timestamp, and the unapproved flag
/// are assigned at creation.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub post_slug: Slug,
    pub body: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub avatar: Option<String>,
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.body.trim().is_empty() {
            return Err(ParseError::Empty("body"));
        }
        if self.body.len() > COMMENT_MAX_LEN {
            return Err(ParseError::TooLong("body", COMMENT_MAX_LEN));
        }
        if self.author_name.trim().is_empty() {
            return Err(ParseError::Empty("name"));
        }
        Ok(())
    }
}
