// SPDX-License-Identifier: Apache-2.0

use crate::user::UserId;
use crate::view::ViewLedger;
use chrono::{DateTime, Utc};
use pressbox_core::is_canonical_slug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

pub const TITLE_MAX_LEN: usize = 256;
const ID_HEX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::TooLong(name, max) => write!(f, "{name} exceeds max length {max}"),
            Self::InvalidFormat(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Durable post identity: 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.len() != ID_HEX_LEN || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidFormat(
                "post id must be 24 hex characters",
            ));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    /// Builds an id from 12 raw bytes (hex-encoded).
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

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL-safe, human-readable unique identifier for a post. Always canonical:
/// lowercase ASCII alphanumerics and single hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty("slug"));
        }
        if !is_canonical_slug(trimmed) {
            return Err(ParseError::InvalidFormat(
                "slug must be lowercase alphanumerics and single hyphens",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(ParseError::InvalidFormat(
                "status must be 'draft' or 'published'",
            )),
        }
    }
}

/// Authorship is either a denormalized free-text name carried over from
/// legacy records, or a reference to a user account with a cached display
/// name snapshot. Read paths resolve both to one display name and never
/// branch on the shape downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorRef {
    Denormalized { name: String },
    Referenced { user_id: UserId, cached_name: String },
}

impl AuthorRef {
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Denormalized { name } => name,
            Self::Referenced { cached_name, .. } => cached_name,
        }
    }

    /// The owning account, when one exists.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Denormalized { .. } => None,
            Self::Referenced { user_id, .. } => Some(user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Post {
    pub id: PostId,
    pub slug: Slug,
    pub title: String,
    pub subtitle: Option<String>,
    pub excerpt: Option<String>,
    pub body: String,
    pub featured_image: Option<String>,
    pub tags: BTreeSet<String>,
    pub category: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub author: AuthorRef,
    pub status: PostStatus,
    pub deleted: bool,
    pub ledger: ViewLedger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Required-field validation for the requested status. A draft may have
    /// an empty body; a published post may not. Title is always required.
    pub fn validate_for_status(&self, status: PostStatus) -> Result<(), ParseError> {
        validate_fields(&self.title, &self.body, status)
    }

    /// Whether the post is visible on public read paths.
    #[must_use]
    pub fn publicly_visible(&self) -> bool {
        !self.deleted && self.status == PostStatus::Published
    }
}

/// Input for creating a post; id, timestamps, and the empty ledger are
/// assigned by the lifecycle layer.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub slug: Slug,
    pub title: String,
    pub subtitle: Option<String>,
    pub excerpt: Option<String>,
    pub body: String,
    pub featured_image: Option<String>,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub status: PostStatus,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_fields(&self.title, &self.body, self.status)
    }
}

/// Field-level update for an existing post. `None` leaves the field alone;
/// status and trash transitions go through the lifecycle layer instead.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub slug: Option<Slug>,
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub excerpt: Option<Option<String>>,
    pub body: Option<String>,
    pub featured_image: Option<Option<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub category: Option<String>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub keywords: Option<Option<String>>,
}

impl PostUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slug.is_none()
            && self.title.is_none()
            && self.subtitle.is_none()
            && self.excerpt.is_none()
            && self.body.is_none()
            && self.featured_image.is_none()
            && self.tags.is_none()
            && self.category.is_none()
            && self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.keywords.is_none()
    }

    /// Applies the update to a post in place, leaving lifecycle fields
    /// untouched.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            post.subtitle = subtitle.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(featured_image) = &self.featured_image {
            post.featured_image = featured_image.clone();
        }
        if let Some(tags) = &self.tags {
            post.tags = tags.clone();
        }
        if let Some(category) = &self.category {
            post.category = category.clone();
        }
        if let Some(meta_title) = &self.meta_title {
            post.meta_title = meta_title.clone();
        }
        if let Some(meta_description) = &self.meta_description {
            post.meta_description = meta_description.clone();
        }
        if let Some(keywords) = &self.keywords {
            post.keywords = keywords.clone();
        }
    }
}

fn validate_fields(title: &str, body: &str, status: PostStatus) -> Result<(), ParseError> {
    if title.trim().is_empty() {
        return Err(ParseError::Empty("title"));
    }
    if title.len() > TITLE_MAX_LEN {
        return Err(ParseError::TooLong("title", TITLE_MAX_LEN));
    }
    if status == PostStatus::Published && body.trim().is_empty() {
        return Err(ParseError::Empty("body"));
    }
    Ok(())
}
