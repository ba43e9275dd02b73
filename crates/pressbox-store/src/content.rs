// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use async_trait::async_trait;
use pressbox_core::DateKey;
use pressbox_model::{
    AccountStatus, Comment, CommentId, Post, PostId, PostStatus, PostUpdate, Slug, User, UserId,
};

/// Listing filter for posts. `deleted: None` means both live and trashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub deleted: Option<bool>,
    pub published_only: bool,
    pub category: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Outcome of a conditional (compare-and-swap) lifecycle write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The expected state matched and the write applied.
    Applied,
    /// The record exists but its state did not match the expectation.
    StateMismatch,
    /// No record with that id exists.
    Missing,
}

/// Durable system of record for posts, comments, and users.
///
/// Mutual exclusion is delegated to the backing store: slug and email
/// uniqueness are index constraints surfaced as `DuplicateSlug` /
/// `DuplicateEmail`, lifecycle writes are conditional updates, and view
/// merges are atomic increments. Implementations never hold in-process
/// locks across calls.
#[async_trait]
pub trait ContentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    // Posts.

    /// Inserts a new post. The slug uniqueness constraint is authoritative
    /// here: a racing duplicate insert fails with `DuplicateSlug` no matter
    /// what any advisory check said.
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;

    /// The unique non-deleted post with this slug, if any. Never matches
    /// trashed posts.
    async fn find_live_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError>;

    /// Any post with this slug, trashed or not. Admin paths only.
    async fn find_any_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError>;

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<Post>, StoreError>;

    /// Newest-first listing.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError>;

    /// Applies a field update. A slug change re-checks uniqueness through
    /// the same constraint as insertion. Returns the updated post, or
    /// `None` when the id does not resolve.
    async fn update_post(
        &self,
        id: &PostId,
        update: &PostUpdate,
    ) -> Result<Option<Post>, StoreError>;

    /// Sets the draft/published status, leaving the trash flag alone.
    /// Returns the updated post, or `None` when the id does not resolve
    /// (e.g. it was purged in between).
    async fn set_post_status(
        &self,
        id: &PostId,
        status: PostStatus,
    ) -> Result<Option<Post>, StoreError>;

    /// Conditionally flips the trash flag: applies only when the current
    /// flag equals `expected`. Status is left untouched so restore returns
    /// the post to its prior state.
    async fn set_post_deleted(
        &self,
        id: &PostId,
        deleted: bool,
        expected: bool,
    ) -> Result<CasOutcome, StoreError>;

    /// Physically removes a post, only if it is currently trashed. The
    /// condition makes purge safe against a concurrent restore.
    async fn purge_post(&self, id: &PostId) -> Result<CasOutcome, StoreError>;

    /// Atomically folds a merged counter delta into both `views` and
    /// `views_by_date[date]` (read-then-increment, never overwrite).
    async fn merge_views(
        &self,
        id: &PostId,
        date: &DateKey,
        delta: u64,
    ) -> Result<(), StoreError>;

    // Comments.

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;

    /// Newest-first. `approved_only` is the public path; admin moderation
    /// passes `false` to see everything.
    async fn list_comments(
        &self,
        slug: &Slug,
        approved_only: bool,
    ) -> Result<Vec<Comment>, StoreError>;

    async fn set_comment_approved(
        &self,
        id: &CommentId,
        approved: bool,
    ) -> Result<Option<Comment>, StoreError>;

    async fn delete_comment(&self, id: &CommentId) -> Result<bool, StoreError>;

    // Users.

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn list_users_by_status(
        &self,
        status: AccountStatus,
    ) -> Result<Vec<User>, StoreError>;

    async fn set_user_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<Option<User>, StoreError>;
}
