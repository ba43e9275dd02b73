// SPDX-License-Identifier: Apache-2.0

use crate::content::{CasOutcome, ContentStore, PostFilter};
use crate::error::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use pressbox_core::DateKey;
use pressbox_model::{
    AccountStatus, Comment, CommentId, Post, PostId, PostStatus, PostUpdate, Slug, User, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
    users: HashMap<UserId, User>,
}

/// In-memory [`ContentStore`]. The single mutex around the maps plays the
/// role the document database's per-operation atomicity plays in
/// production: each trait call observes and mutates a consistent snapshot,
/// so the uniqueness and compare-and-swap semantics match the Mongo
/// backend. Used by tests and the `memory` dev mode.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// When set, every call fails with `Unavailable`. Lets tests simulate
    /// a store outage.
    pub fail_all: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::Relaxed) {
            return Err(StoreError::unavailable("memory store marked unavailable"));
        }
        Ok(())
    }
}

fn slug_taken(inner: &Inner, slug: &Slug, excluding: Option<&PostId>) -> bool {
    // Trashed posts keep their slug reserved; only purge releases it.
    inner
        .posts
        .values()
        .any(|p| p.slug == *slug && excluding != Some(&p.id))
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        if slug_taken(&inner, &post.slug, None) {
            return Err(StoreError::new(
                StoreErrorCode::DuplicateSlug,
                format!("slug '{}' already exists", post.slug),
            ));
        }
        inner.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn find_live_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .posts
            .values()
            .find(|p| p.slug == *slug && !p.deleted)
            .cloned())
    }

    async fn find_any_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.posts.values().find(|p| p.slug == *slug).cloned())
    }

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<Post>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.posts.get(id).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut rows: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| filter.deleted.is_none_or(|d| p.deleted == d))
            .filter(|p| !filter.published_only || p.status == PostStatus::Published)
            .filter(|p| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| p.category == c)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let limit = if filter.limit == 0 { rows.len() } else { filter.limit };
        Ok(rows.into_iter().skip(filter.offset).take(limit).collect())
    }

    async fn update_post(
        &self,
        id: &PostId,
        update: &PostUpdate,
    ) -> Result<Option<Post>, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        if let Some(new_slug) = &update.slug {
            if slug_taken(&inner, new_slug, Some(id)) {
                return Err(StoreError::new(
                    StoreErrorCode::DuplicateSlug,
                    format!("slug '{new_slug}' already exists"),
                ));
            }
        }
        let Some(post) = inner.posts.get_mut(id) else {
            return Ok(None);
        };
        update.apply_to(post);
        post.updated_at = chrono::Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_status(
        &self,
        id: &PostId,
        status: PostStatus,
    ) -> Result<Option<Post>, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let Some(post) = inner.posts.get_mut(id) else {
            return Ok(None);
        };
        post.status = status;
        post.updated_at = chrono::Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_deleted(
        &self,
        id: &PostId,
        deleted: bool,
        expected: bool,
    ) -> Result<CasOutcome, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let Some(post) = inner.posts.get_mut(id) else {
            return Ok(CasOutcome::Missing);
        };
        if post.deleted != expected {
            return Ok(CasOutcome::StateMismatch);
        }
        post.deleted = deleted;
        post.updated_at = chrono::Utc::now();
        Ok(CasOutcome::Applied)
    }

    async fn purge_post(&self, id: &PostId) -> Result<CasOutcome, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        match inner.posts.get(id) {
            None => Ok(CasOutcome::Missing),
            Some(post) if !post.deleted => Ok(CasOutcome::StateMismatch),
            Some(_) => {
                inner.posts.remove(id);
                Ok(CasOutcome::Applied)
            }
        }
    }

    async fn merge_views(
        &self,
        id: &PostId,
        date: &DateKey,
        delta: u64,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let Some(post) = inner.posts.get_mut(id) else {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("post {id} not found for view merge"),
            ));
        };
        post.ledger.merge(date.clone(), delta);
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        inner.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn list_comments(
        &self,
        slug: &Slug,
        approved_only: bool,
    ) -> Result<Vec<Comment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut rows: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.post_slug == *slug)
            .filter(|c| !approved_only || c.approved)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_comment_approved(
        &self,
        id: &CommentId,
        approved: bool,
    ) -> Result<Option<Comment>, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let Some(comment) = inner.comments.get_mut(id) else {
            return Ok(None);
        };
        comment.approved = approved;
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        Ok(inner.comments.remove(id).is_some())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::new(
                StoreErrorCode::DuplicateEmail,
                format!("email '{}' already registered", user.email),
            ));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.users.get(id).cloned())
    }

    async fn list_users_by_status(
        &self,
        status: AccountStatus,
    ) -> Result<Vec<User>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut rows: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.status == status)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn set_user_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(id) else {
            return Ok(None);
        };
        user.status = status;
        user.updated_at = chrono::Utc::now();
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressbox_model::{AuthorRef, ViewLedger};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn post(id_byte: u8, slug: &str, deleted: bool) -> Post {
        Post {
            id: PostId::from_bytes([id_byte; 12]),
            slug: Slug::parse(slug).expect("slug"),
            title: "Title".to_string(),
            subtitle: None,
            excerpt: None,
            body: "<p>body</p>".to_string(),
            featured_image: None,
            tags: BTreeSet::new(),
            category: "uncategorized".to_string(),
            meta_title: None,
            meta_description: None,
            keywords: None,
            author: AuthorRef::Denormalized {
                name: "Admin".to_string(),
            },
            status: PostStatus::Published,
            deleted,
            ledger: ViewLedger::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_even_against_trashed_posts() {
        let store = MemoryStore::new();
        store.insert_post(&post(1, "taken", true)).await.expect("insert");
        let err = store
            .insert_post(&post(2, "taken", false))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code, StoreErrorCode::DuplicateSlug);
    }

    #[tokio::test]
    async fn live_lookup_never_matches_trashed() {
        let store = MemoryStore::new();
        store.insert_post(&post(1, "hidden", true)).await.expect("insert");
        let slug = Slug::parse("hidden").expect("slug");
        assert!(store.find_live_by_slug(&slug).await.expect("lookup").is_none());
        assert!(store.find_any_by_slug(&slug).await.expect("lookup").is_some());
    }

    #[tokio::test]
    async fn purge_requires_trashed_state() {
        let store = MemoryStore::new();
        let live = post(1, "live", false);
        store.insert_post(&live).await.expect("insert");
        assert_eq!(
            store.purge_post(&live.id).await.expect("purge"),
            CasOutcome::StateMismatch
        );
        store
            .set_post_deleted(&live.id, true, false)
            .await
            .expect("trash");
        assert_eq!(
            store.purge_post(&live.id).await.expect("purge"),
            CasOutcome::Applied
        );
        assert_eq!(
            store.purge_post(&live.id).await.expect("purge"),
            CasOutcome::Missing
        );
    }

    #[tokio::test]
    async fn concurrent_creators_racing_on_one_slug_yield_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let first = post(1, "contested", false);
        let second = post(2, "contested", false);
        let (a, b) = tokio::join!(
            {
                let store = Arc::clone(&store);
                async move { store.insert_post(&first).await }
            },
            {
                let store = Arc::clone(&store);
                async move { store.insert_post(&second).await }
            }
        );
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if a.is_err() { a } else { b };
        assert_eq!(
            loser.expect_err("one racer must lose").code,
            StoreErrorCode::DuplicateSlug
        );
    }

    #[tokio::test]
    async fn trash_cas_detects_stale_expectation() {
        let store = MemoryStore::new();
        let p = post(1, "cas", false);
        store.insert_post(&p).await.expect("insert");
        assert_eq!(
            store
                .set_post_deleted(&p.id, true, true)
                .await
                .expect("cas"),
            CasOutcome::StateMismatch
        );
        assert_eq!(
            store
                .set_post_deleted(&p.id, true, false)
                .await
                .expect("cas"),
            CasOutcome::Applied
        );
    }
}
