// SPDX-License-Identifier: Apache-2.0

use crate::content::{CasOutcome, ContentStore, PostFilter};
use crate::error::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use pressbox_core::DateKey;
use pressbox_model::{
    AccountStatus, AuthorRef, Comment, CommentId, Post, PostId, PostStatus, PostUpdate, Role,
    Slug, User, UserId, ViewLedger,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const POSTS: &str = "posts";
const COMMENTS: &str = "comments";
const USERS: &str = "users";

/// MongoDB-backed [`ContentStore`].
///
/// The unique index on `posts.slug` is the authoritative slug-uniqueness
/// backstop (the advisory `reserve` check is UX only); lifecycle writes are
/// conditional single-document updates, and view merges use `$inc`, so all
/// mutual exclusion is the server's own per-document atomicity.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let store = Self {
            db: client.database(db_name),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();
        self.posts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "slug": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        self.comments()
            .create_index(IndexModel::builder().keys(doc! { "post_slug": 1 }).build())
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Ok(())
    }

    fn posts(&self) -> Collection<PostRecord> {
        self.db.collection::<PostRecord>(POSTS)
    }

    fn comments(&self) -> Collection<CommentRecord> {
        self.db.collection::<CommentRecord>(COMMENTS)
    }

    fn users(&self) -> Collection<UserRecord> {
        self.db.collection::<UserRecord>(USERS)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

fn map_write_err(err: mongodb::error::Error, duplicate: StoreErrorCode) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::new(duplicate, "unique index rejected the write")
    } else {
        StoreError::unavailable(err.to_string())
    }
}

fn map_read_err(err: mongodb::error::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
struct PostRecord {
    #[serde(rename = "_id")]
    id: String,
    slug: String,
    title: String,
    subtitle: Option<String>,
    excerpt: Option<String>,
    body: String,
    featured_image: Option<String>,
    tags: Vec<String>,
    category: String,
    meta_title: Option<String>,
    meta_description: Option<String>,
    keywords: Option<String>,
    author_name: String,
    author_user_id: Option<String>,
    status: String,
    deleted: bool,
    views: i64,
    #[serde(default)]
    views_by_date: BTreeMap<String, i64>,
    created_at: String,
    updated_at: String,
}

impl PostRecord {
    fn from_post(post: &Post) -> Self {
        Self {
            id: post.id.as_str().to_string(),
            slug: post.slug.as_str().to_string(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            excerpt: post.excerpt.clone(),
            body: post.body.clone(),
            featured_image: post.featured_image.clone(),
            tags: post.tags.iter().cloned().collect(),
            category: post.category.clone(),
            meta_title: post.meta_title.clone(),
            meta_description: post.meta_description.clone(),
            keywords: post.keywords.clone(),
            author_name: post.author.display_name().to_string(),
            author_user_id: post.author.user_id().map(|id| id.as_str().to_string()),
            status: post.status.as_str().to_string(),
            deleted: post.deleted,
            views: clamp_to_i64(post.ledger.views),
            views_by_date: post
                .ledger
                .by_date
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), clamp_to_i64(*v)))
                .collect(),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }

    fn into_post(self) -> Result<Post, StoreError> {
        let author = match self.author_user_id {
            Some(raw) => AuthorRef::Referenced {
                user_id: UserId::parse(&raw).map_err(record_err)?,
                cached_name: self.author_name,
            },
            None => AuthorRef::Denormalized {
                name: self.author_name,
            },
        };
        let mut by_date = BTreeMap::new();
        for (raw_date, count) in self.views_by_date {
            by_date.insert(
                DateKey::parse(&raw_date).map_err(record_err)?,
                count.max(0) as u64,
            );
        }
        Ok(Post {
            id: PostId::parse(&self.id).map_err(record_err)?,
            slug: Slug::parse(&self.slug).map_err(record_err)?,
            title: self.title,
            subtitle: self.subtitle,
            excerpt: self.excerpt,
            body: self.body,
            featured_image: self.featured_image,
            tags: self.tags.into_iter().collect::<BTreeSet<_>>(),
            category: self.category,
            meta_title: self.meta_title,
            meta_description: self.meta_description,
            keywords: self.keywords,
            author,
            status: PostStatus::parse(&self.status).map_err(record_err)?,
            deleted: self.deleted,
            ledger: ViewLedger {
                views: self.views.max(0) as u64,
                by_date,
            },
            created_at: parse_rfc3339(&self.created_at)?,
            updated_at: parse_rfc3339(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CommentRecord {
    #[serde(rename = "_id")]
    id: String,
    post_slug: String,
    body: String,
    author_name: String,
    author_email: Option<String>,
    avatar: Option<String>,
    approved: bool,
    created_at: String,
}

impl CommentRecord {
    fn from_comment(comment: &Comment) -> Self {
        Self {
            id: comment.id.as_str().to_string(),
            post_slug: comment.post_slug.as_str().to_string(),
            body: comment.body.clone(),
            author_name: comment.author_name.clone(),
            author_email: comment.author_email.clone(),
            avatar: comment.avatar.clone(),
            approved: comment.approved,
            created_at: comment.created_at.to_rfc3339(),
        }
    }

    fn into_comment(self) -> Result<Comment, StoreError> {
        Ok(Comment {
            id: CommentId::parse(&self.id).map_err(record_err)?,
            post_slug: Slug::parse(&self.post_slug).map_err(record_err)?,
            body: self.body,
            author_name: self.author_name,
            author_email: self.author_email,
            avatar: self.avatar,
            approved: self.approved,
            created_at: parse_rfc3339(&self.created_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    password_hash: String,
    display_name: String,
    bio: Option<String>,
    avatar: Option<String>,
    roles: Vec<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl UserRecord {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar: user.avatar.clone(),
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            status: user.status.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }

    fn into_user(self) -> Result<User, StoreError> {
        let mut roles = BTreeSet::new();
        for raw in &self.roles {
            roles.insert(Role::parse(raw).map_err(record_err)?);
        }
        Ok(User {
            id: UserId::parse(&self.id).map_err(record_err)?,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            bio: self.bio,
            avatar: self.avatar,
            roles,
            status: AccountStatus::parse(&self.status).map_err(record_err)?,
            created_at: parse_rfc3339(&self.created_at)?,
            updated_at: parse_rfc3339(&self.updated_at)?,
        })
    }
}

fn record_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::new(StoreErrorCode::Internal, format!("corrupt record: {err}"))
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(record_err)
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn optional_string(value: &Option<String>) -> Bson {
    match value {
        Some(v) => Bson::String(v.clone()),
        None => Bson::Null,
    }
}

fn update_document(update: &PostUpdate, now: &DateTime<Utc>) -> Document {
    let mut set = doc! { "updated_at": now.to_rfc3339() };
    if let Some(slug) = &update.slug {
        set.insert("slug", slug.as_str());
    }
    if let Some(title) = &update.title {
        set.insert("title", title.as_str());
    }
    if let Some(subtitle) = &update.subtitle {
        set.insert("subtitle", optional_string(subtitle));
    }
    if let Some(excerpt) = &update.excerpt {
        set.insert("excerpt", optional_string(excerpt));
    }
    if let Some(body) = &update.body {
        set.insert("body", body.as_str());
    }
    if let Some(featured_image) = &update.featured_image {
        set.insert("featured_image", optional_string(featured_image));
    }
    if let Some(tags) = &update.tags {
        set.insert(
            "tags",
            Bson::Array(tags.iter().map(|t| Bson::String(t.clone())).collect()),
        );
    }
    if let Some(category) = &update.category {
        set.insert("category", category.as_str());
    }
    if let Some(meta_title) = &update.meta_title {
        set.insert("meta_title", optional_string(meta_title));
    }
    if let Some(meta_description) = &update.meta_description {
        set.insert("meta_description", optional_string(meta_description));
    }
    if let Some(keywords) = &update.keywords {
        set.insert("keywords", optional_string(keywords));
    }
    doc! { "$set": set }
}

#[async_trait]
impl ContentStore for MongoStore {
    fn backend_tag(&self) -> &'static str {
        "mongo"
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        self.posts()
            .insert_one(PostRecord::from_post(post))
            .await
            .map_err(|e| map_write_err(e, StoreErrorCode::DuplicateSlug))?;
        Ok(())
    }

    async fn find_live_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError> {
        self.posts()
            .find_one(doc! { "slug": slug.as_str(), "deleted": false })
            .await
            .map_err(map_read_err)?
            .map(PostRecord::into_post)
            .transpose()
    }

    async fn find_any_by_slug(&self, slug: &Slug) -> Result<Option<Post>, StoreError> {
        self.posts()
            .find_one(doc! { "slug": slug.as_str() })
            .await
            .map_err(map_read_err)?
            .map(PostRecord::into_post)
            .transpose()
    }

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<Post>, StoreError> {
        self.posts()
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(map_read_err)?
            .map(PostRecord::into_post)
            .transpose()
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let mut query = Document::new();
        if let Some(deleted) = filter.deleted {
            query.insert("deleted", deleted);
        }
        if filter.published_only {
            query.insert("status", PostStatus::Published.as_str());
        }
        if let Some(category) = &filter.category {
            query.insert("category", category.as_str());
        }
        let coll = self.posts();
        let mut find = coll
            .find(query)
            .sort(doc! { "created_at": -1 })
            .skip(filter.offset as u64);
        if filter.limit > 0 {
            find = find.limit(clamp_to_i64(filter.limit as u64));
        }
        let mut cursor = find.await.map_err(map_read_err)?;
        let mut out = Vec::new();
        while let Some(record) = cursor.try_next().await.map_err(map_read_err)? {
            out.push(record.into_post()?);
        }
        Ok(out)
    }

    async fn update_post(
        &self,
        id: &PostId,
        update: &PostUpdate,
    ) -> Result<Option<Post>, StoreError> {
        let now = Utc::now();
        self.posts()
            .find_one_and_update(doc! { "_id": id.as_str() }, update_document(update, &now))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| map_write_err(e, StoreErrorCode::DuplicateSlug))?
            .map(PostRecord::into_post)
            .transpose()
    }

    async fn set_post_status(
        &self,
        id: &PostId,
        status: PostStatus,
    ) -> Result<Option<Post>, StoreError> {
        self.posts()
            .find_one_and_update(
                doc! { "_id": id.as_str() },
                doc! { "$set": { "status": status.as_str(), "updated_at": Utc::now().to_rfc3339() } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_read_err)?
            .map(PostRecord::into_post)
            .transpose()
    }

    async fn set_post_deleted(
        &self,
        id: &PostId,
        deleted: bool,
        expected: bool,
    ) -> Result<CasOutcome, StoreError> {
        let result = self
            .posts()
            .update_one(
                doc! { "_id": id.as_str(), "deleted": expected },
                doc! { "$set": { "deleted": deleted, "updated_at": Utc::now().to_rfc3339() } },
            )
            .await
            .map_err(map_read_err)?;
        if result.matched_count > 0 {
            return Ok(CasOutcome::Applied);
        }
        match self.find_post_by_id(id).await? {
            Some(_) => Ok(CasOutcome::StateMismatch),
            None => Ok(CasOutcome::Missing),
        }
    }

    async fn purge_post(&self, id: &PostId) -> Result<CasOutcome, StoreError> {
        // The trash condition rides in the filter, so purge cannot race a
        // concurrent restore into deleting a live post.
        let result = self
            .posts()
            .delete_one(doc! { "_id": id.as_str(), "deleted": true })
            .await
            .map_err(map_read_err)?;
        if result.deleted_count > 0 {
            return Ok(CasOutcome::Applied);
        }
        match self.find_post_by_id(id).await? {
            Some(_) => Ok(CasOutcome::StateMismatch),
            None => Ok(CasOutcome::Missing),
        }
    }

    async fn merge_views(
        &self,
        id: &PostId,
        date: &DateKey,
        delta: u64,
    ) -> Result<(), StoreError> {
        if delta == 0 {
            return Ok(());
        }
        let mut inc = Document::new();
        inc.insert("views", clamp_to_i64(delta));
        inc.insert(
            format!("views_by_date.{}", date.as_str()),
            clamp_to_i64(delta),
        );
        let result = self
            .posts()
            .update_one(doc! { "_id": id.as_str() }, doc! { "$inc": inc })
            .await
            .map_err(map_read_err)?;
        if result.matched_count == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("post {id} not found for view merge"),
            ));
        }
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.comments()
            .insert_one(CommentRecord::from_comment(comment))
            .await
            .map_err(|e| map_write_err(e, StoreErrorCode::Internal))?;
        Ok(())
    }

    async fn list_comments(
        &self,
        slug: &Slug,
        approved_only: bool,
    ) -> Result<Vec<Comment>, StoreError> {
        let mut query = doc! { "post_slug": slug.as_str() };
        if approved_only {
            query.insert("approved", true);
        }
        let mut cursor = self
            .comments()
            .find(query)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(map_read_err)?;
        let mut out = Vec::new();
        while let Some(record) = cursor.try_next().await.map_err(map_read_err)? {
            out.push(record.into_comment()?);
        }
        Ok(out)
    }

    async fn set_comment_approved(
        &self,
        id: &CommentId,
        approved: bool,
    ) -> Result<Option<Comment>, StoreError> {
        self.comments()
            .find_one_and_update(
                doc! { "_id": id.as_str() },
                doc! { "$set": { "approved": approved } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_read_err)?
            .map(CommentRecord::into_comment)
            .transpose()
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<bool, StoreError> {
        let result = self
            .comments()
            .delete_one(doc! { "_id": id.as_str() })
            .await
            .map_err(map_read_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users()
            .insert_one(UserRecord::from_user(user))
            .await
            .map_err(|e| map_write_err(e, StoreErrorCode::DuplicateEmail))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "email": email })
            .await
            .map_err(map_read_err)?
            .map(UserRecord::into_user)
            .transpose()
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(map_read_err)?
            .map(UserRecord::into_user)
            .transpose()
    }

    async fn list_users_by_status(
        &self,
        status: AccountStatus,
    ) -> Result<Vec<User>, StoreError> {
        let mut cursor = self
            .users()
            .find(doc! { "status": status.as_str() })
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(map_read_err)?;
        let mut out = Vec::new();
        while let Some(record) = cursor.try_next().await.map_err(map_read_err)? {
            out.push(record.into_user()?);
        }
        Ok(out)
    }

    async fn set_user_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one_and_update(
                doc! { "_id": id.as_str() },
                doc! { "$set": { "status": status.as_str(), "updated_at": Utc::now().to_rfc3339() } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_read_err)?
            .map(UserRecord::into_user)
            .transpose()
    }
}
