// SPDX-License-Identifier: Apache-2.0

use pressbox_core::DateKey;
use pressbox_model::{Comment, Post, PostStatus, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorDto {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewTotalsDto {
    pub cumulative: u64,
    pub by_date: BTreeMap<DateKey, u64>,
}

/// Public shape of a resolved post. Trash state and SEO internals are not
/// exposed here; admin listings use [`PostListItemDto`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostDetailDto {
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub excerpt: Option<String>,
    pub body: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub author: AuthorDto,
    pub status: PostStatus,
    pub date: String,
    pub views: ViewTotalsDto,
}

impl PostDetailDto {
    /// `views` carries the merged total: durable ledger plus today's
    /// not-yet-folded counter delta.
    #[must_use]
    pub fn from_post(post: &Post, merged_total: u64) -> Self {
        Self {
            slug: post.slug.as_str().to_string(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            excerpt: post.excerpt.clone(),
            body: post.body.clone(),
            image: post.featured_image.clone(),
            tags: post.tags.iter().cloned().collect(),
            category: post.category.clone(),
            author: AuthorDto {
                name: post.author.display_name().to_string(),
            },
            status: post.status,
            date: post.created_at.to_rfc3339(),
            views: ViewTotalsDto {
                cumulative: merged_total,
                by_date: post.ledger.by_date.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostListItemDto {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub author: AuthorDto,
    pub category: String,
    pub status: PostStatus,
    pub deleted: bool,
    pub views: u64,
    pub date: String,
}

impl PostListItemDto {
    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: post.id.as_str().to_string(),
            slug: post.slug.as_str().to_string(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            author: AuthorDto {
                name: post.author.display_name().to_string(),
            },
            category: post.category.clone(),
            status: post.status,
            deleted: post.deleted,
            views: post.ledger.views,
            date: post.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentDto {
    pub id: String,
    pub post_slug: String,
    pub body: String,
    pub author_name: String,
    pub avatar: Option<String>,
    pub approved: bool,
    pub date: String,
}

impl CommentDto {
    #[must_use]
    pub fn from_comment(comment: &Comment) -> Self {
        Self {
            id: comment.id.as_str().to_string(),
            post_slug: comment.post_slug.as_str().to_string(),
            body: comment.body.clone(),
            author_name: comment.author_name.clone(),
            avatar: comment.avatar.clone(),
            approved: comment.approved,
            date: comment.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionUserDto {
    pub id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub status: String,
}

impl SessionUserDto {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            status: user.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginResponseDto {
    pub user: SessionUserDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlugCheckDto {
    pub slug: String,
    pub available: bool,
}

/// Create payload. `slug` may be omitted, in which case the server derives
/// one from the title; `status` defaults to draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostRequestDto {
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// Full-replacement update payload (`PUT`): absent optional fields clear.
/// Status and trash state change through the lifecycle actions instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePostRequestDto {
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRequestDto {
    pub body: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequestDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequestDto {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorActionDto {
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentModerationDto {
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchHitDto {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchResponseDto {
    pub results: Vec<SearchHitDto>,
    pub total: usize,
    pub page: usize,
}
