// SPDX-License-Identifier: Apache-2.0

//! Ad hoc interactive search: a stateless fuzzy match over title and
//! excerpt, rebuilt from the store on each query. Fine at blog scale; a
//! real inverted index would replace this if the corpus grew.

use pressbox_model::Post;

const EXCERPT_DISPLAY_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub score: u32,
}

/// Scores every published, non-deleted post against the query and returns
/// hits sorted best-first (ties broken by title for stable output).
#[must_use]
pub fn search_posts(posts: &[Post], query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit> = posts
        .iter()
        .filter(|p| p.publicly_visible())
        .filter_map(|p| {
            let title_score = score_field(&p.title.to_lowercase(), &needle);
            let excerpt_score = p
                .excerpt
                .as_deref()
                .map(|e| score_field(&e.to_lowercase(), &needle))
                .unwrap_or(0);
            // Title matches outrank excerpt matches of the same kind.
            let score = title_score * 2 + excerpt_score;
            if score == 0 {
                return None;
            }
            Some(SearchHit {
                slug: p.slug.as_str().to_string(),
                title: p.title.clone(),
                excerpt: display_excerpt(p),
                score,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.title.cmp(&b.title)));
    hits
}

/// Match quality: exact > prefix > substring > subsequence.
fn score_field(haystack: &str, needle: &str) -> u32 {
    if haystack == needle {
        100
    } else if haystack.starts_with(needle) {
        60
    } else if haystack.contains(needle) {
        40
    } else if is_subsequence(haystack, needle) {
        10
    } else {
        0
    }
}

fn is_subsequence(haystack: &str, needle: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}

fn display_excerpt(post: &Post) -> String {
    let raw = post.excerpt.as_deref().unwrap_or("");
    let stripped = strip_tags(raw);
    stripped.chars().take(EXCERPT_DISPLAY_LEN).collect()
}

/// Drops HTML tags from rich-text excerpts for plain-text display.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressbox_model::{AuthorRef, PostId, PostStatus, Slug, ViewLedger};
    use std::collections::BTreeSet;

    fn post(slug: &str, title: &str, excerpt: Option<&str>, status: PostStatus, deleted: bool) -> Post {
        Post {
            id: PostId::from_bytes([slug.len() as u8; 12]),
            slug: Slug::parse(slug).expect("slug"),
            title: title.to_string(),
            subtitle: None,
            excerpt: excerpt.map(str::to_string),
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
            status,
            deleted,
            ledger: ViewLedger::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn hidden_posts_never_match() {
        let posts = vec![
            post("visible", "Rental Fraud", None, PostStatus::Published, false),
            post("drafted", "Rental Fraud Draft", None, PostStatus::Draft, false),
            post("trashed", "Rental Fraud Trashed", None, PostStatus::Published, true),
        ];
        let hits = search_posts(&posts, "rental");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "visible");
    }

    #[test]
    fn title_matches_outrank_excerpt_matches() {
        let posts = vec![
            post("by-excerpt", "Unrelated", Some("rental fraud deep dive"), PostStatus::Published, false),
            post("by-title", "Rental Fraud", None, PostStatus::Published, false),
        ];
        let hits = search_posts(&posts, "rental");
        assert_eq!(hits[0].slug, "by-title");
        assert_eq!(hits[1].slug, "by-excerpt");
    }

    #[test]
    fn subsequence_matching_catches_typos_of_omission() {
        assert!(score_field("rental fraud", "rntl") > 0);
        assert_eq!(score_field("rental fraud", "zzz"), 0);
    }

    #[test]
    fn excerpts_are_stripped_and_truncated() {
        let long = format!("<p>{}</p>", "x".repeat(400));
        let p = post("long", "Long", Some(&long), PostStatus::Published, false);
        let hits = search_posts(&[p], "long");
        assert_eq!(hits[0].excerpt.len(), EXCERPT_DISPLAY_LEN);
        assert!(!hits[0].excerpt.contains('<'));
    }
}
