use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::posts::PostEntity,
    value_objects::{
        enums::{interaction_types::InteractionType, post_statuses::PostStatus},
        interactions::InteractionStats,
        pagination::PaginationMeta,
    },
};

pub const TITLE_MAX_CHARS: usize = 200;
const PREVIEW_PARAGRAPHS: usize = 2;

/// Structured listing filter. Every present field narrows the result with `AND`;
/// `labels` matches posts carrying any of the given labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilters {
    pub status: Option<PostStatus>,
    pub label: Option<String>,
    pub labels: Vec<String>,
    pub is_premium: Option<bool>,
    pub author_id: Option<i64>,
    pub q: Option<String>,
    pub favorited_by: Option<i64>,
}

/// Query string accepted by `GET /api/posts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub labels: Option<String>,
    pub search: Option<String>,
    pub favorites: Option<bool>,
    pub premium: Option<bool>,
    pub status: Option<String>,
    pub label: Option<String>,
    pub author_id: Option<i64>,
    pub q: Option<String>,
}

/// Splits a comma separated label list, dropping blanks and duplicates while keeping order.
pub fn parse_label_list(raw: &str) -> Vec<String> {
    normalize_labels(raw.split(',').map(str::to_string))
}

pub fn normalize_labels<I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut normalized: Vec<String> = Vec::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() || normalized.iter().any(|existing| existing == label) {
            continue;
        }
        normalized.push(label.to_string());
    }
    normalized
}

/// Teaser served in place of premium content: the stored preview when it has text,
/// otherwise the first two blank-line separated paragraphs of the body.
pub fn derive_preview(preview: Option<&str>, content: &str) -> String {
    if let Some(preview) = preview.map(str::trim).filter(|value| !value.is_empty()) {
        return preview.to_string();
    }

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
            if paragraphs.len() == PREVIEW_PARAGRAPHS {
                break;
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() && paragraphs.len() < PREVIEW_PARAGRAPHS {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n").trim().to_string()
}

/// Outcome of the premium gate for one post and one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub has_access: bool,
    pub content: String,
}

impl AccessDecision {
    pub fn for_post(post: &PostEntity, has_access: bool) -> Self {
        let content = if has_access {
            post.content.clone()
        } else {
            derive_preview(post.preview.as_deref(), &post.content)
        };

        Self {
            has_access,
            content,
        }
    }

    pub fn requires_subscription(&self) -> bool {
        !self.has_access
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub preview: Option<String>,
    pub image_id: Option<Uuid>,
    pub status: PostStatus,
    pub is_premium: bool,
    pub labels: Vec<String>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    pub user_interaction: Option<InteractionType>,
    pub requires_subscription: bool,
}

impl PostDto {
    pub fn new(
        post: PostEntity,
        access: AccessDecision,
        stats: InteractionStats,
        comment_count: i64,
        user_interaction: Option<InteractionType>,
    ) -> Self {
        let status = post.status();
        Self {
            id: post.id,
            title: post.title,
            content: access.content,
            preview: post.preview,
            image_id: post.image_id,
            status,
            is_premium: post.is_premium,
            labels: post.labels,
            author_id: post.author_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
            like_count: stats.like_count,
            dislike_count: stats.dislike_count,
            comment_count,
            user_interaction,
            requires_subscription: !access.has_access,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostDto>,
    pub pagination: PaginationMeta,
}

/// Body of `POST /api/posts`, whether it arrived as JSON or multipart fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatePostModel {
    pub title: Option<String>,
    pub content: Option<String>,
    pub preview: Option<String>,
    pub image_id: Option<Uuid>,
    pub status: Option<String>,
    pub is_premium: Option<bool>,
    pub labels: Option<Vec<String>>,
    pub author_id: Option<i64>,
}

/// Body of `PUT /api/posts/:id`. Absent fields stay untouched; an explicit `null`
/// clears `preview` or `image_id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdatePostModel {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub preview: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    pub is_premium: Option<bool>,
    pub labels: Option<Vec<String>>,
    pub author_id: Option<i64>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn premium_post(content: &str, preview: Option<&str>) -> PostEntity {
        let now = Utc::now();
        PostEntity {
            id: 1,
            title: "Premium".to_string(),
            content: content.to_string(),
            preview: preview.map(str::to_string),
            image_id: None,
            status: "published".to_string(),
            is_premium: true,
            labels: vec![],
            author_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn preview_takes_first_two_paragraphs() {
        let preview = derive_preview(None, "Para one.\n\nPara two.\n\nPara three.");
        assert_eq!(preview, "Para one.\n\nPara two.");
    }

    #[test]
    fn preview_handles_crlf_and_extra_blank_lines() {
        let preview = derive_preview(
            None,
            "\r\n  First line\r\nstill first\r\n\r\n\r\n   \r\nSecond\r\n\r\nThird",
        );
        assert_eq!(preview, "First line\nstill first\n\nSecond");
    }

    #[test]
    fn preview_of_single_paragraph_is_whole_body() {
        assert_eq!(derive_preview(None, "  Only one.  "), "Only one.");
        assert_eq!(derive_preview(None, ""), "");
    }

    #[test]
    fn stored_preview_wins_unless_blank() {
        assert_eq!(derive_preview(Some("Teaser"), "A\n\nB\n\nC"), "Teaser");
        assert_eq!(derive_preview(Some("   "), "A\n\nB\n\nC"), "A\n\nB");
    }

    #[test]
    fn denied_access_serves_truncated_content() {
        let post = premium_post("Para one.\n\nPara two.\n\nPara three.", None);
        let decision = AccessDecision::for_post(&post, false);
        assert_eq!(decision.content, "Para one.\n\nPara two.");
        assert!(decision.requires_subscription());

        let granted = AccessDecision::for_post(&post, true);
        assert_eq!(granted.content, post.content);
        assert!(!granted.requires_subscription());
    }

    #[test]
    fn label_lists_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_label_list(" rust, ,tokio,rust ,axum"),
            vec!["rust".to_string(), "tokio".to_string(), "axum".to_string()]
        );
        assert!(parse_label_list(" , ").is_empty());
    }

    #[test]
    fn update_model_distinguishes_null_from_missing() {
        let missing: UpdatePostModel = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(missing.preview, None);

        let cleared: UpdatePostModel = serde_json::from_str(r#"{"preview":null}"#).unwrap();
        assert_eq!(cleared.preview, Some(None));

        let set: UpdatePostModel = serde_json::from_str(r#"{"preview":"p"}"#).unwrap();
        assert_eq!(set.preview, Some(Some("p".to_string())));
    }
}
