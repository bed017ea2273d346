use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::comments::CommentWithAuthorEntity;

pub const COMMENT_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentModel {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCommentsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// True when the comment body has between 1 and 1000 characters and is not only whitespace.
pub fn is_valid_comment_content(content: &str) -> bool {
    let length = content.chars().count();
    !content.trim().is_empty() && (1..=COMMENT_MAX_CHARS).contains(&length)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAuthorDto {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentDto {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthorDto,
}

impl From<CommentWithAuthorEntity> for CommentDto {
    fn from(value: CommentWithAuthorEntity) -> Self {
        Self {
            id: value.comment.id,
            content: value.comment.content,
            created_at: value.comment.created_at,
            user: CommentAuthorDto {
                name: value.author_name,
                avatar_url: value.author_avatar_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_length_bounds() {
        assert!(is_valid_comment_content("a"));
        assert!(is_valid_comment_content(&"x".repeat(1000)));
        assert!(!is_valid_comment_content(&"x".repeat(1001)));
        assert!(!is_valid_comment_content(""));
        assert!(!is_valid_comment_content("   \n"));
    }

    #[test]
    fn comment_length_counts_characters_not_bytes() {
        assert!(is_valid_comment_content(&"é".repeat(1000)));
    }
}
