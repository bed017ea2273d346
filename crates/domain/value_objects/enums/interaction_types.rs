use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Like,
    Dislike,
    Favorite,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Like => "like",
            InteractionType::Dislike => "dislike",
            InteractionType::Favorite => "favorite",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "like" => Some(InteractionType::Like),
            "dislike" => Some(InteractionType::Dislike),
            "favorite" => Some(InteractionType::Favorite),
            _ => None,
        }
    }

    /// The reaction that cannot coexist with this one. Favorites sit on their own axis.
    pub fn opposite(&self) -> Option<Self> {
        match self {
            InteractionType::Like => Some(InteractionType::Dislike),
            InteractionType::Dislike => Some(InteractionType::Like),
            InteractionType::Favorite => None,
        }
    }
}

impl Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
