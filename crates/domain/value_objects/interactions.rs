use serde::Serialize;

use crate::domain::value_objects::enums::interaction_types::InteractionType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InteractionStats {
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
}

/// Row changes a toggle applies for one (user, post) pair.
///
/// Toggling flips presence of the requested reaction. Inserting a like or a dislike
/// also clears its opposite so the pair never settles on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Remove(InteractionType),
    Insert {
        kind: InteractionType,
        clear: Option<InteractionType>,
    },
}

impl ToggleAction {
    pub fn plan(kind: InteractionType, currently_present: bool) -> Self {
        if currently_present {
            ToggleAction::Remove(kind)
        } else {
            ToggleAction::Insert {
                kind,
                clear: kind.opposite(),
            }
        }
    }
}

/// Collapses a caller's reactions into the single value the API exposes.
/// A like or dislike outranks a favorite.
pub fn summarize_user_interaction(kinds: &[InteractionType]) -> Option<InteractionType> {
    [
        InteractionType::Like,
        InteractionType::Dislike,
        InteractionType::Favorite,
    ]
    .into_iter()
    .find(|candidate| kinds.contains(candidate))
}

/// Response of the interaction endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSummaryDto {
    pub likes: i64,
    pub dislikes: i64,
    pub comments: i64,
    pub user_interaction: Option<InteractionType>,
}
