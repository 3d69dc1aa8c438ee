use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    operation_transformation::{Position, Selection},
    utils::color::user_color,
};

/// Live caret, selection and typing state of one user in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    pub user_id: String,
    pub display_name: String,
    pub cursor_position: Position,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    pub color: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: DateTime<Utc>,

    #[serde(default)]
    pub is_typing: bool,
}

impl UserPresence {
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let user_id = user_id.into();

        Self {
            color: user_color(&user_id),
            user_id,
            display_name: display_name.into(),
            cursor_position: Position::default(),
            selection: None,
            last_seen: Utc::now(),
            is_typing: false,
        }
    }

    /// Takes over the caret state reported by the user.
    pub fn update_cursor(
        &mut self,
        cursor_position: Position,
        selection: Option<Selection>,
        is_typing: bool,
        now: DateTime<Utc>,
    ) {
        self.cursor_position = cursor_position;
        self.selection = selection;
        self.is_typing = is_typing;
        self.last_seen = now;
    }

    /// Whether the user has been silent for longer than `timeout` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        (now - self.last_seen)
            .to_std()
            .is_ok_and(|silence| silence > timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Join,
    Leave,
    Update,
}
