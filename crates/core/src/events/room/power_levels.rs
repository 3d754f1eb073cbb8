//! The content of an `m.room.power_levels` event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::UserId;

/// The content of an `m.room.power_levels` event, defining who may do what.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PowerLevelsContent {
    /// The level required to ban a user.
    #[serde(default = "default_moderator_level", skip_serializing_if = "is_moderator_level")]
    pub ban: i64,

    /// The levels required to send specific event types.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, i64>,

    /// The default level required to send message events.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub events_default: i64,

    /// The level required to invite a user.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub invite: i64,

    /// The level required to kick a user.
    #[serde(default = "default_moderator_level", skip_serializing_if = "is_moderator_level")]
    pub kick: i64,

    /// The level required to redact another user's event.
    #[serde(default = "default_moderator_level", skip_serializing_if = "is_moderator_level")]
    pub redact: i64,

    /// The default level required to send state events.
    #[serde(default = "default_moderator_level", skip_serializing_if = "is_moderator_level")]
    pub state_default: i64,

    /// The power levels of specific users.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<UserId, i64>,

    /// The default level of every user in the room.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub users_default: i64,

    /// The levels required for specific notification types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationPowerLevels>,
}

impl Default for PowerLevelsContent {
    fn default() -> Self {
        Self {
            ban: default_moderator_level(),
            events: BTreeMap::new(),
            events_default: 0,
            invite: 0,
            kick: default_moderator_level(),
            redact: default_moderator_level(),
            state_default: default_moderator_level(),
            users: BTreeMap::new(),
            users_default: 0,
            notifications: None,
        }
    }
}

impl PowerLevelsContent {
    /// The effective power level of `user_id`.
    pub fn for_user(&self, user_id: &UserId) -> i64 {
        self.users.get(user_id).copied().unwrap_or(self.users_default)
    }
}

/// The levels required for specific notification types.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NotificationPowerLevels {
    /// The level required to trigger an `@room` notification.
    #[serde(default = "default_moderator_level", skip_serializing_if = "is_moderator_level")]
    pub room: i64,
}

fn default_moderator_level() -> i64 {
    50
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_moderator_level(level: &i64) -> bool {
    *level == default_moderator_level()
}
