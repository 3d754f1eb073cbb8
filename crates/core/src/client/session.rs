//! `POST /_matrix/client/v3/login` and `POST /_matrix/client/v3/refresh`
//!
//! [login]: https://spec.matrix.org/latest/client-server-api/#post_matrixclientv3login
//! [refresh]: https://spec.matrix.org/latest/client-server-api/#post_matrixclientv3refresh

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DeviceId, UserId};

/// Request type for the `login` endpoint.
#[derive(Serialize, Debug)]
pub struct LoginReqBody {
    /// The authentication mechanism.
    #[serde(flatten)]
    pub login_info: LoginInfo,

    /// ID of the client device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,

    /// A display name to assign to the newly-created device.
    ///
    /// Ignored if `device_id` corresponds to a known device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_device_display_name: Option<String>,

    /// If set to `true`, the client supports [refresh tokens].
    ///
    /// [refresh tokens]: https://spec.matrix.org/latest/client-server-api/#refreshing-access-tokens
    #[serde(skip_serializing_if = "crate::serde::is_default")]
    pub refresh_token: bool,
}

/// The authentication mechanism.
#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum LoginInfo {
    /// An identifier and password are supplied to authenticate.
    #[serde(rename = "m.login.password")]
    Password {
        /// Identification information for the user.
        identifier: UserIdentifier,

        /// The password.
        password: String,
    },

    /// Token-based login.
    #[serde(rename = "m.login.token")]
    Token {
        /// The token.
        token: String,
    },
}

/// Identification information for the user.
#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum UserIdentifier {
    /// Either a fully qualified Matrix user ID, or just the localpart.
    #[serde(rename = "m.id.user")]
    User {
        /// The user ID or localpart.
        user: String,
    },
}

/// Response type for the `login` endpoint.
#[derive(Deserialize, Debug)]
pub struct LoginResBody {
    /// The fully-qualified Matrix ID that has been registered.
    pub user_id: UserId,

    /// An access token for the account.
    pub access_token: String,

    /// ID of the logged-in device.
    pub device_id: DeviceId,

    /// A refresh token for the account.
    ///
    /// This token can be used to obtain a new access token when it expires by
    /// calling the `refresh` endpoint.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The lifetime of the access token, in milliseconds.
    ///
    /// If this is `None`, the client can assume that the access token will
    /// not expire.
    #[serde(default, with = "crate::serde::duration_opt_ms")]
    pub expires_in_ms: Option<Duration>,
}

/// Request type for the `refresh` endpoint.
#[derive(Serialize, Debug)]
pub struct RefreshTokenReqBody {
    /// The refresh token.
    pub refresh_token: String,
}

/// Response type for the `refresh` endpoint.
#[derive(Deserialize, Debug)]
pub struct RefreshTokenResBody {
    /// The new access token to use.
    pub access_token: String,

    /// The new refresh token to use when the access token needs to be
    /// refreshed again.
    ///
    /// If this is `None`, the old refresh token can be re-used.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The lifetime of the access token, in milliseconds.
    #[serde(default, with = "crate::serde::duration_opt_ms")]
    pub expires_in_ms: Option<Duration>,
}
