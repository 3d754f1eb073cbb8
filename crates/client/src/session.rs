//! Login session state: tokens, refresh, soft-logout recovery.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;
use url::Url;

use fluo_core::client::session::{
    LoginInfo, LoginReqBody, LoginResBody, RefreshTokenReqBody, RefreshTokenResBody, UserIdentifier,
};
use fluo_core::{DeviceId, UnixMillis, UserId};

use crate::api::Requester;
use crate::error::{Error, Result};

/// The persistence boundary of a session.
///
/// The host stores this record however it likes and passes it back to resume
/// a session without logging in again.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginData {
    /// The homeserver base URL.
    pub homeserver: Url,

    /// The access token, if logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The refresh token, if the server issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The user the session belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// The device of this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,

    /// When the access token expires, if it does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<UnixMillis>,
}

impl LoginData {
    /// A logged-out record for the given homeserver.
    pub fn new(homeserver: Url) -> Self {
        Self {
            homeserver,
            access_token: None,
            refresh_token: None,
            user_id: None,
            device_id: None,
            expires_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct Tokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user_id: Option<UserId>,
    device_id: Option<DeviceId>,
    expires_at: Option<UnixMillis>,
}

/// The session of a client: token storage plus the login and refresh flows.
///
/// Authenticated requests fetch the token through [`Session::ensure_access_token`]
/// at dispatch time, so a refresh that happens between two dispatches is
/// picked up by the second one automatically.
pub struct Session {
    requester: Requester,
    tokens: StdMutex<Tokens>,
    // Serializes refreshes so concurrent soft-logouts rotate the refresh
    // token once, not once per caller.
    refresh_lock: AsyncMutex<()>,
}

impl Session {
    pub(crate) fn new(requester: Requester, data: &LoginData) -> Self {
        Self {
            requester,
            tokens: StdMutex::new(Tokens {
                access_token: data.access_token.clone(),
                refresh_token: data.refresh_token.clone(),
                user_id: data.user_id.clone(),
                device_id: data.device_id.clone(),
                expires_at: data.expires_at,
            }),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    /// Whether the session holds an access token.
    pub fn logged_in(&self) -> bool {
        self.tokens.lock().unwrap().access_token.is_some()
    }

    /// Whether the access token has expired as of now.
    pub fn expired(&self) -> bool {
        self.expired_at(UnixMillis::now())
    }

    /// Whether the access token has expired as of `at`.
    pub fn expired_at(&self, at: UnixMillis) -> bool {
        let tokens = self.tokens.lock().unwrap();
        tokens.access_token.is_some() && tokens.expires_at.is_some_and(|expires| expires < at)
    }

    /// The user this session is logged in as, if known.
    pub fn user_id(&self) -> Option<UserId> {
        self.tokens.lock().unwrap().user_id.clone()
    }

    /// The device of this session, if known.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.tokens.lock().unwrap().device_id.clone()
    }

    /// The persistable form of the session.
    pub fn to_login_data(&self) -> LoginData {
        let tokens = self.tokens.lock().unwrap();
        LoginData {
            homeserver: self.requester.homeserver().clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            user_id: tokens.user_id.clone(),
            device_id: tokens.device_id.clone(),
            expires_at: tokens.expires_at,
        }
    }

    /// Logs in with a username (or full user ID) and password.
    pub async fn password_login(
        &self,
        identifier: impl Into<String>,
        password: impl Into<String>,
        initial_device_display_name: Option<String>,
        device_id: Option<DeviceId>,
    ) -> Result<()> {
        self.login(LoginReqBody {
            login_info: LoginInfo::Password {
                identifier: UserIdentifier::User { user: identifier.into() },
                password: password.into(),
            },
            device_id,
            initial_device_display_name,
            refresh_token: true,
        })
        .await
    }

    /// Logs in with a login token, e.g. from SSO.
    pub async fn token_login(
        &self,
        token: impl Into<String>,
        initial_device_display_name: Option<String>,
        device_id: Option<DeviceId>,
    ) -> Result<()> {
        self.login(LoginReqBody {
            login_info: LoginInfo::Token { token: token.into() },
            device_id,
            initial_device_display_name,
            refresh_token: true,
        })
        .await
    }

    async fn login(&self, body: LoginReqBody) -> Result<()> {
        let url = self.requester.endpoint(&["login"], &[])?;
        let response: LoginResBody =
            self.requester.request(http::Method::POST, url, None, Some(&body)).await?;

        debug!(user_id = %response.user_id, "logged in");
        let mut tokens = self.tokens.lock().unwrap();
        tokens.access_token = Some(response.access_token);
        tokens.refresh_token = response.refresh_token;
        tokens.user_id = Some(response.user_id);
        tokens.device_id = Some(response.device_id);
        tokens.expires_at = expires_at_from(response.expires_in_ms);
        Ok(())
    }

    /// Obtains a new access token from the refresh token.
    ///
    /// Fails with [`Error::LoginRequired`] when there is no refresh token or
    /// when the server no longer recognizes it.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.do_refresh().await
    }

    /// Refreshes unless another task already rotated the token that failed.
    async fn refresh_unless_rotated(&self, failed_token: &str) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        if self.tokens.lock().unwrap().access_token.as_deref() != Some(failed_token) {
            return Ok(());
        }
        self.do_refresh().await
    }

    async fn do_refresh(&self) -> Result<()> {
        let refresh_token =
            self.tokens.lock().unwrap().refresh_token.clone().ok_or(Error::LoginRequired)?;

        let url = self.requester.endpoint(&["refresh"], &[])?;
        let body = RefreshTokenReqBody { refresh_token };
        let result: Result<RefreshTokenResBody> =
            self.requester.request(http::Method::POST, url, None, Some(&body)).await;

        match result {
            Ok(response) => {
                debug!("access token refreshed");
                let mut tokens = self.tokens.lock().unwrap();
                tokens.access_token = Some(response.access_token);
                if let Some(refresh_token) = response.refresh_token {
                    tokens.refresh_token = Some(refresh_token);
                }
                tokens.expires_at = expires_at_from(response.expires_in_ms);
                Ok(())
            }
            Err(e) if e.is_unknown_token().is_some() => {
                self.clear();
                Err(Error::LoginRequired)
            }
            Err(e) => Err(e),
        }
    }

    /// The current access token, refreshing first if it has expired.
    ///
    /// Called at dispatch time by every authenticated request; the token is
    /// never captured earlier by a request builder.
    pub async fn ensure_access_token(&self) -> Result<String> {
        let expired_token = {
            let tokens = self.tokens.lock().unwrap();
            match &tokens.access_token {
                None => return Err(Error::LoginRequired),
                Some(token) => {
                    let expired = tokens.expires_at.is_some_and(|expires| expires < UnixMillis::now());
                    if !expired {
                        return Ok(token.clone());
                    }
                    token.clone()
                }
            }
        };
        // Skipped if a concurrent dispatch already rotated this token.
        self.refresh_unless_rotated(&expired_token).await?;
        self.tokens.lock().unwrap().access_token.clone().ok_or(Error::LoginRequired)
    }

    /// Reacts to an `M_UNKNOWN_TOKEN` response for `failed_token`.
    ///
    /// Returns the error the failing request should yield: [`Error::Retry`]
    /// after a successful soft-logout refresh, [`Error::LoginRequired`] when
    /// the session is gone for good.
    pub(crate) async fn handle_unknown_token(&self, soft_logout: bool, failed_token: &str) -> Error {
        if soft_logout {
            debug!("soft logout, refreshing access token");
            match self.refresh_unless_rotated(failed_token).await {
                Ok(()) => Error::Retry,
                Err(e) => e,
            }
        } else {
            self.clear();
            Error::LoginRequired
        }
    }

    fn clear(&self) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.access_token = None;
        tokens.refresh_token = None;
        tokens.expires_at = None;
    }
}

fn expires_at_from(expires_in: Option<Duration>) -> Option<UnixMillis> {
    expires_in.map(|d| UnixMillis::now().saturating_add(d))
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("homeserver", self.requester.homeserver())
            .field("logged_in", &self.logged_in())
            .finish_non_exhaustive()
    }
}
