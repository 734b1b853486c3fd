//! Auth store — session state plus the mutations and actions that drive it.
//!
//! SYSTEM CONTEXT
//! ==============
//! A host (page shell, server renderer, CLI) owns one `AuthStore` and
//! dispatches actions on it. Mutations are synchronous and the only way state
//! changes; actions await the request layer and commit mutations as results
//! arrive.
//!
//! DESIGN
//! ======
//! - Browser vs. server rendering is decided by whether a document cookie
//!   store is attached. Server-side callers pass the inbound request headers
//!   into the actions that read the token cookie.
//! - The default state is an immutable template; every reset clones it.
//! - Actions take `&mut self`, so one store never runs two actions at once.
//!
//! ERROR HANDLING
//! ==============
//! `fetch` and `logout` absorb every failure and leave the store logged out.
//! `login` returns its request failure to the caller.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::sync::Arc;

use reqwest::header::{COOKIE, HeaderMap};
use serde::Serialize;
use serde_json::Value;

use crate::config::StoreOptions;
use crate::cookies::{self, CookieOptions, DocumentCookies, TOKEN_COOKIE};
use crate::request::{RequestError, RequestLayer};
use crate::session::{SessionState, UserFields, UserProfile};

pub const USER_PATH: &str = "/auth/user";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Errors surfaced by [`AuthStore::login`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("login fields could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("response missing `{0}`")]
    MissingField(&'static str),
}

/// Why a profile response could not be applied.
#[derive(Debug, thiserror::Error)]
enum ProfileError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("profile response is not an object")]
    NotAnObject,
    #[error("profile `user` is not an object")]
    UserNotAnObject,
}

/// Client-side authentication state synchronized with a cookie and a
/// request layer.
pub struct AuthStore<R> {
    defaults: SessionState,
    state: SessionState,
    token_cookie: CookieOptions,
    requests: R,
    document: Option<Arc<dyn DocumentCookies>>,
}

impl<R: RequestLayer> AuthStore<R> {
    /// Store in server-rendering context (no document attached).
    #[must_use]
    pub fn new(options: StoreOptions, requests: R) -> Self {
        let defaults = SessionState::with_default_user(options.default_user);
        Self { state: defaults.clone(), defaults, token_cookie: options.token_cookie, requests, document: None }
    }

    /// Attach a live document cookie store (browser context).
    #[must_use]
    pub fn with_document(mut self, document: Arc<dyn DocumentCookies>) -> Self {
        self.document = Some(document);
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.state.user
    }

    #[must_use]
    pub fn logged_in(&self) -> bool {
        self.state.logged_in
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    #[must_use]
    pub fn requests(&self) -> &R {
        &self.requests
    }

    /// Whether a document cookie store is attached.
    #[must_use]
    pub fn in_browser(&self) -> bool {
        self.document.is_some()
    }

    /// Copy of the current state, e.g. for handing server-rendered state to
    /// the browser.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Adopt state rendered elsewhere.
    ///
    /// Goes through the mutations: a logged-in profile is merged over this
    /// store's default user, a logged-out one resets to it, and the token
    /// reaches the request layer and the document.
    pub fn hydrate(&mut self, state: SessionState) {
        let SessionState { user, logged_in, token } = state;
        self.set_user(logged_in.then(|| user.to_fields()));
        self.set_token(token);
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Replace the profile with `user` merged over the default user, or reset
    /// it to the default when `user` is `None`.
    ///
    /// `logged_in` follows the argument, not the merged profile.
    pub fn set_user(&mut self, user: Option<UserFields>) {
        self.state.logged_in = user.is_some();
        self.state.user = match user {
            Some(fields) => self.defaults.user.merged_with(fields),
            None => self.defaults.user.clone(),
        };
    }

    /// Store `token`, hand it to the request layer, and mirror it into the
    /// document's `token` cookie. An empty token counts as no token.
    pub fn set_token(&mut self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        self.requests.set_token(token.as_deref());
        if let Some(document) = &self.document {
            match &token {
                Some(value) => document.set(TOKEN_COOKIE, value, &self.token_cookie),
                None => document.remove(TOKEN_COOKIE, &self.token_cookie),
            }
        }
        self.state.token = token;
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Read the `token` cookie and commit it.
    ///
    /// The cookie header comes from the attached document when there is one,
    /// otherwise from `request` (the inbound request being rendered).
    pub fn load_token(&mut self, request: Option<&HeaderMap>) {
        let header = match &self.document {
            Some(document) => document.cookie_header(),
            None => request.map(inbound_cookie_header).unwrap_or_default(),
        };
        let token = cookies::parse_cookie_header(&header).remove(TOKEN_COOKIE);
        self.set_token(token);
    }

    /// Load the token and, if there is one, fetch the user's profile.
    ///
    /// Any failure while fetching logs the session out.
    pub async fn fetch(&mut self, request: Option<&HeaderMap>) {
        self.load_token(request);
        self.refresh_profile().await;
    }

    /// Post credentials, store the returned token, then fetch the profile.
    ///
    /// In browser context the follow-up is a full [`Self::fetch`], which
    /// reads the token back from the cookie just written. A server-side
    /// store has no cookie to read back, so it fetches the profile with the
    /// token it was just given.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if `fields` cannot be encoded, the login request
    /// fails, or the response carries no `id_token`. Nothing is committed in
    /// those cases.
    pub async fn login<F>(&mut self, fields: &F) -> Result<(), AuthError>
    where
        F: Serialize + ?Sized,
    {
        let body = serde_json::to_value(fields).map_err(AuthError::Encode)?;
        let resp = self.requests.post(LOGIN_PATH, &body).await?;
        let token = resp
            .get("id_token")
            .and_then(Value::as_str)
            .ok_or(AuthError::MissingField("id_token"))?;

        tracing::info!(in_browser = self.in_browser(), "login accepted");
        self.set_token(Some(token.to_owned()));
        if self.in_browser() {
            self.fetch(None).await;
        } else {
            self.refresh_profile().await;
        }
        Ok(())
    }

    /// Drop the profile immediately, tell the server, and clear the token
    /// whether or not the server call succeeded.
    pub async fn logout(&mut self) {
        self.set_user(None);
        if let Err(e) = self.requests.get(LOGOUT_PATH).await {
            tracing::debug!(error = %e, "server logout failed; clearing local token anyway");
        }
        self.set_token(None);
        tracing::info!("logged out");
    }

    /// Fetch the profile for the committed token; log out on any failure.
    async fn refresh_profile(&mut self) {
        if self.state.token.is_none() {
            tracing::debug!("no session token; skipping profile fetch");
            return;
        }

        match self.fetch_profile().await {
            Ok(user) => {
                tracing::debug!(logged_in = user.is_some(), "profile loaded");
                self.set_user(user);
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed; logging out");
                self.logout().await;
            }
        }
    }

    async fn fetch_profile(&self) -> Result<Option<UserFields>, ProfileError> {
        let body = self.requests.get(USER_PATH).await?;
        let Value::Object(mut body) = body else {
            return Err(ProfileError::NotAnObject);
        };
        match body.remove("user") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(user)) => Ok(Some(user)),
            Some(_) => Err(ProfileError::UserNotAnObject),
        }
    }
}

/// Join every inbound `Cookie` header into one header value.
fn inbound_cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}
