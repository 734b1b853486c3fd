//! # authstore
//!
//! Client-side authentication state for a web front-end: the current user's
//! profile, a session token, and a login flag, kept in sync with a `token`
//! cookie and with the outgoing-request layer that talks to `/auth/*`.
//!
//! [`AuthStore`] is the state container. It depends on two seams:
//! [`RequestLayer`] (shipped as the reqwest-backed [`HttpClient`]) and
//! [`DocumentCookies`] (shipped as [`MemoryDocument`], plus
//! `BrowserDocument` behind the `hydrate` feature).

#[cfg(feature = "hydrate")]
pub mod browser;
pub mod config;
pub mod cookies;
pub mod request;
pub mod session;
pub mod store;

#[cfg(feature = "hydrate")]
pub use browser::BrowserDocument;
pub use config::{ClientConfig, ConfigError, StoreOptions};
pub use cookies::{CookieOptions, DocumentCookies, MemoryDocument, SameSitePolicy, TOKEN_COOKIE};
pub use request::{HttpClient, RequestError, RequestLayer};
pub use session::{SessionState, UserFields, UserProfile};
pub use store::{AuthError, AuthStore};
