//! Browser document cookies via `web-sys` (`hydrate` feature).
//!
//! Reads and writes `document.cookie` directly, so it only works on the main
//! thread of a page. Outside a page every read is empty and writes are dropped
//! with a warning.

use wasm_bindgen::JsCast;

use crate::cookies::{CookieOptions, DocumentCookies, removal_cookie, write_cookie};

/// `DocumentCookies` backed by the live page's `document.cookie`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserDocument;

fn html_document() -> Option<web_sys::HtmlDocument> {
    web_sys::window()?
        .document()?
        .dyn_into::<web_sys::HtmlDocument>()
        .ok()
}

fn assign(cookie: &str) {
    let Some(document) = html_document() else {
        tracing::warn!("no document; cookie write dropped");
        return;
    };
    if let Err(e) = document.set_cookie(cookie) {
        tracing::warn!(error = ?e, "document.cookie write failed");
    }
}

impl DocumentCookies for BrowserDocument {
    fn cookie_header(&self) -> String {
        html_document()
            .and_then(|document| document.cookie().ok())
            .unwrap_or_default()
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        assign(&write_cookie(name, value, options).encoded().to_string());
    }

    fn remove(&self, name: &str, options: &CookieOptions) {
        assign(&removal_cookie(name, options).encoded().to_string());
    }
}
