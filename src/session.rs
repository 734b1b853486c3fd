//! Session state model — the user profile, login flag, and token.
//!
//! DESIGN
//! ======
//! The profile keeps two typed fields (`roles`, `name`) and an open-ended
//! `custom` map for whatever else the server sends. Merging supplied fields
//! over the default profile is a shallow key overwrite, after which the typed
//! fields are coerced back into shape so a profile never loses them.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw user fields as received from the server or supplied by the host.
pub type UserFields = Map<String, Value>;

/// Current user's profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Role names granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Display name, if known.
    #[serde(default)]
    pub name: Option<String>,
    /// Every other field the server attached to the profile.
    #[serde(flatten)]
    pub custom: UserFields,
}

impl UserProfile {
    /// Build a profile from raw fields.
    ///
    /// `roles` that is missing, `null`, or not a list becomes empty and
    /// non-string entries are dropped. A non-string `name` becomes `None`.
    #[must_use]
    pub fn from_fields(mut fields: UserFields) -> Self {
        let roles = match fields.remove("roles") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(role) => Some(role),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let name = match fields.remove("name") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        };
        Self { roles, name, custom: fields }
    }

    /// Flatten the profile back into raw fields.
    #[must_use]
    pub fn to_fields(&self) -> UserFields {
        let mut fields = self.custom.clone();
        fields.insert(
            "roles".to_owned(),
            Value::Array(self.roles.iter().cloned().map(Value::String).collect()),
        );
        fields.insert(
            "name".to_owned(),
            self.name.clone().map_or(Value::Null, Value::String),
        );
        fields
    }

    /// Return a new profile with `fields` shallow-merged over this one.
    #[must_use]
    pub fn merged_with(&self, fields: UserFields) -> Self {
        let mut merged = self.to_fields();
        merged.extend(fields);
        Self::from_fields(merged)
    }
}

/// Authentication state held by the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Current profile, or the default profile when logged out.
    pub user: UserProfile,
    /// Whether the last `set_user` received a user.
    pub logged_in: bool,
    /// Session token mirrored into the `token` cookie.
    pub token: Option<String>,
}

impl SessionState {
    /// Logged-out state seeded with `default_user` merged over the base shape.
    #[must_use]
    pub fn with_default_user(default_user: UserFields) -> Self {
        Self {
            user: UserProfile::default().merged_with(default_user),
            logged_in: false,
            token: None,
        }
    }
}
