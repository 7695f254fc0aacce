use serde::{Deserialize, Serialize};

use crate::error::RoleError;

/// The authenticated principal of the current session.
///
/// Owned by the session store; everything else only reads it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-assigned unique id.
    pub id: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Bearer token attached by the authenticated HTTP adapter.
    pub id_token: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            photo_url: None,
            id_token: id_token.into(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Apply a profile update in place.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(url) = &update.photo_url {
            self.photo_url = Some(url.clone());
        }
    }
}

// The token must not end up in logs.
impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Display attributes that `update_profile` may change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Coarse authorization label.
///
/// Roles are exact-match labels, not a hierarchy: `Admin` does not imply
/// `Moderator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Parse a role name as returned by the API.
    pub fn parse(name: &str) -> Result<Self, RoleError> {
        match name.trim() {
            "student" => Ok(Role::Student),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "" => Err(RoleError::Missing),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

/// A resolved role for one identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleRecord {
    pub identity_id: String,
    pub email: String,
    pub role: Role,
}
