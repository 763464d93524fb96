//! Session user types

use serde::{Deserialize, Serialize};

/// Role used for dashboard access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Viewer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Manager => write!(f, "manager"),
            UserRole::Viewer => write!(f, "viewer"),
        }
    }
}

/// Authenticated dashboard user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub onboarding_complete: bool,
}

impl SessionUser {
    /// Merge a partial update into the user, leaving unset fields alone
    pub fn apply(&mut self, update: SessionUserUpdate) {
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(done) = update.onboarding_complete {
            self.onboarding_complete = done;
        }
    }
}

/// Login request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Partial user update (onboarding fields, display fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: 1,
            username: "ana".to_string(),
            email: None,
            name: None,
            role: UserRole::Manager,
            avatar_url: None,
            onboarding_complete: false,
        }
    }

    #[test]
    fn apply_merges_only_set_fields() {
        let mut u = user();
        u.apply(SessionUserUpdate {
            name: Some("Ana".to_string()),
            onboarding_complete: Some(true),
            ..Default::default()
        });
        assert_eq!(u.name.as_deref(), Some("Ana"));
        assert!(u.onboarding_complete);
        assert_eq!(u.email, None);
        assert_eq!(u.role, UserRole::Manager);
    }

    #[test]
    fn role_deserializes_lowercase() {
        let u: SessionUser =
            serde_json::from_str(r#"{"id":1,"username":"a","role":"admin"}"#).unwrap();
        assert_eq!(u.role, UserRole::Admin);
        assert!(!u.onboarding_complete);
    }
}
