//! Authentication and authorization types for Watchpost.
//!
//! This module provides:
//! - User, role, and account status definitions
//! - Password hashing with bcrypt
//! - JWT issuing and verification

pub mod password;
pub mod token;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use password::{hash_password, verify_password, PasswordError};
pub use token::{parse_ttl, Claims, IssuedToken, TokenError, TokenService};

/// User roles, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// Full access, including user administration.
    Admin,
    /// Can create and modify incidents and threats.
    Analyst,
    /// Read-only access to dashboards, incidents, and threats.
    #[default]
    Viewer,
}

impl Role {
    /// Returns the role name as stored and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Analyst => "Analyst",
            Role::Viewer => "Viewer",
        }
    }

    /// Returns true if this role has at least the permissions of the given role.
    pub fn has_permission(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::Analyst, Role::Analyst | Role::Viewer) => true,
            (Role::Viewer, Role::Viewer) => true,
            _ => false,
        }
    }

    /// Returns true if this role appears in the allow-list.
    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Account state. Only `Active` accounts can log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Disabled => "Disabled",
            UserStatus::Deleted => "Deleted",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "disabled" => Ok(UserStatus::Disabled),
            "deleted" => Ok(UserStatus::Deleted),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// A user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Email address (unique, lowercased).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Bcrypt password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active user. The email is normalized to lowercase.
    pub fn new(
        email: impl AsRef<str>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email.as_ref()),
            name: name.into(),
            password_hash: password_hash.into(),
            role,
            status: UserStatus::Active,
            last_login_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Returns true if the user has at least the given role's permissions.
    pub fn has_permission(&self, required: Role) -> bool {
        self.role.has_permission(required)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Public projection of a user embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Lowercases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.has_permission(Role::Analyst));
        assert!(Role::Analyst.has_permission(Role::Viewer));
        assert!(!Role::Viewer.has_permission(Role::Analyst));
        assert!(!Role::Analyst.has_permission(Role::Admin));
    }

    #[test]
    fn test_role_allow_list() {
        let writers = [Role::Admin, Role::Analyst];
        assert!(Role::Analyst.is_one_of(&writers));
        assert!(!Role::Viewer.is_one_of(&writers));
    }

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [Role::Admin, Role::Analyst, Role::Viewer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new("  Jane.Doe@Example.COM ", "Jane", "hash", Role::Analyst);
        assert_eq!(user.email, "jane.doe@example.com");
        assert!(user.is_active());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@b.io", "A", "secret-hash", Role::Viewer);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"Viewer\""));
    }
}
