//! User Record Entity

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::Employee,
        }
    }
}

/// An account, keyed by username. Also the shape of the `currentUser` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl UserRecord {
    pub fn new(username: String, email: String, role: Role) -> Self {
        Self { username, email, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Entity for UserRecord {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.username.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str(Role::Admin.as_str()), Role::Admin);
        assert_eq!(Role::from_str("unknown"), Role::Employee);
    }

    #[test]
    fn test_user_defaults_to_employee() {
        let user: UserRecord = serde_json::from_str(r#"{"username":"alice","email":"a@x.io"}"#).unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.id(), "alice");
    }
}
