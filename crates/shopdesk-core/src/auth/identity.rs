use serde::{Deserialize, Serialize};

/// Role name that grants admin access.
pub const ADMIN_ROLE: &str = "admin";

/// Reserved role identifier of the admin role.
pub const ADMIN_ROLE_ID: i64 = 1;

/// The authenticated identity returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE) || self.role_id == Some(ADMIN_ROLE_ID)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == permission)
    }

    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.email.as_deref().unwrap_or("unknown user")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<&str>, role_id: Option<i64>) -> User {
        User {
            id: Some(7),
            name: "Dana".to_string(),
            email: Some("dana@example.com".to_string()),
            role: role.map(str::to_string),
            role_id,
            permissions: vec!["sales:create".to_string()],
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(user(Some("admin"), None).is_admin());
        assert!(user(None, Some(1)).is_admin());
        assert!(user(Some("cashier"), Some(1)).is_admin());

        assert!(!user(Some("cashier"), Some(2)).is_admin());
        assert!(!user(Some("Admin"), None).is_admin());
        assert!(!user(None, None).is_admin());
    }

    #[test]
    fn test_has_permission() {
        let cashier = user(Some("cashier"), Some(3));
        assert!(cashier.has_permission("sales:create"));
        assert!(!cashier.has_permission("products:delete"));
        assert!(user(Some("admin"), None).has_permission("products:delete"));
    }

    #[test]
    fn test_parse_minimal_user() {
        let parsed: User = serde_json::from_str(r#"{"name":"Lee","role_id":1}"#).unwrap();
        assert_eq!(parsed.name, "Lee");
        assert!(parsed.permissions.is_empty());
        assert!(parsed.is_admin());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut u = user(None, None);
        u.name.clear();
        assert_eq!(u.display_name(), "dana@example.com");
    }
}
