// src/identity.rs

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The verified claims of a Cognito-issued token.
///
/// Field names follow the wire claim names of the Cognito token payload. A
/// `Claims` value only exists after signature and rule checks have passed;
/// required claims (`sub`, `token_use`, `iat`, `exp`, `iss`) that are absent
/// or mistyped fail deserialization, so a partially populated value never
/// escapes the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(rename = "cognito:username")]
    pub username: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
    pub token_use: String,
    pub scope: Option<String>,
    pub auth_time: Option<i64>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub client_id: Option<String>,
    pub aud: Option<String>,
}

impl Claims {
    /// Projects the claims into a `User` identity for authorization queries.
    ///
    /// The projection is rebuilt per request and never cached.
    pub fn to_user(&self) -> User {
        User {
            id: self.sub.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            groups: self.groups.clone(),
            auth_time: self
                .auth_time
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

/// An authenticated user, as seen by authorization checks.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub groups: Vec<String>,
    pub auth_time: Option<DateTime<Utc>>,
}

impl User {
    /// Checks membership of a single group. Exact, case-sensitive comparison.
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Checks membership of any of the given groups.
    pub fn has_any_group(&self, groups: &[&str]) -> bool {
        groups.iter().any(|g| self.has_group(g))
    }

    /// Checks membership of all of the given groups.
    pub fn has_all_groups(&self, groups: &[&str]) -> bool {
        groups.iter().all(|g| self.has_group(g))
    }

    /// A user is an admin iff they are in the `admin` group.
    pub fn is_admin(&self) -> bool {
        self.has_group("admin")
    }

    /// A user is a manager iff they are in the `manager` group or are an admin.
    pub fn is_manager(&self) -> bool {
        self.has_group("manager") || self.is_admin()
    }

    /// A user is a teacher iff they are in the `teacher` group or are a manager.
    pub fn is_teacher(&self) -> bool {
        self.has_group("teacher") || self.is_manager()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_groups(groups: &[&str]) -> User {
        User {
            id: "user-1".into(),
            email: Some("user@example.com".into()),
            username: Some("user1".into()),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            auth_time: None,
        }
    }

    #[test]
    fn admin_implies_manager_and_teacher() {
        let user = user_with_groups(&["admin"]);
        assert!(user.is_admin());
        assert!(user.is_manager());
        assert!(user.is_teacher());
    }

    #[test]
    fn manager_implies_teacher_but_not_admin() {
        let user = user_with_groups(&["manager"]);
        assert!(!user.is_admin());
        assert!(user.is_manager());
        assert!(user.is_teacher());
    }

    #[test]
    fn teacher_implies_nothing_broader() {
        let user = user_with_groups(&["teacher"]);
        assert!(!user.is_admin());
        assert!(!user.is_manager());
        assert!(user.is_teacher());
    }

    #[test]
    fn no_groups_satisfies_no_role() {
        let user = user_with_groups(&[]);
        assert!(!user.is_admin());
        assert!(!user.is_manager());
        assert!(!user.is_teacher());
    }

    #[test]
    fn group_comparison_is_case_sensitive() {
        let user = user_with_groups(&["Admin"]);
        assert!(!user.is_admin());
        assert!(user.has_group("Admin"));
        assert!(!user.has_any_group(&["admin", "manager"]));
    }

    #[test]
    fn has_all_groups_requires_every_group() {
        let user = user_with_groups(&["teacher", "staff"]);
        assert!(user.has_all_groups(&["teacher", "staff"]));
        assert!(!user.has_all_groups(&["teacher", "admin"]));
    }

    #[test]
    fn to_user_projects_claims() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "user-1",
            "email": "user@example.com",
            "email_verified": true,
            "cognito:username": "user1",
            "cognito:groups": ["teacher"],
            "token_use": "id",
            "auth_time": 1_700_000_000,
            "iat": 1_700_000_000,
            "exp": 1_700_003_600,
            "iss": "https://issuer.example/pool",
            "aud": "client-1"
        }))
        .unwrap();

        let user = claims.to_user();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
        assert_eq!(user.username.as_deref(), Some("user1"));
        assert_eq!(user.groups, vec!["teacher"]);
        assert_eq!(
            user.auth_time,
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
    }

    #[test]
    fn required_claims_must_be_present() {
        // Missing `sub` must fail deserialization rather than default to "".
        let result: Result<Claims, _> = serde_json::from_value(serde_json::json!({
            "token_use": "access",
            "iat": 1, "exp": 2,
            "iss": "https://issuer.example/pool"
        }));
        assert!(result.is_err());
    }
}
