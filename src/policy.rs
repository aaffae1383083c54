//! Pure authorization predicates. No I/O: decisions are made from the
//! actor's and resource's role/ownership fields alone.

use crate::core::errors::ApiError;
use crate::models::models::User;

/// A named predicate result. Handlers build an explicit ordered list of
/// these per operation instead of composing permission objects.
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
}

impl Check {
    pub fn new(name: &'static str, passed: bool) -> Self {
        Check { name, passed }
    }
}

/// Update/delete rights on a Post or Comment: the recorded author, or
/// any staff user.
pub fn can_modify(actor: &User, author_id: &str) -> bool {
    actor.id == author_id || actor.is_staff
}

/// Gate for the admin-scoped management surface.
pub fn is_admin(actor: &User) -> bool {
    actor.is_staff
}

/// Evaluate checks as a conjunction: all must pass, the first failure
/// yields Forbidden carrying the failed check's name.
pub fn enforce(checks: &[Check]) -> Result<(), ApiError> {
    match checks.iter().find(|c| !c.passed) {
        Some(failed) => Err(ApiError::Forbidden(format!(
            "Permission denied: {}",
            failed.name
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::helpers::now_iso;

    fn user(id: &str, is_staff: bool) -> User {
        User {
            id: id.to_string(),
            username: format!("user-{}", id),
            email: format!("{}@example.com", id),
            password: "hash".to_string(),
            bio: None,
            is_staff,
            is_active: true,
            created_at: now_iso(),
        }
    }

    #[test]
    fn author_can_modify_own_resource() {
        assert!(can_modify(&user("a", false), "a"));
    }

    #[test]
    fn non_author_cannot_modify() {
        assert!(!can_modify(&user("b", false), "a"));
    }

    #[test]
    fn staff_can_modify_anything() {
        assert!(can_modify(&user("b", true), "a"));
        assert!(can_modify(&user("a", true), "a"));
    }

    #[test]
    fn admin_gate_follows_staff_flag() {
        assert!(is_admin(&user("a", true)));
        assert!(!is_admin(&user("a", false)));
    }

    #[test]
    fn enforce_is_a_conjunction() {
        assert!(enforce(&[Check::new("a", true), Check::new("b", true)]).is_ok());

        let err = enforce(&[Check::new("a", true), Check::new("b", false)]).unwrap_err();
        match err {
            ApiError::Forbidden(detail) => assert!(detail.contains("b")),
            other => panic!("expected Forbidden, got {}", other),
        }
    }

    #[test]
    fn enforce_reports_first_failure() {
        let err = enforce(&[
            Check::new("first", false),
            Check::new("second", false),
        ])
        .unwrap_err();
        match err {
            ApiError::Forbidden(detail) => assert!(detail.contains("first")),
            other => panic!("expected Forbidden, got {}", other),
        }
    }
}
