//! Caller resolution and the ownership predicate.
//!
//! Every handler follows the same order: authenticate, gate on role,
//! load the target (404 if missing), then check ownership with
//! [`is_party`]. Appointments and medical records share the predicate.

use rusqlite::Connection;
use uuid::Uuid;

use crate::crypto::TokenIssuer;
use crate::db::repository::{doctor_id_for_user, get_user};
use crate::error::ServiceError;
use crate::models::{Role, User};

// ═══════════════════════════════════════════════════════════
// Caller
// ═══════════════════════════════════════════════════════════

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    /// Linked doctor profile, for doctors that have one.
    pub doctor_id: Option<i64>,
}

impl Caller {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Resolve the caller from candidate tokens, in priority order.
///
/// The first token that verifies and names an existing user wins; an
/// invalid bearer token falls through to the cookie. Never fails: every
/// problem is logged and degrades to `None`.
pub fn resolve_caller<'a, I>(conn: &Connection, tokens: &TokenIssuer, candidates: I) -> Option<Caller>
where
    I: IntoIterator<Item = &'a str>,
{
    for candidate in candidates {
        let claims = match tokens.verify(candidate) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                continue;
            }
        };

        let user = match get_user(conn, &claims.sub) {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!(user_id = %claims.sub, "Token names a deleted user");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Caller lookup failed");
                return None;
            }
        };

        let doctor_id = if user.role == Role::Doctor {
            match doctor_id_for_user(conn, &user.id) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(error = %e, "Doctor profile lookup failed");
                    return None;
                }
            }
        } else {
            None
        };

        return Some(Caller { user, doctor_id });
    }
    None
}

// ═══════════════════════════════════════════════════════════
// Gates
// ═══════════════════════════════════════════════════════════

/// Unwrap a resolved caller or fail with 401.
pub fn require_caller(caller: Option<Caller>) -> Result<Caller, ServiceError> {
    caller.ok_or(ServiceError::Unauthenticated)
}

fn require_role(caller: &Caller, role: Role) -> Result<(), ServiceError> {
    if caller.role() == role {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!("Only a {role} may do this")))
    }
}

pub fn require_patient(caller: &Caller) -> Result<(), ServiceError> {
    require_role(caller, Role::Patient)
}

pub fn require_doctor(caller: &Caller) -> Result<(), ServiceError> {
    require_role(caller, Role::Doctor)
}

pub fn require_admin(caller: &Caller) -> Result<(), ServiceError> {
    require_role(caller, Role::Admin)
}

/// Doctor role gate that also requires a linked profile, returning its id.
pub fn require_doctor_profile(caller: &Caller) -> Result<i64, ServiceError> {
    require_doctor(caller)?;
    caller
        .doctor_id
        .ok_or_else(|| ServiceError::forbidden("No doctor profile is linked to this account"))
}

// ═══════════════════════════════════════════════════════════
// Ownership
// ═══════════════════════════════════════════════════════════

/// True iff the caller is the patient, or a doctor whose linked profile is `doctor_id`.
pub fn is_party(caller: &Caller, patient_id: &Uuid, doctor_id: i64) -> bool {
    caller.id() == *patient_id || is_owning_doctor(caller, doctor_id)
}

/// True iff the caller is the doctor linked to `doctor_id`.
pub fn is_owning_doctor(caller: &Caller, doctor_id: i64) -> bool {
    caller.role() == Role::Doctor && caller.doctor_id == Some(doctor_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use crate::db::repository::{insert_doctor, insert_user};
    use crate::db::sqlite::open_memory_database;
    use crate::models::NewDoctor;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "x".into(),
            role,
            created_at: Utc::now(),
        }
    }

    fn caller(role: Role, doctor_id: Option<i64>) -> Caller {
        Caller {
            user: user(role),
            doctor_id,
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            SigningSecret::new(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap(),
            3600,
        )
    }

    #[test]
    fn patient_is_party_to_own_appointment() {
        let patient = caller(Role::Patient, None);
        assert!(is_party(&patient, &patient.id(), 7));
        assert!(!is_party(&patient, &Uuid::new_v4(), 7));
    }

    #[test]
    fn doctor_is_party_only_through_linked_profile() {
        let doctor = caller(Role::Doctor, Some(7));
        assert!(is_party(&doctor, &Uuid::new_v4(), 7));
        assert!(!is_party(&doctor, &Uuid::new_v4(), 8));

        let unlinked = caller(Role::Doctor, None);
        assert!(!is_party(&unlinked, &Uuid::new_v4(), 7));
    }

    #[test]
    fn non_doctor_with_matching_id_is_not_party() {
        let admin = caller(Role::Admin, Some(7));
        assert!(!is_party(&admin, &Uuid::new_v4(), 7));
        assert!(!is_owning_doctor(&admin, 7));
    }

    #[test]
    fn role_gates() {
        let patient = caller(Role::Patient, None);
        assert!(require_patient(&patient).is_ok());
        assert!(matches!(require_doctor(&patient), Err(ServiceError::Forbidden(_))));
        assert!(matches!(require_admin(&patient), Err(ServiceError::Forbidden(_))));

        let doctor = caller(Role::Doctor, None);
        assert!(require_doctor(&doctor).is_ok());
        assert!(matches!(require_doctor_profile(&doctor), Err(ServiceError::Forbidden(_))));
        assert_eq!(require_doctor_profile(&caller(Role::Doctor, Some(3))).unwrap(), 3);
    }

    #[test]
    fn missing_caller_is_unauthenticated() {
        assert!(matches!(require_caller(None), Err(ServiceError::Unauthenticated)));
    }

    #[test]
    fn resolves_doctor_with_linked_profile() {
        let conn = open_memory_database().unwrap();
        let doctor_user = user(Role::Doctor);
        insert_user(&conn, &doctor_user).unwrap();
        let profile = insert_doctor(
            &conn,
            &NewDoctor {
                user_id: Some(doctor_user.id),
                name: "Dr Test".into(),
                specialization: "ENT".into(),
                city: "Goa".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let tokens = issuer();
        let token = tokens.issue(&doctor_user).unwrap();
        let resolved = resolve_caller(&conn, &tokens, [token.as_str()]).unwrap();
        assert_eq!(resolved.id(), doctor_user.id);
        assert_eq!(resolved.doctor_id, Some(profile.id));
    }

    #[test]
    fn invalid_first_candidate_falls_through() {
        let conn = open_memory_database().unwrap();
        let patient = user(Role::Patient);
        insert_user(&conn, &patient).unwrap();
        let tokens = issuer();
        let token = tokens.issue(&patient).unwrap();

        let resolved = resolve_caller(&conn, &tokens, ["garbage", token.as_str()]).unwrap();
        assert_eq!(resolved.id(), patient.id);
        assert_eq!(resolved.doctor_id, None);
    }

    #[test]
    fn unknown_user_or_bad_token_resolves_to_none() {
        let conn = open_memory_database().unwrap();
        let tokens = issuer();
        let ghost = tokens.issue(&user(Role::Patient)).unwrap();
        assert!(resolve_caller(&conn, &tokens, [ghost.as_str()]).is_none());
        assert!(resolve_caller(&conn, &tokens, ["a.b.c"]).is_none());
        assert!(resolve_caller(&conn, &tokens, std::iter::empty::<&str>()).is_none());
    }
}
