//! Account service: signup, login, admin bootstrap and account deletion.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::Caller;
use crate::crypto::{dummy_hash, hash_password, verify_password, TokenIssuer};
use crate::db::repository;
use crate::error::ServiceError;
use crate::models::{NewDoctor, Role, User};

pub const MIN_PASSWORD_LEN: usize = 8;

// ─── Types ────────────────────────────────────────────────────────────────────

/// Signup form. Role-specific fields are ignored for the other role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
    // doctor
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub city: Option<String>,
    pub consultation_fee: Option<i64>,
    pub profile_photo: Option<String>,
    // patient
    pub age: Option<i64>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login: the user and a freshly signed token.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

/// Where the client should land after login.
pub fn redirect_url(role: Role) -> &'static str {
    match role {
        Role::Doctor => "/doctor/dashboard",
        Role::Patient => "/patient/dashboard",
        Role::Admin => "/",
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_credentials(name: &str, email: &str, password: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::validation("name is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::validation("A valid email is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Register a patient or doctor account together with its role profile.
pub fn signup(
    conn: &Connection,
    request: SignupRequest,
    password_iterations: u32,
) -> Result<SignupResponse, ServiceError> {
    let name = request.name.trim().to_string();
    let email = normalize_email(&request.email);
    validate_credentials(&name, &email, &request.password)?;

    let role = match request
        .role
        .as_deref()
        .map(|raw| Role::from_str(&raw.trim().to_lowercase()))
    {
        Some(Ok(role)) if role != Role::Admin => role,
        _ => return Err(ServiceError::validation("role must be patient or doctor")),
    };

    let doctor = if role == Role::Doctor {
        let specialization = non_empty(request.specialization)
            .ok_or_else(|| ServiceError::validation("specialization is required for doctors"))?;
        let city = non_empty(request.city)
            .ok_or_else(|| ServiceError::validation("city is required for doctors"))?;
        let experience_years = request.experience_years.unwrap_or(0);
        let consultation_fee = request.consultation_fee.unwrap_or(0);
        if experience_years < 0 || consultation_fee < 0 {
            return Err(ServiceError::validation(
                "experienceYears and consultationFee must not be negative",
            ));
        }
        Some(NewDoctor {
            user_id: None,
            name: name.clone(),
            specialization,
            qualification: non_empty(request.qualification),
            experience_years,
            city,
            consultation_fee,
            profile_photo: non_empty(request.profile_photo),
        })
    } else {
        None
    };

    if repository::email_exists(conn, &email)? {
        return Err(ServiceError::validation("Email is already registered"));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&request.password, password_iterations),
        role,
        created_at: Utc::now(),
    };

    let tx = conn.unchecked_transaction()?;
    repository::insert_user(&tx, &user).map_err(|e| {
        if e.is_unique_violation() {
            ServiceError::validation("Email is already registered")
        } else {
            ServiceError::from(e)
        }
    })?;
    match doctor {
        Some(mut profile) => {
            profile.user_id = Some(user.id);
            repository::insert_doctor(&tx, &profile)?;
        }
        None => {
            repository::upsert_patient(&tx, &user.id, request.age, non_empty(request.gender).as_deref())?;
        }
    }
    tx.commit()?;

    tracing::info!(user_id = %user.id, role = %role, "Account created");
    Ok(SignupResponse {
        user_id: user.id,
        role,
    })
}

/// Check credentials and sign a token. Unknown email and wrong password
/// return the same error after the same amount of hashing;
/// `password_iterations` sizes the stand-in hash for unknown emails.
pub fn login(
    conn: &Connection,
    tokens: &TokenIssuer,
    email: &str,
    password: &str,
    password_iterations: u32,
) -> Result<LoginOutcome, ServiceError> {
    let email = normalize_email(email);
    let Some(user) = repository::get_user_by_email(conn, &email)? else {
        let _ = verify_password(password, &dummy_hash(password_iterations));
        tracing::debug!("Login for unknown email");
        return Err(ServiceError::InvalidCredentials);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash unreadable");
            return Err(ServiceError::InvalidCredentials);
        }
    }

    let token = tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
    Ok(LoginOutcome { user, token })
}

/// Create the configured admin account if it does not exist yet.
/// Returns `true` when an account was created.
pub fn ensure_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    password_iterations: u32,
) -> Result<bool, ServiceError> {
    let email = normalize_email(email);
    validate_credentials("Administrator", &email, password)?;

    if let Some(existing) = repository::get_user_by_email(conn, &email)? {
        if existing.role != Role::Admin {
            tracing::warn!(user_id = %existing.id, "Admin email belongs to a non-admin account");
        }
        return Ok(false);
    }

    let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".into(),
        email,
        password_hash: hash_password(password, password_iterations),
        role: Role::Admin,
        created_at: Utc::now(),
    };
    let tx = conn.unchecked_transaction()?;
    repository::insert_user(&tx, &admin)?;
    repository::insert_audit_entry(&tx, None, "admin.bootstrap", &format!("user:{}", admin.id))?;
    tx.commit()?;

    tracing::info!(user_id = %admin.id, "Admin account bootstrapped");
    Ok(true)
}

/// Delete an account with everything it owns, as that user or an admin.
pub fn delete_account(conn: &Connection, caller: &Caller, target_id: &Uuid) -> Result<(), ServiceError> {
    if repository::get_user(conn, target_id)?.is_none() {
        return Err(ServiceError::not_found("User not found"));
    }
    if caller.id() != *target_id && caller.role() != Role::Admin {
        return Err(ServiceError::forbidden("You may only delete your own account"));
    }

    let tx = conn.unchecked_transaction()?;
    repository::delete_user_cascade(&tx, target_id)?;
    repository::insert_audit_entry(&tx, Some(&caller.id()), "account.delete", &format!("user:{target_id}"))?;
    tx.commit()?;

    tracing::info!(user_id = %target_id, actor = %caller.id(), "Account deleted");
    Ok(())
}
