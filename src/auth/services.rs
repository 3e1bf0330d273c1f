use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{self, User};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalizes an email address: trims whitespace and lowercases the domain
/// segment only. The local part is case-significant per RFC 5321, so
/// `Ada.L@EXAMPLE.COM` becomes `Ada.L@example.com`.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Create a user with a hashed password. Email must be present and
/// well-formed; duplicates surface as `Conflict`.
pub async fn create_user(
    db: &PgPool,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let hash = hash_password(password)?;
    let user = repo::create(db, &email, name, &hash)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Email already registered".into())
            }
            _ => ApiError::Internal(e.into()),
        })?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

/// Create a user and grant staff + superuser flags. Used by the
/// `create-superuser` admin subcommand.
pub async fn create_superuser(db: &PgPool, email: &str, password: &str) -> anyhow::Result<User> {
    let user = create_user(db, email, password, "")
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = repo::promote_to_superuser(db, user.id).await?;
    Ok(user)
}

/// Verify credentials. Returns `None` on unknown email, wrong password, or
/// a deactivated account; the caller decides how to surface the failure.
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let email = normalize_email(email);
    let Some(user) = repo::find_by_email(db, &email).await? else {
        return Ok(None);
    };
    if !user.is_active {
        warn!(user_id = %user.id, "authentication against deactivated account");
        return Ok(None);
    }
    if !verify_password(password, &user.password_hash)? {
        return Ok(None);
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("Ada.L@EXAMPLE.COM"), "Ada.L@example.com");
        assert_eq!(normalize_email("plain@example.com"), "plain@example.com");
        assert_eq!(normalize_email("MiXeD@CaSe.Org"), "MiXeD@case.org");
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_email("  user@Example.com \n"), "user@example.com");
    }

    #[test]
    fn normalize_leaves_strings_without_at_alone() {
        assert_eq!(normalize_email("NotAnEmail"), "NotAnEmail");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("User.Name+tag@sub.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
