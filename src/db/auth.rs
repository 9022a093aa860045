//! Email/password auth: credentials, opaque session tokens, reset tokens.
//!
//! Delivery of the reset link is an external concern; this module only
//! issues and consumes the token.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Role, SessionContext, SignInInput, SignUpInput, UserProfile};

use super::{Database, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub profile: UserProfile,
}

impl Database {
    /// Creates the credential row and, if absent, the profile. New profiles
    /// start as principal.
    pub fn sign_up(&self, input: SignUpInput) -> Result<AuthSession, StoreError> {
        let username = input.username.trim().to_string();
        if username.is_empty() || input.password.is_empty() {
            return Err(StoreError::InvalidCredentials);
        }
        let user_id = self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM profiles WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::UsernameTaken);
            }
            let user_id = Uuid::new_v4();
            Self::insert_profile(conn, user_id, &username, &input.full_name, Role::Principal)?;
            let salt = Uuid::new_v4().simple().to_string();
            conn.execute(
                "INSERT INTO credentials (user_id, salt, password_hash, updated_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id.to_string(),
                    salt,
                    hash_password(&salt, &input.password),
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(user_id)
        })?;
        self.issue_session(user_id)
    }

    pub fn sign_in(&self, input: SignInInput) -> Result<AuthSession, StoreError> {
        let user_id = self.with_conn(|conn| {
            let row: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT p.id, c.salt, c.password_hash \
                     FROM profiles p JOIN credentials c ON c.user_id = p.id \
                     WHERE p.username = ?1",
                    params![input.username.trim()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let (id, salt, stored) = row.ok_or(StoreError::InvalidCredentials)?;
            if hash_password(&salt, &input.password) != stored {
                return Err(StoreError::InvalidCredentials);
            }
            super::get_uuid_str(&id)
        })?;
        self.issue_session(user_id)
    }

    pub fn sign_out(&self, token: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM auth_sessions WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    /// Resolves a bearer token to the caller identity used by every
    /// gateway call.
    pub fn resolve_session(&self, token: &str) -> Result<SessionContext, StoreError> {
        let user_id = self.with_conn(|conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM auth_sessions WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .optional()?;
            id.ok_or(StoreError::InvalidToken)
                .and_then(|id| super::get_uuid_str(&id))
        })?;
        let profile = self
            .get_profile(user_id)?
            .ok_or(StoreError::InvalidToken)?;
        Ok(SessionContext::new(profile.id, profile.role))
    }

    /// Issues a reset token for the account. The caller (an email sender in
    /// production) is responsible for delivering it; the return value exists
    /// so tests can complete the round trip.
    pub fn request_password_reset(&self, username: &str) -> Result<String, StoreError> {
        let profile = self
            .get_profile_by_username(username)?
            .ok_or_else(|| StoreError::NotFound(format!("profile {username:?}")))?;
        let token = new_token();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token, profile.id.to_string(), Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })?;
        Ok(token)
    }

    /// Consumes a reset token and replaces the credential. Existing sessions
    /// for the account are revoked.
    pub fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        if new_password.is_empty() {
            return Err(StoreError::InvalidCredentials);
        }
        self.with_conn(|conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT user_id, consumed FROM password_resets WHERE token = ?1",
                    params![token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (user_id, consumed) = row.ok_or(StoreError::InvalidToken)?;
            if consumed != 0 {
                return Err(StoreError::InvalidToken);
            }
            let tx = conn.unchecked_transaction()?;
            let salt = Uuid::new_v4().simple().to_string();
            tx.execute(
                "UPDATE credentials SET salt = ?1, password_hash = ?2, updated_at = ?3 \
                 WHERE user_id = ?4",
                params![
                    salt,
                    hash_password(&salt, new_password),
                    Utc::now().to_rfc3339(),
                    user_id,
                ],
            )?;
            tx.execute(
                "UPDATE password_resets SET consumed = 1 WHERE token = ?1",
                params![token],
            )?;
            tx.execute(
                "DELETE FROM auth_sessions WHERE user_id = ?1",
                params![user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn issue_session(&self, user_id: Uuid) -> Result<AuthSession, StoreError> {
        let token = new_token();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token, user_id.to_string(), Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })?;
        let profile = self
            .get_profile(user_id)?
            .ok_or_else(|| StoreError::NotFound(format!("profile {user_id}")))?;
        Ok(AuthSession { token, profile })
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignInInput, SignUpInput};

    fn db() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn sign_up_provisions_a_principal_profile() {
        let db = db();
        let session = db
            .sign_up(SignUpInput {
                username: "kepala@sekolah.sch.id".into(),
                password: "rahasia".into(),
                full_name: "Ibu Sari".into(),
            })
            .unwrap();
        assert_eq!(session.profile.role, Role::Principal);

        let ctx = db.resolve_session(&session.token).unwrap();
        assert_eq!(ctx.user_id, session.profile.id);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = db();
        let input = SignUpInput {
            username: "admin@yayasan.or.id".into(),
            password: "pw".into(),
            full_name: "Admin".into(),
        };
        db.sign_up(input.clone()).unwrap();
        assert!(matches!(db.sign_up(input), Err(StoreError::UsernameTaken)));
    }

    #[test]
    fn wrong_password_fails_generically() {
        let db = db();
        db.sign_up(SignUpInput {
            username: "guru@sekolah.sch.id".into(),
            password: "benar".into(),
            full_name: "Guru".into(),
        })
        .unwrap();
        let err = db
            .sign_in(SignInInput {
                username: "guru@sekolah.sch.id".into(),
                password: "salah".into(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCredentials));
    }

    #[test]
    fn password_reset_round_trip_revokes_sessions() {
        let db = db();
        let session = db
            .sign_up(SignUpInput {
                username: "reset@sekolah.sch.id".into(),
                password: "lama".into(),
                full_name: "Reset".into(),
            })
            .unwrap();

        let token = db.request_password_reset("reset@sekolah.sch.id").unwrap();
        db.confirm_password_reset(&token, "baru").unwrap();

        // Old session is gone, token is single-use, new password works.
        assert!(db.resolve_session(&session.token).is_err());
        assert!(db.confirm_password_reset(&token, "lagi").is_err());
        db.sign_in(SignInInput {
            username: "reset@sekolah.sch.id".into(),
            password: "baru".into(),
        })
        .unwrap();
    }
}
