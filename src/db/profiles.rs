use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{Role, SessionContext, UpdateProfileInput, UserProfile};

use super::{decode_err, Database, StoreError};

impl Database {
    pub fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        self.with_conn(|conn| get_profile_inner(conn, id))
    }

    pub fn get_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, username, full_name, role, created_at, updated_at \
                     FROM profiles WHERE username = ?1",
                    params![username],
                    row_to_profile,
                )
                .optional()?)
        })
    }

    /// Admin-only listing of every profile.
    pub fn list_profiles(&self, ctx: &SessionContext) -> Result<Vec<UserProfile>, StoreError> {
        if ctx.role != Role::Admin {
            return Err(StoreError::Forbidden);
        }
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, full_name, role, created_at, updated_at \
                 FROM profiles ORDER BY username",
            )?;
            let mut rows = stmt.query([])?;
            let mut profiles = Vec::new();
            while let Some(row) = rows.next()? {
                profiles.push(row_to_profile(row)?);
            }
            Ok(profiles)
        })
    }

    /// Profiles may rename themselves; only admin may change a role.
    pub fn update_profile(
        &self,
        ctx: &SessionContext,
        id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, StoreError> {
        if input.role.is_some() && ctx.role != Role::Admin {
            return Err(StoreError::Forbidden);
        }
        if ctx.role != Role::Admin && ctx.user_id != id {
            return Err(StoreError::Forbidden);
        }
        self.with_conn(|conn| {
            let existing = get_profile_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("profile {id}")))?;

            let full_name = input.full_name.unwrap_or(existing.full_name);
            let role = input.role.unwrap_or(existing.role);
            let now = Utc::now();
            conn.execute(
                "UPDATE profiles SET full_name = ?1, role = ?2, updated_at = ?3 WHERE id = ?4",
                params![full_name, role.as_str(), now.to_rfc3339(), id.to_string()],
            )?;
            Ok(UserProfile {
                full_name,
                role,
                updated_at: now,
                ..existing
            })
        })
    }

    pub(crate) fn insert_profile(
        conn: &Connection,
        id: Uuid,
        username: &str,
        full_name: &str,
        role: Role,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO profiles (id, username, full_name, role, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id.to_string(), username, full_name, role.as_str(), now],
        )?;
        Ok(())
    }
}

fn get_profile_inner(conn: &Connection, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, username, full_name, role, created_at, updated_at \
             FROM profiles WHERE id = ?1",
            params![id.to_string()],
            row_to_profile,
        )
        .optional()?)
}

fn row_to_profile(row: &Row) -> rusqlite::Result<UserProfile> {
    let role: String = row.get(3)?;
    Ok(UserProfile {
        id: super::get_uuid(row, 0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        role: Role::from_str(&role).ok_or_else(|| decode_err(format!("bad role {role:?}")))?,
        created_at: super::get_datetime(row, 4)?,
        updated_at: super::get_datetime(row, 5)?,
    })
}
