use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{MemoData, MemoStatus, MemoTable, RecordId, Role, SaveMemoInput, SessionContext};
use crate::workflow;

use super::{decode_err, reports::delete_missing_children, Database, StoreError};

const MEMO_COLS: &str = "id, user_id, memo_number, subject, date, status, created_at, updated_at";

impl Database {
    /// Foundation only sees memos that were sent to it.
    pub fn fetch_memos(&self, ctx: &SessionContext) -> Result<Vec<MemoData>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMO_COLS} FROM memos {} ORDER BY date DESC, created_at DESC",
                match ctx.role {
                    Role::Principal => "WHERE user_id = ?1",
                    Role::Foundation => "WHERE status = 'sent_to_foundation'",
                    Role::Admin => "",
                }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut memos = Vec::new();
            if ctx.role == Role::Principal {
                let mut rows = stmt.query(params![ctx.user_id.to_string()])?;
                while let Some(row) = rows.next()? {
                    memos.push(row_to_memo(row)?);
                }
            } else {
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    memos.push(row_to_memo(row)?);
                }
            }
            for memo in &mut memos {
                load_tables(conn, memo)?;
            }
            Ok(memos)
        })
    }

    pub fn get_memo(&self, ctx: &SessionContext, id: Uuid) -> Result<Option<MemoData>, StoreError> {
        self.with_conn(|conn| {
            let Some(memo) = get_memo_inner(conn, id)? else {
                return Ok(None);
            };
            let visible = match ctx.role {
                Role::Admin => true,
                Role::Principal => memo.user_id == ctx.user_id,
                Role::Foundation => memo.status == MemoStatus::SentToFoundation,
            };
            Ok(visible.then_some(memo))
        })
    }

    /// Upsert plus replace-by-diff of the embedded tables. Refused once the
    /// memo has been sent to the foundation (for principals).
    pub fn save_memo(&self, ctx: &SessionContext, input: SaveMemoInput) -> Result<MemoData, StoreError> {
        if ctx.role == Role::Foundation {
            return Err(StoreError::Forbidden);
        }
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();

            let memo_id = match input.id.persisted() {
                Some(id) => {
                    let existing = get_memo_inner(&tx, id)?;
                    match existing {
                        Some(existing) => {
                            if !workflow::can_edit_memo(ctx, &existing) {
                                return Err(StoreError::Forbidden);
                            }
                            tx.execute(
                                "UPDATE memos SET memo_number = ?1, subject = ?2, date = ?3, \
                                 updated_at = ?4 WHERE id = ?5",
                                params![
                                    input.memo_number,
                                    input.subject,
                                    input.date.to_string(),
                                    now,
                                    id.to_string(),
                                ],
                            )?;
                            id
                        }
                        None => {
                            insert_memo(&tx, ctx, id, &input, &now)?;
                            id
                        }
                    }
                }
                None => {
                    let id = Uuid::new_v4();
                    insert_memo(&tx, ctx, id, &input, &now)?;
                    id
                }
            };

            reconcile_tables(&tx, memo_id, &input)?;
            tx.commit()?;

            get_memo_inner(conn, memo_id)?
                .ok_or_else(|| StoreError::NotFound(format!("memo {memo_id}")))
        })
    }

    /// Inserts a duplicate produced by [`workflow::duplicate_memo`] as-is.
    pub fn insert_duplicated_memo(&self, memo: &MemoData) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO memos (id, user_id, memo_number, subject, date, status, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    memo.id.to_string(),
                    memo.user_id.to_string(),
                    memo.memo_number,
                    memo.subject,
                    memo.date.to_string(),
                    memo.status.as_str(),
                    memo.created_at.to_rfc3339(),
                    memo.updated_at.to_rfc3339(),
                ],
            )?;
            for (position, table) in memo.tables.iter().enumerate() {
                tx.execute(
                    "INSERT INTO memo_tables (id, memo_id, title, headers, rows, position) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        table.id.to_string(),
                        memo.id.to_string(),
                        table.title,
                        serde_json::to_string(&table.headers)?,
                        serde_json::to_string(&table.rows)?,
                        position as i64,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn persist_memo_transition(&self, memo: &MemoData) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE memos SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    memo.status.as_str(),
                    Utc::now().to_rfc3339(),
                    memo.id.to_string(),
                ],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(format!("memo {}", memo.id)));
            }
            Ok(())
        })
    }

    pub fn delete_memo(&self, ctx: &SessionContext, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let memo = get_memo_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("memo {id}")))?;
            if !workflow::can_edit_memo(ctx, &memo) {
                return Err(StoreError::Forbidden);
            }
            conn.execute("DELETE FROM memos WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })
    }
}

fn insert_memo(
    conn: &Connection,
    ctx: &SessionContext,
    id: Uuid,
    input: &SaveMemoInput,
    now: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO memos (id, user_id, memo_number, subject, date, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?6)",
        params![
            id.to_string(),
            ctx.user_id.to_string(),
            input.memo_number,
            input.subject,
            input.date.to_string(),
            now,
        ],
    )?;
    Ok(())
}

fn reconcile_tables(conn: &Connection, memo_id: Uuid, input: &SaveMemoInput) -> Result<(), StoreError> {
    let keep: HashSet<String> = input
        .tables
        .iter()
        .filter_map(|t| t.id.persisted().map(|id| id.to_string()))
        .collect();
    delete_missing_children(conn, "memo_tables", "memo_id", memo_id, &keep)?;

    for (position, table) in input.tables.iter().enumerate() {
        let table_id = match &table.id {
            RecordId::Persisted(id) => *id,
            RecordId::Pending(_) => Uuid::new_v4(),
        };
        let headers = serde_json::to_string(&table.headers)?;
        let rows = serde_json::to_string(&table.rows)?;
        let updated = conn.execute(
            "UPDATE memo_tables SET title = ?1, headers = ?2, rows = ?3, position = ?4 \
             WHERE id = ?5 AND memo_id = ?6",
            params![
                table.title,
                headers,
                rows,
                position as i64,
                table_id.to_string(),
                memo_id.to_string(),
            ],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO memo_tables (id, memo_id, title, headers, rows, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    table_id.to_string(),
                    memo_id.to_string(),
                    table.title,
                    headers,
                    rows,
                    position as i64,
                ],
            )?;
        }
    }
    Ok(())
}

fn get_memo_inner(conn: &Connection, id: Uuid) -> Result<Option<MemoData>, StoreError> {
    let memo = conn
        .query_row(
            &format!("SELECT {MEMO_COLS} FROM memos WHERE id = ?1"),
            params![id.to_string()],
            row_to_memo,
        )
        .optional()?;
    match memo {
        Some(mut memo) => {
            load_tables(conn, &mut memo)?;
            Ok(Some(memo))
        }
        None => Ok(None),
    }
}

fn load_tables(conn: &Connection, memo: &mut MemoData) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, memo_id, title, headers, rows, position FROM memo_tables \
         WHERE memo_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![memo.id.to_string()])?;
    memo.tables.clear();
    while let Some(row) = rows.next()? {
        let headers: String = row.get(3)?;
        let grid: String = row.get(4)?;
        memo.tables.push(MemoTable {
            id: super::get_uuid(row, 0)?,
            memo_id: super::get_uuid(row, 1)?,
            title: row.get(2)?,
            headers: serde_json::from_str(&headers)
                .map_err(|e| decode_err(format!("bad headers: {e}")))?,
            rows: serde_json::from_str(&grid)
                .map_err(|e| decode_err(format!("bad rows: {e}")))?,
            position: row.get(5)?,
        });
    }
    Ok(())
}

fn row_to_memo(row: &Row) -> rusqlite::Result<MemoData> {
    let status: String = row.get(5)?;
    Ok(MemoData {
        id: super::get_uuid(row, 0)?,
        user_id: super::get_uuid(row, 1)?,
        memo_number: row.get(2)?,
        subject: row.get(3)?,
        date: super::get_date(row, 4)?,
        tables: Vec::new(),
        status: MemoStatus::from_str(&status)
            .ok_or_else(|| decode_err(format!("bad status {status:?}")))?,
        created_at: super::get_datetime(row, 6)?,
        updated_at: super::get_datetime(row, 7)?,
    })
}
