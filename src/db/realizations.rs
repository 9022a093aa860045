use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{
    RabRealization, RealizationItem, RealizationStatus, RecordId, Role,
    SaveRealizationItemsInput, SessionContext,
};
use crate::workflow;

use super::{decode_err, rabs::get_rab_inner, reports::delete_missing_children, Database, StoreError};

const REALIZATION_COLS: &str = "id, user_id, rab_id, status, created_at, updated_at";

impl Database {
    /// Spawns a realization from an approved plan: one item per expense
    /// item, planned amount copied over, actuals starting at zero. Callers
    /// run [`workflow::ensure_realization_creatable`] first so the status
    /// guard fails with its user-visible message; this method re-checks and
    /// refuses with a plain permission error.
    pub fn create_realization(
        &self,
        ctx: &SessionContext,
        rab_id: Uuid,
    ) -> Result<RabRealization, StoreError> {
        self.with_conn(|conn| {
            let rab = get_rab_inner(conn, rab_id)?
                .ok_or_else(|| StoreError::NotFound(format!("budget plan {rab_id}")))?;
            if workflow::ensure_realization_creatable(ctx, &rab).is_err() {
                return Err(StoreError::Forbidden);
            }

            let tx = conn.unchecked_transaction()?;
            let id = Uuid::new_v4();
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO rab_realizations (id, user_id, rab_id, status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, 'in_progress', ?4, ?4)",
                params![id.to_string(), rab.user_id.to_string(), rab_id.to_string(), now],
            )?;
            for (position, expense) in rab.expense_items().enumerate() {
                tx.execute(
                    "INSERT INTO realization_items (id, realization_id, expense_item_id, \
                     description, planned_amount, actual_amount, position) \
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                    params![
                        Uuid::new_v4().to_string(),
                        id.to_string(),
                        expense.id.to_string(),
                        expense.description,
                        expense.amount,
                        position as i64,
                    ],
                )?;
            }
            tx.commit()?;

            get_realization_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("realization {id}")))
        })
    }

    pub fn fetch_realizations(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<RabRealization>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REALIZATION_COLS} FROM rab_realizations {} ORDER BY created_at DESC",
                match ctx.role {
                    Role::Principal => "WHERE user_id = ?1",
                    Role::Foundation => "WHERE status != 'in_progress'",
                    Role::Admin => "",
                }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut realizations = Vec::new();
            if ctx.role == Role::Principal {
                let mut rows = stmt.query(params![ctx.user_id.to_string()])?;
                while let Some(row) = rows.next()? {
                    realizations.push(row_to_realization(row)?);
                }
            } else {
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    realizations.push(row_to_realization(row)?);
                }
            }
            for realization in &mut realizations {
                load_items(conn, realization)?;
            }
            Ok(realizations)
        })
    }

    pub fn get_realization(
        &self,
        ctx: &SessionContext,
        id: Uuid,
    ) -> Result<Option<RabRealization>, StoreError> {
        self.with_conn(|conn| {
            let Some(realization) = get_realization_inner(conn, id)? else {
                return Ok(None);
            };
            let visible = match ctx.role {
                Role::Admin => true,
                Role::Principal => realization.user_id == ctx.user_id,
                Role::Foundation => realization.status != RealizationStatus::InProgress,
            };
            Ok(visible.then_some(realization))
        })
    }

    /// Replace-by-diff of the realization items. Only actuals and notes are
    /// client-editable; description and planned amount stay pinned to the
    /// originating expense item.
    pub fn save_realization_items(
        &self,
        ctx: &SessionContext,
        id: Uuid,
        input: SaveRealizationItemsInput,
    ) -> Result<RabRealization, StoreError> {
        self.with_conn(|conn| {
            let realization = get_realization_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("realization {id}")))?;
            if workflow::ensure_realization_items_editable(ctx, &realization).is_err() {
                return Err(StoreError::Forbidden);
            }

            let tx = conn.unchecked_transaction()?;
            let keep: HashSet<String> = input
                .realization_items
                .iter()
                .filter_map(|item| item.id.persisted().map(|id| id.to_string()))
                .collect();
            delete_missing_children(&tx, "realization_items", "realization_id", id, &keep)?;

            for item in &input.realization_items {
                match &item.id {
                    RecordId::Persisted(item_id) => {
                        tx.execute(
                            "UPDATE realization_items SET actual_amount = ?1, notes = ?2 \
                             WHERE id = ?3 AND realization_id = ?4",
                            params![
                                item.actual_amount,
                                item.notes,
                                item_id.to_string(),
                                id.to_string(),
                            ],
                        )?;
                    }
                    RecordId::Pending(_) => {
                        // A new row must still point at one of the plan's
                        // expense items.
                        let source: Option<(String, i64)> = tx
                            .query_row(
                                "SELECT description, amount FROM expense_items \
                                 WHERE id = ?1 AND rab_id = ?2",
                                params![
                                    item.expense_item_id.to_string(),
                                    realization.rab_id.to_string(),
                                ],
                                |row| Ok((row.get(0)?, row.get(1)?)),
                            )
                            .optional()?;
                        let (description, planned) = source.ok_or_else(|| {
                            StoreError::NotFound(format!(
                                "expense item {}",
                                item.expense_item_id
                            ))
                        })?;
                        tx.execute(
                            "INSERT INTO realization_items (id, realization_id, expense_item_id, \
                             description, planned_amount, actual_amount, notes, position) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, \
                                     (SELECT COALESCE(MAX(position) + 1, 0) \
                                      FROM realization_items WHERE realization_id = ?2))",
                            params![
                                Uuid::new_v4().to_string(),
                                id.to_string(),
                                item.expense_item_id.to_string(),
                                description,
                                planned,
                                item.actual_amount,
                                item.notes,
                            ],
                        )?;
                    }
                }
            }
            tx.commit()?;

            get_realization_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("realization {id}")))
        })
    }

    pub fn persist_realization_transition(
        &self,
        realization: &RabRealization,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE rab_realizations SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    realization.status.as_str(),
                    Utc::now().to_rfc3339(),
                    realization.id.to_string(),
                ],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(format!(
                    "realization {}",
                    realization.id
                )));
            }
            Ok(())
        })
    }
}

fn get_realization_inner(
    conn: &Connection,
    id: Uuid,
) -> Result<Option<RabRealization>, StoreError> {
    let realization = conn
        .query_row(
            &format!("SELECT {REALIZATION_COLS} FROM rab_realizations WHERE id = ?1"),
            params![id.to_string()],
            row_to_realization,
        )
        .optional()?;
    match realization {
        Some(mut realization) => {
            load_items(conn, &mut realization)?;
            Ok(Some(realization))
        }
        None => Ok(None),
    }
}

fn load_items(conn: &Connection, realization: &mut RabRealization) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, realization_id, expense_item_id, description, planned_amount, \
         actual_amount, notes FROM realization_items \
         WHERE realization_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![realization.id.to_string()])?;
    realization.realization_items.clear();
    while let Some(row) = rows.next()? {
        realization.realization_items.push(RealizationItem {
            id: super::get_uuid(row, 0)?,
            realization_id: super::get_uuid(row, 1)?,
            expense_item_id: super::get_uuid(row, 2)?,
            description: row.get(3)?,
            planned_amount: row.get(4)?,
            actual_amount: row.get(5)?,
            notes: row.get(6)?,
        });
    }
    Ok(())
}

fn row_to_realization(row: &Row) -> rusqlite::Result<RabRealization> {
    let status: String = row.get(3)?;
    Ok(RabRealization {
        id: super::get_uuid(row, 0)?,
        user_id: super::get_uuid(row, 1)?,
        rab_id: super::get_uuid(row, 2)?,
        realization_items: Vec::new(),
        status: RealizationStatus::from_str(&status)
            .ok_or_else(|| decode_err(format!("bad status {status:?}")))?,
        created_at: super::get_datetime(row, 4)?,
        updated_at: super::get_datetime(row, 5)?,
    })
}
