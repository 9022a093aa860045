use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{
    ExpenseItem, ExpenseKind, ExpenseUnit, EstimatedWeek, FundSource, RabData, RabStatus,
    RecordId, Role, SaveRabInput, SessionContext, Signatures,
};
use crate::workflow;

use super::{decode_err, reports::delete_missing_children, Database, StoreError};

const RAB_COLS: &str = "id, user_id, institution_name, period, year, status, submitted_at, \
     reviewed_at, review_comment, sig_prepared_by, sig_treasurer, sig_principal, \
     sig_committee_chair, sig_foundation_chair, created_at, updated_at";

impl Database {
    /// Foundation sees every plan that has entered review (submitted,
    /// approved or rejected); principals see only their own; admin all.
    pub fn fetch_rabs(&self, ctx: &SessionContext) -> Result<Vec<RabData>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RAB_COLS} FROM rab_data {} ORDER BY year DESC, created_at DESC",
                match ctx.role {
                    Role::Principal => "WHERE user_id = ?1",
                    Role::Foundation => "WHERE status IN ('submitted', 'approved', 'rejected')",
                    Role::Admin => "",
                }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rabs = Vec::new();
            if ctx.role == Role::Principal {
                let mut rows = stmt.query(params![ctx.user_id.to_string()])?;
                while let Some(row) = rows.next()? {
                    rabs.push(row_to_rab(row)?);
                }
            } else {
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    rabs.push(row_to_rab(row)?);
                }
            }
            for rab in &mut rabs {
                load_expenses(conn, rab)?;
            }
            Ok(rabs)
        })
    }

    pub fn get_rab(&self, ctx: &SessionContext, id: Uuid) -> Result<Option<RabData>, StoreError> {
        self.with_conn(|conn| {
            let Some(rab) = get_rab_inner(conn, id)? else {
                return Ok(None);
            };
            let visible = match ctx.role {
                Role::Admin => true,
                Role::Principal => rab.user_id == ctx.user_id,
                Role::Foundation => rab.status != RabStatus::Draft,
            };
            Ok(visible.then_some(rab))
        })
    }

    /// Upsert plus replace-by-diff of both expense lists in one
    /// transaction. Editing an already-submitted plan is refused here as
    /// well as in the workflow layer, since the edit window is a stored
    /// property of the row.
    pub fn save_rab(&self, ctx: &SessionContext, input: SaveRabInput) -> Result<RabData, StoreError> {
        if ctx.role == Role::Foundation {
            return Err(StoreError::Forbidden);
        }
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();

            let rab_id = match input.id.persisted() {
                Some(id) => {
                    let existing = get_rab_inner(&tx, id)?;
                    match existing {
                        Some(existing) => {
                            if !workflow::can_edit_rab(ctx, &existing) {
                                return Err(StoreError::Forbidden);
                            }
                            tx.execute(
                                "UPDATE rab_data SET institution_name = ?1, period = ?2, \
                                 year = ?3, sig_prepared_by = ?4, sig_treasurer = ?5, \
                                 sig_principal = ?6, sig_committee_chair = ?7, \
                                 sig_foundation_chair = ?8, updated_at = ?9 WHERE id = ?10",
                                params![
                                    input.institution_name,
                                    input.period,
                                    input.year,
                                    input.signatures.prepared_by,
                                    input.signatures.treasurer,
                                    input.signatures.principal,
                                    input.signatures.committee_chair,
                                    input.signatures.foundation_chair,
                                    now,
                                    id.to_string(),
                                ],
                            )?;
                            id
                        }
                        None => {
                            insert_rab(&tx, ctx, id, &input, &now)?;
                            id
                        }
                    }
                }
                None => {
                    let id = Uuid::new_v4();
                    insert_rab(&tx, ctx, id, &input, &now)?;
                    id
                }
            };

            reconcile_expenses(&tx, rab_id, &input)?;
            tx.commit()?;

            get_rab_inner(conn, rab_id)?
                .ok_or_else(|| StoreError::NotFound(format!("budget plan {rab_id}")))
        })
    }

    /// Writes back status, submitted_at, reviewed_at and the review comment
    /// after a workflow transition.
    pub fn persist_rab_transition(&self, rab: &RabData) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE rab_data SET status = ?1, submitted_at = ?2, reviewed_at = ?3, \
                 review_comment = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    rab.status.as_str(),
                    rab.submitted_at.map(|t| t.to_rfc3339()),
                    rab.reviewed_at.map(|t| t.to_rfc3339()),
                    rab.review_comment,
                    Utc::now().to_rfc3339(),
                    rab.id.to_string(),
                ],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(format!("budget plan {}", rab.id)));
            }
            Ok(())
        })
    }

    /// Delete guard comes from the workflow layer: a principal may only
    /// delete while the plan is draft or rejected, admin from any status.
    pub fn delete_rab(&self, ctx: &SessionContext, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rab = get_rab_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("budget plan {id}")))?;
            if !workflow::can_delete_rab(ctx, &rab) {
                return Err(StoreError::Forbidden);
            }
            conn.execute("DELETE FROM rab_data WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })
    }
}

fn insert_rab(
    conn: &Connection,
    ctx: &SessionContext,
    id: Uuid,
    input: &SaveRabInput,
    now: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO rab_data (id, user_id, institution_name, period, year, status, \
         sig_prepared_by, sig_treasurer, sig_principal, sig_committee_chair, \
         sig_foundation_chair, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            id.to_string(),
            ctx.user_id.to_string(),
            input.institution_name,
            input.period,
            input.year,
            input.signatures.prepared_by,
            input.signatures.treasurer,
            input.signatures.principal,
            input.signatures.committee_chair,
            input.signatures.foundation_chair,
            now,
        ],
    )?;
    Ok(())
}

fn reconcile_expenses(
    conn: &Connection,
    rab_id: Uuid,
    input: &SaveRabInput,
) -> Result<(), StoreError> {
    let keep: HashSet<String> = input
        .routine_expenses
        .iter()
        .chain(input.incidental_expenses.iter())
        .filter_map(|item| item.id.persisted().map(|id| id.to_string()))
        .collect();
    delete_missing_children(conn, "expense_items", "rab_id", rab_id, &keep)?;

    for (kind, list) in [
        (ExpenseKind::Routine, &input.routine_expenses),
        (ExpenseKind::Incidental, &input.incidental_expenses),
    ] {
        for (position, item) in list.iter().enumerate() {
            let item_id = match &item.id {
                RecordId::Persisted(id) => *id,
                RecordId::Pending(_) => Uuid::new_v4(),
            };
            let updated = conn.execute(
                "UPDATE expense_items SET kind = ?1, description = ?2, volume = ?3, \
                 unit = ?4, unit_price = ?5, amount = ?6, fund_source = ?7, \
                 estimated_week = ?8, position = ?9 WHERE id = ?10 AND rab_id = ?11",
                params![
                    kind.as_str(),
                    item.description,
                    item.volume,
                    item.unit.as_str(),
                    item.unit_price,
                    item.amount,
                    item.fund_source.as_str(),
                    item.estimated_week.as_str(),
                    position as i64,
                    item_id.to_string(),
                    rab_id.to_string(),
                ],
            )?;
            if updated == 0 {
                conn.execute(
                    "INSERT INTO expense_items (id, rab_id, kind, description, volume, unit, \
                     unit_price, amount, fund_source, estimated_week, position) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        item_id.to_string(),
                        rab_id.to_string(),
                        kind.as_str(),
                        item.description,
                        item.volume,
                        item.unit.as_str(),
                        item.unit_price,
                        item.amount,
                        item.fund_source.as_str(),
                        item.estimated_week.as_str(),
                        position as i64,
                    ],
                )?;
            }
        }
    }
    Ok(())
}

pub(crate) fn get_rab_inner(conn: &Connection, id: Uuid) -> Result<Option<RabData>, StoreError> {
    let rab = conn
        .query_row(
            &format!("SELECT {RAB_COLS} FROM rab_data WHERE id = ?1"),
            params![id.to_string()],
            row_to_rab,
        )
        .optional()?;
    match rab {
        Some(mut rab) => {
            load_expenses(conn, &mut rab)?;
            Ok(Some(rab))
        }
        None => Ok(None),
    }
}

fn load_expenses(conn: &Connection, rab: &mut RabData) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, rab_id, kind, description, volume, unit, unit_price, amount, \
         fund_source, estimated_week FROM expense_items WHERE rab_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![rab.id.to_string()])?;
    rab.routine_expenses.clear();
    rab.incidental_expenses.clear();
    while let Some(row) = rows.next()? {
        let item = row_to_expense(row)?;
        match item.kind {
            ExpenseKind::Routine => rab.routine_expenses.push(item),
            ExpenseKind::Incidental => rab.incidental_expenses.push(item),
        }
    }
    Ok(())
}

fn row_to_expense(row: &Row) -> rusqlite::Result<ExpenseItem> {
    let kind: String = row.get(2)?;
    let unit: String = row.get(5)?;
    let fund_source: String = row.get(8)?;
    let estimated_week: String = row.get(9)?;
    Ok(ExpenseItem {
        id: super::get_uuid(row, 0)?,
        rab_id: super::get_uuid(row, 1)?,
        kind: ExpenseKind::from_str(&kind)
            .ok_or_else(|| decode_err(format!("bad expense kind {kind:?}")))?,
        description: row.get(3)?,
        volume: row.get(4)?,
        unit: ExpenseUnit::from_str(&unit)
            .ok_or_else(|| decode_err(format!("bad unit {unit:?}")))?,
        unit_price: row.get(6)?,
        amount: row.get(7)?,
        fund_source: FundSource::from_str(&fund_source)
            .ok_or_else(|| decode_err(format!("bad fund source {fund_source:?}")))?,
        estimated_week: EstimatedWeek::from_str(&estimated_week)
            .ok_or_else(|| decode_err(format!("bad week {estimated_week:?}")))?,
    })
}

fn row_to_rab(row: &Row) -> rusqlite::Result<RabData> {
    let status: String = row.get(5)?;
    Ok(RabData {
        id: super::get_uuid(row, 0)?,
        user_id: super::get_uuid(row, 1)?,
        institution_name: row.get(2)?,
        period: row.get(3)?,
        year: row.get(4)?,
        routine_expenses: Vec::new(),
        incidental_expenses: Vec::new(),
        status: RabStatus::from_str(&status)
            .ok_or_else(|| decode_err(format!("bad status {status:?}")))?,
        submitted_at: super::get_opt_datetime(row, 6)?,
        reviewed_at: super::get_opt_datetime(row, 7)?,
        review_comment: row.get(8)?,
        signatures: Signatures {
            prepared_by: row.get(9)?,
            treasurer: row.get(10)?,
            principal: row.get(11)?,
            committee_chair: row.get(12)?,
            foundation_chair: row.get(13)?,
        },
        created_at: super::get_datetime(row, 14)?,
        updated_at: super::get_datetime(row, 15)?,
    })
}
