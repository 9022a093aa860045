use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{
    Achievement, Activity, Evaluation, RecordId, Report, ReportPeriod, ReportStatus, Role,
    SaveReportInput, SessionContext,
};
use crate::realtime::{ChangeOp, ReportChange};

use super::{decode_err, Database, StoreError};

const REPORT_COLS: &str = "id, user_id, date, principal_name, school_name, period, \
     principal_evaluation, foundation_evaluation, foundation_comment, status, \
     submitted_at, created_at, updated_at";

impl Database {
    /// Role-scoped listing: principals see their own reports, foundation
    /// sees submitted and approved ones, admin sees everything.
    pub fn fetch_reports(&self, ctx: &SessionContext) -> Result<Vec<Report>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REPORT_COLS} FROM reports {} ORDER BY date DESC, created_at DESC",
                match ctx.role {
                    Role::Principal => "WHERE user_id = ?1",
                    Role::Foundation => "WHERE status IN ('submitted', 'approved')",
                    Role::Admin => "",
                }
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut reports = Vec::new();
            let mut push_all = |rows: &mut rusqlite::Rows| -> Result<(), StoreError> {
                while let Some(row) = rows.next()? {
                    reports.push(row_to_report(row)?);
                }
                Ok(())
            };
            match ctx.role {
                Role::Principal => {
                    let mut rows = stmt.query(params![ctx.user_id.to_string()])?;
                    push_all(&mut rows)?;
                }
                _ => {
                    let mut rows = stmt.query([])?;
                    push_all(&mut rows)?;
                }
            }
            for report in &mut reports {
                load_children(conn, report)?;
            }
            Ok(reports)
        })
    }

    pub fn get_report(&self, ctx: &SessionContext, id: Uuid) -> Result<Option<Report>, StoreError> {
        self.with_conn(|conn| {
            let Some(report) = get_report_inner(conn, id)? else {
                return Ok(None);
            };
            let visible = match ctx.role {
                Role::Admin => true,
                Role::Principal => report.user_id == ctx.user_id,
                Role::Foundation => {
                    matches!(report.status, ReportStatus::Submitted | ReportStatus::Approved)
                }
            };
            Ok(visible.then_some(report))
        })
    }

    /// Upsert of the report row plus replace-by-diff of its activities and
    /// achievements, in one transaction. Never touches status or the
    /// foundation's fields.
    pub fn save_report(
        &self,
        ctx: &SessionContext,
        input: SaveReportInput,
    ) -> Result<Report, StoreError> {
        if ctx.role == Role::Foundation {
            return Err(StoreError::Forbidden);
        }
        let (report, op) = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now().to_rfc3339();

            let (report_id, op) = match input.id.persisted() {
                Some(id) => {
                    let owner: Option<String> = tx
                        .query_row(
                            "SELECT user_id FROM reports WHERE id = ?1",
                            params![id.to_string()],
                            |row| row.get(0),
                        )
                        .optional()?;
                    match owner {
                        Some(owner) => {
                            if ctx.role != Role::Admin && owner != ctx.user_id.to_string() {
                                return Err(StoreError::Forbidden);
                            }
                            tx.execute(
                                "UPDATE reports SET date = ?1, principal_name = ?2, \
                                 school_name = ?3, period = ?4, principal_evaluation = ?5, \
                                 updated_at = ?6 WHERE id = ?7",
                                params![
                                    input.date.to_string(),
                                    input.principal_name,
                                    input.school_name,
                                    input.period.as_str(),
                                    serde_json::to_string(&input.principal_evaluation)?,
                                    now,
                                    id.to_string(),
                                ],
                            )?;
                            (id, ChangeOp::Update)
                        }
                        // Unknown server id: treat as an insert under that id.
                        None => {
                            insert_report(&tx, ctx, id, &input, &now)?;
                            (id, ChangeOp::Insert)
                        }
                    }
                }
                None => {
                    let id = Uuid::new_v4();
                    insert_report(&tx, ctx, id, &input, &now)?;
                    (id, ChangeOp::Insert)
                }
            };

            reconcile_activities(&tx, report_id, &input)?;
            reconcile_achievements(&tx, report_id, &input)?;
            tx.commit()?;

            let report = get_report_inner(conn, report_id)?
                .ok_or_else(|| StoreError::NotFound(format!("report {report_id}")))?;
            Ok((report, op))
        })?;
        self.publish_report_change(ReportChange::new(op, report.id));
        Ok(report)
    }

    /// Writes back the fields a workflow transition changed: status,
    /// submitted_at, foundation evaluation and comment.
    pub fn persist_report_transition(&self, report: &Report) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE reports SET status = ?1, submitted_at = ?2, \
                 foundation_evaluation = ?3, foundation_comment = ?4, updated_at = ?5 \
                 WHERE id = ?6",
                params![
                    report.status.as_str(),
                    report.submitted_at.map(|t| t.to_rfc3339()),
                    serde_json::to_string(&report.foundation_evaluation)?,
                    report.foundation_comment,
                    Utc::now().to_rfc3339(),
                    report.id.to_string(),
                ],
            )?;
            if rows == 0 {
                return Err(StoreError::NotFound(format!("report {}", report.id)));
            }
            Ok(())
        })?;
        self.publish_report_change(ReportChange::new(ChangeOp::Update, report.id));
        Ok(())
    }

    /// Children go with the parent via FK cascade.
    pub fn delete_report(&self, ctx: &SessionContext, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM reports WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let owner = owner.ok_or_else(|| StoreError::NotFound(format!("report {id}")))?;
            if ctx.role != Role::Admin && owner != ctx.user_id.to_string() {
                return Err(StoreError::Forbidden);
            }
            conn.execute("DELETE FROM reports WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })?;
        self.publish_report_change(ReportChange::new(ChangeOp::Delete, id));
        Ok(())
    }
}

fn insert_report(
    conn: &Connection,
    ctx: &SessionContext,
    id: Uuid,
    input: &SaveReportInput,
    now: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO reports (id, user_id, date, principal_name, school_name, period, \
         principal_evaluation, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'draft', ?8, ?8)",
        params![
            id.to_string(),
            ctx.user_id.to_string(),
            input.date.to_string(),
            input.principal_name,
            input.school_name,
            input.period.as_str(),
            serde_json::to_string(&input.principal_evaluation)?,
            now,
        ],
    )?;
    Ok(())
}

/// Replace-by-diff: children absent from the incoming list are deleted,
/// persisted ones are updated in place, pending ones are inserted under a
/// fresh server id.
fn reconcile_activities(
    conn: &Connection,
    report_id: Uuid,
    input: &SaveReportInput,
) -> Result<(), StoreError> {
    let keep: HashSet<String> = input
        .activities
        .iter()
        .filter_map(|a| a.id.persisted().map(|id| id.to_string()))
        .collect();
    delete_missing_children(conn, "activities", "report_id", report_id, &keep)?;

    for (position, item) in input.activities.iter().enumerate() {
        let item_id = match &item.id {
            RecordId::Persisted(id) => *id,
            RecordId::Pending(_) => Uuid::new_v4(),
        };
        let updated = conn.execute(
            "UPDATE activities SET name = ?1, description = ?2, date = ?3, position = ?4 \
             WHERE id = ?5 AND report_id = ?6",
            params![
                item.name,
                item.description,
                item.date.map(|d| d.to_string()),
                position as i64,
                item_id.to_string(),
                report_id.to_string(),
            ],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO activities (id, report_id, name, description, date, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item_id.to_string(),
                    report_id.to_string(),
                    item.name,
                    item.description,
                    item.date.map(|d| d.to_string()),
                    position as i64,
                ],
            )?;
        }
    }
    Ok(())
}

fn reconcile_achievements(
    conn: &Connection,
    report_id: Uuid,
    input: &SaveReportInput,
) -> Result<(), StoreError> {
    let keep: HashSet<String> = input
        .achievements
        .iter()
        .filter_map(|a| a.id.persisted().map(|id| id.to_string()))
        .collect();
    delete_missing_children(conn, "achievements", "report_id", report_id, &keep)?;

    for (position, item) in input.achievements.iter().enumerate() {
        let item_id = match &item.id {
            RecordId::Persisted(id) => *id,
            RecordId::Pending(_) => Uuid::new_v4(),
        };
        let updated = conn.execute(
            "UPDATE achievements SET title = ?1, description = ?2, position = ?3 \
             WHERE id = ?4 AND report_id = ?5",
            params![
                item.title,
                item.description,
                position as i64,
                item_id.to_string(),
                report_id.to_string(),
            ],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO achievements (id, report_id, title, description, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    item_id.to_string(),
                    report_id.to_string(),
                    item.title,
                    item.description,
                    position as i64,
                ],
            )?;
        }
    }
    Ok(())
}

pub(crate) fn delete_missing_children(
    conn: &Connection,
    table: &str,
    parent_col: &str,
    parent_id: Uuid,
    keep: &HashSet<String>,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT id FROM {table} WHERE {parent_col} = ?1"))?;
    let mut rows = stmt.query(params![parent_id.to_string()])?;
    let mut stale = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        if !keep.contains(&id) {
            stale.push(id);
        }
    }
    drop(rows);
    drop(stmt);
    for id in stale {
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
    }
    Ok(())
}

fn get_report_inner(conn: &Connection, id: Uuid) -> Result<Option<Report>, StoreError> {
    let report = conn
        .query_row(
            &format!("SELECT {REPORT_COLS} FROM reports WHERE id = ?1"),
            params![id.to_string()],
            row_to_report,
        )
        .optional()?;
    match report {
        Some(mut report) => {
            load_children(conn, &mut report)?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}

fn load_children(conn: &Connection, report: &mut Report) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, name, description, date FROM activities \
         WHERE report_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![report.id.to_string()])?;
    report.activities.clear();
    while let Some(row) = rows.next()? {
        report.activities.push(Activity {
            id: super::get_uuid(row, 0)?,
            report_id: super::get_uuid(row, 1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            date: super::get_opt_date(row, 4)?,
        });
    }
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare(
        "SELECT id, report_id, title, description FROM achievements \
         WHERE report_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![report.id.to_string()])?;
    report.achievements.clear();
    while let Some(row) = rows.next()? {
        report.achievements.push(Achievement {
            id: super::get_uuid(row, 0)?,
            report_id: super::get_uuid(row, 1)?,
            title: row.get(2)?,
            description: row.get(3)?,
        });
    }
    Ok(())
}

fn row_to_report(row: &Row) -> rusqlite::Result<Report> {
    let period: String = row.get(5)?;
    let principal_evaluation: String = row.get(6)?;
    let foundation_evaluation: String = row.get(7)?;
    let status: String = row.get(9)?;
    Ok(Report {
        id: super::get_uuid(row, 0)?,
        user_id: super::get_uuid(row, 1)?,
        date: super::get_date(row, 2)?,
        principal_name: row.get(3)?,
        school_name: row.get(4)?,
        period: ReportPeriod::from_str(&period)
            .ok_or_else(|| decode_err(format!("bad period {period:?}")))?,
        activities: Vec::new(),
        achievements: Vec::new(),
        principal_evaluation: parse_evaluation(&principal_evaluation)?,
        foundation_evaluation: parse_evaluation(&foundation_evaluation)?,
        foundation_comment: row.get(8)?,
        status: ReportStatus::from_str(&status)
            .ok_or_else(|| decode_err(format!("bad status {status:?}")))?,
        submitted_at: super::get_opt_datetime(row, 10)?,
        created_at: super::get_datetime(row, 11)?,
        updated_at: super::get_datetime(row, 12)?,
    })
}

fn parse_evaluation(json: &str) -> rusqlite::Result<Evaluation> {
    serde_json::from_str(json).map_err(|e| decode_err(format!("bad evaluation: {e}")))
}
