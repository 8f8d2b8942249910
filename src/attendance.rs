//! Date-keyed attendance ledger: at most one status per student per day.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::roster::{self, now_stamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> StoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            _ => Err(StoreError::validation(
                "status",
                "must be \"present\" or \"absent\"",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: i64,
    pub absent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub date: String,
    pub status: AttendanceStatus,
    pub marked_at: String,
}

fn ensure_student(conn: &Connection, student_id: i64) -> StoreResult<()> {
    if roster::student_exists(conn, student_id)? {
        Ok(())
    } else {
        Err(StoreError::not_found("student", student_id))
    }
}

/// Record `status` for `date`, replacing whatever was recorded for that day.
pub fn mark(
    conn: &Connection,
    student_id: i64,
    status: AttendanceStatus,
    date: NaiveDate,
    today: NaiveDate,
) -> StoreResult<()> {
    if date > today {
        return Err(StoreError::validation("date", "must not be in the future"));
    }
    ensure_student(conn, student_id)?;
    conn.execute(
        "INSERT INTO attendance_entries(student_id, date, status, marked_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(student_id, date) DO UPDATE SET
           status = excluded.status,
           marked_at = excluded.marked_at",
        (
            student_id,
            date.format("%Y-%m-%d").to_string(),
            status.as_str(),
            now_stamp(),
        ),
    )?;
    tracing::debug!(student_id, %date, status = status.as_str(), "attendance marked");
    Ok(())
}

pub fn summary(conn: &Connection, student_id: i64) -> StoreResult<AttendanceSummary> {
    ensure_student(conn, student_id)?;
    let (present, absent) = conn.query_row(
        "SELECT
           COALESCE(SUM(status = 'present'), 0),
           COALESCE(SUM(status = 'absent'), 0)
         FROM attendance_entries
         WHERE student_id = ?",
        [student_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(AttendanceSummary { present, absent })
}

/// Newest date first.
pub fn history(conn: &Connection, student_id: i64) -> StoreResult<Vec<AttendanceEntry>> {
    ensure_student(conn, student_id)?;
    let mut stmt = conn.prepare(
        "SELECT date, status, marked_at
         FROM attendance_entries
         WHERE student_id = ?
         ORDER BY date DESC",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(date, status, marked_at)| {
            Ok(AttendanceEntry {
                date,
                status: AttendanceStatus::parse(&status)?,
                marked_at,
            })
        })
        .collect()
}

/// Totals for every student that has at least one entry.
pub fn summaries(conn: &Connection) -> StoreResult<HashMap<i64, AttendanceSummary>> {
    let mut stmt = conn.prepare(
        "SELECT student_id,
           SUM(status = 'present'),
           SUM(status = 'absent')
         FROM attendance_entries
         GROUP BY student_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                AttendanceSummary {
                    present: r.get(1)?,
                    absent: r.get(2)?,
                },
            ))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::roster::{create_student, CreateMode, StudentInput};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).expect("date")
    }

    fn seed(conn: &Connection) -> i64 {
        let input = StudentInput {
            name: Some("Aman".into()),
            birth_date: Some("2013-04-02".into()),
            ..Default::default()
        };
        create_student(conn, &input, CreateMode::TeacherForm, day(10)).expect("create")
    }

    #[test]
    fn mark_present_adds_one_present() {
        let conn = db::open_in_memory();
        let id = seed(&conn);
        assert_eq!(summary(&conn, id).unwrap(), AttendanceSummary::default());
        mark(&conn, id, AttendanceStatus::Present, day(10), day(10)).unwrap();
        assert_eq!(
            summary(&conn, id).unwrap(),
            AttendanceSummary { present: 1, absent: 0 }
        );
    }

    #[test]
    fn same_day_overwrites_instead_of_accumulating() {
        let conn = db::open_in_memory();
        let id = seed(&conn);
        mark(&conn, id, AttendanceStatus::Present, day(10), day(10)).unwrap();
        mark(&conn, id, AttendanceStatus::Present, day(10), day(10)).unwrap();
        assert_eq!(
            summary(&conn, id).unwrap(),
            AttendanceSummary { present: 1, absent: 0 }
        );
        mark(&conn, id, AttendanceStatus::Absent, day(10), day(10)).unwrap();
        assert_eq!(
            summary(&conn, id).unwrap(),
            AttendanceSummary { present: 0, absent: 1 }
        );
    }

    #[test]
    fn separate_days_accumulate() {
        let conn = db::open_in_memory();
        let id = seed(&conn);
        mark(&conn, id, AttendanceStatus::Present, day(8), day(10)).unwrap();
        mark(&conn, id, AttendanceStatus::Present, day(9), day(10)).unwrap();
        mark(&conn, id, AttendanceStatus::Absent, day(10), day(10)).unwrap();
        assert_eq!(
            summary(&conn, id).unwrap(),
            AttendanceSummary { present: 2, absent: 1 }
        );
        let dates: Vec<String> = history(&conn, id).unwrap().into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["2025-07-10", "2025-07-09", "2025-07-08"]);
        assert_eq!(summaries(&conn).unwrap().get(&id).copied().unwrap().present, 2);
    }

    #[test]
    fn unknown_student_and_future_date_fail() {
        let conn = db::open_in_memory();
        let id = seed(&conn);
        let e = mark(&conn, id + 1, AttendanceStatus::Present, day(10), day(10)).unwrap_err();
        assert!(matches!(e, StoreError::NotFound { .. }));
        let e = mark(&conn, id, AttendanceStatus::Present, day(11), day(10)).unwrap_err();
        assert!(matches!(e, StoreError::Validation { field: "date", .. }));
        assert!(matches!(summary(&conn, id + 1), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn deleting_student_discards_entries() {
        let conn = db::open_in_memory();
        let id = seed(&conn);
        mark(&conn, id, AttendanceStatus::Present, day(10), day(10)).unwrap();
        roster::delete_student(&conn, id).unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM attendance_entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn status_parse() {
        assert_eq!(AttendanceStatus::parse(" Present ").unwrap(), AttendanceStatus::Present);
        assert!(matches!(
            AttendanceStatus::parse("late"),
            Err(StoreError::Validation { field: "status", .. })
        ));
    }
}
