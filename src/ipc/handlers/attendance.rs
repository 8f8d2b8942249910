use rusqlite::Connection;
use serde_json::json;

use crate::attendance::{self, AttendanceStatus};
use crate::ipc::helpers::{
    get_optional_i64, get_optional_str, get_required_i64, get_required_str, with_db, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use crate::validation;

fn attendance_mark(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let student_id = get_required_i64(params, "studentId")?;
    let status = AttendanceStatus::parse(&get_required_str(params, "status")?)?;
    let today = validation::today();
    let date = match get_optional_str(params, "date") {
        Some(raw) if !raw.trim().is_empty() => validation::parse_date("date", &raw)
            .map_err(crate::error::StoreError::from)?,
        _ => today,
    };
    attendance::mark(conn, student_id, status, date, today)?;
    let summary = attendance::summary(conn, student_id)?;
    Ok(json!({
        "studentId": student_id,
        "date": date.format("%Y-%m-%d").to_string(),
        "status": status,
        "summary": summary
    }))
}

fn attendance_summary(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    let student_id = session.readable_student(get_optional_i64(params, "studentId")?)?;
    let summary = attendance::summary(conn, student_id)?;
    Ok(json!({
        "studentId": student_id,
        "present": summary.present,
        "absent": summary.absent
    }))
}

fn attendance_history(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    let student_id = session.readable_student(get_optional_i64(params, "studentId")?)?;
    let entries = attendance::history(conn, student_id)?;
    Ok(json!({ "studentId": student_id, "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    match req.method.as_str() {
        "attendance.mark" => Some(with_db(state, req, |c, s| attendance_mark(c, s, p))),
        "attendance.summary" => Some(with_db(state, req, |c, s| attendance_summary(c, s, p))),
        "attendance.history" => Some(with_db(state, req, |c, s| attendance_history(c, s, p))),
        _ => None,
    }
}
