use rusqlite::Connection;
use serde_json::json;

use crate::ipc::helpers::{
    get_optional_i64, get_optional_str, get_required_i64, get_required_str, parse_params,
    require_db, respond, with_db, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, CreateMode, StudentInput};
use crate::session::Session;
use crate::validation;

fn students_create(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let input: StudentInput = parse_params(params)?;
    let id = roster::create_student(conn, &input, CreateMode::TeacherForm, validation::today())?;
    Ok(json!({ "studentId": id }))
}

fn students_signup(conn: &Connection, params: &serde_json::Value) -> HandlerResult {
    let input: StudentInput = parse_params(params)?;
    let id = roster::create_student(conn, &input, CreateMode::SelfSignup, validation::today())?;
    Ok(json!({ "studentId": id }))
}

fn students_update(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let id = get_required_i64(params, "studentId")?;
    let input: StudentInput = parse_params(params)?;
    roster::update_student(conn, id, &input, validation::today())?;
    Ok(json!({ "ok": true }))
}

fn students_delete(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let id = get_required_i64(params, "studentId")?;
    let deleted = roster::delete_student(conn, id)?;
    Ok(json!({ "deleted": deleted }))
}

fn students_delete_all(conn: &Connection, session: Session) -> HandlerResult {
    session.require_teacher()?;
    let deleted = roster::delete_all_students(conn)?;
    Ok(json!({ "deleted": deleted }))
}

fn students_get(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    let id = session.readable_student(get_optional_i64(params, "studentId")?)?;
    let student = roster::get_student(conn, id)?;
    Ok(json!({ "student": student }))
}

fn students_find(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let login_id = get_required_str(params, "loginId")?;
    let phone = get_required_str(params, "phone")?;
    let id = roster::find_student(conn, login_id.trim(), phone.trim())?;
    Ok(json!({ "studentId": id }))
}

fn students_list(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let query = get_optional_str(params, "query");
    let students = roster::list_students(conn, query.as_deref())?;
    Ok(json!({ "count": students.len(), "students": students }))
}

fn students_contacts(state: &AppState) -> HandlerResult {
    let conn = require_db(&state.db)?;
    state.session.require_teacher()?;
    let contacts = roster::collect_contact_numbers(conn, &state.config.contact_prefix)?;
    Ok(json!(contacts))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let resp = match req.method.as_str() {
        "students.create" => with_db(state, req, |c, s| students_create(c, s, p)),
        "students.signup" => with_db(state, req, |c, _| students_signup(c, p)),
        "students.update" => with_db(state, req, |c, s| students_update(c, s, p)),
        "students.delete" => with_db(state, req, |c, s| students_delete(c, s, p)),
        "students.deleteAll" => with_db(state, req, students_delete_all),
        "students.get" => with_db(state, req, |c, s| students_get(c, s, p)),
        "students.find" => with_db(state, req, |c, s| students_find(c, s, p)),
        "students.list" => with_db(state, req, |c, s| students_list(c, s, p)),
        "students.contacts" => respond(req, students_contacts(state)),
        _ => return None,
    };
    Some(resp)
}
