use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::error::{StoreError, StoreResult};
use crate::ipc::helpers::{get_required_str, require_db, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::mailer;
use crate::session::{self, Session};

/// A failed login drops whatever session was active.
fn apply_login(state: &mut AppState, attempt: StoreResult<Session>) -> HandlerResult {
    match attempt {
        Ok(session) => {
            state.session = session;
            Ok(json!({ "session": session.to_json() }))
        }
        Err(e) => {
            state.session = session::logout();
            Err(e.into())
        }
    }
}

fn login_teacher(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let conn = require_db(&state.db)?;
    let username = get_required_str(params, "username")?;
    let secret = get_required_str(params, "secret")?;
    let attempt = session::login_teacher(conn, username.trim(), &secret);
    apply_login(state, attempt)
}

fn login_student(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let conn = require_db(&state.db)?;
    let login_id = get_required_str(params, "loginId")?;
    let secret = get_required_str(params, "secret")?;
    let attempt = session::login_student(conn, &login_id, &secret);
    apply_login(state, attempt)
}

fn login_student_by_name_phone(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let conn = require_db(&state.db)?;
    let name = get_required_str(params, "name")?;
    let phone = get_required_str(params, "phone")?;
    let attempt = session::login_student_by_name_phone(conn, &name, &phone);
    apply_login(state, attempt)
}

fn request_reset(state: &mut AppState) -> HandlerResult {
    require_db(&state.db)?;
    let now = Utc::now();
    let (code, challenge) = session::issue_reset_code(now, state.config.reset_code_ttl_secs);
    let expires_at = challenge.expires_at;
    tracing::info!(issued_at = %challenge.issued_at, %expires_at, "reset code issued");
    state.pending_reset = Some(challenge);

    let to = state.config.reset_email.clone();
    let delivery = match &state.config.mail {
        Some(mail) => mailer::send_reset_code(mail, &to, &code),
        None => Err(StoreError::Transport("smtp is not configured".to_string())),
    };
    let mut result = json!({
        "sentTo": to,
        "delivered": delivery.is_ok(),
        "expiresAt": expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    });
    // Delivery failures never block the reset; the code goes back to the caller instead.
    if let Err(e) = delivery {
        tracing::warn!(error = %e, "reset code not delivered, returning it to the caller");
        result["devCode"] = json!(code);
    }
    Ok(result)
}

fn reset_teacher_secret(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let conn = require_db(&state.db)?;
    let code = get_required_str(params, "code")?;
    let new_secret = get_required_str(params, "newSecret")?;
    let confirm = get_required_str(params, "confirmSecret")?;
    session::reset_teacher_secret(
        conn,
        &mut state.pending_reset,
        &code,
        &new_secret,
        &confirm,
        Utc::now(),
    )?;
    Ok(json!({ "ok": true }))
}

fn change_teacher_secret(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let conn = require_db(&state.db)?;
    state.session.require_teacher()?;
    let new_secret = get_required_str(params, "newSecret")?;
    let confirm = get_required_str(params, "confirmSecret")?;
    state.session = session::change_teacher_secret(conn, state.session, &new_secret, &confirm)?;
    Ok(json!({ "session": state.session.to_json() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.whoami" => Ok(json!({ "session": state.session.to_json() })),
        "auth.loginTeacher" => login_teacher(state, &req.params),
        "auth.loginStudent" => login_student(state, &req.params),
        "auth.loginStudentByNamePhone" => login_student_by_name_phone(state, &req.params),
        "auth.logout" => {
            state.session = session::logout();
            Ok(json!({ "session": state.session.to_json() }))
        }
        "auth.requestReset" => request_reset(state),
        "auth.resetTeacherSecret" => reset_teacher_secret(state, &req.params),
        "auth.changeTeacherSecret" => change_teacher_secret(state, &req.params),
        _ => return None,
    };
    Some(respond(req, result))
}
