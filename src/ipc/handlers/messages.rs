use rusqlite::Connection;
use serde_json::json;

use crate::error::StoreError;
use crate::ipc::helpers::{get_required_i64, get_required_str, with_db, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::messages;
use crate::roster;
use crate::session::Session;

/// Messages are filed under the student's login id, so name+phone sessions
/// without one cannot post.
fn sender_login_id(conn: &Connection, session: Session) -> Result<String, StoreError> {
    let Session::Student(id) = session else {
        return Err(StoreError::auth("only students can post messages"));
    };
    roster::get_student(conn, id)?
        .login_id
        .ok_or_else(|| StoreError::auth("sign up with a login id to send messages"))
}

fn messages_post(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    let sender = sender_login_id(conn, session)?;
    let body = get_required_str(params, "body")?;
    let id = messages::post_message(conn, &sender, &body)?;
    Ok(json!({ "messageId": id }))
}

fn messages_list(conn: &Connection, session: Session) -> HandlerResult {
    let list = match session {
        Session::Teacher => messages::list_messages(conn, None)?,
        Session::Student(id) => match roster::get_student(conn, id)?.login_id {
            Some(login_id) => messages::list_messages(conn, Some(&login_id))?,
            None => Vec::new(),
        },
        Session::Anonymous => return Err(StoreError::auth("login required").into()),
    };
    Ok(json!({ "messages": list }))
}

fn messages_reply(conn: &Connection, session: Session, params: &serde_json::Value) -> HandlerResult {
    session.require_teacher()?;
    let id = get_required_i64(params, "messageId")?;
    let reply = get_required_str(params, "reply")?;
    messages::reply_to_message(conn, id, &reply)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    match req.method.as_str() {
        "messages.post" => Some(with_db(state, req, |c, s| messages_post(c, s, p))),
        "messages.list" => Some(with_db(state, req, messages_list)),
        "messages.reply" => Some(with_db(state, req, |c, s| messages_reply(c, s, p))),
        _ => None,
    }
}
