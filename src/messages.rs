use rusqlite::Connection;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::roster::now_stamp;
use crate::validation::non_empty_trimmed;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender_login_id: String,
    pub body: String,
    pub reply: Option<String>,
    pub created_at: String,
    pub replied_at: Option<String>,
}

pub fn post_message(conn: &Connection, sender_login_id: &str, body: &str) -> StoreResult<i64> {
    let body = non_empty_trimmed(Some(body))
        .ok_or_else(|| StoreError::validation("body", "must not be empty"))?;
    conn.execute(
        "INSERT INTO messages(sender_login_id, body, created_at) VALUES(?, ?, ?)",
        (sender_login_id, &body, now_stamp()),
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(message_id = id, sender = sender_login_id, "message posted");
    Ok(id)
}

/// Newest first; `sender` restricts the list to one login id.
pub fn list_messages(conn: &Connection, sender: Option<&str>) -> StoreResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_login_id, body, reply, created_at, replied_at
         FROM messages
         WHERE ?1 IS NULL OR sender_login_id = ?1
         ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([sender], |r| {
            Ok(Message {
                id: r.get(0)?,
                sender_login_id: r.get(1)?,
                body: r.get(2)?,
                reply: r.get(3)?,
                created_at: r.get(4)?,
                replied_at: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The reply is the only mutable part of a message; a later reply replaces an earlier one.
pub fn reply_to_message(conn: &Connection, id: i64, reply: &str) -> StoreResult<()> {
    let reply = non_empty_trimmed(Some(reply))
        .ok_or_else(|| StoreError::validation("reply", "must not be empty"))?;
    let changed = conn.execute(
        "UPDATE messages SET reply = ?, replied_at = ? WHERE id = ?",
        (&reply, now_stamp(), id),
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("message", id));
    }
    Ok(())
}
