use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

use crate::export;
use crate::ipc::helpers::{get_required_str, with_db, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;

fn export_failed(e: anyhow::Error) -> HandlerErr {
    tracing::warn!(error = %e, "export failed");
    HandlerErr {
        code: "export_failed",
        message: format!("{e:#}"),
        details: None,
    }
}

fn export_to(
    conn: &Connection,
    session: Session,
    params: &serde_json::Value,
    write: fn(&Connection, &Path) -> anyhow::Result<usize>,
) -> HandlerResult {
    session.require_teacher()?;
    let out_path = get_required_str(params, "outPath")?;
    let rows = write(conn, Path::new(&out_path)).map_err(export_failed)?;
    tracing::info!(rows, path = %out_path, "roster exported");
    Ok(json!({ "rowsExported": rows, "path": out_path }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    match req.method.as_str() {
        "export.csv" => Some(with_db(state, req, |c, s| {
            export_to(c, s, p, export::write_students_csv)
        })),
        "export.xlsx" => Some(with_db(state, req, |c, s| {
            export_to(c, s, p, export::write_students_xlsx)
        })),
        _ => None,
    }
}
