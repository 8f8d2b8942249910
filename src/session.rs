//! Role gate: who is driving this process, and the teacher reset-code exchange.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::credentials;
use crate::error::{StoreError, StoreResult};
use crate::roster::{self, now_stamp};

pub const RESET_CODE_DIGITS: usize = 6;
pub const MAX_RESET_ATTEMPTS: u32 = 5;
/// Longest lifetime a reset code may have; larger settings are clamped to it.
pub const MAX_RESET_CODE_TTL_SECS: i64 = 86_400;

const BAD_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Teacher,
    Student(i64),
}

impl Session {
    pub fn to_json(self) -> serde_json::Value {
        match self {
            Session::Anonymous => json!({ "role": "anonymous" }),
            Session::Teacher => json!({ "role": "teacher" }),
            Session::Student(id) => json!({ "role": "student", "studentId": id }),
        }
    }

    pub fn require_teacher(self) -> StoreResult<()> {
        match self {
            Session::Teacher => Ok(()),
            _ => Err(StoreError::auth("teacher login required")),
        }
    }

    /// Resolve which student a read targets. Teachers may read anyone (an id is
    /// required); students only themselves.
    pub fn readable_student(self, requested: Option<i64>) -> StoreResult<i64> {
        match (self, requested) {
            (Session::Teacher, Some(id)) => Ok(id),
            (Session::Teacher, None) => Err(StoreError::validation("studentId", "is required")),
            (Session::Student(own), None) => Ok(own),
            (Session::Student(own), Some(id)) if id == own => Ok(own),
            (Session::Student(_), Some(_)) => {
                Err(StoreError::auth("students may only read their own record"))
            }
            (Session::Anonymous, _) => Err(StoreError::auth("login required")),
        }
    }
}

pub fn login_teacher(conn: &Connection, username: &str, secret: &str) -> StoreResult<Session> {
    let (stored_username, stored_hash): (String, String) = conn.query_row(
        "SELECT username, secret_hash FROM teacher WHERE id = 1",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    // Always run the hash check so a wrong username costs the same as a wrong secret.
    let secret_ok = credentials::verify_secret(secret, &stored_hash)?;
    if username != stored_username || !secret_ok {
        tracing::warn!(username, "teacher login failed");
        return Err(StoreError::auth(BAD_CREDENTIALS));
    }
    tracing::info!(username, "teacher logged in");
    Ok(Session::Teacher)
}

pub fn login_student(conn: &Connection, login_id: &str, secret: &str) -> StoreResult<Session> {
    let Some((id, Some(hash))) = roster::login_record(conn, login_id.trim())? else {
        tracing::warn!(login_id, "student login failed");
        return Err(StoreError::auth(BAD_CREDENTIALS));
    };
    if !credentials::verify_secret(secret, &hash)? {
        tracing::warn!(login_id, "student login failed");
        return Err(StoreError::auth(BAD_CREDENTIALS));
    }
    tracing::info!(student_id = id, "student logged in");
    Ok(Session::Student(id))
}

/// Name + phone login, only for records that never had a secret set.
pub fn login_student_by_name_phone(
    conn: &Connection,
    name: &str,
    phone: &str,
) -> StoreResult<Session> {
    let (id, protected) = match roster::find_student_by_name_phone(conn, name, phone) {
        Ok(v) => v,
        Err(StoreError::NotFound { .. }) => {
            return Err(StoreError::auth("no student found with that name and phone"))
        }
        Err(e) => return Err(e),
    };
    if protected {
        return Err(StoreError::auth(
            "account is protected; log in with login id and secret",
        ));
    }
    tracing::info!(student_id = id, "student logged in by name and phone");
    Ok(Session::Student(id))
}

pub fn logout() -> Session {
    Session::Anonymous
}

/// A pending reset code. Only a digest of the code is kept.
#[derive(Debug, Clone)]
pub struct ResetChallenge {
    digest: [u8; 32],
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    attempts: u32,
}

fn digest_code(code: &str) -> [u8; 32] {
    Sha256::digest(code.trim().as_bytes()).into()
}

pub fn issue_reset_code(now: DateTime<Utc>, ttl_secs: i64) -> (String, ResetChallenge) {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let code = format!("{:0width$}", n, width = RESET_CODE_DIGITS);
    let challenge = ResetChallenge {
        digest: digest_code(&code),
        issued_at: now,
        expires_at: now
            .checked_add_signed(Duration::seconds(ttl_secs.clamp(0, MAX_RESET_CODE_TTL_SECS)))
            .unwrap_or(now),
        attempts: 0,
    };
    (code, challenge)
}

/// Check `code` against the pending challenge. The challenge is consumed on
/// success, on expiry, and once the attempt budget is spent.
pub fn redeem_reset_code(
    pending: &mut Option<ResetChallenge>,
    code: &str,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let Some(challenge) = pending.as_mut() else {
        return Err(StoreError::auth("no reset code has been issued"));
    };
    if now >= challenge.expires_at {
        *pending = None;
        return Err(StoreError::auth("reset code expired"));
    }
    if digest_code(code) != challenge.digest {
        challenge.attempts += 1;
        if challenge.attempts >= MAX_RESET_ATTEMPTS {
            *pending = None;
            return Err(StoreError::auth("too many wrong codes; request a new one"));
        }
        return Err(StoreError::auth("invalid reset code"));
    }
    *pending = None;
    Ok(())
}

fn check_new_secret(new_secret: &str, confirm: &str) -> StoreResult<()> {
    if new_secret.is_empty() || confirm.is_empty() {
        return Err(StoreError::validation("newSecret", "fill both fields"));
    }
    if new_secret != confirm {
        return Err(StoreError::validation("confirmSecret", "secrets do not match"));
    }
    Ok(())
}

fn store_teacher_secret(conn: &Connection, new_secret: &str) -> StoreResult<()> {
    let hash = credentials::hash_secret(new_secret)?;
    conn.execute(
        "UPDATE teacher SET secret_hash = ?, updated_at = ? WHERE id = 1",
        (&hash, now_stamp()),
    )?;
    Ok(())
}

/// Set a new teacher secret after a reset code was redeemed.
pub fn reset_teacher_secret(
    conn: &Connection,
    pending: &mut Option<ResetChallenge>,
    code: &str,
    new_secret: &str,
    confirm: &str,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    check_new_secret(new_secret, confirm)?;
    redeem_reset_code(pending, code, now)?;
    store_teacher_secret(conn, new_secret)?;
    tracing::info!("teacher secret reset");
    Ok(())
}

/// Change the secret from a logged-in teacher session. The caller is logged out.
pub fn change_teacher_secret(
    conn: &Connection,
    session: Session,
    new_secret: &str,
    confirm: &str,
) -> StoreResult<Session> {
    session.require_teacher()?;
    check_new_secret(new_secret, confirm)?;
    store_teacher_secret(conn, new_secret)?;
    tracing::info!("teacher secret changed");
    Ok(Session::Anonymous)
}
