//! Student records: creation, edits, removal and lookup.

use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::credentials;
use crate::error::{StoreError, StoreResult};
use crate::validation::{self, non_empty_trimmed, FieldError, Grade};

pub const CONTACT_MESSAGE_TEMPLATE: &str = "Hello, this group is for class updates.";

pub(crate) fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Raw student fields as submitted by a form. Everything is optional here;
/// [`StudentInput::validate_profile`] decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentInput {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,
    pub login_id: Option<String>,
    pub secret: Option<String>,
}

/// The teacher-editable part of a student, already validated and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub name: String,
    pub grade: Option<Grade>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: NaiveDate,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    TeacherForm,
    SelfSignup,
}

impl StudentInput {
    pub fn validate_profile(&self, today: NaiveDate) -> Result<StudentProfile, FieldError> {
        let name = non_empty_trimmed(self.name.as_deref())
            .ok_or_else(|| FieldError::new("name", "is required"))?;
        let birth_raw = non_empty_trimmed(self.birth_date.as_deref())
            .ok_or_else(|| FieldError::new("birthDate", "is required"))?;
        let birth_date = validation::parse_date("birthDate", &birth_raw)?;
        validation::check_birth_date(birth_date, today)?;

        let grade = match non_empty_trimmed(self.grade.as_deref()) {
            Some(g) => Some(Grade::parse(&g)?),
            None => None,
        };
        let national_id = non_empty_trimmed(self.national_id.as_deref());
        validation::check_national_id(national_id.as_deref())?;
        let phone = non_empty_trimmed(self.phone.as_deref());
        validation::check_phone("phone", phone.as_deref())?;
        let alt_phone = non_empty_trimmed(self.alt_phone.as_deref());
        validation::check_phone("altPhone", alt_phone.as_deref())?;

        Ok(StudentProfile {
            name,
            grade,
            father_name: non_empty_trimmed(self.father_name.as_deref()),
            mother_name: non_empty_trimmed(self.mother_name.as_deref()),
            national_id,
            birth_date,
            phone,
            alt_phone,
        })
    }

    /// Login id and secret travel together: both or neither.
    fn login_pair(&self, mode: CreateMode) -> Result<Option<(String, String)>, FieldError> {
        let login_id = non_empty_trimmed(self.login_id.as_deref());
        let secret = self.secret.clone().filter(|s| !s.trim().is_empty());
        match (login_id, secret) {
            (Some(l), Some(s)) => Ok(Some((l, s))),
            (None, None) if mode == CreateMode::TeacherForm => Ok(None),
            (None, _) => Err(FieldError::new("loginId", "is required")),
            (Some(_), None) => Err(FieldError::new("secret", "is required")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub grade: Option<Grade>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: String,
    pub phone: Option<String>,
    pub alt_phone: Option<String>,
    pub login_id: Option<String>,
    pub has_secret: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

const STUDENT_COLUMNS: &str = "id, name, grade, father_name, mother_name, national_id, birth_date,
     phone, alt_phone, login_id, secret_hash IS NOT NULL, created_at, updated_at";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    let grade: Option<String> = r.get(2)?;
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        grade: grade.and_then(|g| Grade::parse(&g).ok()),
        father_name: r.get(3)?,
        mother_name: r.get(4)?,
        national_id: r.get(5)?,
        birth_date: r.get(6)?,
        phone: r.get(7)?,
        alt_phone: r.get(8)?,
        login_id: r.get(9)?,
        has_secret: r.get(10)?,
        created_at: r.get(11)?,
        updated_at: r.get(12)?,
    })
}

fn login_id_taken(conn: &Connection, login_id: &str) -> StoreResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM students WHERE login_id = ?",
            [login_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

pub fn create_student(
    conn: &Connection,
    input: &StudentInput,
    mode: CreateMode,
    today: NaiveDate,
) -> StoreResult<i64> {
    let profile = input.validate_profile(today)?;
    if mode == CreateMode::SelfSignup && profile.phone.is_none() {
        return Err(StoreError::validation("phone", "is required"));
    }
    let login = input.login_pair(mode)?;

    let mut login_id: Option<String> = None;
    let mut secret_hash: Option<String> = None;
    if let Some((l, secret)) = login {
        if login_id_taken(conn, &l)? {
            return Err(StoreError::Duplicate {
                field: "loginId",
                value: l,
            });
        }
        secret_hash = Some(credentials::hash_secret(&secret)?);
        login_id = Some(l);
    }

    let inserted = conn.execute(
        "INSERT INTO students(
           name, grade, father_name, mother_name, national_id, birth_date,
           phone, alt_phone, login_id, secret_hash, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            profile.name,
            profile.grade.map(|g| g.as_str()),
            profile.father_name,
            profile.mother_name,
            profile.national_id,
            profile.birth_date.format("%Y-%m-%d").to_string(),
            profile.phone,
            profile.alt_phone,
            login_id,
            secret_hash,
            now_stamp(),
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(StoreError::Duplicate {
                field: "loginId",
                value: login_id.unwrap_or_default(),
            });
        }
        Err(e) => return Err(e.into()),
    }
    let id = conn.last_insert_rowid();
    tracing::info!(student_id = id, ?mode, "student created");
    Ok(id)
}

/// Replace every profile field of `id`. Login credentials are left untouched.
pub fn update_student(
    conn: &Connection,
    id: i64,
    input: &StudentInput,
    today: NaiveDate,
) -> StoreResult<()> {
    let profile = input.validate_profile(today)?;
    let changed = conn.execute(
        "UPDATE students SET
           name = ?, grade = ?, father_name = ?, mother_name = ?, national_id = ?,
           birth_date = ?, phone = ?, alt_phone = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            profile.name,
            profile.grade.map(|g| g.as_str()),
            profile.father_name,
            profile.mother_name,
            profile.national_id,
            profile.birth_date.format("%Y-%m-%d").to_string(),
            profile.phone,
            profile.alt_phone,
            now_stamp(),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("student", id));
    }
    tracing::info!(student_id = id, "student updated");
    Ok(())
}

/// Remove a student and its attendance. Deleting an unknown id is a no-op and
/// returns `false`.
pub fn delete_student(conn: &Connection, id: i64) -> StoreResult<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance_entries WHERE student_id = ?", [id])?;
    let removed = tx.execute("DELETE FROM students WHERE id = ?", [id])?;
    tx.commit()?;
    if removed > 0 {
        tracing::info!(student_id = id, "student deleted");
    }
    Ok(removed > 0)
}

pub fn delete_all_students(conn: &Connection) -> StoreResult<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance_entries", [])?;
    let removed = tx.execute("DELETE FROM students", [])?;
    tx.commit()?;
    tracing::warn!(removed, "all students deleted");
    Ok(removed)
}

pub fn get_student(conn: &Connection, id: i64) -> StoreResult<Student> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    conn.query_row(&sql, [id], student_from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("student", id))
}

pub fn student_exists(conn: &Connection, id: i64) -> StoreResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}

pub fn find_student(conn: &Connection, login_id: &str, phone: &str) -> StoreResult<i64> {
    conn.query_row(
        "SELECT id FROM students WHERE login_id = ? AND phone = ?",
        (login_id, phone),
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("student", login_id))
}

/// Credential-free lookup. Returns the id and whether the record is protected
/// by a secret. The most recently created match wins.
pub fn find_student_by_name_phone(
    conn: &Connection,
    name: &str,
    phone: &str,
) -> StoreResult<(i64, bool)> {
    conn.query_row(
        "SELECT id, secret_hash IS NOT NULL FROM students
         WHERE name = ? AND phone = ?
         ORDER BY id DESC LIMIT 1",
        (name.trim(), phone.trim()),
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("student", name.trim()))
}

/// Id and stored secret hash for a login identifier.
pub fn login_record(conn: &Connection, login_id: &str) -> StoreResult<Option<(i64, Option<String>)>> {
    Ok(conn
        .query_row(
            "SELECT id, secret_hash FROM students WHERE login_id = ?",
            [login_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?)
}

/// Most recently created first. A non-empty `query` keeps students whose name,
/// guardian names or national id contain it, ignoring case.
pub fn list_students(conn: &Connection, query: Option<&str>) -> StoreResult<Vec<Student>> {
    let sql = format!("SELECT {} FROM students ORDER BY id DESC", STUDENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let Some(q) = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()) else {
        return Ok(students);
    };
    let contains = |field: &Option<String>| {
        field
            .as_deref()
            .map(|v| v.to_lowercase().contains(&q))
            .unwrap_or(false)
    };
    Ok(students
        .into_iter()
        .filter(|s| {
            s.name.to_lowercase().contains(&q)
                || contains(&s.father_name)
                || contains(&s.mother_name)
                || contains(&s.national_id)
        })
        .collect())
}

pub fn student_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactList {
    pub count: usize,
    pub numbers: Vec<String>,
    pub message_template: String,
}

/// Valid alternate (WhatsApp) numbers in roster order, with `prefix` prepended.
pub fn collect_contact_numbers(conn: &Connection, prefix: &str) -> StoreResult<ContactList> {
    let mut stmt =
        conn.prepare("SELECT alt_phone FROM students WHERE alt_phone IS NOT NULL ORDER BY id DESC")?;
    let numbers: Vec<String> = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|n| validation::is_valid_phone(n))
        .map(|n| format!("{}{}", prefix, n))
        .collect();
    Ok(ContactList {
        count: numbers.len(),
        numbers,
        message_template: CONTACT_MESSAGE_TEMPLATE.to_string(),
    })
}
