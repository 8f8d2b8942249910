//! Field format rules applied before any roster mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const PHONE_LEN: usize = 10;
pub const NATIONAL_ID_MIN_LEN: usize = 4;
pub const NATIONAL_ID_MAX_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn all_ascii_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_phone(s: &str) -> bool {
    !s.is_empty() && s.len() == PHONE_LEN && all_ascii_digits(s)
}

/// Empty means "not supplied" and is accepted.
pub fn is_valid_national_id(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    all_ascii_digits(s) && (NATIONAL_ID_MIN_LEN..=NATIONAL_ID_MAX_LEN).contains(&s.len())
}

/// The local calendar date used for birth-date checks and attendance marks.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn is_valid_birth_date(d: NaiveDate, today: NaiveDate) -> bool {
    d <= today
}

pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| FieldError::new(field, "must be a date in YYYY-MM-DD format"))
}

pub fn check_phone(field: &'static str, s: Option<&str>) -> Result<(), FieldError> {
    match s {
        Some(v) if !is_valid_phone(v) => Err(FieldError::new(
            field,
            format!("must be exactly {} digits", PHONE_LEN),
        )),
        _ => Ok(()),
    }
}

pub fn check_national_id(s: Option<&str>) -> Result<(), FieldError> {
    match s {
        Some(v) if !is_valid_national_id(v) => Err(FieldError::new(
            "nationalId",
            format!(
                "must be {}-{} digits",
                NATIONAL_ID_MIN_LEN, NATIONAL_ID_MAX_LEN
            ),
        )),
        _ => Ok(()),
    }
}

pub fn check_birth_date(d: NaiveDate, today: NaiveDate) -> Result<(), FieldError> {
    if is_valid_birth_date(d, today) {
        Ok(())
    } else {
        Err(FieldError::new("birthDate", "must not be in the future"))
    }
}

/// Trim and collapse blank input to `None`.
pub fn non_empty_trimmed(s: Option<&str>) -> Option<String> {
    let t = s?.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "6th")]
    Sixth,
    #[serde(rename = "7th")]
    Seventh,
    #[serde(rename = "8th")]
    Eighth,
}

impl Grade {
    pub const ALL: [Grade; 3] = [Grade::Sixth, Grade::Seventh, Grade::Eighth];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Sixth => "6th",
            Grade::Seventh => "7th",
            Grade::Eighth => "8th",
        }
    }

    pub fn parse(s: &str) -> Result<Grade, FieldError> {
        let t = s.trim();
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| FieldError::new("grade", "must be one of 6th, 7th, 8th"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn phone_requires_exactly_ten_digits() {
        assert!(is_valid_phone("9896300467"));
        assert!(!is_valid_phone("98963004"));
        assert!(!is_valid_phone("98963004a7"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("98963004671"));
        // Non-ASCII digits are rejected even when the char count is 10.
        assert!(!is_valid_phone("٠١٢٣٤٥٦٧٨٩"));
    }

    #[test]
    fn national_id_bounds() {
        assert!(is_valid_national_id(""));
        assert!(!is_valid_national_id("123"));
        assert!(is_valid_national_id("1234"));
        assert!(is_valid_national_id("123456789012"));
        assert!(!is_valid_national_id("1234567890123"));
        assert!(!is_valid_national_id("12ab56"));
    }

    #[test]
    fn birth_date_not_in_future() {
        let today = d("2024-06-15");
        assert!(is_valid_birth_date(d("2012-01-01"), today));
        assert!(is_valid_birth_date(today, today));
        assert!(!is_valid_birth_date(d("2024-06-16"), today));
        assert_eq!(
            check_birth_date(d("2030-01-01"), today).unwrap_err().field,
            "birthDate"
        );
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("birthDate", " 2015-03-09 ").unwrap(), d("2015-03-09"));
        assert!(parse_date("birthDate", "09/03/2015").is_err());
    }

    #[test]
    fn grade_parse_is_case_insensitive() {
        assert_eq!(Grade::parse("7TH").unwrap(), Grade::Seventh);
        assert_eq!(Grade::parse("9th").unwrap_err().field, "grade");
    }

    #[test]
    fn check_helpers_report_field() {
        assert_eq!(check_phone("altPhone", Some("12")).unwrap_err().field, "altPhone");
        assert!(check_phone("phone", None).is_ok());
        assert_eq!(check_national_id(Some("12")).unwrap_err().field, "nationalId");
        assert_eq!(non_empty_trimmed(Some("   ")), None);
        assert_eq!(non_empty_trimmed(Some(" Aman ")), Some("Aman".to_string()));
    }
}
