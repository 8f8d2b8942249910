use serde_json::json;

mod test_support;

use test_support::{error_code, login_teacher, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn teacher_adds_marks_and_deletes_a_student() {
    let workspace = temp_dir("rosterd-aman");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    login_teacher(&mut stdin, &mut reader);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Aman",
            "grade": "7th",
            "birthDate": "2013-04-02",
            "phone": "9876543210"
        }),
    );
    let id = created["studentId"].as_i64().expect("studentId");

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "studentId": id, "status": "present" }),
    );
    assert_eq!(marked["status"].as_str(), Some("present"));

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.summary",
        json!({ "studentId": id }),
    );
    assert_eq!(summary["present"].as_i64(), Some(1));
    assert_eq!(summary["absent"].as_i64(), Some(0));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.delete",
        json!({ "studentId": id }),
    );
    assert_eq!(deleted["deleted"].as_bool(), Some(true));

    let gone = request(
        &mut stdin,
        &mut reader,
        "6",
        "students.get",
        json!({ "studentId": id }),
    );
    assert_eq!(error_code(&gone), "not_found");

    let list = request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));
    let names: Vec<&str> = list["students"]
        .as_array()
        .expect("students array")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert!(!names.contains(&"Aman"), "Aman still listed: {:?}", names);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn signup_with_short_phone_is_rejected_without_a_row() {
    let workspace = temp_dir("rosterd-signup-phone");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.signup",
        json!({
            "name": "Riya",
            "birthDate": "2012-01-15",
            "phone": "12345",
            "loginId": "riya",
            "secret": "pw"
        }),
    );
    assert_eq!(error_code(&resp), "validation_failed");
    assert_eq!(resp["error"]["details"]["field"].as_str(), Some("phone"));

    login_teacher(&mut stdin, &mut reader);
    let list = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(list["count"].as_u64(), Some(0));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn duplicate_login_id_leaves_roster_unchanged() {
    let workspace = temp_dir("rosterd-duplicate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let signup = json!({
        "name": "Kabir",
        "birthDate": "2012-06-30",
        "phone": "9123456780",
        "loginId": "kabir",
        "secret": "pw"
    });
    request_ok(&mut stdin, &mut reader, "2", "students.signup", signup.clone());
    let again = request(&mut stdin, &mut reader, "3", "students.signup", signup);
    assert_eq!(error_code(&again), "duplicate");
    assert_eq!(again["error"]["details"]["field"].as_str(), Some("loginId"));

    login_teacher(&mut stdin, &mut reader);
    let list = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    assert_eq!(list["count"].as_u64(), Some(1));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn create_then_get_returns_supplied_fields_only() {
    let workspace = temp_dir("rosterd-roundtrip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    login_teacher(&mut stdin, &mut reader);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Meera",
            "grade": "8th",
            "fatherName": "Arun",
            "nationalId": "123456789012",
            "birthDate": "2011-11-05",
            "altPhone": "9000000001"
        }),
    );
    let id = created["studentId"].as_i64().expect("studentId");

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "studentId": id }),
    );
    let s = &got["student"];
    assert_eq!(s["name"].as_str(), Some("Meera"));
    assert_eq!(s["grade"].as_str(), Some("8th"));
    assert_eq!(s["fatherName"].as_str(), Some("Arun"));
    assert_eq!(s["nationalId"].as_str(), Some("123456789012"));
    assert_eq!(s["birthDate"].as_str(), Some("2011-11-05"));
    assert_eq!(s["altPhone"].as_str(), Some("9000000001"));
    assert!(s["motherName"].is_null());
    assert!(s["phone"].is_null());
    assert!(s["loginId"].is_null());
    assert_eq!(s["hasSecret"].as_bool(), Some(false));

    let updated = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "studentId": id, "name": "Meera", "birthDate": "2011-11-05", "nationalId": "123" }),
    );
    assert_eq!(error_code(&updated), "validation_failed");
    assert_eq!(updated["error"]["details"]["field"].as_str(), Some("nationalId"));

    let contacts = request_ok(&mut stdin, &mut reader, "5", "students.contacts", json!({}));
    assert_eq!(contacts["count"].as_u64(), Some(1));
    assert_eq!(contacts["numbers"][0].as_str(), Some("+919000000001"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn delete_of_missing_student_is_a_no_op() {
    let workspace = temp_dir("rosterd-delete-missing");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    login_teacher(&mut stdin, &mut reader);

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.delete",
        json!({ "studentId": 4242 }),
    );
    assert_eq!(res["deleted"].as_bool(), Some(false));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn store_methods_require_a_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(error_code(&resp), "no_workspace");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn delete_all_reports_removed_count_and_clears_attendance() {
    let workspace = temp_dir("rosterd-delete-all");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    login_teacher(&mut stdin, &mut reader);

    let mut ids = Vec::new();
    for (rid, name) in [("2", "Aman"), ("3", "Neha")] {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            rid,
            "students.create",
            json!({ "name": name, "birthDate": "2013-04-02" }),
        );
        ids.push(created["studentId"].as_i64().expect("studentId"));
    }
    for (i, id) in ids.iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("m{}", i),
            "attendance.mark",
            json!({ "studentId": id, "status": "present", "date": "2024-02-01" }),
        );
    }

    let res = request_ok(&mut stdin, &mut reader, "4", "students.deleteAll", json!({}));
    assert_eq!(res["deleted"].as_u64(), Some(2));

    let list = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert_eq!(list["count"].as_u64(), Some(0));
    let history = request(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.history",
        json!({ "studentId": ids[0] }),
    );
    assert_eq!(error_code(&history), "not_found");

    let again = request_ok(&mut stdin, &mut reader, "7", "students.deleteAll", json!({}));
    assert_eq!(again["deleted"].as_u64(), Some(0));

    drop(stdin);
    let _ = child.wait();
}
