use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(envs: &[(&str, &str)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classroomd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("CLASSROOMD_WORKSPACE")
        .env_remove("CLASSROOMD_MARK_POLICY")
        .env_remove("CLASSROOMD_NOTICE_TTL_MS");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classroomd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[test]
fn roster_commands_persist_across_restarts() {
    let workspace = temp_dir("classroomd-roster");
    let ws = workspace.to_string_lossy().to_string();

    let (class_id, kept_id) = {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&[]);
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": ws }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "teacher.login",
            json!({ "name": "  Ms. Hina " }),
        );
        let created = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "classes.create",
            json!({
                "name": "Class 5",
                "students": [
                    { "rollNo": "7", "name": "Ali", "fatherName": "Aslam" },
                    { "name": "Sara" }
                ]
            }),
        );
        let class_id = created["classId"].as_str().expect("classId").to_string();
        let students = created["class"]["students"].as_array().expect("students").clone();
        assert_eq!(students[1]["rollNo"], "8");

        let next = request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "students.nextRollNo",
            json!({ "classId": class_id }),
        );
        assert_eq!(next["rollNo"], "9");

        let added = request_ok(
            &mut stdin,
            &mut reader,
            "5",
            "students.add",
            json!({ "classId": class_id, "name": "Bilal" }),
        );
        assert_eq!(added["student"]["rollNo"], "9");

        let sara_id = students[1]["id"].as_str().expect("id").to_string();
        let updated = request_ok(
            &mut stdin,
            &mut reader,
            "6",
            "students.update",
            json!({
                "classId": class_id,
                "studentId": sara_id,
                "patch": { "fatherName": "Karim" }
            }),
        );
        assert_eq!(updated["student"]["name"], "Sara");
        assert_eq!(updated["student"]["fatherName"], "Karim");

        let ali_id = students[0]["id"].as_str().expect("id").to_string();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "7",
            "students.remove",
            json!({ "classId": class_id, "studentId": ali_id }),
        );
        let code = request_err_code(
            &mut stdin,
            &mut reader,
            "8",
            "students.remove",
            json!({ "classId": class_id, "studentId": ali_id }),
        );
        assert_eq!(code, "not_found");

        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "9",
            "classes.rename",
            json!({ "classId": class_id, "name": "Class 5-B" }),
        );

        drop(stdin);
        let _ = child.wait();
        (class_id, sara_id)
    };

    let (mut child, mut stdin, mut reader) =
        spawn_sidecar(&[("CLASSROOMD_WORKSPACE", ws.as_str())]);
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["workspacePath"], ws.as_str());

    let teacher = request_ok(&mut stdin, &mut reader, "2", "teacher.get", json!({}));
    assert_eq!(teacher["teacherName"], "Ms. Hina");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.get",
        json!({ "classId": class_id }),
    );
    assert_eq!(class["class"]["name"], "Class 5-B");
    let names: Vec<&str> = class["class"]["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Sara", "Bilal"]);
    assert_eq!(class["class"]["students"][0]["id"], kept_id.as_str());

    let _ = request_ok(&mut stdin, &mut reader, "4", "teacher.logout", json!({}));
    let teacher = request_ok(&mut stdin, &mut reader, "5", "teacher.get", json!({}));
    assert!(teacher["teacherName"].is_null());
    assert_eq!(teacher["loggedIn"], false);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn roster_validation_errors() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&[]);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({ "name": "   " }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "teacher.login",
        json!({ "name": "" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "students.add",
        json!({ "classId": "missing", "name": "X" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "classes.create",
        json!({ "name": "Class 1", "students": [{ "rollNo": "1" }] }),
    );
    assert_eq!(code, "bad_params");

    // Memory store still accepts work before a workspace is chosen.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classes.create",
        json!({ "name": "Scratch" }),
    );
    assert!(created["classId"].is_string());

    drop(stdin);
    let _ = child.wait();
}
