//! E2E tests for the non-interactive commands against a local fake
//! PostgREST server: `tagreview list`, `show`, `stats`, `apply`.
//!
//! Covers: frequency ordering, action filtering, JSON shapes, partial update
//! bodies, dry runs, save failures, and load failures.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fake PostgREST
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Value>,
    fail_ids: HashSet<i64>,
    requests: Vec<Request>,
}

#[derive(Debug, Clone)]
struct Request {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct FakeStore {
    url: String,
    table: Arc<Mutex<Table>>,
}

impl FakeStore {
    fn start(rows: Vec<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let table = Arc::new(Mutex::new(Table {
            rows,
            ..Table::default()
        }));
        let shared = Arc::clone(&table);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &shared);
            }
        });
        Self { url, table }
    }

    fn fail_updates_for(&self, id: i64) {
        self.table.lock().unwrap().fail_ids.insert(id);
    }

    fn requests(&self) -> Vec<Request> {
        self.table.lock().unwrap().requests.clone()
    }

    fn patches(&self) -> Vec<(String, Value)> {
        self.requests()
            .into_iter()
            .filter(|req| req.method == "PATCH")
            .map(|req| (req.target, serde_json::from_str(&req.body).unwrap()))
            .collect()
    }

    fn row(&self, id: i64) -> Value {
        self.table
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|row| row["id"] == id)
            .cloned()
            .unwrap()
    }
}

fn read_request(stream: &TcpStream) -> Request {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    let length: usize = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .map_or(0, |(_, value)| value.parse().unwrap());
    let mut body = vec![0; length];
    reader.read_exact(&mut body).unwrap();

    Request {
        method,
        target,
        headers,
        body: String::from_utf8(body).unwrap(),
    }
}

fn respond(mut stream: &TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).unwrap();
}

fn serve(stream: TcpStream, table: &Mutex<Table>) {
    let request = read_request(&stream);
    let mut table = table.lock().unwrap();
    table.requests.push(request.clone());

    match request.method.as_str() {
        "GET" => {
            let mut rows = table.rows.clone();
            rows.sort_by_key(|row| std::cmp::Reverse(row["Frequency"].as_i64().unwrap_or(i64::MIN)));
            respond(&stream, "200 OK", &Value::Array(rows).to_string());
        }
        "PATCH" => {
            let id: i64 = request
                .target
                .split("id=eq.")
                .nth(1)
                .and_then(|raw| raw.parse().ok())
                .unwrap();
            if table.fail_ids.contains(&id) {
                respond(&stream, "500 Internal Server Error", r#"{"message":"boom"}"#);
                return;
            }
            let patch: Value = serde_json::from_str(&request.body).unwrap();
            if let Some(row) = table.rows.iter_mut().find(|row| row["id"] == id) {
                for (key, value) in patch.as_object().unwrap() {
                    row[key] = value.clone();
                }
            }
            respond(&stream, "204 No Content", "");
        }
        _ => respond(&stream, "405 Method Not Allowed", "{}"),
    }
}

fn sample_rows() -> Vec<Value> {
    vec![
        json!({
            "id": 1, "created_at": "2024-03-01T10:00:00+00:00",
            "Old_Tag": "rb", "New_Tag": "ruby", "Action": null, "Frequency": 5,
            "AI_Suggestion": "merge", "AI_New_Name": "ruby",
            "AI_Reasoning": "abbreviation", "Notes": null
        }),
        json!({
            "id": 2, "created_at": "2024-03-01T10:00:00+00:00",
            "Old_Tag": "js", "New_Tag": "javascript", "Action": "Approved", "Frequency": 30,
            "AI_Suggestion": "merge", "AI_New_Name": "javascript",
            "AI_Reasoning": "same language", "Notes": "obvious"
        }),
        json!({
            "id": 3, "created_at": "2024-03-01T10:00:00+00:00",
            "Old_Tag": "go", "New_Tag": "golang", "Action": "Reject", "Frequency": 10,
            "AI_Suggestion": "rename", "AI_New_Name": "golang",
            "AI_Reasoning": "search clarity", "Notes": null
        }),
    ]
}

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

fn tagreview(dir: &Path, store_url: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tagreview"));
    cmd.current_dir(dir);
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("TAGREVIEW_LOG", "error");
    cmd.env("TAGREVIEW_URL", store_url);
    for name in ["SUPABASE_URL", "SUPABASE_ANON_KEY", "TAGREVIEW_API_KEY", "TAGREVIEW_TABLE", "FORMAT"] {
        cmd.env_remove(name);
    }
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

// ---------------------------------------------------------------------------
// list / show / stats
// ---------------------------------------------------------------------------

#[test]
fn list_text_is_ordered_by_frequency() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    let output = tagreview(dir.path(), &store.url)
        .args(["list", "--format", "text"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let ids: Vec<&str> = stdout
        .lines()
        .skip(1)
        .map(|line| line.split('\t').next().unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "3", "1"]);
    assert!(stdout.starts_with("ID\tFREQ\tOLD\tNEW\tACTION\tAI\n"));

    let requests = store.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].target,
        "/rest/v1/Tag_Mapping?select=*&order=Frequency.desc"
    );
}

#[test]
fn list_json_filters_by_action() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    let rows = json_stdout(
        tagreview(dir.path(), &store.url).args(["list", "--action", "unset", "--format", "json"]),
    );
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[0]["Action"], Value::Null);
}

#[test]
fn list_rejects_unknown_action_before_fetching() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["list", "--action", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"))
        .stderr(predicate::str::contains("invalid action 'maybe'"));
    assert!(store.requests().is_empty());
}

#[test]
fn api_key_is_sent_as_apikey_and_bearer() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .env("TAGREVIEW_API_KEY", "anon-key")
        .args(["stats", "--format", "json"])
        .assert()
        .success();

    let requests = store.requests();
    assert_eq!(requests[0].header("apikey"), Some("anon-key"));
    assert_eq!(requests[0].header("authorization"), Some("Bearer anon-key"));
}

#[test]
fn show_json_includes_reasoning() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    let row = json_stdout(tagreview(dir.path(), &store.url).args(["show", "3", "--format", "json"]));
    assert_eq!(row["Old_Tag"], "go");
    assert_eq!(row["Action"], "Reject");
    assert_eq!(row["AI_Reasoning"], "search clarity");
}

#[test]
fn show_unknown_row_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["show", "99", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error_code\": \"E2001\""))
        .stderr(predicate::str::contains("row 99 not found"));
}

#[test]
fn stats_json_counts_actions() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    let stats = json_stdout(tagreview(dir.path(), &store.url).args(["stats", "--format", "json"]));
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["approved"], 1);
    assert_eq!(stats["rejected"], 1);
    assert_eq!(stats["unset"], 1);
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

#[test]
fn apply_sends_only_changed_fields() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    let report = json_stdout(tagreview(dir.path(), &store.url).args([
        "apply",
        "--approve",
        "1",
        "--note",
        "3=too generic",
        "--format",
        "json",
    ]));
    assert_eq!(report["saved"], 2);

    let mut patches = store.patches();
    patches.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        patches,
        vec![
            (
                "/rest/v1/Tag_Mapping?id=eq.1".to_string(),
                json!({"Action": "Approved"})
            ),
            (
                "/rest/v1/Tag_Mapping?id=eq.3".to_string(),
                json!({"Notes": "too generic"})
            ),
        ]
    );
    assert_eq!(store.row(3)["Action"], "Reject");
}

#[test]
fn apply_unset_writes_null() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["apply", "--unset", "2", "--note", "2=", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 change(s) saved successfully!"));

    assert_eq!(
        store.patches(),
        vec![(
            "/rest/v1/Tag_Mapping?id=eq.2".to_string(),
            json!({"Action": null, "Notes": null})
        )]
    );
}

#[test]
fn apply_matching_current_value_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["apply", "--approve", "2", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to save."));
    assert!(store.patches().is_empty());
}

#[test]
fn apply_dry_run_prints_payloads_without_sending() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["apply", "--set", "1=reject", "--dry-run", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PATCH id=1 {\"Action\":\"Reject\"}"));
    assert!(store.patches().is_empty());
}

#[test]
fn apply_failure_reports_failed_rows() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());
    store.fail_updates_for(3);

    tagreview(dir.path(), &store.url)
        .args(["apply", "--approve", "1", "--approve", "3", "--format", "text"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed id=3"))
        .stderr(predicate::str::contains("error saving 1 record(s) of 2"))
        .stderr(predicate::str::contains("E4002"));
}

#[test]
fn apply_unknown_row_fails_without_saving() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["apply", "--approve", "1", "--reject", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 42 not found"));
    assert!(store.patches().is_empty());
}

#[test]
fn quiet_apply_prints_nothing_on_success() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());

    tagreview(dir.path(), &store.url)
        .args(["apply", "--reject", "1", "--quiet", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(store.row(1)["Action"], "Reject");
}

// ---------------------------------------------------------------------------
// Failure surfaces
// ---------------------------------------------------------------------------

#[test]
fn missing_store_url_is_reported() {
    let dir = TempDir::new().unwrap();

    let mut cmd = tagreview(dir.path(), "");
    cmd.env_remove("TAGREVIEW_URL")
        .args(["list", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"))
        .stderr(predicate::str::contains("remote store URL is not configured"));
}

#[test]
fn unreachable_store_is_a_load_failure() {
    let dir = TempDir::new().unwrap();
    // Bind then drop to get a port nothing listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    tagreview(dir.path(), &format!("http://127.0.0.1:{port}"))
        .args(["stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error fetching tags"))
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn malformed_project_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = FakeStore::start(sample_rows());
    std::fs::create_dir_all(dir.path().join(".tagreview")).unwrap();
    std::fs::write(dir.path().join(".tagreview/config.toml"), "[store\nurl = ").unwrap();

    tagreview(dir.path(), &store.url)
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
    assert!(store.requests().is_empty());
}
