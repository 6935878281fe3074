use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;

const MIXED_DIFF: &str = "\
diff --git a/uv.lock b/uv.lock
index 1111111..2222222 100644
--- a/uv.lock
+++ b/uv.lock
@@ -1,3 +1,3 @@
-version = 1
+version = 2
diff --git a/main.py b/main.py
index 3333333..4444444 100644
--- a/main.py
+++ b/main.py
@@ -1,2 +1,3 @@
 def main():
+    print(\"hello world\")
     pass
";

fn scribe(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_scribe"))
        .args(args)
        .arg("--no-clipboard")
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut pipe = child.stdin.take().unwrap();
    // The binary may exit before reading, e.g. on a config error.
    if let Err(e) = pipe.write_all(stdin.as_bytes()) {
        assert_eq!(e.kind(), ErrorKind::BrokenPipe, "writing stdin: {e}");
    }
    drop(pipe);
    child.wait_with_output().unwrap()
}

/// Answer one HTTP request with a chat reply and hand back the request body.
fn serve_chat_once(reply: &str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let body = serde_json::json!({
        "model": "stub",
        "message": { "role": "assistant", "content": reply },
        "done": true,
    })
    .to_string();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut request = vec![0; content_length];
        reader.read_exact(&mut request).unwrap();
        tx.send(String::from_utf8(request).unwrap()).unwrap();

        let mut stream = reader.into_inner();
        write!(
            stream,
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
    });

    (url, rx)
}

#[test]
fn empty_stdin_reports_nothing_staged() {
    let dir = tempfile::tempdir().unwrap();
    let output = scribe(dir.path(), &[], "");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nothing to summarize"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn refused_connection_reports_unavailable_server() {
    let dir = tempfile::tempdir().unwrap();
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}");

    let output = scribe(dir.path(), &["--url", &url, "--timeout", "5"], MIXED_DIFF);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unavailable"), "stderr: {stderr}");
}

#[test]
fn lockfile_and_source_change_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (url, requests) = serve_chat_once("Add hello world print");

    let output = scribe(dir.path(), &["--url", &url, "--model", "stub-model"], MIXED_DIFF);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        "Add hello world print and updated documentation"
    );

    let request: serde_json::Value = serde_json::from_str(&requests.recv().unwrap()).unwrap();
    assert_eq!(request["model"], "stub-model");
    assert_eq!(request["stream"], false);
    let user = request["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("print(\"hello world\")"));
    assert!(!user.contains("version = 2"));
}

#[test]
fn json_output_includes_stats() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _requests) = serve_chat_once("\"Add hello world print\"");

    let output = scribe(dir.path(), &["--url", &url, "--format", "json"], MIXED_DIFF);

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        summary["message"],
        "Add hello world print and updated documentation"
    );
    assert_eq!(summary["stats"]["filesSeen"], 2);
    assert_eq!(summary["stats"]["documentationUpdated"], true);
    assert_eq!(summary["stats"]["skipped"][0]["path"], "uv.lock");
}

#[test]
fn dry_run_prints_prompt_without_contacting_server() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens here; a network call would fail the run.
    let output = scribe(
        dir.path(),
        &["--dry-run", "--url", "http://127.0.0.1:9"],
        MIXED_DIFF,
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Write a concise, imperative-mood git commit message"));
    assert!(stdout.contains("diff --git a/main.py b/main.py"));
    assert!(!stdout.contains("diff --git a/uv.lock"));
    assert_eq!(stdout.matches("and updated documentation").count(), 1);
}

#[test]
fn diff_flag_reads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let patch = dir.path().join("changes.patch");
    std::fs::write(&patch, "diff --git a/a.rs b/a.rs\n+fn a() {}\n").unwrap();

    let output = scribe(
        dir.path(),
        &["--dry-run", "--diff", patch.to_str().unwrap()],
        "",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.ends_with("diff --git a/a.rs b/a.rs\n+fn a() {}\n"));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".scribe.toml"),
        "[message]\nmax_length = 72\n",
    )
    .unwrap();

    let output = scribe(dir.path(), &["--dry-run"], "diff --git a/a.rs b/a.rs\n+x\n");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("under 72 characters"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".scribe.toml"),
        "[llm]\ntimeout_secs = 0\n",
    )
    .unwrap();

    // Large enough to overflow the pipe buffer if nothing reads it.
    let diff = "diff --git a/a.rs b/a.rs\n+x\n".repeat(20_000);
    let output = scribe(dir.path(), &["--dry-run"], &diff);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
