// Integration tests for the sango binary
// This file should be run with cargo test --test test_cli

#[path = "../src/mux/mod.rs"]
mod mux;

use std::process::{Command, Output};

const NO_CONFIG: &str = "/nonexistent/sango.toml";

fn sango(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sango"))
        .arg("--config")
        .arg(NO_CONFIG)
        .args(args)
        .output()
        .unwrap()
}

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

/// The pretty-printed report that follows the log lines on stderr
fn report_from_stderr(stderr: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stderr);
    let start = text
        .lines()
        .position(|line| line == "{")
        .unwrap_or_else(|| panic!("no report in stderr:\n{text}"));
    let report: Vec<&str> = text.lines().skip(start).collect();
    serde_json::from_str(&report.join("\n")).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Without --mux the report is the only thing on stdout
    #[test]
    fn test_exec_report_on_stdout() {
        let out = sango(&["exec", "--", "/bin/sh", "-c", "echo hi; echo oops >&2; exit 3"]);

        // A nonzero child exit is not a CLI failure
        assert!(out.status.success());
        let report = json(&out.stdout);
        assert_eq!(report["status"], "normal");
        assert_eq!(report["code"], 3);
        assert_eq!(report["signal"], 0);
        assert_eq!(report["stdout"], "hi\n");
        assert_eq!(report["stderr"], "oops\n");
        assert!(report["elapsed"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_exec_timeout_is_reported() {
        let out = sango(&["exec", "--timeout-ms", "100", "--", "sleep", "5"]);

        assert!(out.status.success());
        let report = json(&out.stdout);
        assert_eq!(report["status"], "timeout");
        assert_eq!(report["signal"], 9);
        assert!(report["elapsed"].as_f64().unwrap() < 4.0);
    }

    #[test]
    fn test_exec_limit_and_stdin() {
        let dir = std::env::temp_dir().join(format!("sango-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("stdin.txt");
        std::fs::write(&input, "abcdefgh").unwrap();

        let out = sango(&["exec", "--limit", "4", "--stdin", input.to_str().unwrap(), "--", "cat"]);

        assert!(out.status.success());
        assert_eq!(json(&out.stdout)["stdout"], "abcd");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    /// With --mux stdout carries frames only and the report moves to stderr
    #[test]
    fn test_exec_mux_frames_on_stdout() {
        let out = sango(&["exec", "--mux", "--", "/bin/sh", "-c", "printf out; printf err >&2"]);

        assert!(out.status.success());
        let messages = mux::decode_messages(&out.stdout).unwrap();
        let mut grouped = mux::group_by_tag(&messages);
        grouped.sort();
        assert_eq!(
            grouped,
            vec![
                ("stderr".to_string(), "err".to_string()),
                ("stdout".to_string(), "out".to_string()),
            ]
        );

        let report = report_from_stderr(&out.stderr);
        assert_eq!(report["status"], "normal");
        assert_eq!(report["code"], 0);
        assert!(report.get("stdout").is_none());
        assert!(report.get("stderr").is_none());
    }

    #[test]
    fn test_exec_spawn_failure_exits_1() {
        let out = sango(&["exec", "--", "/nonexistent/sango-run"]);

        assert_eq!(out.status.code(), Some(1));
        assert!(out.stdout.is_empty());
        assert!(String::from_utf8_lossy(&out.stderr).contains("sango failed"));
    }

    #[test]
    fn test_job_prints_output() {
        let dir = std::env::temp_dir().join(format!("sango-cli-job-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let workdir = dir.join("work");
        let job_file = dir.join("job.json");
        let job = serde_json::json!({
            "input": {"files": {"main.sh": "read x\necho got $x\n"}, "stdin": "7\n"},
            "run": {"program": "/bin/sh", "args": ["main.sh"]},
            "workdir": workdir,
        });
        std::fs::write(&job_file, job.to_string()).unwrap();

        let out = sango(&["job", job_file.to_str().unwrap()]);

        assert!(out.status.success());
        let output = json(&out.stdout);
        assert_eq!(output["status"], "success");
        assert_eq!(output["run-stdout"], "got 7\n");
        assert_eq!(output["mixed-output"][0]["tag"], "run-stdout");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_job_malformed_file_exits_1() {
        let dir = std::env::temp_dir().join(format!("sango-cli-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let job_file = dir.join("job.json");
        std::fs::write(&job_file, "{\"workdir\": 1}").unwrap();

        let out = sango(&["job", job_file.to_str().unwrap()]);

        assert_eq!(out.status.code(), Some(1));
        assert!(out.stdout.is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
