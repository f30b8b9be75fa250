//! Test helpers for sqlai integration tests
//!
//! This module provides helper functions and structs to simplify
//! writing integration tests for the sqlai binary, including a mock
//! chat-completions server that replays canned model replies.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Represents one invocation of the sqlai binary
pub struct SqlaiTestCase {
    /// Command line arguments, database excluded
    pub args: Vec<String>,
    /// Text written to stdin
    pub stdin: Option<String>,
    /// Expected strings in stdout
    pub expected_stdout: Vec<String>,
    /// Strings that must not appear in stdout
    pub unexpected_stdout: Vec<String>,
    /// Expected strings in stderr
    pub expected_stderr: Vec<String>,
    /// Whether the command is expected to succeed
    pub should_succeed: bool,
}

impl Default for SqlaiTestCase {
    fn default() -> Self {
        SqlaiTestCase {
            args: Vec::new(),
            stdin: None,
            expected_stdout: Vec::new(),
            unexpected_stdout: Vec::new(),
            expected_stderr: Vec::new(),
            should_succeed: true,
        }
    }
}

/// Build a sqlai command that uses a database inside `dir`
///
/// The working directory is `dir` as well, so history files land there.
pub fn sqlai_command(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("sqlai")?;
    cmd.current_dir(dir)
        .env_remove("GROQ_API_KEY")
        .env_remove("SQLAI_MODEL")
        .env_remove("SQLAI_ENDPOINT")
        .env_remove("SQLAI_TIMEOUT")
        .env_remove("RUST_LOG")
        .arg("-d")
        .arg(dir.join("test.db"));
    Ok(cmd)
}

/// Run a test case against the database in `dir`
pub fn run_test_case(test_case: SqlaiTestCase, dir: &Path) -> TestResult {
    let mut cmd = sqlai_command(dir)?;
    cmd.args(&test_case.args);
    if let Some(stdin) = &test_case.stdin {
        cmd.write_stdin(stdin.as_str());
    }

    let mut assert = cmd.assert();
    if test_case.should_succeed {
        assert = assert.success();
    } else {
        assert = assert.failure();
    }
    for expected in test_case.expected_stdout {
        assert = assert.stdout(predicate::str::contains(expected));
    }
    for unexpected in test_case.unexpected_stdout {
        assert = assert.stdout(predicate::str::contains(unexpected).not());
    }
    for expected in test_case.expected_stderr {
        assert = assert.stderr(predicate::str::contains(expected));
    }
    Ok(())
}

/// Helper function to create a temp directory for tests, respecting CARGO_TARGET_TMPDIR if set
pub fn create_temp_dir() -> Result<TempDir, Box<dyn std::error::Error>> {
    if let Ok(cargo_target_tmpdir) = env::var("CARGO_TARGET_TMPDIR") {
        fs::create_dir_all(&cargo_target_tmpdir)?;
        Ok(TempDir::new_in(cargo_target_tmpdir)?)
    } else {
        Ok(TempDir::new()?)
    }
}

/// Helper function to create a standard test CSV file with people data
pub fn prepare_test_file(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    create_custom_csv(dir, "people.csv", "id,name,age\n1,Alice,30\n2,Bob,25\n3,Charlie,35\n")
}

/// Helper function to create a test CSV file with custom data
pub fn create_custom_csv(
    dir: &Path,
    filename: &str,
    content: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Path argument for a file
pub fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// One canned answer from the fake model service
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub content: String,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok(content: &str) -> Self {
        Reply {
            status: 200,
            content: content.to_string(),
            delay: None,
        }
    }

    pub fn error(status: u16, body: &str) -> Self {
        Reply {
            status,
            content: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(content: &str, delay: Duration) -> Self {
        Reply {
            delay: Some(delay),
            ..Reply::ok(content)
        }
    }

    fn template(&self) -> ResponseTemplate {
        let template = if self.status == 200 {
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": self.content},
                    "finish_reason": "stop"
                }]
            }))
        } else {
            ResponseTemplate::new(self.status).set_body_string(self.content.clone())
        };
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

/// Chat-completions mock server that answers with canned replies
///
/// Replies are served in order; the last one repeats. Every request is
/// recorded by the server for inspection.
pub struct FakeModelServer {
    server: MockServer,
}

impl FakeModelServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let server = MockServer::start().await;
        let last = replies.len().saturating_sub(1);
        for (i, reply) in replies.iter().enumerate() {
            let mock = Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(reply.template());
            let mock = if i < last { mock.up_to_n_times(1) } else { mock };
            mock.mount(&server).await;
        }
        FakeModelServer { server }
    }

    /// Base URL to pass as `--endpoint`
    pub fn endpoint(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// JSON bodies of the requests received so far
    pub async fn requests(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Text of the system and user messages of request `index`
    pub async fn prompt(&self, index: usize) -> (String, String) {
        let requests = self.requests().await;
        let request = &requests[index];
        let text = |i: usize| {
            request["messages"][i]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        };
        (text(0), text(1))
    }
}
