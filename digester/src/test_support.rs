//! Scripted fakes and fixtures shared by unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;

use crate::core::period::PeriodDescriptor;
use crate::core::types::Usage;
use crate::io::client::{
    CallError, ContentBlock, Message, MessageRequest, MessageResponse, MessagesClient, StopReason,
};
use crate::io::config::DigestConfig;
use crate::io::escalation::Escalator;
use crate::io::retry::Sleeper;

/// Client that replays a fixed script of results and records every request.
pub struct ScriptedClient {
    script: RefCell<VecDeque<Result<MessageResponse, CallError>>>,
    requests: RefCell<Vec<MessageRequest>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<MessageResponse, CallError>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<MessageRequest> {
        self.requests.borrow().clone()
    }
}

impl MessagesClient for ScriptedClient {
    fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, CallError> {
        self.requests.borrow_mut().push(request.clone());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(CallError::Transport("script exhausted".to_string())))
    }
}

/// Sleeper that records requested waits instead of blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Escalator that records opened issues.
#[derive(Default)]
pub struct RecordingEscalator {
    issues: RefCell<Vec<(String, String)>>,
}

impl RecordingEscalator {
    /// `(title, body)` pairs, in order.
    pub fn issues(&self) -> Vec<(String, String)> {
        self.issues.borrow().clone()
    }
}

impl Escalator for RecordingEscalator {
    fn open_issue(&self, title: &str, body: &str) {
        self.issues
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
    }
}

fn usage() -> Usage {
    Usage {
        input_tokens: 1_000,
        output_tokens: 200,
    }
}

/// Response that ends the conversation with `text`.
pub fn final_response(text: &str) -> MessageResponse {
    MessageResponse {
        stop_reason: Some(StopReason::EndTurn),
        content: vec![ContentBlock::from_text(text)],
        usage: usage(),
    }
}

/// Response where the service paused mid-task.
pub fn paused_response(content: Vec<ContentBlock>) -> MessageResponse {
    MessageResponse {
        stop_reason: Some(StopReason::PauseTurn),
        content,
        usage: usage(),
    }
}

/// Server-side search invocation block.
pub fn search_block(query: &str) -> ContentBlock {
    ContentBlock(json!({
        "type": "server_tool_use",
        "id": format!("srvtoolu_{}", query.len()),
        "name": "web_search",
        "input": { "query": query },
    }))
}

/// Minimal single-message request.
pub fn request() -> MessageRequest {
    MessageRequest {
        model: "test-model".to_string(),
        max_tokens: 64,
        system: None,
        tools: Vec::new(),
        messages: vec![Message::user("hello")],
    }
}

/// Digest that passes header validation for `period`.
pub fn valid_document(period: &PeriodDescriptor) -> String {
    format!(
        "---\n\
         title: \"AI Security Weekly: Week {week}\"\n\
         description: \"The week in AI security, {range}.\"\n\
         pubDate: {pub_date}\n\
         weekNumber: {week}\n\
         year: {year}\n\
         highlights:\n\
         \x20 - \"Prompt injection lands in a popular agent framework\"\n\
         \x20 - \"New jailbreak benchmark published\"\n\
         \x20 - \"Model supply chain advisory issued\"\n\
         draft: false\n\
         ---\n\
         \n\
         ## Research\n\
         \n\
         Body text.\n",
        week = period.week_number,
        year = period.year,
        range = period.date_range,
        pub_date = period.pub_date,
    )
}

/// Scratch project root laid out with the default configured paths.
pub struct TestProject {
    dir: tempfile::TempDir,
    pub config: DigestConfig,
}

impl TestProject {
    pub fn new() -> Self {
        let config = DigestConfig {
            turn_delay_secs: 1,
            ..DigestConfig::default()
        };
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn digests_dir(&self) -> PathBuf {
        self.root().join(&self.config.paths.digests_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root().join(&self.config.paths.logs_dir)
    }

    pub fn add_image(&self, name: &str) {
        let dir = self.root().join(&self.config.paths.images_dir);
        fs::create_dir_all(&dir).expect("create images dir");
        fs::write(dir.join(name), "<svg/>").expect("write image");
    }

    pub fn add_digest(&self, filename: &str, contents: &str) -> PathBuf {
        let dir = self.digests_dir();
        fs::create_dir_all(&dir).expect("create digests dir");
        let path = dir.join(filename);
        fs::write(&path, contents).expect("write digest");
        path
    }

    /// Paths of every run log written so far, sorted.
    pub fn run_logs(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.logs_dir()) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .map(|entry| entry.expect("log entry").path())
            .collect();
        paths.sort();
        paths
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
