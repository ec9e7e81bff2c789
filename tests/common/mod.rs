// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared fixtures: a recording model client and session builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use gemini_mcp::error::ProviderError;
use gemini_mcp::protocol::Session;
use gemini_mcp::providers::{ClientFactory, ModelClient, SharedClient};
use gemini_mcp::tools::{FileReader, ToolContext};
use gemini_mcp::types::{GenerateOptions, SearchResponse};

/// One call seen by [`StubClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: &'static str,
    pub prompt: String,
    pub images: Vec<String>,
    pub options: GenerateOptions,
}

/// Model client that replays canned replies and records every call.
pub struct StubClient {
    model: Mutex<String>,
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            model: Mutex::new("gemini-stub".to_string()),
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        let stub = Self::new();
        for reply in replies {
            stub.push(Ok(reply.to_string()));
        }
        stub
    }

    pub fn push(&self, reply: Result<String, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, prompt: &str, images: &[String], options: &GenerateOptions) {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            prompt: prompt.to_string(),
            images: images.to_vec(),
            options: options.clone(),
        });
    }

    fn next_reply(&self) -> Result<String, ProviderError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[async_trait]
impl ModelClient for StubClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError> {
        self.record("generate", prompt, &[], options);
        self.next_reply()
    }

    async fn generate_multimodal(
        &self,
        prompt: &str,
        images: &[String],
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        self.record("multimodal", prompt, images, options);
        self.next_reply()
    }

    async fn search(&self, prompt: &str, options: &GenerateOptions) -> Result<SearchResponse, ProviderError> {
        self.record("search", prompt, &[], options);
        self.next_reply().map(|text| SearchResponse { text, grounding: None })
    }

    fn model(&self) -> String {
        self.model.lock().unwrap().clone()
    }

    fn set_model(&self, model: &str) {
        *self.model.lock().unwrap() = model.to_string();
    }
}

/// Factory that always hands out the same stub.
pub fn stub_factory(stub: Arc<StubClient>) -> ClientFactory {
    Box::new(move || Ok(Arc::clone(&stub) as SharedClient))
}

/// Session over an empty temporary workspace.
pub fn session(factory: ClientFactory) -> (TempDir, Session) {
    let temp = TempDir::new().unwrap();
    let files = FileReader::new(temp.path()).unwrap();
    (temp, Session::with_defaults(factory, files))
}

/// Tool context over a workspace seeded with `files`.
pub fn context(stub: Arc<StubClient>, files: &[(&str, &str)]) -> (TempDir, ToolContext) {
    let temp = TempDir::new().unwrap();
    for (path, content) in files {
        let full = temp.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }
    let reader = FileReader::new(temp.path()).unwrap();
    (temp, ToolContext::new(stub, reader))
}
