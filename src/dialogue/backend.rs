//! Remote dialogue generation backend
//!
//! Model-agnostic HTTP client for generating NPC speech, plus the
//! request/response contract the orchestrator speaks. The transport is an
//! OpenAI-style chat completion; nothing outside this module depends on
//! that. A request is submitted as a non-blocking operation and resolves
//! through a oneshot channel the tick loop polls, so the simulation never
//! blocks on the network and tests can drive resolution by hand.

use crate::core::error::{CourtError, Result};
use crate::dialogue::session::TranscriptLine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tokio::sync::oneshot;

/// Everything the backend needs to speak as one NPC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub npc_name: String,
    pub npc_role: String,
    pub npc_personality: String,
    /// What the player just said, or a context tag like "working" when
    /// the line is schedule-driven flavor rather than a reply
    pub player_message: String,
    pub recent_history: Vec<TranscriptLine>,
}

/// Result of polling a pending reply
#[derive(Debug)]
pub enum ReplyPoll {
    Pending,
    Resolved(String),
    Failed(String),
}

/// Handle for one outstanding generation call
///
/// Dropping it cancels the request from the simulation's point of view;
/// any in-flight HTTP call just resolves into a closed channel.
pub struct PendingReply {
    rx: oneshot::Receiver<Result<String>>,
}

impl PendingReply {
    pub fn new(rx: oneshot::Receiver<Result<String>>) -> Self {
        Self { rx }
    }

    /// Non-blocking poll; `Failed` covers both backend errors and a
    /// dropped sender.
    pub fn try_resolve(&mut self) -> ReplyPoll {
        match self.rx.try_recv() {
            Ok(Ok(text)) if !text.trim().is_empty() => ReplyPoll::Resolved(text),
            Ok(Ok(_)) => ReplyPoll::Failed("empty reply".into()),
            Ok(Err(e)) => ReplyPoll::Failed(e.to_string()),
            Err(oneshot::error::TryRecvError::Empty) => ReplyPoll::Pending,
            Err(oneshot::error::TryRecvError::Closed) => {
                ReplyPoll::Failed("reply channel closed".into())
            }
        }
    }
}

/// A dialogue generator the orchestrator can submit requests to
pub trait DialogueBackend {
    fn submit(&self, request: GenerationRequest) -> PendingReply;
}

/// HTTP backend speaking an OpenAI-compatible chat API
pub struct LlmBackend {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    /// Runtime the request futures are spawned onto; injected so the
    /// simulation itself never owns a runtime
    handle: tokio::runtime::Handle,
}

impl LlmBackend {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            handle,
        }
    }

    /// Create a backend from environment variables
    ///
    /// Required: DIALOGUE_API_KEY
    /// Optional: DIALOGUE_API_URL, DIALOGUE_MODEL
    pub fn from_env(handle: tokio::runtime::Handle) -> Result<Self> {
        let api_key = std::env::var("DIALOGUE_API_KEY")
            .map_err(|_| CourtError::DialogueError("DIALOGUE_API_KEY not set".into()))?;
        let api_url = std::env::var("DIALOGUE_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into());
        let model = std::env::var("DIALOGUE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Ok(Self::new(api_key, api_url, model, handle))
    }

    fn system_prompt(request: &GenerationRequest) -> String {
        format!(
            "You are {name}, a {role} in a small basketball town. \
             Personality: {personality}. \
             Stay in character, speak in first person, keep replies under \
             two sentences, and never repeat yourself.",
            name = request.npc_name,
            role = request.npc_role,
            personality = request.npc_personality,
        )
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = vec![Message {
            role: "system".into(),
            content: Self::system_prompt(request),
        }];
        // Most recent history only; the live transcript is already capped
        // but flavor requests may pass longer durable history.
        for line in request.recent_history.iter().rev().take(10).rev() {
            let role = if line.speaker == request.npc_name {
                "assistant"
            } else {
                "user"
            };
            messages.push(Message {
                role: role.into(),
                content: line.text.clone(),
            });
        }
        messages.push(Message {
            role: "user".into(),
            content: request.player_message.clone(),
        });

        ChatRequest {
            model: self.model.clone(),
            max_tokens: 150,
            temperature: 0.8,
            messages,
        }
    }
}

impl DialogueBackend for LlmBackend {
    fn submit(&self, request: GenerationRequest) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let body = self.build_body(&request);
        let client = self.client.clone();
        let api_url = self.api_url.clone();
        let api_key = self.api_key.clone();

        self.handle.spawn(async move {
            let result = complete(client, api_url, api_key, body).await;
            // Receiver may have been dropped by scene teardown; nothing
            // to do in that case.
            let _ = tx.send(result);
        });

        PendingReply::new(rx)
    }
}

async fn complete(
    client: Client,
    api_url: String,
    api_key: String,
    body: ChatRequest,
) -> Result<String> {
    let response = client
        .post(&api_url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| CourtError::DialogueError(e.to_string()))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(CourtError::DialogueError(format!(
            "API error: {}",
            error_text
        )));
    }

    let completion: ChatResponse = response
        .json()
        .await
        .map_err(|e| CourtError::DialogueError(e.to_string()))?;

    completion
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .ok_or_else(|| CourtError::DialogueError("Empty response".into()))
}

// OpenAI-compatible wire format
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Deterministic backend for tests and offline demos
///
/// Submitted requests park until the owner resolves or fails them, so a
/// test can interleave resolution with simulation ticks however it likes.
#[derive(Default, Clone)]
pub struct ScriptedBackend {
    queue: Rc<RefCell<VecDeque<(GenerationRequest, oneshot::Sender<Result<String>>)>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting for a scripted resolution
    pub fn outstanding(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Peek at the oldest unresolved request
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.queue.borrow().front().map(|(req, _)| req.clone())
    }

    /// Resolve the oldest request with the given text
    pub fn resolve_next(&self, text: &str) -> bool {
        match self.queue.borrow_mut().pop_front() {
            Some((_, tx)) => tx.send(Ok(text.to_string())).is_ok(),
            None => false,
        }
    }

    /// Fail the oldest request
    pub fn fail_next(&self, reason: &str) -> bool {
        match self.queue.borrow_mut().pop_front() {
            Some((_, tx)) => tx
                .send(Err(CourtError::DialogueError(reason.into())))
                .is_ok(),
            None => false,
        }
    }
}

impl DialogueBackend for ScriptedBackend {
    fn submit(&self, request: GenerationRequest) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        self.queue.borrow_mut().push_back((request, tx));
        PendingReply::new(rx)
    }
}
