//! Shared test doubles.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use swasthya_scan::assessment::{RecordingNotifier, SessionController};
use swasthya_scan::config::AssessmentConfig;
use swasthya_scan::error::LlmError;
use swasthya_scan::llm::{CompletionRequest, CompletionResponse, LlmProvider};

/// One scripted provider outcome.
pub enum Step {
    Reply(String),
    Fail,
}

/// Stub LLM provider that replays a script (no real API calls).
pub struct ScriptedLlm {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Reply(content)) => Ok(CompletionResponse {
                content,
                input_tokens: 10,
                output_tokens: 5,
            }),
            Some(Step::Fail) => Err(LlmError::Timeout {
                provider: "scripted".into(),
                timeout: std::time::Duration::from_secs(30),
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".into(),
                reason: "script exhausted".into(),
            }),
        }
    }
}

/// Holds every call until the test releases a permit, then answers with
/// the same content.
pub struct GatedLlm {
    pub gate: Semaphore,
    content: String,
}

impl GatedLlm {
    pub fn new(content: &str) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            content: content.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for GatedLlm {
    fn model_name(&self) -> &str {
        "gated"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let permit = self.gate.acquire().await.map_err(|_| LlmError::RequestFailed {
            provider: "gated".into(),
            reason: "gate closed".into(),
        })?;
        permit.forget();
        Ok(CompletionResponse {
            content: self.content.clone(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// Poll until `check` holds, failing the test after five seconds.
pub async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !check() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

pub fn reply(text: &str, complete: bool) -> Step {
    Step::Reply(serde_json::json!({"reply": text, "complete": complete}).to_string())
}

pub fn condition(name: &str, probability: i64, severity: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "probability": probability,
        "reasoning": format!("{name} fits the reported symptoms"),
        "severity": severity,
        "recommendation": "See a doctor if symptoms persist"
    })
}

pub fn report(conditions: Vec<serde_json::Value>) -> Step {
    Step::Reply(
        serde_json::json!({
            "summary": "Fever and headache for two days.",
            "conditions": conditions,
            "disclaimer": "This assessment is not a medical diagnosis."
        })
        .to_string(),
    )
}

/// Report used by the Asha scenario: Viral Fever 70/Medium, Migraine 30/Low.
pub fn asha_report() -> Step {
    report(vec![
        condition("Viral Fever", 70, "Medium"),
        condition("Migraine", 30, "Low"),
    ])
}

pub fn controller(
    llm: Arc<ScriptedLlm>,
    config: AssessmentConfig,
) -> (Arc<SessionController>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = Arc::new(SessionController::new(llm, config, notifier.clone()));
    (controller, notifier)
}
