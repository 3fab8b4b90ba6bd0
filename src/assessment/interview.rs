//! Conversational interview: per-session interview state and the engine that
//! talks to the remote model one turn at a time.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::AssessmentConfig;
use crate::error::SessionError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::model::PatientProfile;
use super::prompts::{
    InterviewReply, interview_system_prompt, parse_interview_reply, warm_up_prompt,
};
use super::transcript::{Transcript, TranscriptMessage};

/// Interview progress for one session.
#[derive(Debug, Clone, Default)]
pub struct Interview {
    transcript: Transcript,
    greeting: Option<String>,
    complete: bool,
}

impl Interview {
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Warm-up greeting, if one was requested. Kept outside the transcript so
    /// the transcript stays strictly user/model alternating.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Whether the model's last reply (or the turn cap) ended the interview.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn set_greeting(&mut self, greeting: String) {
        self.greeting = Some(greeting);
    }

    /// Commit a settled turn. Both lines land together, so a failed call
    /// never leaves a dangling user message behind.
    pub(crate) fn record_turn(
        &mut self,
        user_text: &str,
        reply: InterviewReply,
        max_turns: Option<u32>,
    ) -> &TranscriptMessage {
        let turns = self.transcript.turns() + 1;
        let capped = max_turns.is_some_and(|max| turns >= max as usize);
        self.complete = reply.complete || capped;
        self.transcript.push_turn(user_text, reply.text)
    }

    /// Provider messages for the next call: greeting, history, then the new
    /// user text.
    fn request_messages(&self, profile: &PatientProfile, user_text: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(interview_system_prompt(profile))];
        if let Some(ref greeting) = self.greeting {
            messages.push(ChatMessage::user(warm_up_prompt()));
            messages.push(ChatMessage::assistant(greeting));
        }
        messages.extend(self.transcript.to_llm_messages());
        messages.push(ChatMessage::user(user_text));
        messages
    }
}

/// Drives the remote side of the interview.
pub struct InterviewEngine {
    llm: Arc<dyn LlmProvider>,
    config: AssessmentConfig,
}

impl InterviewEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, config: AssessmentConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// Optional warm-up call: ask the model for its opening question.
    pub async fn start_interview(&self, profile: &PatientProfile) -> Result<String, SessionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(interview_system_prompt(profile)),
            ChatMessage::user(warm_up_prompt()),
        ])
        .with_temperature(self.config.interview_temperature)
        .with_max_tokens(self.config.interview_max_tokens)
        .with_json_output();

        let response = self.llm.complete(request).await?;
        let reply = parse_interview_reply(&response.content);
        info!(model = self.llm.model_name(), "Interview warm-up received");
        Ok(reply.text)
    }

    /// Send one user turn with the full history and profile as context.
    /// Does not touch `interview`; the caller commits the result.
    pub async fn continue_interview(
        &self,
        profile: &PatientProfile,
        interview: &Interview,
        user_text: &str,
    ) -> Result<InterviewReply, SessionError> {
        let request = CompletionRequest::new(interview.request_messages(profile, user_text))
            .with_temperature(self.config.interview_temperature)
            .with_max_tokens(self.config.interview_max_tokens)
            .with_json_output();

        let response = self.llm.complete(request).await?;
        let reply = parse_interview_reply(&response.content);
        debug!(
            turn = interview.transcript().turns() + 1,
            complete = reply.complete,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Interview reply received"
        );
        Ok(reply)
    }
}
