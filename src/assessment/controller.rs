//! The stage machine that owns one assessment session.
//!
//! All mutation goes through `submit_intake`, `start_interview`, `send_turn`,
//! `complete_interview` and `reset`. The state lock is never held across a
//! remote call; an in-flight flag keeps at most one call outstanding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::AssessmentConfig;
use crate::error::SessionError;
use crate::llm::LlmProvider;

use super::interview::{Interview, InterviewEngine};
use super::model::{AssessmentReport, PatientProfile};
use super::notify::Notifier;
use super::report::ReportSynthesizer;
use super::state::{AppStage, SessionState};
use super::transcript::{Transcript, TranscriptMessage};

/// Shown when the report call fails or returns an unusable report.
pub const REPORT_FAILURE_MESSAGE: &str =
    "Something went wrong generating the diagnosis. Please try again.";

/// Shown when an interview call fails.
pub const INTERVIEW_FAILURE_MESSAGE: &str =
    "The assistant could not be reached. Please start the assessment again.";

/// Read-only view of a session for front ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub stage: AppStage,
    pub profile: Option<PatientProfile>,
    pub greeting: Option<String>,
    pub transcript: Transcript,
    /// User text of a turn still waiting for the model.
    pub pending_turn: Option<String>,
    pub interview_complete: bool,
    pub report: Option<AssessmentReport>,
    /// A remote call is outstanding; front ends should disable input.
    pub busy: bool,
}

/// Marks the single outstanding remote call; clears the flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates intake, interview and report for one session.
pub struct SessionController {
    engine: InterviewEngine,
    synthesizer: ReportSynthesizer,
    notifier: Arc<dyn Notifier>,
    state: RwLock<SessionState>,
    in_flight: AtomicBool,
}

impl SessionController {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        config: AssessmentConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine: InterviewEngine::new(Arc::clone(&llm), config.clone()),
            synthesizer: ReportSynthesizer::new(llm, config),
            notifier,
            state: RwLock::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AssessmentConfig {
        self.engine.config()
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub async fn stage(&self) -> AppStage {
        self.state.read().await.stage
    }

    pub async fn profile(&self) -> Option<PatientProfile> {
        self.state.read().await.profile.clone()
    }

    pub async fn report(&self) -> Option<AssessmentReport> {
        self.state.read().await.report.clone()
    }

    pub async fn transcript(&self) -> Transcript {
        self.state.read().await.interview.transcript().clone()
    }

    pub async fn is_interview_complete(&self) -> bool {
        self.state.read().await.interview.is_complete()
    }

    /// Whether a remote call is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.read().await;
        SessionSnapshot {
            stage: s.stage,
            profile: s.profile.clone(),
            greeting: s.interview.greeting().map(str::to_string),
            transcript: s.interview.transcript().clone(),
            pending_turn: s.pending_turn.clone(),
            interview_complete: s.interview.is_complete(),
            report: s.report.clone(),
            busy: self.is_busy(),
        }
    }

    // ── Operations ──────────────────────────────────────────────────

    /// INTAKE → INTERVIEW with a validated profile.
    pub async fn submit_intake(&self, profile: PatientProfile) -> Result<(), SessionError> {
        profile.validate()?;
        let mut s = self.state.write().await;
        s.transition(AppStage::Interview)?;
        info!(age = profile.age, gender = %profile.gender, "Intake submitted");
        s.profile = Some(profile);
        s.interview = Interview::default();
        s.report = None;
        Ok(())
    }

    /// Optional warm-up: fetch the model's opening question. Returns the
    /// existing greeting if one was already fetched.
    pub async fn start_interview(&self) -> Result<String, SessionError> {
        let _call = self.begin_call()?;
        let (profile, epoch) = {
            let s = self.state.read().await;
            let profile = require_interview(&s)?;
            if let Some(greeting) = s.interview.greeting() {
                return Ok(greeting.to_string());
            }
            if !s.interview.transcript().is_empty() {
                return Err(SessionError::InterviewAlreadyStarted);
            }
            (profile, s.epoch)
        };

        let result = self.engine.start_interview(&profile).await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            debug!("Discarding warm-up result from a reset session");
            return Err(SessionError::SessionReset);
        }
        match result {
            Ok(greeting) => {
                s.interview.set_greeting(greeting.clone());
                Ok(greeting)
            }
            Err(e) => {
                self.fail(&mut s, INTERVIEW_FAILURE_MESSAGE, &e);
                Err(e)
            }
        }
    }

    /// Send one user turn and return the model's reply line.
    ///
    /// A remote failure notifies the user once and resets the session.
    pub async fn send_turn(&self, text: &str) -> Result<TranscriptMessage, SessionError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(SessionError::EmptyTurn);
        }

        let _call = self.begin_call()?;
        let (profile, interview, epoch) = {
            let mut s = self.state.write().await;
            let profile = require_interview(&s)?;
            if s.interview.is_complete() {
                return Err(SessionError::InterviewComplete);
            }
            s.pending_turn = Some(text.clone());
            (profile, s.interview.clone(), s.epoch)
        };

        let result = self
            .engine
            .continue_interview(&profile, &interview, &text)
            .await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            debug!("Discarding interview reply from a reset session");
            return Err(SessionError::SessionReset);
        }
        s.pending_turn = None;
        match result {
            Ok(reply) => {
                let max_turns = self.engine.config().max_turns;
                let message = s.interview.record_turn(&text, reply, max_turns).clone();
                info!(
                    turns = s.interview.transcript().turns(),
                    complete = s.interview.is_complete(),
                    "Interview turn recorded"
                );
                Ok(message)
            }
            Err(e) => {
                self.fail(&mut s, INTERVIEW_FAILURE_MESSAGE, &e);
                Err(e)
            }
        }
    }

    /// INTERVIEW → ANALYZING → REPORT, or back to INTAKE on failure.
    pub async fn complete_interview(&self) -> Result<AssessmentReport, SessionError> {
        let _call = self.begin_call()?;
        let (profile, interview, epoch) = {
            let mut s = self.state.write().await;
            let Some(profile) = s.profile.clone() else {
                return Err(SessionError::InvalidTransition {
                    from: s.stage,
                    to: AppStage::Analyzing,
                });
            };
            s.transition(AppStage::Analyzing)?;
            info!(
                turns = s.interview.transcript().turns(),
                model_declared_complete = s.interview.is_complete(),
                "Interview finished, analyzing"
            );
            (profile, s.interview.clone(), s.epoch)
        };

        let result = self.synthesizer.generate_report(&profile, &interview).await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            debug!("Discarding report from a reset session");
            return Err(SessionError::SessionReset);
        }
        match result {
            Ok(report) => {
                s.report = Some(report.clone());
                s.transition(AppStage::Report)?;
                info!(
                    conditions = report.conditions().len(),
                    max_severity = %report.max_severity(),
                    "Assessment report ready"
                );
                Ok(report)
            }
            Err(e) => {
                self.fail(&mut s, REPORT_FAILURE_MESSAGE, &e);
                Err(e)
            }
        }
    }

    /// Clear everything and return to INTAKE. Valid from any stage.
    pub async fn reset(&self) {
        let mut s = self.state.write().await;
        let from = s.stage;
        s.reset();
        info!(from = %from, "Session reset");
    }

    // ── Internals ───────────────────────────────────────────────────

    fn begin_call(&self) -> Result<InFlight<'_>, SessionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| SessionError::TurnInFlight)
    }

    /// Remote failure: one notification, then a hard reset to INTAKE.
    fn fail(&self, s: &mut SessionState, message: &str, err: &SessionError) {
        error!(stage = %s.stage, error = %err, "Session failed, resetting to intake");
        self.notifier.notify(message);
        s.reset();
    }
}

/// The profile of a session that is in INTERVIEW.
fn require_interview(s: &SessionState) -> Result<PatientProfile, SessionError> {
    match &s.profile {
        Some(profile) if s.stage.accepts_turns() => Ok(profile.clone()),
        _ => Err(SessionError::WrongStage {
            expected: AppStage::Interview,
            actual: s.stage,
        }),
    }
}
