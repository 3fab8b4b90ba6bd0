//! Session stage machine and the state carried across stages.

use serde::{Deserialize, Serialize};

use super::interview::Interview;
use super::model::{AssessmentReport, PatientProfile};

/// The four screens of an assessment.
///
/// INTAKE → INTERVIEW → ANALYZING → REPORT, with ANALYZING falling back to
/// INTAKE on failure and every stage resettable to INTAKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStage {
    Intake,
    Interview,
    Analyzing,
    Report,
}

impl AppStage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: AppStage) -> bool {
        use AppStage::*;
        matches!(
            (self, target),
            (Intake, Interview) | (Interview, Analyzing) | (Analyzing, Report) | (_, Intake)
        )
    }

    /// Whether a new interview turn may be sent in this stage.
    pub fn accepts_turns(&self) -> bool {
        matches!(self, Self::Interview)
    }
}

impl Default for AppStage {
    fn default() -> Self {
        Self::Intake
    }
}

impl std::fmt::Display for AppStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intake => "INTAKE",
            Self::Interview => "INTERVIEW",
            Self::Analyzing => "ANALYZING",
            Self::Report => "REPORT",
        };
        write!(f, "{s}")
    }
}

/// Everything one session owns. Mutated only by the session controller.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub stage: AppStage,
    pub profile: Option<PatientProfile>,
    pub interview: Interview,
    pub report: Option<AssessmentReport>,
    /// User text of a turn whose remote call has not settled yet.
    pub pending_turn: Option<String>,
    /// Bumped on every reset; remote results from an older epoch are dropped.
    pub epoch: u64,
}

impl SessionState {
    /// Move to `target`, refusing edges the stage machine does not allow.
    pub fn transition(&mut self, target: AppStage) -> Result<(), crate::error::SessionError> {
        if !self.stage.can_transition_to(target) {
            return Err(crate::error::SessionError::InvalidTransition {
                from: self.stage,
                to: target,
            });
        }
        tracing::debug!(from = %self.stage, to = %target, "Stage transition");
        self.stage = target;
        Ok(())
    }

    /// Drop all session data and return to INTAKE.
    pub fn reset(&mut self) {
        self.stage = AppStage::Intake;
        self.profile = None;
        self.interview = Interview::default();
        self.report = None;
        self.pending_turn = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}
