//! Assessment session: intake, symptom interview, and report.
//!
//! A session moves through INTAKE → INTERVIEW → ANALYZING → REPORT. The
//! `SessionController` owns the state; the interview engine and report
//! synthesizer do the remote work; front ends read snapshots and call the
//! controller's operations.

pub mod controller;
pub mod interview;
pub mod model;
pub mod notify;
pub mod prompts;
pub mod report;
pub mod routes;
pub mod state;
pub mod transcript;

pub use controller::{
    INTERVIEW_FAILURE_MESSAGE, REPORT_FAILURE_MESSAGE, SessionController, SessionSnapshot,
};
pub use interview::{Interview, InterviewEngine};
pub use model::{AssessmentReport, Gender, MedicalCondition, PatientProfile, Severity};
pub use notify::{Notifier, RecordingNotifier};
pub use report::{ReportSynthesizer, parse_report};
pub use routes::{AssessmentRouteState, assessment_routes};
pub use state::{AppStage, SessionState};
pub use transcript::{Speaker, Transcript, TranscriptMessage};
