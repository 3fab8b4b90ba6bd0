//! Report synthesis: one final structured request, parsed all-or-nothing.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::AssessmentConfig;
use crate::error::SessionError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::interview::Interview;
use super::model::{AssessmentReport, MedicalCondition, PatientProfile, Severity};
use super::prompts::{extract_json_object, report_prompt, report_system_prompt};

/// Turns a finished interview into an `AssessmentReport`.
pub struct ReportSynthesizer {
    llm: Arc<dyn LlmProvider>,
    config: AssessmentConfig,
}

impl ReportSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, config: AssessmentConfig) -> Self {
        Self { llm, config }
    }

    /// Request the structured report and validate it.
    pub async fn generate_report(
        &self,
        profile: &PatientProfile,
        interview: &Interview,
    ) -> Result<AssessmentReport, SessionError> {
        let mut transcript_text = interview.transcript().render();
        if let Some(greeting) = interview.greeting() {
            transcript_text = format!("Assistant: {greeting}\n{transcript_text}");
        }

        let request = CompletionRequest::new(vec![
            ChatMessage::system(report_system_prompt()),
            ChatMessage::user(report_prompt(profile, &transcript_text)),
        ])
        .with_temperature(self.config.report_temperature)
        .with_max_tokens(self.config.report_max_tokens)
        .with_json_output();

        info!(
            turns = interview.transcript().turns(),
            model = self.llm.model_name(),
            "Requesting assessment report"
        );

        let response = self.llm.complete(request).await?;
        match parse_report(&response.content) {
            Ok(report) => {
                info!(conditions = report.conditions().len(), "Assessment report parsed");
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, response = %response.content, "Rejected assessment report");
                Err(e)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawReport {
    summary: Option<String>,
    conditions: Option<Vec<RawCondition>>,
    disclaimer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    name: Option<String>,
    probability: Option<serde_json::Number>,
    reasoning: Option<String>,
    severity: Option<String>,
    recommendation: Option<String>,
}

/// Parse and validate a report payload. Any invalid field rejects the whole
/// report; nothing is dropped or clamped.
pub fn parse_report(raw: &str) -> Result<AssessmentReport, SessionError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| SessionError::malformed("response contains no JSON object"))?;
    let parsed: RawReport = serde_json::from_str(json)
        .map_err(|e| SessionError::malformed(format!("invalid report JSON: {e}")))?;

    let summary = required_text(parsed.summary, "summary")?;
    let disclaimer = required_text(parsed.disclaimer, "disclaimer")?;

    let raw_conditions = parsed
        .conditions
        .ok_or_else(|| SessionError::malformed("missing field: conditions"))?;
    if raw_conditions.is_empty() {
        return Err(SessionError::malformed("conditions list is empty"));
    }

    let conditions = raw_conditions
        .into_iter()
        .enumerate()
        .map(|(i, c)| parse_condition(i, c))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AssessmentReport::new(summary, conditions, disclaimer))
}

fn parse_condition(index: usize, raw: RawCondition) -> Result<MedicalCondition, SessionError> {
    let field = |name: &str| format!("conditions[{index}].{name}");

    let name = required_text(raw.name, &field("name"))?;
    let reasoning = required_text(raw.reasoning, &field("reasoning"))?;
    let recommendation = required_text(raw.recommendation, &field("recommendation"))?;

    let severity_label = required_text(raw.severity, &field("severity"))?;
    let severity = Severity::parse(&severity_label).ok_or_else(|| {
        SessionError::malformed(format!(
            "{}: unknown severity {severity_label:?}",
            field("severity")
        ))
    })?;

    let number = raw.probability.ok_or_else(|| {
        SessionError::malformed(format!("missing field: {}", field("probability")))
    })?;
    let probability = probability_percent(&number).ok_or_else(|| {
        SessionError::malformed(format!(
            "{}: {number} is not an integer in [0, 100]",
            field("probability")
        ))
    })?;

    Ok(MedicalCondition::new(
        name,
        probability,
        reasoning,
        severity,
        recommendation,
    ))
}

/// Accept integral values in [0, 100]. `70` and `70.0` are fine; `70.5`,
/// `-1` and `150` are not.
fn probability_percent(number: &serde_json::Number) -> Option<u8> {
    if let Some(n) = number.as_u64() {
        return (n <= 100).then_some(n as u8);
    }
    let f = number.as_f64()?;
    (f.fract() == 0.0 && (0.0..=100.0).contains(&f)).then_some(f as u8)
}

fn required_text(value: Option<String>, field: &str) -> Result<String, SessionError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(SessionError::malformed(format!("empty field: {field}"))),
        None => Err(SessionError::malformed(format!("missing field: {field}"))),
    }
}
