//! Prompts for the interview and report calls, and parsing of the
//! interview reply contract.

use super::model::PatientProfile;

/// Marker a free-text reply may carry to declare the interview finished.
/// Stripped before the reply is shown.
pub const COMPLETE_MARKER: &str = "[INTERVIEW_COMPLETE]";

const INTERVIEW_BASE: &str = "\
You are SwasthyaScan, a careful medical intake assistant conducting a short symptom interview.

Guidelines:
- Ask ONE clear question at a time, 1-3 sentences per reply.
- Build on what the patient already told you; never repeat a question.
- Cover onset, duration, severity, associated symptoms, and relevant history.
- Do not diagnose during the interview and do not prescribe medication.
- If the patient describes an emergency (chest pain, difficulty breathing, \
loss of consciousness, severe bleeding), tell them to seek emergency care immediately.
- When you have enough information for an assessment, thank the patient and \
set \"complete\" to true.

Respond ONLY with a JSON object of the form:
{\"reply\": \"<your message to the patient>\", \"complete\": <true|false>}";

/// System prompt for every interview call. The profile travels with each
/// request so the model keeps context across turns.
pub fn interview_system_prompt(profile: &PatientProfile) -> String {
    format!("{INTERVIEW_BASE}\n\n{}", profile.to_prompt_section())
}

/// User-side instruction for the optional warm-up call.
pub fn warm_up_prompt() -> &'static str {
    "Greet the patient by name and ask your first question about their main complaint. \
Set \"complete\" to false."
}

/// System prompt for the final report call.
pub fn report_system_prompt() -> &'static str {
    "You are a clinical reasoning assistant. You produce a structured, \
probabilistic differential assessment from a symptom interview. \
Output only valid JSON."
}

/// User prompt for the final report call.
pub fn report_prompt(profile: &PatientProfile, transcript_text: &str) -> String {
    format!(
        "{profile}\n\n\
         # Interview\n\
         {transcript_text}\n\n\
         Based on the profile and interview above, return a JSON object with exactly this shape:\n\
         {{\n  \
           \"summary\": \"short plain-language summary of the presentation\",\n  \
           \"conditions\": [\n    \
             {{\n      \
               \"name\": \"condition name\",\n      \
               \"probability\": <integer 0-100>,\n      \
               \"reasoning\": \"why this condition fits\",\n      \
               \"severity\": \"Low\" | \"Medium\" | \"High\" | \"Critical\",\n      \
               \"recommendation\": \"what the patient should do next\"\n    \
             }}\n  \
           ],\n  \
           \"disclaimer\": \"statement that this is not a medical diagnosis\"\n\
         }}\n\
         List between 1 and 5 conditions, most likely first.\n\
         Respond with ONLY valid JSON, no explanation or markdown formatting.",
        profile = profile.to_prompt_section()
    )
}

/// Result of parsing one interview reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewReply {
    /// Text to show the patient, markers stripped.
    pub text: String,
    /// Whether the model declared the interview complete.
    pub complete: bool,
}

#[derive(serde::Deserialize)]
struct StructuredReply {
    reply: String,
    #[serde(default)]
    complete: bool,
}

/// Parse an interview reply.
///
/// Prefers the `{reply, complete}` JSON contract. Falls back to treating the
/// whole response as free text, where `[INTERVIEW_COMPLETE]` signals the end.
pub fn parse_interview_reply(response: &str) -> InterviewReply {
    if let Some(json) = extract_json_object(response) {
        if let Ok(structured) = serde_json::from_str::<StructuredReply>(json) {
            let marker = structured.reply.contains(COMPLETE_MARKER);
            return InterviewReply {
                text: strip_marker(&structured.reply),
                complete: structured.complete || marker,
            };
        }
    }

    InterviewReply {
        text: strip_marker(response),
        complete: response.contains(COMPLETE_MARKER),
    }
}

fn strip_marker(text: &str) -> String {
    text.replace(COMPLETE_MARKER, "").trim().to_string()
}

/// Extract the first JSON object from LLM output that might contain
/// markdown fences or extra prose.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    // Fenced block, with or without a language tag
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::model::Gender;

    fn profile() -> PatientProfile {
        PatientProfile {
            primary_symptom: Some("headache".to_string()),
            ..PatientProfile::new("Asha", 29, Gender::Female)
        }
    }

    #[test]
    fn interview_prompt_carries_profile_and_contract() {
        let prompt = interview_system_prompt(&profile());
        assert!(prompt.contains("Asha"));
        assert!(prompt.contains("headache"));
        assert!(prompt.contains("\"complete\""));
        assert!(prompt.contains("ONE clear question"));
    }

    #[test]
    fn report_prompt_includes_transcript_and_schema() {
        let prompt = report_prompt(&profile(), "Patient: fever\nAssistant: how long?");
        assert!(prompt.contains("Patient: fever"));
        assert!(prompt.contains("\"probability\": <integer 0-100>"));
        assert!(prompt.contains("Critical"));
        assert!(prompt.contains("disclaimer"));
    }

    #[test]
    fn parse_structured_reply() {
        let reply = parse_interview_reply(r#"{"reply": "How long?", "complete": false}"#);
        assert_eq!(reply.text, "How long?");
        assert!(!reply.complete);

        let done = parse_interview_reply(r#"{"reply": "Thank you.", "complete": true}"#);
        assert!(done.complete);
    }

    #[test]
    fn parse_structured_reply_defaults_complete_to_false() {
        let reply = parse_interview_reply(r#"{"reply": "Any nausea?"}"#);
        assert_eq!(reply.text, "Any nausea?");
        assert!(!reply.complete);
    }

    #[test]
    fn parse_fenced_structured_reply() {
        let raw = "```json\n{\"reply\": \"Got it.\", \"complete\": true}\n```";
        let reply = parse_interview_reply(raw);
        assert_eq!(reply.text, "Got it.");
        assert!(reply.complete);
    }

    #[test]
    fn parse_free_text_without_marker() {
        let reply = parse_interview_reply("Does the light bother you?");
        assert_eq!(reply.text, "Does the light bother you?");
        assert!(!reply.complete);
    }

    #[test]
    fn parse_free_text_with_marker() {
        let reply = parse_interview_reply("Thanks, I have what I need.\n[INTERVIEW_COMPLETE]");
        assert_eq!(reply.text, "Thanks, I have what I need.");
        assert!(reply.complete);
    }

    #[test]
    fn json_with_wrong_shape_falls_back_to_text() {
        let raw = r#"{"message": "hello"}"#;
        let reply = parse_interview_reply(raw);
        assert_eq!(reply.text, raw);
        assert!(!reply.complete);
    }

    #[test]
    fn extract_object_direct_and_embedded() {
        assert_eq!(extract_json_object(r#" {"a":1} "#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json_object(r#"Sure! {"a": {"b": 2}} hope that helps"#),
            Some(r#"{"a": {"b": 2}}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn extract_object_from_plain_fence() {
        let raw = "Here:\n```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(raw), Some("{\"a\": 1}"));
    }
}
