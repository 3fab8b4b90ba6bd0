//! Patient profile and assessment report models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound accepted at intake. Anything above is a typo, not a patient.
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" | "o" => Ok(Self::Other),
            "" => Err(ValidationError::Required { field: "gender" }),
            other => Err(ValidationError::OutOfRange {
                field: "gender",
                message: format!("expected Male, Female or Other, got {other:?}"),
            }),
        }
    }
}

/// Patient details collected at intake.
///
/// Immutable once submitted; the session controller owns it until reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_symptom: Option<String>,
}

impl PatientProfile {
    pub fn new(name: impl Into<String>, age: u32, gender: Gender) -> Self {
        Self {
            name: name.into(),
            age,
            gender,
            blood_group: None,
            allergies: None,
            existing_conditions: None,
            primary_symptom: None,
        }
    }

    /// Minimal intake validation: a name and a plausible age.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required { field: "name" });
        }
        if self.age == 0 {
            return Err(ValidationError::OutOfRange {
                field: "age",
                message: "must be positive".to_string(),
            });
        }
        if self.age > MAX_AGE {
            return Err(ValidationError::OutOfRange {
                field: "age",
                message: format!("must be at most {MAX_AGE}"),
            });
        }
        Ok(())
    }

    /// Render the profile as a markdown section for system prompt injection.
    pub fn to_prompt_section(&self) -> String {
        let mut parts = vec!["# Patient Profile".to_string()];
        parts.push(format!("- **Name:** {}", self.name.trim()));
        parts.push(format!("- **Age:** {}", self.age));
        parts.push(format!("- **Gender:** {}", self.gender));

        let optional = [
            ("Blood group", &self.blood_group),
            ("Allergies", &self.allergies),
            ("Existing conditions", &self.existing_conditions),
            ("Primary symptom", &self.primary_symptom),
        ];
        for (label, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                parts.push(format!("- **{label}:** {v}"));
            }
        }

        parts.join("\n")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Case-insensitive parse of the model's severity label.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        write!(f, "{s}")
    }
}

/// One candidate condition in a report. Only built by the report parser,
/// which guarantees `probability <= 100`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MedicalCondition {
    name: String,
    probability: u8,
    reasoning: String,
    severity: Severity,
    recommendation: String,
}

impl MedicalCondition {
    pub(crate) fn new(
        name: String,
        probability: u8,
        reasoning: String,
        severity: Severity,
        recommendation: String,
    ) -> Self {
        debug_assert!(probability <= 100);
        Self {
            name,
            probability,
            reasoning,
            severity,
            recommendation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Likelihood in percent, 0 to 100 inclusive.
    pub fn probability(&self) -> u8 {
        self.probability
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }
}

/// The final report of a completed interview.
///
/// `conditions` is never empty and keeps the model's ranking order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    summary: String,
    conditions: Vec<MedicalCondition>,
    disclaimer: String,
    generated_at: DateTime<Utc>,
}

impl AssessmentReport {
    pub(crate) fn new(
        summary: String,
        conditions: Vec<MedicalCondition>,
        disclaimer: String,
    ) -> Self {
        debug_assert!(!conditions.is_empty());
        Self {
            summary,
            conditions,
            disclaimer,
            generated_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn conditions(&self) -> &[MedicalCondition] {
        &self.conditions
    }

    pub fn disclaimer(&self) -> &str {
        &self.disclaimer
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Highest severity across all listed conditions.
    pub fn max_severity(&self) -> Severity {
        self.conditions
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or(Severity::Low)
    }
}
