// rams-document-service/src/models.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub project_name: String,
    pub location: String,
    pub date: NaiveDate,
    pub assessor: String,
}

impl ProjectInfo {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            project_name: String::new(),
            location: String::new(),
            date,
            assessor: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfoUpdate {
    pub project_name: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub assessor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub id: String,
    pub hazard: String,
    pub risk: String,
    pub likelihood: u8,
    pub severity: u8,
    pub risk_rating: u8,
    pub controls: String,
    pub residual_risk: u8,
    /// Catalog template this risk was instantiated from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ppe: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regulations: Vec<String>,
}

/// A risk as entered by the user, before an id and rating are assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRisk {
    pub hazard: String,
    pub risk: String,
    pub likelihood: u8,
    pub severity: u8,
    #[serde(default)]
    pub controls: String,
    #[serde(default)]
    pub residual_risk: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskUpdate {
    pub hazard: Option<String>,
    pub risk: Option<String>,
    pub likelihood: Option<u8>,
    pub severity: Option<u8>,
    pub controls: Option<String>,
    pub residual_risk: Option<u8>,
}

/// Hazard suggestion carrying only a qualitative risk level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardSuggestion {
    pub hazard: String,
    #[serde(default)]
    pub risk: String,
    pub risk_level: String,
    #[serde(default)]
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub estimated_duration: Option<String>,
    pub risk_level: RiskLevel,
    /// Ids of linked risks, insertion ordered, no duplicates
    pub linked_hazards: Vec<String>,
    pub responsible_person: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    pub status: TaskStatus,
}

impl Task {
    /// Returns false when the hazard was already linked.
    pub fn link_hazard(&mut self, hazard_id: &str) -> bool {
        if self.linked_hazards.iter().any(|id| id == hazard_id) {
            return false;
        }
        self.linked_hazards.push(hazard_id.to_string());
        true
    }

    pub fn unlink_hazard(&mut self, hazard_id: &str) -> bool {
        let before = self.linked_hazards.len();
        self.linked_hazards.retain(|id| id != hazard_id);
        before != self.linked_hazards.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub linked_hazards: Vec<String>,
    #[serde(default)]
    pub responsible_person: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<Vec<String>>,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub estimated_duration: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub responsible_person: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    pub include_signatures: bool,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_signatures: true,
            company_name: None,
            logo_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingUpdate {
    pub include_signatures: Option<bool>,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_data_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOff {
    pub prepared_by: Option<Signature>,
    pub reviewed_by: Option<Signature>,
    pub approved_by: Option<Signature>,
}

impl SignOff {
    /// Fields present in `update` replace the current ones.
    pub fn merge(&mut self, update: SignOff) {
        if update.prepared_by.is_some() {
            self.prepared_by = update.prepared_by;
        }
        if update.reviewed_by.is_some() {
            self.reviewed_by = update.reviewed_by;
        }
        if update.approved_by.is_some() {
            self.approved_by = update.approved_by;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub content_base64: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
}
