// rams-document-service/src/method_statement.rs

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{RiskLevel, ValidationReport};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStatementDetails {
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub contractor: String,
    #[serde(default)]
    pub supervisor: String,
    #[serde(default)]
    pub work_type: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStatementStep {
    pub id: String,
    pub step_number: u32,
    pub title: String,
    pub description: String,
    pub safety_requirements: Vec<String>,
    pub equipment_needed: Vec<String>,
    pub qualifications: Vec<String>,
    pub estimated_duration: String,
    pub risk_level: RiskLevel,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_hazards: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub safety_requirements: Vec<String>,
    #[serde(default)]
    pub equipment_needed: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub linked_hazards: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub safety_requirements: Option<Vec<String>>,
    pub equipment_needed: Option<Vec<String>>,
    pub qualifications: Option<Vec<String>>,
    pub estimated_duration: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub linked_hazards: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodStatement {
    #[serde(default)]
    pub details: MethodStatementDetails,
    #[serde(default)]
    pub steps: Vec<MethodStatementStep>,
}

impl MethodStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_details(&mut self, details: MethodStatementDetails) {
        self.details = details;
    }

    /// Appends a step numbered `len + 1`. Numbers are never reassigned, so
    /// removing a middle step leaves a gap.
    pub fn add_step(&mut self, new: NewStep) -> String {
        let id = Uuid::new_v4().to_string();
        let step_number = self.steps.len() as u32 + 1;
        debug!(step_id = %id, step_number, "Method statement step added");
        self.steps.push(MethodStatementStep {
            id: id.clone(),
            step_number,
            title: new.title,
            description: new.description,
            safety_requirements: new.safety_requirements,
            equipment_needed: new.equipment_needed,
            qualifications: new.qualifications,
            estimated_duration: new.estimated_duration,
            risk_level: new.risk_level,
            is_completed: false,
            linked_hazards: new.linked_hazards,
        });
        id
    }

    pub fn update_step(&mut self, id: &str, update: StepUpdate) {
        let Some(step) = self.steps.iter_mut().find(|s| s.id == id) else {
            return;
        };
        if let Some(title) = update.title {
            step.title = title;
        }
        if let Some(description) = update.description {
            step.description = description;
        }
        if let Some(reqs) = update.safety_requirements {
            step.safety_requirements = reqs;
        }
        if let Some(equipment) = update.equipment_needed {
            step.equipment_needed = equipment;
        }
        if let Some(quals) = update.qualifications {
            step.qualifications = quals;
        }
        if let Some(duration) = update.estimated_duration {
            step.estimated_duration = duration;
        }
        if let Some(level) = update.risk_level {
            step.risk_level = level;
        }
        if let Some(hazards) = update.linked_hazards {
            step.linked_hazards = Some(hazards);
        }
    }

    pub fn remove_step(&mut self, id: &str) {
        self.steps.retain(|s| s.id != id);
    }

    pub fn toggle_step_complete(&mut self, id: &str) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            step.is_completed = !step.is_completed;
        }
    }

    /// Stricter rules applied only to the integrated RAMS flow.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        if self.details.contractor.trim().is_empty() {
            errors.push("Contractor is required".to_string());
        }
        if self.details.supervisor.trim().is_empty() {
            errors.push("Supervisor is required".to_string());
        }
        if self.details.work_type.trim().is_empty() {
            errors.push("Work type is required".to_string());
        }
        if self.steps.is_empty() {
            errors.push("At least one method statement step is required".to_string());
        }
        ValidationReport::from_errors(errors)
    }
}
