// rams-document-service/src/store.rs

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::library::HazardTemplate;
use crate::models::{
    BrandingUpdate, HazardSuggestion, NewRisk, NewTask, ProjectInfo, ProjectInfoUpdate,
    ReportOptions, Risk, RiskUpdate, SignOff, Task, TaskUpdate, ValidationReport,
};
use crate::scoring::{self, HazardLevel, RiskBand};

/// Point-in-time copy of the store, consumed by document composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RamsSnapshot {
    pub project_info: ProjectInfo,
    pub activities: Vec<String>,
    pub risks: Vec<Risk>,
    pub tasks: Vec<Task>,
    pub report_options: ReportOptions,
    pub sign_off: SignOff,
}

#[derive(Debug, Clone)]
pub struct RamsStore {
    project_info: ProjectInfo,
    activities: Vec<String>,
    risks: Vec<Risk>,
    tasks: Vec<Task>,
    report_options: ReportOptions,
    sign_off: SignOff,
}

impl Default for RamsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RamsStore {
    pub fn new() -> Self {
        Self::with_date(Local::now().date_naive())
    }

    /// Store whose project date defaults to `date`.
    pub fn with_date(date: NaiveDate) -> Self {
        Self {
            project_info: ProjectInfo::new(date),
            activities: Vec::new(),
            risks: Vec::new(),
            tasks: Vec::new(),
            report_options: ReportOptions::default(),
            sign_off: SignOff::default(),
        }
    }

    pub fn project_info(&self) -> &ProjectInfo {
        &self.project_info
    }

    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    pub fn risks(&self) -> &[Risk] {
        &self.risks
    }

    pub fn risk(&self, id: &str) -> Option<&Risk> {
        self.risks.iter().find(|r| r.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn report_options(&self) -> &ReportOptions {
        &self.report_options
    }

    pub fn sign_off(&self) -> &SignOff {
        &self.sign_off
    }

    pub fn snapshot(&self) -> RamsSnapshot {
        RamsSnapshot {
            project_info: self.project_info.clone(),
            activities: self.activities.clone(),
            risks: self.risks.clone(),
            tasks: self.tasks.clone(),
            report_options: self.report_options.clone(),
            sign_off: self.sign_off.clone(),
        }
    }

    // ------------------------------------------------------------
    // Project info
    // ------------------------------------------------------------

    pub fn update_project_info(&mut self, update: ProjectInfoUpdate) {
        if let Some(name) = update.project_name {
            self.project_info.project_name = name;
        }
        if let Some(location) = update.location {
            self.project_info.location = location;
        }
        if let Some(date) = update.date {
            self.project_info.date = date;
        }
        if let Some(assessor) = update.assessor {
            self.project_info.assessor = assessor;
        }
        debug!(project = %self.project_info.project_name, "Project info updated");
    }

    // ------------------------------------------------------------
    // Risks
    // ------------------------------------------------------------

    pub fn add_risk(&mut self, new: NewRisk) -> String {
        self.insert_risk(new, None)
    }

    /// Copies hazard, risk, factors and controls from a catalog template.
    pub fn add_risk_from_template(&mut self, template: &HazardTemplate) -> String {
        let new = NewRisk {
            hazard: template.hazard.clone(),
            risk: template.risk.clone(),
            likelihood: template.likelihood,
            severity: template.severity,
            controls: template.controls_summary(),
            residual_risk: template.residual_risk,
        };
        self.insert_risk(new, Some(template))
    }

    /// Adds a risk from a qualitative hazard suggestion, linking it to
    /// `task_id` when that task exists.
    pub fn add_risk_from_hazard(
        &mut self,
        hazard: &HazardSuggestion,
        task_id: Option<&str>,
    ) -> String {
        let (likelihood, severity) = HazardLevel::from_label(&hazard.risk_level).factors();
        let new = NewRisk {
            hazard: hazard.hazard.clone(),
            risk: hazard.risk.clone(),
            likelihood,
            severity,
            controls: hazard.controls.join("; "),
            residual_risk: None,
        };
        let id = self.insert_risk(new, None);

        if let Some(task_id) = task_id {
            if !self.link_hazard_to_task(task_id, &id) {
                warn!(task_id = %task_id, risk_id = %id, "Hazard added but task not found for linking");
            }
        }
        id
    }

    fn insert_risk(&mut self, new: NewRisk, template: Option<&HazardTemplate>) -> String {
        let id = Uuid::new_v4().to_string();
        let likelihood = scoring::clamp_factor(new.likelihood);
        let severity = scoring::clamp_factor(new.severity);
        let risk_rating = scoring::compute_rating(likelihood, severity);
        let residual_risk = new
            .residual_risk
            .unwrap_or_else(|| scoring::compute_residual(risk_rating));

        debug!(risk_id = %id, hazard = %new.hazard, risk_rating, "Risk added");

        self.risks.push(Risk {
            id: id.clone(),
            hazard: new.hazard,
            risk: new.risk,
            likelihood,
            severity,
            risk_rating,
            controls: new.controls,
            residual_risk,
            source_template: template.map(|t| t.id.clone()),
            ppe: template.map(|t| t.ppe.clone()).unwrap_or_default(),
            regulations: template.map(|t| t.regulations.clone()).unwrap_or_default(),
        });
        id
    }

    /// Removes the risk and prunes it from every task's linked hazards.
    pub fn remove_risk(&mut self, id: &str) {
        let before = self.risks.len();
        self.risks.retain(|r| r.id != id);
        if before == self.risks.len() {
            return;
        }
        for task in &mut self.tasks {
            task.unlink_hazard(id);
        }
        debug!(risk_id = %id, "Risk removed");
    }

    pub fn update_risk(&mut self, id: &str, update: RiskUpdate) {
        let Some(risk) = self.risks.iter_mut().find(|r| r.id == id) else {
            debug!(risk_id = %id, "Ignoring update for unknown risk");
            return;
        };

        if let Some(hazard) = update.hazard {
            risk.hazard = hazard;
        }
        if let Some(description) = update.risk {
            risk.risk = description;
        }
        if let Some(controls) = update.controls {
            risk.controls = controls;
        }
        if let Some(likelihood) = update.likelihood {
            risk.likelihood = scoring::clamp_factor(likelihood);
        }
        if let Some(severity) = update.severity {
            risk.severity = scoring::clamp_factor(severity);
        }
        if let Some(residual) = update.residual_risk {
            risk.residual_risk = residual;
        }
        risk.risk_rating = scoring::compute_rating(risk.likelihood, risk.severity);
    }

    pub fn risks_in_band(&self, band: RiskBand) -> Vec<&Risk> {
        self.risks
            .iter()
            .filter(|r| scoring::classify_rating(r.risk_rating) == band)
            .collect()
    }

    // ------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------

    pub fn add_task(&mut self, new: NewTask) -> String {
        let id = Uuid::new_v4().to_string();
        let mut task = Task {
            id: id.clone(),
            title: new.title,
            description: new.description,
            category: new.category,
            estimated_duration: new.estimated_duration,
            risk_level: new.risk_level,
            linked_hazards: Vec::with_capacity(new.linked_hazards.len()),
            responsible_person: new.responsible_person,
            prerequisites: new.prerequisites,
            status: new.status,
        };
        for hazard_id in &new.linked_hazards {
            task.link_hazard(hazard_id);
        }
        debug!(task_id = %id, title = %task.title, "Task added");
        self.tasks.push(task);
        id
    }

    pub fn update_task(&mut self, id: &str, update: TaskUpdate) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(task_id = %id, "Ignoring update for unknown task");
            return;
        };

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(category) = update.category {
            task.category = category;
        }
        if let Some(duration) = update.estimated_duration {
            task.estimated_duration = Some(duration);
        }
        if let Some(level) = update.risk_level {
            task.risk_level = level;
        }
        if let Some(person) = update.responsible_person {
            task.responsible_person = Some(person);
        }
        if let Some(prerequisites) = update.prerequisites {
            task.prerequisites = Some(prerequisites);
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        debug!(task_id = %id, status = ?task.status, "Task updated");
    }

    pub fn remove_task(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() < before {
            debug!(task_id = %id, "Task removed");
        }
    }

    /// Returns false only when the task does not exist. Linking twice is a no-op.
    pub fn link_hazard_to_task(&mut self, task_id: &str, hazard_id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.link_hazard(hazard_id);
                true
            }
            None => false,
        }
    }

    pub fn unlink_hazard_from_task(&mut self, task_id: &str, hazard_id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.unlink_hazard(hazard_id);
        }
    }

    // ------------------------------------------------------------
    // Activities (flat work description list)
    // ------------------------------------------------------------

    pub fn add_activity(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.activities.iter().any(|a| a == trimmed) {
            return;
        }
        debug!(activity = %trimmed, "Activity added");
        self.activities.push(trimmed.to_string());
    }

    pub fn remove_activity(&mut self, index: usize) {
        if index < self.activities.len() {
            let removed = self.activities.remove(index);
            debug!(index, activity = %removed, "Activity removed");
        }
    }

    // ------------------------------------------------------------
    // Branding and sign-off
    // ------------------------------------------------------------

    pub fn set_branding(&mut self, update: BrandingUpdate) {
        if let Some(include) = update.include_signatures {
            self.report_options.include_signatures = include;
        }
        if let Some(company) = update.company_name {
            self.report_options.company_name = Some(company);
        }
        if let Some(logo) = update.logo_url {
            self.report_options.logo_url = Some(logo);
        }
        debug!(
            include_signatures = self.report_options.include_signatures,
            "Branding updated"
        );
    }

    pub fn set_signatures(&mut self, update: SignOff) {
        self.sign_off.merge(update);
        debug!("Signatures updated");
    }

    // ------------------------------------------------------------
    // Validation / lifecycle
    // ------------------------------------------------------------

    /// Every violated export requirement, in a stable order.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let info = &self.project_info;

        if info.project_name.trim().is_empty() {
            errors.push("Project name is required".to_string());
        }
        if info.location.trim().is_empty() {
            errors.push("Location is required".to_string());
        }
        if info.assessor.trim().is_empty() {
            errors.push("Assessor name is required".to_string());
        }
        if self.activities.is_empty() && self.tasks.is_empty() {
            errors.push("At least one work activity or task is required".to_string());
        }
        if self.risks.is_empty() {
            errors.push("At least one risk must be identified".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
        debug!("RAMS store reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    fn ladder_risk() -> NewRisk {
        NewRisk {
            hazard: "Working at height".into(),
            risk: "Fall from ladder".into(),
            likelihood: 3,
            severity: 4,
            controls: "Use tower scaffold".into(),
            residual_risk: None,
        }
    }

    #[test]
    fn add_risk_computes_rating_and_residual() {
        let mut store = RamsStore::new();
        let id = store.add_risk(ladder_risk());
        let risk = store.risk(&id).unwrap();
        assert_eq!(risk.risk_rating, 12);
        assert_eq!(risk.residual_risk, 6);
    }

    #[test]
    fn explicit_residual_is_kept() {
        let mut store = RamsStore::new();
        let id = store.add_risk(NewRisk {
            residual_risk: Some(2),
            ..ladder_risk()
        });
        assert_eq!(store.risk(&id).unwrap().residual_risk, 2);
    }

    #[test]
    fn partial_update_recomputes_with_other_factor() {
        let mut store = RamsStore::new();
        let id = store.add_risk(ladder_risk());

        store.update_risk(
            &id,
            RiskUpdate {
                likelihood: Some(5),
                ..Default::default()
            },
        );
        assert_eq!(store.risk(&id).unwrap().risk_rating, 20);

        store.update_risk(
            &id,
            RiskUpdate {
                severity: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(store.risk(&id).unwrap().risk_rating, 5);

        store.update_risk(
            &id,
            RiskUpdate {
                likelihood: Some(2),
                severity: Some(2),
                ..Default::default()
            },
        );
        let risk = store.risk(&id).unwrap();
        assert_eq!(risk.risk_rating, risk.likelihood * risk.severity);
        assert_eq!(risk.risk_rating, 4);
    }

    #[test]
    fn hazard_suggestion_links_to_task() {
        let mut store = RamsStore::new();
        let task_id = store.add_task(NewTask {
            title: "Install consumer unit".into(),
            risk_level: RiskLevel::High,
            ..Default::default()
        });

        let risk_id = store.add_risk_from_hazard(
            &HazardSuggestion {
                hazard: "Live conductors".into(),
                risk: "Electric shock".into(),
                risk_level: "Very High".into(),
                controls: vec!["Safe isolation".into(), "Lock off".into()],
            },
            Some(&task_id),
        );

        let risk = store.risk(&risk_id).unwrap();
        assert_eq!((risk.likelihood, risk.severity), (5, 5));
        assert_eq!(risk.risk_rating, 25);
        assert_eq!(risk.controls, "Safe isolation; Lock off");
        assert_eq!(store.task(&task_id).unwrap().linked_hazards, vec![risk_id]);
    }

    #[test]
    fn hazard_suggestion_with_unknown_task_still_adds_risk() {
        let mut store = RamsStore::new();
        let id = store.add_risk_from_hazard(
            &HazardSuggestion {
                hazard: "Dust".into(),
                risk_level: "Medium".into(),
                ..Default::default()
            },
            Some("missing"),
        );
        assert_eq!(store.risk(&id).unwrap().risk_rating, 9);
    }

    #[test]
    fn linking_is_idempotent_and_removal_prunes() {
        let mut store = RamsStore::new();
        let risk_id = store.add_risk(ladder_risk());
        let task_id = store.add_task(NewTask {
            title: "Rewire".into(),
            ..Default::default()
        });

        assert!(store.link_hazard_to_task(&task_id, &risk_id));
        assert!(store.link_hazard_to_task(&task_id, &risk_id));
        assert_eq!(store.task(&task_id).unwrap().linked_hazards.len(), 1);

        store.remove_risk(&risk_id);
        assert!(store.task(&task_id).unwrap().linked_hazards.is_empty());
    }

    #[test]
    fn activities_are_trimmed_and_deduplicated() {
        let mut store = RamsStore::new();
        store.add_activity("Isolate supply");
        store.add_activity("  Isolate supply ");
        store.add_activity("   ");
        assert_eq!(store.activities(), ["Isolate supply"]);

        store.remove_activity(7);
        assert_eq!(store.activities().len(), 1);
        store.remove_activity(0);
        assert!(store.activities().is_empty());
    }

    #[test]
    fn task_edits_apply_and_unknown_ids_are_ignored() {
        let mut store = RamsStore::new();
        let id = store.add_task(NewTask {
            title: "Second fix".into(),
            ..Default::default()
        });
        store.update_task(
            &id,
            TaskUpdate {
                status: Some(crate::models::TaskStatus::InProgress),
                ..Default::default()
            },
        );
        store.update_task(
            "missing",
            TaskUpdate {
                title: Some("Ghost".into()),
                ..Default::default()
            },
        );
        store.remove_task("missing");
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].status, crate::models::TaskStatus::InProgress);
        assert_eq!(store.tasks()[0].title, "Second fix");

        store.remove_task(&id);
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn empty_store_reports_every_rule() {
        let report = RamsStore::new().validate();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 5);
    }

    #[test]
    fn task_alone_satisfies_work_description() {
        let mut store = RamsStore::new();
        store.add_task(NewTask {
            title: "First fix".into(),
            ..Default::default()
        });
        let report = store.validate();
        assert!(!report
            .errors
            .iter()
            .any(|e| e.contains("work activity or task")));
    }

    #[test]
    fn branding_merges_shallowly() {
        let mut store = RamsStore::new();
        store.set_branding(BrandingUpdate {
            company_name: Some("Spark Ltd".into()),
            ..Default::default()
        });
        store.set_branding(BrandingUpdate {
            include_signatures: Some(false),
            ..Default::default()
        });
        let options = store.report_options();
        assert_eq!(options.company_name.as_deref(), Some("Spark Ltd"));
        assert!(!options.include_signatures);
    }

    #[test]
    fn band_filter_uses_shared_classification() {
        let mut store = RamsStore::new();
        store.add_risk(ladder_risk());
        store.add_risk(NewRisk {
            likelihood: 1,
            severity: 2,
            ..ladder_risk()
        });
        assert_eq!(store.risks_in_band(RiskBand::High).len(), 1);
        assert_eq!(store.risks_in_band(RiskBand::Low).len(), 1);
        assert!(store.risks_in_band(RiskBand::VeryHigh).is_empty());
    }
}
