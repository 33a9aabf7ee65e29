// rams-document-service/src/session_file.rs

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::composition::BrandingOverrides;
use crate::error::{RamsError, Result};
use crate::library::TemplateLibrary;
use crate::method_statement::{MethodStatement, MethodStatementDetails, NewStep};
use crate::models::{BrandingUpdate, HazardSuggestion, NewRisk, NewTask, ProjectInfoUpdate, SignOff};
use crate::store::RamsStore;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionFile {
    pub project: ProjectInfoUpdate,
    pub activities: Vec<String>,
    pub tasks: Vec<NewTask>,
    pub risks: Vec<NewRisk>,
    pub hazards: Vec<HazardSuggestion>,
    /// Template ids to instantiate
    pub quick_add: Vec<String>,
    /// Instantiate every template matching this search
    pub quick_add_query: Option<String>,
    pub branding: BrandingUpdate,
    pub sign_off: SignOff,
    pub method_statement: Option<MethodStatementFile>,
    pub document_reference: Option<String>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodStatementFile {
    pub details: MethodStatementDetails,
    pub steps: Vec<NewStep>,
}

pub struct ReplayedSession {
    pub store: RamsStore,
    pub method_statement: Option<MethodStatement>,
    pub overrides: BrandingOverrides,
}

impl SessionFile {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn replay(self, library: &TemplateLibrary) -> Result<ReplayedSession> {
        let mut store = RamsStore::new();
        store.update_project_info(self.project);

        for activity in &self.activities {
            store.add_activity(activity);
        }
        let task_ids: Vec<String> = self.tasks.into_iter().map(|t| store.add_task(t)).collect();

        for risk in self.risks {
            store.add_risk(risk);
        }
        // Hazard suggestions link to the first task, when there is one
        let first_task = task_ids.first().map(String::as_str);
        for hazard in &self.hazards {
            store.add_risk_from_hazard(hazard, first_task);
        }
        for id in &self.quick_add {
            let template = library
                .get(id)
                .ok_or_else(|| RamsError::InvalidData(format!("unknown hazard template: {}", id)))?;
            store.add_risk_from_template(template);
        }
        if let Some(query) = &self.quick_add_query {
            library.add_filtered(query, &mut store);
        }

        store.set_branding(self.branding);
        store.set_signatures(self.sign_off);

        let method_statement = self.method_statement.map(|file| {
            let mut ms = MethodStatement::new();
            ms.set_details(file.details);
            for step in file.steps {
                ms.add_step(step);
            }
            ms
        });

        info!(
            risks = store.risks().len(),
            tasks = store.tasks().len(),
            activities = store.activities().len(),
            integrated = method_statement.is_some(),
            "Session replayed"
        );

        Ok(ReplayedSession {
            store,
            method_statement,
            overrides: BrandingOverrides {
                document_reference: self.document_reference,
                review_date: self.review_date,
                ..Default::default()
            },
        })
    }
}
