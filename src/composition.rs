// rams-document-service/src/composition.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::method_statement::{MethodStatement, MethodStatementDetails, MethodStatementStep};
use crate::models::{ProjectInfo, Risk, SignOff, Task};
use crate::scoring::{self, RiskBand, RiskSummary};
use crate::store::RamsSnapshot;

/// Generation-time overrides merged over the store's report options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingOverrides {
    pub include_signatures: Option<bool>,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub document_reference: Option<String>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOptions {
    pub include_signatures: bool,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub document_reference: Option<String>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessedRisk {
    #[serde(flatten)]
    pub risk: Risk,
    pub band: RiskBand,
    pub band_label: String,
    pub residual_band: RiskBand,
    pub residual_band_label: String,
}

impl From<&Risk> for AssessedRisk {
    fn from(risk: &Risk) -> Self {
        let band = scoring::classify_rating(risk.risk_rating);
        let residual_band = scoring::classify_rating(risk.residual_risk);
        Self {
            risk: risk.clone(),
            band,
            band_label: band.label().to_string(),
            residual_band,
            residual_band_label: residual_band.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTask {
    #[serde(flatten)]
    pub task: Task,
    pub linked_hazard_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedStep {
    #[serde(flatten)]
    pub step: MethodStatementStep,
    pub linked_hazard_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedMethodStatement {
    pub details: MethodStatementDetails,
    pub steps: Vec<ComposedStep>,
    pub integration_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeDocument {
    pub project: ProjectInfo,
    pub activities: Vec<String>,
    pub tasks: Vec<ComposedTask>,
    pub risks: Vec<AssessedRisk>,
    pub summary: RiskSummary,
    pub ppe: Vec<String>,
    pub regulations: Vec<String>,
    pub options: DocumentOptions,
    pub sign_off: SignOff,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_statement: Option<IntegratedMethodStatement>,
}

impl CompositeDocument {
    pub fn title(&self) -> String {
        if self.method_statement.is_some() {
            format!("RAMS: {}", self.project.project_name)
        } else {
            format!("Risk Assessment: {}", self.project.project_name)
        }
    }
}

/// Options passed to the renderer alongside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub include_signatures: bool,
    pub company_name: Option<String>,
    pub document_reference: Option<String>,
    pub review_date: Option<NaiveDate>,
}

/// Full renderer input. Its serialization is the cache key source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInput {
    pub document: CompositeDocument,
    pub options: GenerationOptions,
}

impl GenerationInput {
    pub fn new(document: CompositeDocument) -> Self {
        let options = GenerationOptions {
            include_signatures: document.options.include_signatures,
            company_name: document.options.company_name.clone(),
            document_reference: document.options.document_reference.clone(),
            review_date: document.options.review_date,
        };
        Self { document, options }
    }
}

pub fn compose_document(
    snapshot: &RamsSnapshot,
    method_statement: Option<&MethodStatement>,
    overrides: Option<&BrandingOverrides>,
) -> CompositeDocument {
    let hazard_names: HashMap<&str, &str> = snapshot
        .risks
        .iter()
        .map(|r| (r.id.as_str(), r.hazard.as_str()))
        .collect();
    let resolve = |ids: &[String]| -> Vec<String> {
        ids.iter()
            .filter_map(|id| hazard_names.get(id.as_str()).map(|name| name.to_string()))
            .collect()
    };

    let tasks = snapshot
        .tasks
        .iter()
        .map(|task| ComposedTask {
            task: task.clone(),
            linked_hazard_names: resolve(&task.linked_hazards),
        })
        .collect();

    let method_statement = method_statement.map(|ms| IntegratedMethodStatement {
        details: ms.details.clone(),
        steps: ms
            .steps
            .iter()
            .map(|step| ComposedStep {
                step: step.clone(),
                linked_hazard_names: step
                    .linked_hazards
                    .as_deref()
                    .map(&resolve)
                    .unwrap_or_default(),
            })
            .collect(),
        integration_note: integration_note(&snapshot.project_info, ms),
    });

    CompositeDocument {
        project: snapshot.project_info.clone(),
        activities: snapshot.activities.clone(),
        tasks,
        risks: snapshot.risks.iter().map(AssessedRisk::from).collect(),
        summary: scoring::summarize(&snapshot.risks),
        ppe: roll_up(snapshot.risks.iter().map(|r| &r.ppe)),
        regulations: roll_up(snapshot.risks.iter().map(|r| &r.regulations)),
        options: merge_options(snapshot, overrides),
        sign_off: snapshot.sign_off.clone(),
        method_statement,
    }
}

fn merge_options(snapshot: &RamsSnapshot, overrides: Option<&BrandingOverrides>) -> DocumentOptions {
    let base = &snapshot.report_options;
    let mut options = DocumentOptions {
        include_signatures: base.include_signatures,
        company_name: base.company_name.clone(),
        logo_url: base.logo_url.clone(),
        document_reference: None,
        review_date: None,
    };
    let Some(overrides) = overrides else {
        return options;
    };

    if let Some(include) = overrides.include_signatures {
        options.include_signatures = include;
    }
    if let Some(company) = &overrides.company_name {
        options.company_name = Some(company.clone());
    }
    if let Some(logo) = &overrides.logo_url {
        options.logo_url = Some(logo.clone());
    }
    options.document_reference = overrides.document_reference.clone();
    options.review_date = overrides.review_date;
    options
}

/// Sorted, de-duplicated union of string lists.
fn roll_up<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    lists
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn integration_note(project: &ProjectInfo, ms: &MethodStatement) -> String {
    format!(
        "This document combines the risk assessment for {} with a {}-step method statement. \
         Hazards referenced by each step are assessed in the risk register above.",
        project.project_name,
        ms.steps.len()
    )
}
