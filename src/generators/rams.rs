// rams-document-service/src/generators/rams.rs

use crate::composition::GenerationInput;
use crate::error::Result;
use crate::generators::Generator;
use async_trait::async_trait;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const TEMPLATE_NAME: &str = "rams";
const EMBEDDED_TEMPLATE: &str = include_str!("../../templates/rams.md.hbs");

/// Free text made safe for a Markdown pipe-table cell: pipes are escaped and
/// line breaks collapse to single spaces.
pub(crate) fn table_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

handlebars_helper!(cell: |value: Json| table_cell(value));

pub struct RamsGenerator {
    handlebars: Arc<RwLock<Handlebars<'static>>>,
    template_dir: Option<PathBuf>,
}

impl RamsGenerator {
    /// Uses `{template_dir}/rams.md.hbs` when present, otherwise the
    /// template compiled into the binary.
    pub fn new(template_dir: Option<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Output is Markdown, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("cell", Box::new(cell));

        Self {
            handlebars: Arc::new(RwLock::new(handlebars)),
            template_dir,
        }
    }

    async fn load_template(&self) -> Result<()> {
        let mut hb = self.handlebars.write().await;
        if hb.has_template(TEMPLATE_NAME) {
            return Ok(());
        }

        let override_path = self
            .template_dir
            .as_deref()
            .map(|dir| dir.join(format!("{}.md.hbs", TEMPLATE_NAME)))
            .filter(|path| path.is_file());

        match override_path {
            Some(path) => {
                debug!(path = %path.display(), "Registering RAMS template from file");
                hb.register_template_file(TEMPLATE_NAME, &path)?;
            }
            None => {
                debug!("Registering embedded RAMS template");
                hb.register_template_string(TEMPLATE_NAME, EMBEDDED_TEMPLATE)?;
            }
        }
        Ok(())
    }
}

impl Default for RamsGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Generator for RamsGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<String> {
        let document = &input.document;
        info!(
            project = %document.project.project_name,
            risks = document.risks.len(),
            integrated = document.method_statement.is_some(),
            "Generating RAMS document"
        );

        self.load_template().await?;

        let context = serde_json::json!({
            "title": document.title(),
            "document": document,
            "options": input.options,
        });

        let hb = self.handlebars.read().await;
        let rendered = hb.render(TEMPLATE_NAME, &context)?;

        info!(
            project = %document.project.project_name,
            size_bytes = rendered.len(),
            "RAMS document generated"
        );

        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::compose_document;
    use crate::method_statement::{MethodStatement, MethodStatementDetails, NewStep};
    use crate::models::{NewRisk, ProjectInfoUpdate, SignOff, Signature};
    use crate::store::RamsStore;
    use chrono::NaiveDate;

    fn store() -> RamsStore {
        let mut store = RamsStore::new();
        store.update_project_info(ProjectInfoUpdate {
            project_name: Some("Rewire 12 High St".into()),
            location: Some("Leeds".into()),
            assessor: Some("J. Smith".into()),
            ..Default::default()
        });
        store.add_activity("Isolate supply");
        store.add_risk(NewRisk {
            hazard: "Working at height".into(),
            risk: "Fall from ladder".into(),
            likelihood: 3,
            severity: 4,
            controls: "Use tower scaffold".into(),
            residual_risk: None,
        });
        store
    }

    #[tokio::test]
    async fn renders_risk_register() {
        let doc = compose_document(&store().snapshot(), None, None);
        let markdown = RamsGenerator::default()
            .generate(&GenerationInput::new(doc))
            .await
            .unwrap();

        assert!(markdown.contains("Risk Assessment: Rewire 12 High St"));
        assert!(markdown.contains("Working at height"));
        assert!(markdown.contains("| 12 | High |"));
        assert!(markdown.contains("Isolate supply"));
        assert!(!markdown.contains("Method Statement"));
    }

    #[test]
    fn table_cells_escape_pipes_and_newlines() {
        assert_eq!(table_cell(&Value::from("Cable | trunking")), "Cable \\| trunking");
        assert_eq!(table_cell(&Value::from("Cuts\nand abrasions")), "Cuts and abrasions");
        assert_eq!(table_cell(&Value::from("a\r\n\r\nb")), "a b");
        assert_eq!(table_cell(&Value::Null), "");
        assert_eq!(table_cell(&Value::from(12)), "12");
    }

    #[tokio::test]
    async fn free_text_stays_inside_its_register_row() {
        let mut store = store();
        store.add_risk(NewRisk {
            hazard: "Cable | trunking".into(),
            risk: "Cuts\nand abrasions".into(),
            likelihood: 2,
            severity: 2,
            controls: "Gloves".into(),
            residual_risk: None,
        });
        let doc = compose_document(&store.snapshot(), None, None);
        let markdown = RamsGenerator::default()
            .generate(&GenerationInput::new(doc))
            .await
            .unwrap();

        assert!(markdown.contains(
            "| Cable \\| trunking | Cuts and abrasions | 2 | 2 | 4 | Low | Gloves | 2 | Low |"
        ));
        assert!(!markdown.lines().any(|line| line.starts_with("and abrasions")));
    }

    #[tokio::test]
    async fn signatures_follow_include_flag() {
        let mut store = store();
        store.set_signatures(SignOff {
            prepared_by: Some(Signature {
                name: "J. Smith".into(),
                date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                signature_data_url: None,
            }),
            ..Default::default()
        });
        let generator = RamsGenerator::default();

        let with = GenerationInput::new(compose_document(&store.snapshot(), None, None));
        let markdown = generator.generate(&with).await.unwrap();
        assert!(markdown.contains("Prepared by"));

        let mut without = with.clone();
        without.options.include_signatures = false;
        let markdown = generator.generate(&without).await.unwrap();
        assert!(!markdown.contains("Prepared by"));
    }

    #[tokio::test]
    async fn integrated_document_lists_steps() {
        let mut ms = MethodStatement::new();
        ms.set_details(MethodStatementDetails {
            contractor: "Spark Ltd".into(),
            supervisor: "A. Jones".into(),
            work_type: "Domestic rewire".into(),
            ..Default::default()
        });
        ms.add_step(NewStep {
            title: "Safe isolation".into(),
            description: "Isolate and lock off the supply".into(),
            ..Default::default()
        });
        let doc = compose_document(&store().snapshot(), Some(&ms), None);
        let markdown = RamsGenerator::default()
            .generate(&GenerationInput::new(doc))
            .await
            .unwrap();

        assert!(markdown.contains("Method Statement"));
        assert!(markdown.contains("Step 1: Safe isolation"));
        assert!(markdown.contains("Spark Ltd"));
    }
}
