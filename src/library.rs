// rams-document-service/src/library.rs

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::store::RamsStore;

const BUILTIN_CATALOG: &str = include_str!("../data/hazard_templates.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardTemplate {
    pub id: String,
    pub hazard: String,
    /// Consequence, or the specific activity the hazard arises from
    pub risk: String,
    pub category: String,
    pub likelihood: u8,
    pub severity: u8,
    #[serde(default)]
    pub residual_risk: Option<u8>,
    pub detailed_controls: Vec<String>,
    #[serde(default)]
    pub ppe: Vec<String>,
    #[serde(default)]
    pub regulations: Vec<String>,
    #[serde(default)]
    pub icon: String,
}

impl HazardTemplate {
    /// Controls as stored on an instantiated risk.
    pub fn controls_summary(&self) -> String {
        self.detailed_controls.join("; ")
    }

    fn matches(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);
        hit(&self.hazard)
            || hit(&self.risk)
            || hit(&self.category)
            || self.detailed_controls.iter().any(|c| hit(c))
            || self.ppe.iter().any(|p| hit(p))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<HazardTemplate>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<HazardTemplate>) -> Self {
        Self { templates }
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let templates: Vec<HazardTemplate> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let library = Self::from_json(&json)?;
        info!(path = %path.display(), templates = library.len(), "Loaded hazard template catalog");
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn all(&self) -> &[HazardTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&HazardTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Case-insensitive substring search across hazard, activity, category,
    /// controls and PPE. A blank query returns the whole catalog.
    pub fn search(&self, query: &str) -> Vec<&HazardTemplate> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.templates.iter().collect();
        }
        self.templates.iter().filter(|t| t.matches(&needle)).collect()
    }

    /// Instantiates every template matching `query` into the store, in
    /// filter order, and returns the new risk ids.
    pub fn add_filtered(&self, query: &str, store: &mut RamsStore) -> Vec<String> {
        let ids: Vec<String> = self
            .search(query)
            .into_iter()
            .map(|template| store.add_risk_from_template(template))
            .collect();
        info!(query = %query, added = ids.len(), "Quick-added hazard templates");
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let library = TemplateLibrary::builtin().unwrap();
        assert!(library.len() >= 8);
        for template in library.all() {
            assert!((1..=5).contains(&template.likelihood), "{}", template.id);
            assert!((1..=5).contains(&template.severity), "{}", template.id);
            assert!(!template.detailed_controls.is_empty(), "{}", template.id);
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let library = TemplateLibrary::builtin().unwrap();

        let by_hazard = library.search("ASBESTOS");
        assert!(by_hazard.iter().any(|t| t.id == "asbestos-disturbance"));

        // PPE-only hit
        let by_ppe = library.search("arc flash");
        assert!(!by_ppe.is_empty());

        assert_eq!(library.search("").len(), library.len());
        assert!(library.search("zzz-no-such-thing").is_empty());
    }

    #[test]
    fn add_filtered_preserves_filter_order() {
        let library = TemplateLibrary::builtin().unwrap();
        let mut store = RamsStore::new();
        let expected: Vec<String> = library
            .search("electrical")
            .iter()
            .map(|t| t.hazard.clone())
            .collect();

        let ids = library.add_filtered("electrical", &mut store);
        assert_eq!(ids.len(), expected.len());
        let hazards: Vec<String> = store.risks().iter().map(|r| r.hazard.clone()).collect();
        assert_eq!(hazards, expected);
    }

    #[test]
    fn template_residual_overrides_default() {
        let library = TemplateLibrary::builtin().unwrap();
        let template = library.get("live-working").unwrap();
        let mut store = RamsStore::new();
        let id = store.add_risk_from_template(template);
        let risk = store.risk(&id).unwrap();
        assert_eq!(Some(risk.residual_risk), template.residual_risk);
        assert_eq!(risk.source_template.as_deref(), Some("live-working"));
    }
}
