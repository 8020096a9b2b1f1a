//! Fixed catalog of project templates.
//!
//! The catalog is built once at startup and shared read-only; new projects
//! are seeded from one of its entries.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    pub quality_preset: String,
    pub analytics_enabled: bool,
    pub offline_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTemplate {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub default_experiences: Vec<String>,
    pub default_settings: TemplateSettings,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<ProjectTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<ProjectTemplate>) -> Self {
        Self { templates }
    }

    /// The three construction-training templates shipped with the product.
    pub fn builtin() -> Self {
        Self::new(vec![
            template(
                "template-1",
                "Crane Operation AR Simulator",
                "Interactive training for crane operators with real-time physics feedback",
                "https://images.unsplash.com/photo-1487958449943-2429e8be8625",
                "Equipment Simulation",
                &["experience-1a", "experience-1b"],
                ("high", true, false),
                "user-1",
            ),
            template(
                "template-2",
                "Structural Steel Assembly Guide",
                "Step-by-step AR instructions for steel beam installation",
                "https://images.unsplash.com/photo-1600585154340-be6161a56a0c?auto=format&fit=crop&w=800&q=80",
                "Assembly Guidance",
                &["experience-2a"],
                ("medium", true, true),
                "user-2",
            ),
            template(
                "template-3",
                "Site Safety Hazard Scanner",
                "AR overlay identifying potential safety risks on construction sites",
                "https://images.unsplash.com/photo-1570129477492-45c003edd2be?auto=format&fit=crop&w=800&q=80",
                "Safety Training",
                &["experience-3a", "experience-3b", "experience-3c"],
                ("ultra", false, false),
                "user-3",
            ),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ProjectTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[ProjectTemplate] {
        &self.templates
    }
}

#[allow(clippy::too_many_arguments)]
fn template(
    id: &str,
    name: &str,
    description: &str,
    thumbnail: &str,
    kind: &str,
    experiences: &[&str],
    (quality_preset, analytics_enabled, offline_access): (&str, bool, bool),
    created_by: &str,
) -> ProjectTemplate {
    ProjectTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        thumbnail: thumbnail.to_string(),
        kind: kind.to_string(),
        default_experiences: experiences.iter().map(|e| e.to_string()).collect(),
        default_settings: TemplateSettings {
            quality_preset: quality_preset.to_string(),
            analytics_enabled,
            offline_access,
        },
        created_by: created_by.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_three_templates() {
        let catalog = TemplateCatalog::builtin();
        let ids: Vec<_> = catalog.all().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["template-1", "template-2", "template-3"]);
    }

    #[test]
    fn lookup_by_id() {
        let catalog = TemplateCatalog::builtin();
        let crane = catalog.get("template-1").unwrap();
        assert_eq!(crane.kind, "Equipment Simulation");
        assert!(catalog.get("template-9").is_none());
        assert!(catalog.get("").is_none());
    }

    #[test]
    fn serializes_with_mongo_style_id_and_type() {
        let json = serde_json::to_value(TemplateCatalog::builtin().get("template-2").unwrap()).unwrap();
        assert_eq!(json["_id"], "template-2");
        assert_eq!(json["type"], "Assembly Guidance");
        assert_eq!(json["defaultSettings"]["offlineAccess"], true);
    }
}
