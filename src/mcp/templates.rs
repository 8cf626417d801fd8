//! Catalogue de templates de prompts
//!
//! Les templates sont chargés une fois au démarrage depuis un fichier
//! TOML. Le rendu est une substitution textuelle `{clé}` → valeur, sans
//! mini-langage d'expressions: les templates existants en dépendent.

use crate::error::{ModerationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_TEMPLATE: &str = "moderation_prompt";

/// Un template de prompt nommé et versionné
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub prompt: String,
    pub safety_level: String,
    pub expected_output: String,
}

/// Catalogue nommé de templates
#[derive(Debug)]
pub struct TemplateCatalogue {
    templates: HashMap<String, PromptTemplate>,
}

impl TemplateCatalogue {
    /// Charge le catalogue; bascule sur le template embarqué si le
    /// fichier est absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let templates: HashMap<String, PromptTemplate> =
                    toml::from_str(&raw).map_err(|e| {
                        ModerationError::configuration_error(format!(
                            "Catalogue de templates illisible ({}): {}",
                            path.display(),
                            e
                        ))
                    })?;

                if !templates.contains_key(DEFAULT_TEMPLATE) {
                    return Err(ModerationError::configuration_error(format!(
                        "Le catalogue doit contenir le template '{}'",
                        DEFAULT_TEMPLATE
                    )));
                }

                tracing::info!(
                    path = %path.display(),
                    count = templates.len(),
                    "✅ Catalogue de templates chargé"
                );
                Ok(Self { templates })
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "⚠️ Catalogue introuvable, template par défaut");
                Ok(Self::with_defaults())
            }
        }
    }

    /// Catalogue embarqué minimal
    pub fn with_defaults() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            DEFAULT_TEMPLATE.to_string(),
            PromptTemplate {
                name: DEFAULT_TEMPLATE.to_string(),
                version: "1.0".to_string(),
                prompt: concat!(
                    "Classify the following message for toxicity:\n",
                    "'{chat_message}'\n\n",
                    "Respond with JSON format:\n",
                    "{\"decision\": \"[Toxic/Non-Toxic]\", \"confidence\": 0.95, ",
                    "\"reasoning\": \"explanation\"}"
                )
                .to_string(),
                safety_level: "high".to_string(),
                expected_output: "json".to_string(),
            },
        );

        Self { templates }
    }

    /// Résout un template par nom. Un nom connu est toujours celui
    /// appliqué; un nom inconnu retombe sur le template par défaut.
    pub fn resolve(&self, name: &str) -> &PromptTemplate {
        self.templates.get(name).unwrap_or_else(|| {
            tracing::warn!(template = %name, "⚠️ Template inconnu, repli sur le défaut");
            &self.templates[DEFAULT_TEMPLATE]
        })
    }

    /// Rend le prompt du template résolu par substitution `{clé}`
    pub fn render(&self, name: &str, variables: &[(&str, &str)]) -> (String, String) {
        let template = self.resolve(name);
        let mut prompt = template.prompt.clone();

        for (key, value) in variables {
            prompt = prompt.replace(&format!("{{{}}}", key), value);
        }

        (prompt, template.version.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}
