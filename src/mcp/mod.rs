//! # Serveur MCP — rendu de prompts et dispatch LLM
//!
//! Reçoit une requête de modération, valide l'entrée contre l'injection
//! de prompt, rend le template demandé, interroge le backend LLM puis
//! normalise la réponse en verdict structuré. Idempotent; peut bloquer
//! sur le LLM jusqu'à la deadline configurée.

pub mod guard;
pub mod llm;
pub mod parser;
pub mod routes;
pub mod templates;

use crate::config::{LlmConfig, McpSettings};
use crate::error::Result;
use crate::models::{ModerationRequest, ModerationVerdict};
use llm::LlmClient;
use std::time::Instant;
use templates::TemplateCatalogue;

/// Le serveur MCP: catalogue + garde + client LLM
pub struct McpServer {
    catalogue: TemplateCatalogue,
    llm_client: LlmClient,
}

impl McpServer {
    pub fn new(settings: McpSettings, llm_config: LlmConfig) -> Result<Self> {
        Ok(Self {
            catalogue: TemplateCatalogue::load(&settings.templates_path)?,
            llm_client: LlmClient::new(llm_config)?,
        })
    }

    /// Variante de test sans fichier de catalogue
    pub fn with_default_templates(llm_config: LlmConfig) -> Result<Self> {
        Ok(Self {
            catalogue: TemplateCatalogue::with_defaults(),
            llm_client: LlmClient::new(llm_config)?,
        })
    }

    /// Traite une requête de modération de bout en bout
    pub async fn moderate(&self, request: &ModerationRequest) -> Result<ModerationVerdict> {
        let started = Instant::now();

        // Rejet immédiat: ni appel LLM ni écriture en base
        guard::validate_request(request)?;

        let (prompt, template_version) = self.catalogue.render(
            &request.template_name,
            &[
                ("chat_message", request.message.as_str()),
                ("user_id", request.user_id.as_str()),
                ("channel_id", request.channel_id.as_str()),
            ],
        );

        let reply = self.llm_client.generate(&prompt).await?;
        let parsed = parser::parse_llm_content(&reply.content);

        Ok(ModerationVerdict {
            decision: parsed.decision,
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            template_version,
        })
    }

    pub fn template_names(&self) -> Vec<String> {
        self.catalogue.names()
    }
}
