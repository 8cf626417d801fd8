//! Client du pipeline de modération, côté ingress
//!
//! Orchestration stricte par message: filtre → MCP → diffusion. Le
//! filtre a une deadline courte et bascule en fail-open; le MCP a la
//! deadline longue et ses échecs deviennent un verdict Error en bande.

use crate::config::PipelineConfig;
use crate::error::{ModerationError, Result};
use crate::models::{
    ChatMessage, FilterVerdict, ModerationDecision, ModerationOutcome, ModerationRequest,
    ModerationVerdict, PipelineResult,
};
use crate::utils::truncate_text;
use chrono::Utc;
use metrics::{counter, histogram};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Client HTTP vers les services du pipeline
#[derive(Debug)]
pub struct PipelineClient {
    config: PipelineConfig,
    client: reqwest::Client,
}

impl PipelineClient {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ModerationError::configuration_error(format!("Client HTTP pipeline: {}", e))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn endpoint(&self, base: &Url, path: &str) -> Url {
        let mut url = base.clone();
        url.set_path(path);
        url
    }

    /// Appelle le filtre léger. Deadline courte; toute erreur synthétise
    /// un verdict `pass` pour que le LLM garde le dernier mot.
    pub async fn send_to_filter(&self, message: &ChatMessage) -> FilterVerdict {
        let url = self.endpoint(&self.config.filter_endpoint, "/filter");

        let outcome = self
            .client
            .post(url)
            .timeout(self.config.filter_timeout)
            .json(message)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match outcome {
            Ok(response) => match response.json::<FilterVerdict>().await {
                Ok(verdict) => {
                    counter!("chat_filter_requests_total", "status" => "success").increment(1);
                    verdict
                }
                Err(e) => {
                    counter!("chat_filter_requests_total", "status" => "error").increment(1);
                    tracing::warn!(error = %e, "⚠️ Verdict du filtre illisible, fail-open");
                    FilterVerdict::synthesized_pass()
                }
            },
            Err(e) => {
                counter!("chat_filter_requests_total", "status" => "error").increment(1);
                tracing::warn!(error = %e, "⚠️ Filtre injoignable, fail-open");
                FilterVerdict::synthesized_pass()
            }
        }
    }

    /// Appelle le serveur MCP. Tout échec devient un verdict Error en
    /// bande, jamais une erreur propagée.
    pub async fn send_to_mcp(&self, message: &ChatMessage) -> ModerationVerdict {
        let url = self.endpoint(&self.config.mcp_endpoint, "/moderate");

        let request = ModerationRequest {
            message: message.message.clone(),
            user_id: message.user_id.clone(),
            channel_id: message.channel_id.clone(),
            timestamp: message.timestamp,
            template_name: crate::models::default_template_name(),
            metadata: message.metadata.clone(),
        };

        let outcome = self.client.post(url).json(&request).send().await;

        let verdict = match outcome {
            Ok(response) if response.status().is_success() => {
                match response.json::<ModerationVerdict>().await {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        tracing::error!(error = %e, "❌ Verdict MCP illisible");
                        ModerationVerdict::error(format!("Invalid MCP response: {}", e), 0.0)
                    }
                }
            }
            Ok(response) => {
                let status = response.status();
                tracing::error!(status = %status, "❌ Erreur HTTP du MCP");
                ModerationVerdict::error(format!("HTTP error: {}", status.as_u16()), 0.0)
            }
            Err(e) if e.is_timeout() => {
                tracing::error!(error = %e, "❌ Timeout MCP");
                ModerationVerdict::error(format!("Request timeout: {}", e), 0.0)
            }
            Err(e) => {
                tracing::error!(error = %e, "❌ Requête MCP échouée");
                ModerationVerdict::error(e.to_string(), 0.0)
            }
        };

        let status = if verdict.decision == ModerationOutcome::Error {
            "error"
        } else {
            "success"
        };
        counter!("chat_moderation_requests_total", "status" => status).increment(1);

        verdict
    }

    /// Transfère un verdict non-Error au moteur de décision (tâche de
    /// fond, sévérité par défaut). Un verdict Error n'est jamais
    /// transféré et ne peut donc pas persister de violation.
    pub fn forward_decision(self: &Arc<Self>, message: &ChatMessage, verdict: &ModerationVerdict) {
        let Some(decision_endpoint) = self.config.decision_endpoint.clone() else {
            return;
        };
        if verdict.decision == ModerationOutcome::Error {
            return;
        }

        let decision = ModerationDecision {
            user_id: message.user_id.clone(),
            channel_id: message.channel_id.clone(),
            message_id: None,
            decision: verdict.decision.to_string(),
            confidence: verdict.confidence,
            reasoning: Some(verdict.reasoning.clone()),
            severity: Default::default(),
            metadata: message.metadata.clone(),
        };

        let client = Arc::clone(self);
        tokio::spawn(async move {
            let url = client.endpoint(&decision_endpoint, "/process");
            if let Err(e) = client
                .client
                .post(url)
                .json(&decision)
                .send()
                .await
                .and_then(|response| response.error_for_status())
            {
                tracing::warn!(error = %e, user_id = %decision.user_id, "⚠️ Transfert de décision échoué");
            }
        });
    }
}

/// Fait traverser le pipeline complet à un message et construit
/// l'enregistrement diffusé aux abonnés
pub async fn process_message(
    pipeline: &Arc<PipelineClient>,
    message: ChatMessage,
) -> PipelineResult {
    let started = Instant::now();

    // Étape 1: filtre léger
    let filter_result = pipeline.send_to_filter(&message).await;

    // Étape 2: modération LLM, seulement si le filtre laisse passer
    let moderation_result = if filter_result.should_process {
        let verdict = pipeline.send_to_mcp(&message).await;
        pipeline.forward_decision(&message, &verdict);
        Some(verdict)
    } else {
        None
    };

    let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    histogram!("chat_message_processing_seconds").record(processing_time_ms / 1000.0);

    let decision_label = moderation_result
        .as_ref()
        .map(|verdict| verdict.decision.to_string())
        .unwrap_or_else(|| "filtered".to_string());
    counter!(
        "chat_messages_total",
        "message_type" => message.message_type.to_string(),
        "decision" => decision_label.clone(),
    )
    .increment(1);

    tracing::info!(
        username = %message.username,
        message = %truncate_text(&message.message, 50),
        decision = %decision_label,
        processing_time_ms = processing_time_ms,
        "💬 Message traité par le pipeline"
    );

    PipelineResult {
        kind: "chat_message".to_string(),
        message,
        filter_result,
        moderation_result,
        processing_time_ms,
        timestamp: Utc::now(),
    }
}

/// Sérialise un résultat de pipeline pour la diffusion WebSocket
pub fn broadcast_payload(result: &PipelineResult) -> serde_json::Value {
    json!(result)
}
