//! Client LLM agnostique du backend
//!
//! Parle à un endpoint compatible OpenAI `/v1/chat/completions`. La mise
//! en forme des messages et les paramètres d'échantillonnage dépendent de
//! la famille de modèle, dérivée du nom configuré par cascade de
//! sous-chaînes exposée comme table de données.

use crate::config::LlmConfig;
use crate::error::{ModerationError, Result};
use metrics::histogram;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Consigne système commune à toutes les familles
const SYSTEM_MESSAGE: &str =
    "You are a content moderation assistant. Respond only in the requested JSON format.";

/// Familles de modèles supportées
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Mistral,
    Deepseek,
    Llama,
    Qwen,
    Default,
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mistral => write!(f, "mistral"),
            Self::Deepseek => write!(f, "deepseek"),
            Self::Llama => write!(f, "llama"),
            Self::Qwen => write!(f, "qwen"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Cascade de détection: première sous-chaîne trouvée gagne. Table de
/// données plutôt que code pour rester extensible.
pub const MODEL_FAMILY_TABLE: &[(&str, ModelFamily)] = &[
    ("mistral", ModelFamily::Mistral),
    ("deepseek", ModelFamily::Deepseek),
    ("llama", ModelFamily::Llama),
    ("qwen", ModelFamily::Qwen),
];

/// Dérive la famille depuis le nom du modèle ou le basename de son chemin
pub fn detect_model_family(model_name: &str) -> ModelFamily {
    let lowered = model_name.to_lowercase();
    let basename = lowered.rsplit('/').next().unwrap_or(&lowered);

    for (needle, family) in MODEL_FAMILY_TABLE {
        if lowered.contains(needle) || basename.contains(needle) {
            return *family;
        }
    }

    tracing::warn!(model = %model_name, "⚠️ Famille de modèle inconnue, format par défaut");
    ModelFamily::Default
}

/// Prépare les tours de conversation selon la famille
pub fn prepare_messages(family: ModelFamily, prompt: &str) -> Vec<Value> {
    match family {
        // Mistral n'accepte pas de tour system: la consigne est repliée
        // dans une enveloppe d'instruction du tour user
        ModelFamily::Mistral => {
            let combined = format!("<s>[INST] {}\n\n{} [/INST]", SYSTEM_MESSAGE, prompt);
            vec![json!({ "role": "user", "content": combined })]
        }

        ModelFamily::Deepseek | ModelFamily::Llama | ModelFamily::Qwen | ModelFamily::Default => {
            vec![
                json!({ "role": "system", "content": SYSTEM_MESSAGE }),
                json!({ "role": "user", "content": prompt }),
            ]
        }
    }
}

/// Paramètres d'échantillonnage selon la famille
pub fn sampling_params(family: ModelFamily) -> Value {
    match family {
        ModelFamily::Mistral => json!({
            "temperature": 0.1,
            "max_tokens": 500,
            "top_p": 0.9,
        }),
        ModelFamily::Deepseek => json!({
            "temperature": 0.1,
            "max_tokens": 500,
            "top_p": 0.95,
        }),
        _ => json!({
            "temperature": 0.1,
            "max_tokens": 500,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Réponse brute du backend
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub duration: Duration,
}

/// Client HTTP vers le backend LLM, avec retries et backoff exponentiel
#[derive(Debug)]
pub struct LlmClient {
    config: LlmConfig,
    family: ModelFamily,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let family = detect_model_family(&config.model);
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ModerationError::configuration_error(format!("Client HTTP LLM: {}", e))
            })?;

        tracing::info!(
            model = %config.model,
            family = %family,
            endpoint = %config.endpoint,
            "🤖 Client LLM initialisé"
        );

        Ok(Self { config, family, client })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Envoie le prompt au backend. Chaque tentative a sa propre
    /// deadline; l'attente entre tentatives double à chaque échec.
    pub async fn generate(&self, prompt: &str) -> Result<LlmReply> {
        let started = Instant::now();
        let messages = prepare_messages(self.family, prompt);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
        });
        let params = sampling_params(self.family);
        if let (Some(base), Some(params)) = (payload.as_object_mut(), params.as_object()) {
            for (key, value) in params {
                base.insert(key.clone(), value.clone());
            }
        }

        tracing::debug!(
            model = %self.config.model,
            family = %self.family,
            "📤 Requête envoyée au backend LLM"
        );

        let mut last_error = String::new();
        for attempt in 0..self.config.max_retries {
            match self.send_once(&payload).await {
                Ok(content) => {
                    let duration = started.elapsed();
                    histogram!("llm_response_time_seconds").record(duration.as_secs_f64());

                    tracing::info!(
                        family = %self.family,
                        duration_s = duration.as_secs_f64(),
                        "🤖 Réponse LLM reçue"
                    );
                    return Ok(LlmReply { content, duration });
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        error = %last_error,
                        "⚠️ Tentative LLM échouée"
                    );

                    if attempt + 1 < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    }
                }
            }
        }

        Err(ModerationError::backend_unavailable(
            "llm",
            format!("LLM service unavailable: {}", last_error),
        ))
    }

    async fn send_once(&self, payload: &Value) -> Result<String> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| ModerationError::upstream("llm", e))?
            .error_for_status()
            .map_err(|e| ModerationError::upstream("llm", e))?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::upstream("llm", e))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ModerationError::ParseError {
                reason: "réponse LLM sans choix".to_string(),
            })
    }
}
