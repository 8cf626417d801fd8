//! Notifications sortantes vers un webhook externe
//!
//! Les échecs de livraison sont loggés puis avalés: une notification
//! perdue ne doit jamais faire échouer l'action de modération qui l'a
//! déclenchée.

use crate::config::NotifierConfig;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Poste des enveloppes `{"text": …}` vers le webhook configuré
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<Url>,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        if config.webhook_url.is_none() {
            tracing::info!("📣 Aucun webhook de notification configuré");
        }

        Self {
            client,
            webhook_url: config.webhook_url,
        }
    }

    /// true si un webhook est configuré
    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Envoie une notification; les échecs sont non fatals
    pub async fn notify(&self, text: &str) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        let result = self
            .client
            .post(url.clone())
            .json(&json!({ "text": text }))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => tracing::debug!(text = %text, "📣 Notification envoyée"),
            Err(e) => tracing::error!(error = %e, "⚠️ Échec d'envoi de la notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_without_webhook_is_noop() {
        let notifier = Notifier::new(NotifierConfig::default());
        assert!(!notifier.is_enabled());
        // Ne doit ni paniquer ni tenter d'E/S
        notifier.notify("⚠️ test").await;
    }
}
