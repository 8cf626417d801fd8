//! Persistance des décisions et des compteurs de violations
//!
//! Le journal `moderation_decisions` est en append seul; la table
//! `user_violations` est upsertée et ses lignes ne sont jamais
//! supprimées, seulement mises à jour. La première infraction insère
//! `violation_count = 1`, les suivantes incrémentent — comportement
//! historique conservé tel quel.

use crate::error::{ModerationError, Result};
use crate::models::{ActionType, ModerationDecision, UserViolationSnapshot};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Accès aux tables du moteur de décision
#[derive(Debug, Clone)]
pub struct DecisionStore {
    pool: PgPool,
}

impl DecisionStore {
    /// Ouvre le pool et crée le schéma si nécessaire
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| ModerationError::from_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.create_tables().await?;

        tracing::info!("✅ Base de données initialisée");
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_decisions (
                id SERIAL PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                channel_id VARCHAR(255) NOT NULL,
                message_id VARCHAR(255),
                decision VARCHAR(100) NOT NULL,
                confidence FLOAT NOT NULL,
                reasoning TEXT,
                severity VARCHAR(50) NOT NULL,
                action_taken VARCHAR(100),
                timestamp TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                metadata JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("create_moderation_decisions", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_violations (
                id SERIAL PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL UNIQUE,
                violation_count INTEGER DEFAULT 1,
                last_violation TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                total_score FLOAT DEFAULT 0.0,
                status VARCHAR(50) DEFAULT 'active'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("create_user_violations", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_user_violations_user_id ON user_violations(user_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("create_index", e))?;

        Ok(())
    }

    /// Ajoute une ligne au journal de décisions (append seul)
    pub async fn record_decision(
        &self,
        decision: &ModerationDecision,
        action: ActionType,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_decisions
                (user_id, channel_id, message_id, decision, confidence, reasoning,
                 severity, action_taken, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&decision.user_id)
        .bind(&decision.channel_id)
        .bind(&decision.message_id)
        .bind(&decision.decision)
        .bind(decision.confidence)
        .bind(&decision.reasoning)
        .bind(decision.severity.to_string())
        .bind(action.to_string())
        .bind(decision.metadata.clone().unwrap_or(serde_json::Value::Null))
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("record_decision", e))?;

        tracing::debug!(
            user_id = %decision.user_id,
            action = %action,
            "📝 Décision enregistrée"
        );
        Ok(())
    }

    /// Upsert du compteur de violations: insert à 1, +1 et +confiance en
    /// cas de conflit, horodatage rafraîchi
    pub async fn update_user_history(&self, user_id: &str, confidence: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_violations (user_id, violation_count, total_score, last_violation)
            VALUES ($1, 1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT (user_id) DO UPDATE SET
                violation_count = user_violations.violation_count + 1,
                total_score = user_violations.total_score + $2,
                last_violation = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .bind(confidence)
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("update_user_history", e))?;

        Ok(())
    }

    /// Instantané des violations d'un utilisateur
    pub async fn get_user_history(&self, user_id: &str) -> Result<Option<UserViolationSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT violation_count, total_score, last_violation, status
            FROM user_violations
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ModerationError::from_sqlx_error("get_user_history", e))?;

        Ok(row.map(|row| UserViolationSnapshot {
            user_id: user_id.to_string(),
            violation_count: row.get("violation_count"),
            total_score: row.get("total_score"),
            last_violation: row.get("last_violation"),
            status: row.get("status"),
        }))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
