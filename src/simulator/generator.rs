//! Générateur de messages de chat synthétiques
//!
//! Échantillonnage pondéré sur des pools étiquetés (normal, toxique,
//! spam, PII) avec un vivier d'une vingtaine d'identités simulées. Les
//! pools peuvent être chargés depuis un fichier JSON; un jeu embarqué
//! sert de repli.

use crate::models::{ChatMessage, MessageType};
use chrono::Utc;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::str::FromStr;

/// Catégories de messages générables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Toxic,
    Spam,
    Pii,
}

impl MessageKind {
    pub const ALL: [MessageKind; 4] = [Self::Normal, Self::Toxic, Self::Spam, Self::Pii];

    /// Distribution par défaut: 70% normal, 15% toxique, 10% spam, 5% PII
    pub const WEIGHTS: [u32; 4] = [70, 15, 10, 5];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Toxic => "toxic",
            Self::Spam => "spam",
            Self::Pii => "pii",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "normal" => Ok(Self::Normal),
            "toxic" => Ok(Self::Toxic),
            "spam" => Ok(Self::Spam),
            "pii" => Ok(Self::Pii),
            other => Err(format!("type de message inconnu: {}", other)),
        }
    }
}

/// Pools de messages étiquetés
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePools {
    pub normal: Vec<String>,
    pub toxic: Vec<String>,
    pub spam: Vec<String>,
    pub pii: Vec<String>,
}

impl MessagePools {
    fn all_non_empty(&self) -> bool {
        !self.normal.is_empty()
            && !self.toxic.is_empty()
            && !self.spam.is_empty()
            && !self.pii.is_empty()
    }

    fn pool(&self, kind: MessageKind) -> &[String] {
        match kind {
            MessageKind::Normal => &self.normal,
            MessageKind::Toxic => &self.toxic,
            MessageKind::Spam => &self.spam,
            MessageKind::Pii => &self.pii,
        }
    }
}

/// Identité simulée avec étiquettes de réputation et d'activité
#[derive(Debug, Clone)]
pub struct SimUser {
    pub user_id: String,
    pub username: String,
    pub reputation: &'static str,
    pub activity_level: &'static str,
}

/// Suffixes décoratifs ajoutés à ~30% des messages générés
const VARIATIONS: &[&str] = &["!", "?", " 😊", " 👍", " 🔥", " ❤️", " 🎮", " 💯"];

const USERNAMES: &[&str] = &[
    "GamerPro123", "ChatMaster", "StreamFan", "TechGuru", "RandomUser",
    "NightOwl", "CoffeeAddict", "BookWorm", "MusicLover", "Traveler",
    "Foodie", "Artist", "Developer", "Student", "Teacher",
    "SportsFan", "MovieBuff", "Photographer", "Chef", "Musician",
];

const REPUTATIONS: &[&str] = &["new", "regular", "trusted", "moderator"];
const ACTIVITY_LEVELS: &[&str] = &["low", "medium", "high"];

/// Générateur pondéré de messages de chat
pub struct MessageGenerator {
    pools: MessagePools,
    users: Vec<SimUser>,
    channels: Vec<String>,
}

impl MessageGenerator {
    /// Charge les pools depuis un fichier JSON, repli sur le jeu embarqué
    pub fn load(sample_path: impl AsRef<Path>) -> Self {
        let path = sample_path.as_ref();
        let pools = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<MessagePools>(&raw) {
                Ok(pools) if pools.all_non_empty() => {
                    tracing::info!(path = %path.display(), "✅ Pools de messages chargés");
                    pools
                }
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "⚠️ Pool de messages vide, jeu embarqué");
                    Self::default_pools()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "⚠️ Pools illisibles, jeu embarqué");
                    Self::default_pools()
                }
            },
            Err(_) => {
                tracing::warn!(path = %path.display(), "⚠️ Pools introuvables, jeu embarqué");
                Self::default_pools()
            }
        };

        Self::from_pools(pools)
    }

    pub fn with_defaults() -> Self {
        Self::from_pools(Self::default_pools())
    }

    fn from_pools(pools: MessagePools) -> Self {
        let mut rng = rand::thread_rng();
        let users = USERNAMES
            .iter()
            .enumerate()
            .map(|(i, username)| SimUser {
                user_id: format!("user_{:04}", i),
                username: username.to_string(),
                reputation: REPUTATIONS.choose(&mut rng).copied().unwrap_or("regular"),
                activity_level: ACTIVITY_LEVELS.choose(&mut rng).copied().unwrap_or("medium"),
            })
            .collect();

        let channels = ["general", "gaming", "tech-talk", "random", "support"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        Self { pools, users, channels }
    }

    fn default_pools() -> MessagePools {
        MessagePools {
            normal: [
                "Hey everyone! How's it going?",
                "Just finished a great game session",
                "Anyone know about the new update?",
                "Thanks for the help earlier!",
                "Good morning chat!",
                "What's everyone up to today?",
                "That was an amazing stream!",
                "Can someone help me with this issue?",
                "Love this community ❤️",
                "See you all later!",
                "Great discussion today!",
                "Looking forward to the next event",
                "This feature is really useful",
                "Thanks for sharing that link",
                "Hope everyone has a good day!",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            toxic: [
                "You're absolutely terrible at this game",
                "This is the worst stream ever",
                "Nobody cares about your opinion",
                "Stop being such a noob",
                "This chat is full of idiots",
                "You should just quit playing",
                "What a waste of time this is",
                "Everyone here is so stupid",
                "This content is garbage",
                "You're all pathetic losers",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            spam: [
                "🎉 FREE MONEY HERE: bit.ly/fake-link 🎉",
                "CLICK HERE FOR AMAZING DEALS!!!",
                "💰💰💰 CRYPTO INVESTMENT OPPORTUNITY 💰💰💰",
                "Follow my channel for exclusive content!",
                "BUY MY COURSE FOR ONLY $99.99",
                "🚀 MAKE $1000 A DAY FROM HOME 🚀",
                "LIMITED TIME OFFER - ACT NOW!!!",
                "FREE GIFT CARDS - CLICK HERE NOW",
                "EARN MONEY FAST WITH THIS TRICK",
                "SUBSCRIBE TO MY CHANNEL FOR PRIZES",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            pii: [
                "My email is john.doe@email.com if you want to contact me",
                "Call me at 555-123-4567",
                "I live at 123 Main Street, Anytown USA",
                "My credit card number is 4532-1234-5678-9012",
                "You can reach me at jane.smith@company.com",
                "My phone is (555) 987-6543",
                "I'm at 456 Oak Avenue, Springfield",
                "My SSN is 123-45-6789 for verification",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Génère un message aléatoire, de catégorie imposée ou tirée selon
    /// la distribution par défaut
    pub fn generate(&self, kind: Option<MessageKind>) -> ChatMessage {
        let mut rng = rand::thread_rng();

        let kind = kind.unwrap_or_else(|| {
            let dist =
                WeightedIndex::new(MessageKind::WEIGHTS).expect("poids de génération valides");
            MessageKind::ALL[dist.sample(&mut rng)]
        });

        let user = self.users.choose(&mut rng).expect("vivier d'utilisateurs non vide");
        let channel = self.channels.choose(&mut rng).expect("liste de canaux non vide");
        let mut text = self
            .pools
            .pool(kind)
            .choose(&mut rng)
            .expect("pool de messages non vide")
            .clone();

        // Variation décorative occasionnelle
        if rng.gen_bool(0.3) {
            if let Some(suffix) = VARIATIONS.choose(&mut rng) {
                text.push_str(suffix);
            }
        }

        ChatMessage {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            channel_id: channel.clone(),
            message: text,
            timestamp: Utc::now(),
            message_type: MessageType::Text,
            metadata: Some(json!({
                "reputation": user.reputation,
                "activity_level": user.activity_level,
            })),
        }
    }

    pub fn user_pool_size(&self) -> usize {
        self.users.len()
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn available_kinds(&self) -> Vec<&'static str> {
        MessageKind::ALL.iter().map(|kind| kind.label()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_kind_draws_from_that_pool() {
        let generator = MessageGenerator::with_defaults();
        let message = generator.generate(Some(MessageKind::Pii));

        // Chaque entrée du pool PII contient une donnée personnelle
        assert!(
            message.message.contains('@')
                || message.message.contains("555")
                || message.message.contains("4532")
                || message.message.contains("123-45-6789")
                || message.message.contains("Street")
                || message.message.contains("Avenue")
        );
    }

    #[test]
    fn test_generated_message_has_identity_and_metadata() {
        let generator = MessageGenerator::with_defaults();
        let message = generator.generate(None);

        assert!(message.user_id.starts_with("user_"));
        assert!(!message.username.is_empty());
        assert!(generator.channels().contains(&message.channel_id));

        let metadata = message.metadata.unwrap();
        assert!(metadata.get("reputation").is_some());
        assert!(metadata.get("activity_level").is_some());
    }

    #[test]
    fn test_user_pool_has_twenty_identities() {
        let generator = MessageGenerator::with_defaults();
        assert_eq!(generator.user_pool_size(), 20);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("toxic".parse::<MessageKind>().unwrap(), MessageKind::Toxic);
        assert!("unknown".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_weighted_distribution_covers_all_kinds() {
        let generator = MessageGenerator::with_defaults();
        // Sur un échantillon large, la catégorie majoritaire doit être
        // le trafic normal
        let mut normal = 0;
        for _ in 0..500 {
            let message = generator.generate(None);
            let is_toxicish = message.message.contains("worst")
                || message.message.contains("FREE")
                || message.message.contains('@');
            if !is_toxicish {
                normal += 1;
            }
        }
        assert!(normal > 200);
    }
}
