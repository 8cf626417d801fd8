//! Rate limiting par utilisateur en fenêtre glissante
//!
//! Chaque utilisateur possède un bucket de timestamps borné à la fenêtre.
//! Le bucket est purgé des entrées expirées avant chaque insertion; la
//! soumission courante est comptée même lorsqu'elle est rejetée.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct UserBucket {
    messages: Vec<Instant>,
    last_activity: Instant,
}

impl UserBucket {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// Purge les timestamps sortis de la fenêtre puis enregistre la
    /// soumission courante. Retourne true si la limite est dépassée.
    fn record_and_check(&mut self, limit: usize, window: Duration) -> bool {
        let cutoff = Instant::now() - window;
        self.messages.retain(|&timestamp| timestamp > cutoff);
        self.messages.push(Instant::now());
        self.last_activity = Instant::now();

        self.messages.len() > limit
    }
}

/// Filtre de rate limiting, un bucket par `user_id`
#[derive(Debug)]
pub struct RateLimitFilter {
    buckets: DashMap<String, UserBucket>,
    window: Duration,
    max_messages: usize,
}

impl RateLimitFilter {
    pub fn new(window: Duration, max_messages: usize) -> Self {
        Self {
            buckets: DashMap::new(),
            window,
            max_messages,
        }
    }

    /// true si l'utilisateur dépasse la limite pour la fenêtre courante
    pub fn is_rate_limited(&self, user_id: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(user_id.to_string())
            .or_insert_with(UserBucket::new);

        bucket.record_and_check(self.max_messages, self.window)
    }

    /// Nombre d'utilisateurs avec un bucket actif
    pub fn active_users(&self) -> usize {
        self.buckets.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Supprime les buckets inactifs depuis plus de `max_idle`
    pub fn cleanup_old_buckets(&self, max_idle: Duration) {
        let cutoff = Instant::now() - max_idle;
        self.buckets.retain(|_, bucket| bucket.last_activity > cutoff);

        tracing::debug!(
            active_buckets = self.buckets.len(),
            "🧹 Nettoyage des buckets de rate limiting"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_limit_is_not_limited() {
        let filter = RateLimitFilter::new(Duration::from_secs(60), 10);
        for _ in 0..10 {
            assert!(!filter.is_rate_limited("user_0001"));
        }
    }

    #[test]
    fn test_eleventh_message_in_window_is_limited() {
        let filter = RateLimitFilter::new(Duration::from_secs(60), 10);
        for _ in 0..10 {
            filter.is_rate_limited("user_0001");
        }
        assert!(filter.is_rate_limited("user_0001"));
    }

    #[test]
    fn test_users_are_independent() {
        let filter = RateLimitFilter::new(Duration::from_secs(60), 2);
        assert!(!filter.is_rate_limited("user_a"));
        assert!(!filter.is_rate_limited("user_a"));
        assert!(filter.is_rate_limited("user_a"));
        assert!(!filter.is_rate_limited("user_b"));
    }

    #[test]
    fn test_window_expiry_frees_capacity() {
        let filter = RateLimitFilter::new(Duration::from_millis(50), 2);
        filter.is_rate_limited("user_a");
        filter.is_rate_limited("user_a");
        assert!(filter.is_rate_limited("user_a"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(!filter.is_rate_limited("user_a"));
    }

    #[test]
    fn test_cleanup_drops_idle_buckets() {
        let filter = RateLimitFilter::new(Duration::from_secs(60), 10);
        filter.is_rate_limited("user_a");
        assert_eq!(filter.active_users(), 1);

        std::thread::sleep(Duration::from_millis(20));
        filter.cleanup_old_buckets(Duration::from_millis(5));
        assert_eq!(filter.active_users(), 0);
    }
}
