//! Hub de diffusion WebSocket de l'ingress
//!
//! Les mutations de la liste de connexions sont sérialisées; la
//! diffusion lit un instantané et envoie en best-effort: un client dont
//! l'envoi échoue est retiré, la diffusion continue pour les autres.

use metrics::gauge;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Un abonné WebSocket: canal d'envoi vers sa tâche d'écriture
#[derive(Debug, Clone)]
struct Peer {
    id: Uuid,
    tx: UnboundedSender<String>,
}

/// Hub de connexions actives et drapeau de simulation
#[derive(Debug, Default)]
pub struct ChatHub {
    peers: RwLock<Vec<Peer>>,
    simulation_active: AtomicBool,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une connexion et retourne son identifiant
    pub async fn add_peer(&self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        let mut peers = self.peers.write().await;
        peers.push(Peer { id, tx });
        gauge!("chat_active_websocket_connections").set(peers.len() as f64);

        tracing::info!(peer_id = %id, total = peers.len(), "🔌 Nouvelle connexion WebSocket");
        id
    }

    /// Retire une connexion
    pub async fn remove_peer(&self, id: Uuid) {
        let mut peers = self.peers.write().await;
        peers.retain(|peer| peer.id != id);
        gauge!("chat_active_websocket_connections").set(peers.len() as f64);

        tracing::info!(peer_id = %id, total = peers.len(), "👋 Connexion WebSocket retirée");
    }

    /// Diffuse un payload JSON à tous les abonnés (best-effort)
    pub async fn broadcast(&self, payload: &Value) {
        let serialized = payload.to_string();

        let snapshot: Vec<Peer> = {
            let peers = self.peers.read().await;
            if peers.is_empty() {
                return;
            }
            peers.clone()
        };

        let mut disconnected = Vec::new();
        for peer in &snapshot {
            if peer.tx.send(serialized.clone()).is_err() {
                disconnected.push(peer.id);
            }
        }

        // Nettoyage des clients dont l'envoi a échoué
        if !disconnected.is_empty() {
            let mut peers = self.peers.write().await;
            peers.retain(|peer| !disconnected.contains(&peer.id));
            gauge!("chat_active_websocket_connections").set(peers.len() as f64);

            tracing::debug!(dropped = disconnected.len(), "🧹 Clients déconnectés retirés");
        }
    }

    pub async fn client_count(&self) -> usize {
        self.peers.read().await.len()
    }

    // ── Drapeau de simulation ──────────────────────────────────────────

    /// Tente de démarrer la simulation; false si déjà active
    pub fn try_start_simulation(&self) -> bool {
        self.simulation_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn stop_simulation(&self) {
        self.simulation_active.store(false, Ordering::SeqCst);
        tracing::info!("🛑 Simulation de chat arrêtée");
    }

    pub fn simulation_active(&self) -> bool {
        self.simulation_active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_broadcast_reaches_all_peers() {
        let hub = ChatHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.add_peer(tx1).await;
        hub.add_peer(tx2).await;

        hub.broadcast(&json!({"type": "status"})).await;

        assert!(rx1.recv().await.unwrap().contains("status"));
        assert!(rx2.recv().await.unwrap().contains("status"));
    }

    #[tokio::test]
    async fn test_failed_send_drops_only_that_peer() {
        let hub = ChatHub::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();

        hub.add_peer(tx_dead).await;
        hub.add_peer(tx_live).await;
        assert_eq!(hub.client_count().await, 2);

        hub.broadcast(&json!({"type": "chat_message"})).await;

        // Le client mort est nettoyé, le vivant a reçu le message
        assert_eq!(hub.client_count().await, 1);
        assert!(rx_live.recv().await.unwrap().contains("chat_message"));
    }

    #[tokio::test]
    async fn test_remove_peer() {
        let hub = ChatHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.add_peer(tx).await;
        assert_eq!(hub.client_count().await, 1);

        hub.remove_peer(id).await;
        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_simulation_flag_starts_once() {
        let hub = ChatHub::new();
        assert!(hub.try_start_simulation());
        assert!(!hub.try_start_simulation());

        hub.stop_simulation();
        assert!(!hub.simulation_active());
        assert!(hub.try_start_simulation());
    }
}
