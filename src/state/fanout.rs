//! Per-match broadcast hubs used for the best-effort real-time fan-out.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Registry of live fan-out channels keyed by match code.
///
/// Membership is ephemeral and per-process: channels are created on demand
/// and dropped when a match reaches a terminal status. The durable record
/// is always the source of truth; nothing here survives a restart.
pub struct FanOutRegistry {
    channels: DashMap<String, Arc<MatchChannel>>,
    capacity: usize,
}

impl FanOutRegistry {
    /// Build the registry with a per-channel broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Get or create the channel for a match.
    pub fn channel(&self, code: &str) -> Arc<MatchChannel> {
        self.channels
            .entry(code.to_owned())
            .or_insert_with(|| Arc::new(MatchChannel::new(self.capacity)))
            .clone()
    }

    /// Look up the channel for a match without creating it.
    pub fn get(&self, code: &str) -> Option<Arc<MatchChannel>> {
        self.channels.get(code).map(|entry| entry.clone())
    }

    /// Drop the channel once the match is terminal. Existing subscribers
    /// keep their receivers until they disconnect.
    pub fn remove(&self, code: &str) {
        self.channels.remove(code);
    }
}

/// Broadcast hub plus connected-participant roster for one match.
pub struct MatchChannel {
    sender: broadcast::Sender<ServerEvent>,
    // Connection counts per participant; one participant may hold several
    // streams (multiple tabs).
    presence: DashMap<Uuid, usize>,
}

impl MatchChannel {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            presence: DashMap::new(),
        }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    /// Fan-out is best-effort by contract; a lagging or absent subscriber
    /// never affects the caller.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Record a participant connection and return the updated roster.
    pub fn join(&self, participant: Uuid) -> Vec<Uuid> {
        *self.presence.entry(participant).or_insert(0) += 1;
        self.roster()
    }

    /// Record a participant disconnection and return the updated roster.
    pub fn leave(&self, participant: Uuid) -> Vec<Uuid> {
        if let Some(mut entry) = self.presence.get_mut(&participant) {
            *entry -= 1;
            let gone = *entry == 0;
            drop(entry);
            if gone {
                self.presence.remove_if(&participant, |_, count| *count == 0);
            }
        }
        self.roster()
    }

    /// Participants currently holding at least one live stream.
    pub fn roster(&self) -> Vec<Uuid> {
        self.presence.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_live_subscribers() {
        let registry = FanOutRegistry::new(16);
        let channel = registry.channel("abc");
        let mut receiver = channel.subscribe();

        channel.broadcast(ServerEvent {
            event: Some("chat.message".into()),
            data: "{}".into(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event.as_deref(), Some("chat.message"));
    }

    #[test]
    fn channel_is_shared_per_code() {
        let registry = FanOutRegistry::new(16);
        let first = registry.channel("abc");
        let second = registry.channel("abc");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn presence_tracks_connection_counts() {
        let registry = FanOutRegistry::new(16);
        let channel = registry.channel("abc");
        let participant = Uuid::new_v4();

        assert_eq!(channel.join(participant), vec![participant]);
        // Second tab for the same participant.
        assert_eq!(channel.join(participant), vec![participant]);
        assert_eq!(channel.leave(participant), vec![participant]);
        assert!(channel.leave(participant).is_empty());
    }
}
