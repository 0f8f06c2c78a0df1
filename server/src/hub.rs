//! Outbound event delivery
//!
//! Every attached connection owns an unbounded queue drained by its writer
//! task. The hub offers two primitives: `publish` fans an event out to all
//! connections, `reply` sends to the one connection that asked.

use crate::registry::ConnectionId;
use log::debug;
use shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug, Default)]
pub struct ConnectionHub {
    peers: HashMap<ConnectionId, EventSender>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Starts delivering events to a connection
    pub fn attach(&mut self, connection: ConnectionId, sender: EventSender) {
        self.peers.insert(connection, sender);
    }

    /// Stops delivering events to a connection
    ///
    /// Returns false if the connection was never attached or already gone.
    pub fn detach(&mut self, connection: ConnectionId) -> bool {
        self.peers.remove(&connection).is_some()
    }

    /// Sends an event to every attached connection
    pub fn publish(&self, event: ServerEvent) {
        for (connection, sender) in &self.peers {
            if sender.send(event.clone()).is_err() {
                debug!(
                    "Dropped '{}' for client {}: writer closed",
                    event.name(),
                    connection
                );
            }
        }
    }

    /// Sends an event to a single connection
    pub fn reply(&self, connection: ConnectionId, event: ServerEvent) {
        match self.peers.get(&connection) {
            Some(sender) => {
                if let Err(e) = sender.send(event) {
                    debug!(
                        "Dropped '{}' for client {}: writer closed",
                        e.0.name(),
                        connection
                    );
                }
            }
            None => debug!(
                "No attached connection {} for '{}'",
                connection,
                event.name()
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn attach(hub: &mut ConnectionHub, connection: ConnectionId) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.attach(connection, tx);
        rx
    }

    #[test]
    fn test_publish_reaches_every_connection() {
        let mut hub = ConnectionHub::new();
        let mut rx1 = attach(&mut hub, 1);
        let mut rx2 = attach(&mut hub, 2);

        hub.publish(ServerEvent::StartGame);

        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::StartGame);
        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::StartGame);
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_reply_reaches_only_target() {
        let mut hub = ConnectionHub::new();
        let mut rx1 = attach(&mut hub, 1);
        let mut rx2 = attach(&mut hub, 2);

        hub.reply(2, ServerEvent::GameReset);

        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::GameReset);
    }

    #[test]
    fn test_reply_to_unknown_connection_is_noop() {
        let mut hub = ConnectionHub::new();
        let mut rx1 = attach(&mut hub, 1);

        hub.reply(42, ServerEvent::StartGame);

        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_detach_stops_delivery() {
        let mut hub = ConnectionHub::new();
        let mut rx1 = attach(&mut hub, 1);
        let _rx2 = attach(&mut hub, 2);

        assert!(hub.detach(1));
        assert!(!hub.detach(1));
        assert_eq!(hub.len(), 1);

        hub.publish(ServerEvent::StartGame);
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_publish_survives_closed_receiver() {
        let mut hub = ConnectionHub::new();
        let rx1 = attach(&mut hub, 1);
        let mut rx2 = attach(&mut hub, 2);
        drop(rx1);

        hub.publish(ServerEvent::GameReset);

        assert_eq!(rx2.try_recv().unwrap(), ServerEvent::GameReset);
    }
}
