//! Server network layer handling WebSocket connections and event dispatch

use crate::error::ServerError;
use crate::game::{GameController, GameState};
use crate::hub::{ConnectionHub, EventSender};
use crate::registry::ConnectionId;
use futures_util::{SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        connection: ConnectionId,
        addr: SocketAddr,
        sender: EventSender,
    },
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Main server coordinating connections and the game controller
///
/// Connection tasks only decode and encode frames. Every decoded event is
/// funnelled into one loop that owns the controller, so requests are
/// applied strictly one after another.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    controller: GameController,
    hub: ConnectionHub,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            controller: GameController::new(GameState::new()),
            hub: ConnectionHub::new(),
            server_tx,
            server_rx,
        })
    }

    /// Address actually bound, useful when binding to port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts sockets and hands out connection ids
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_connection: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let connection = next_connection;
                        next_connection += 1;

                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, connection, server_tx.clone()).await
                            {
                                warn!("Client {} ({}) ended with error: {}", connection, addr, e);
                            }
                            let _ = server_tx.send(ServerMessage::Disconnected { connection });
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected {
                connection,
                addr,
                sender,
            } => {
                info!("Client {} connected from {}", connection, addr);
                self.hub.attach(connection, sender);
            }
            ServerMessage::Event { connection, event } => {
                debug!("Client {} sent {:?}", connection, event);
                self.controller.handle(connection, event, &self.hub);
            }
            ServerMessage::Disconnected { connection } => {
                info!("Client {} disconnected", connection);
                self.hub.detach(connection);
                self.controller.disconnect(connection);
            }
        }
    }

    /// Main server loop applying client events in arrival order
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            self.handle_message(message);
        }

        Ok(())
    }
}

/// Runs one WebSocket connection until the peer goes away
///
/// The reader half decodes frames and forwards them to the main loop; a
/// writer task drains the connection's outbound queue.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    if server_tx
        .send(ServerMessage::Connected {
            connection,
            addr,
            sender: tx,
        })
        .is_err()
    {
        return Ok(());
    }

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode '{}': {}", event.name(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let result = read_frames(&mut stream, connection, &server_tx).await;
    writer.abort();
    result
}

async fn read_frames<S>(
    stream: &mut S,
    connection: ConnectionId,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ServerError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => match ClientEvent::from_json(&text) {
                Ok(event) => {
                    if server_tx
                        .send(ServerMessage::Event { connection, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!("Malformed message from client {}: {}", connection, e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{RegisterClient, SubmitInfo};

    async fn test_server() -> Server {
        Server::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let server = test_server().await;
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let result = Server::bind("127.0.0.1:99999").await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_messages_flow_through_controller() {
        let mut server = test_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let addr = server.local_addr();

        server.handle_message(ServerMessage::Connected {
            connection: 1,
            addr,
            sender: tx,
        });
        server.handle_message(ServerMessage::Event {
            connection: 1,
            event: ClientEvent::RegisterClient(RegisterClient {
                kind: "mobile".to_string(),
            }),
        });
        server.handle_message(ServerMessage::Event {
            connection: 1,
            event: ClientEvent::SubmitInfo(SubmitInfo {
                name: "Alice".to_string(),
                supplier1: "A".to_string(),
                ..Default::default()
            }),
        });

        match rx.try_recv().unwrap() {
            ServerEvent::NewBalloons(balloons) => assert_eq!(balloons.len(), 1),
            other => panic!("Unexpected event: {:?}", other),
        }
        assert_eq!(server.hub.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up_hub_and_registry() {
        let mut server = test_server().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let addr = server.local_addr();

        server.handle_message(ServerMessage::Connected {
            connection: 9,
            addr,
            sender: tx,
        });
        server.handle_message(ServerMessage::Event {
            connection: 9,
            event: ClientEvent::RegisterClient(RegisterClient {
                kind: "screen".to_string(),
            }),
        });
        server.handle_message(ServerMessage::Disconnected { connection: 9 });

        assert!(server.hub.is_empty());
        assert!(server.controller.state().registry.is_empty());
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        assert!(tx
            .send(ServerMessage::Event {
                connection: 3,
                event: ClientEvent::StartGame,
            })
            .is_ok());

        match rx.try_recv().unwrap() {
            ServerMessage::Event { connection, event } => {
                assert_eq!(connection, 3);
                assert_eq!(event, ClientEvent::StartGame);
            }
            other => panic!("Unexpected message type: {:?}", other),
        }
    }
}
