use crate::hub::ConnectionHub;
use crate::registry::{ConnectionId, ConnectionRegistry, Role, UserProfile};
use crate::store::{BalloonStore, Resolution};
use log::{debug, info, warn};
use shared::{
    BalloonHit, BalloonId, ClientEvent, HitDetails, ServerEvent, ShootDart, ShotOutcome,
    SubmitInfo, TargetId, SHOTS_PER_DART,
};
use thiserror::Error;

/// Round progress, tracked for logging only
///
/// No operation is refused because of the phase: phones may submit and
/// shoot at any time, exactly like the screen may start twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("name is empty")]
    EmptyName,
    #[error("no supplier given")]
    NoSuppliers,
}

/// Trimmed, validated contents of a `submitInfo` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub suppliers: Vec<String>,
}

impl Submission {
    /// Requires a non-blank name and at least one non-blank supplier.
    /// Blank suppliers are dropped.
    pub fn validate(info: &SubmitInfo) -> Result<Self, SubmitError> {
        let name = info.name.trim();
        if name.is_empty() {
            return Err(SubmitError::EmptyName);
        }

        let suppliers: Vec<String> = info
            .suppliers()
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if suppliers.is_empty() {
            return Err(SubmitError::NoSuppliers);
        }

        Ok(Self {
            name: name.to_string(),
            suppliers,
        })
    }
}

/// All mutable state of one game instance
#[derive(Debug)]
pub struct GameState {
    pub registry: ConnectionRegistry,
    pub balloons: BalloonStore,
    pub phase: Phase,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            balloons: BalloonStore::new(),
            phase: Phase::Idle,
        }
    }
}

/// Validates and applies client requests against one `GameState`
///
/// Every handler runs to completion before the next request is looked at;
/// the network loop owns the controller, so no locking is involved.
#[derive(Debug, Default)]
pub struct GameController {
    state: GameState,
}

impl GameController {
    pub fn new(state: GameState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Routes a decoded client event to its handler
    pub fn handle(&mut self, connection: ConnectionId, event: ClientEvent, hub: &ConnectionHub) {
        match event {
            ClientEvent::RegisterClient(register) => {
                self.state.registry.register(connection, &register.kind);
            }
            ClientEvent::SubmitInfo(info) => {
                if let Err(e) = self.submit(connection, &info, hub) {
                    debug!("No balloons created for client {}: {}", connection, e);
                }
            }
            ClientEvent::StartGame => self.start(connection, hub),
            ClientEvent::ShootDart(dart) => self.shoot(connection, dart, hub),
            ClientEvent::ResetGame => self.reset(connection, hub),
            ClientEvent::GetResultsData => self.send_results(connection, hub),
        }
    }

    /// Creates one balloon per supplier and announces them to everyone
    ///
    /// Returns the ids of the new balloons. The submitter's name is stored
    /// but not broadcast until a balloon is hit.
    pub fn submit(
        &mut self,
        connection: ConnectionId,
        info: &SubmitInfo,
        hub: &ConnectionHub,
    ) -> Result<Vec<BalloonId>, SubmitError> {
        let submission = Submission::validate(info).map_err(|e| {
            warn!("Rejected submission from client {}: {}", connection, e);
            e
        })?;

        self.state.registry.attach_profile(
            connection,
            UserProfile {
                display_name: submission.name.clone(),
            },
        );

        let created: Vec<_> = submission
            .suppliers
            .iter()
            .map(|supplier| self.state.balloons.create(supplier, &submission.name))
            .collect();

        info!(
            "Client {} submitted as {}: {} balloon(s)",
            connection,
            submission.name,
            created.len()
        );
        debug!("Balloons: {:?}", self.state.balloons.snapshot());

        if self.state.phase == Phase::Idle {
            self.transition(Phase::Collecting);
        }

        hub.publish(ServerEvent::NewBalloons(
            created.iter().map(|balloon| balloon.public_info()).collect(),
        ));

        Ok(created.iter().map(|balloon| balloon.id).collect())
    }

    /// Tells every client the shooting round has begun
    pub fn start(&mut self, connection: ConnectionId, hub: &ConnectionHub) {
        info!("Client {} started the game", connection);
        self.transition(Phase::Started);
        hub.publish(ServerEvent::StartGame);
    }

    /// Throws a dart at two balloons
    ///
    /// Each target is resolved on its own. The shooter always gets one
    /// `shotResult` reply with both outcomes; every new hit is also
    /// announced to everyone as `balloonHit`. Identical targets are not
    /// rejected: the second shot simply finds the balloon already hit.
    pub fn shoot(&mut self, connection: ConnectionId, dart: ShootDart, hub: &ConnectionHub) {
        let Some(shooter) = self
            .state
            .registry
            .profile(connection)
            .map(|profile| profile.display_name.clone())
        else {
            warn!("Shot from unidentified client {}", connection);
            hub.reply(
                connection,
                ServerEvent::ShotResult([
                    ShotOutcome::failure(1, UNIDENTIFIED_ACTOR),
                    ShotOutcome::failure(2, UNIDENTIFIED_ACTOR),
                ]),
            );
            return;
        };

        info!(
            "{} (client {}) shot at balloons {} and {}",
            shooter, connection, dart.target_balloon_id1, dart.target_balloon_id2
        );

        let targets = dart.targets();
        let outcomes: [ShotOutcome; SHOTS_PER_DART] = std::array::from_fn(|index| {
            self.resolve_shot(index as u8 + 1, targets[index], &shooter, hub)
        });

        hub.reply(connection, ServerEvent::ShotResult(outcomes));
    }

    fn resolve_shot(
        &mut self,
        shot: u8,
        target: TargetId,
        shooter: &str,
        hub: &ConnectionHub,
    ) -> ShotOutcome {
        match self.state.balloons.resolve(target, shooter) {
            Resolution::Hit(balloon) => {
                info!("Balloon {} hit by {}", balloon.id, shooter);
                hub.publish(ServerEvent::BalloonHit(BalloonHit {
                    balloon_id: balloon.id,
                    supplier: balloon.supplier.clone(),
                    submitter_name: balloon.submitted_by.clone(),
                    shooter_name: shooter.to_string(),
                }));

                ShotOutcome {
                    shot,
                    success: true,
                    message: format!(
                        "Hit balloon {} ({})! Submitted by {}",
                        balloon.id, balloon.supplier, balloon.submitted_by
                    ),
                    details: Some(HitDetails {
                        balloon_id: balloon.id,
                        supplier: balloon.supplier,
                        submitted_by: balloon.submitted_by,
                    }),
                }
            }
            Resolution::AlreadyHit { by } => {
                debug!("Balloon {} already hit by {}", target, by);
                ShotOutcome::failure(shot, format!("Balloon {} was already hit by {}", target, by))
            }
            Resolution::NotFound => {
                debug!("Balloon {} not found", target);
                ShotOutcome::failure(shot, format!("Balloon {} not found", target))
            }
        }
    }

    /// Clears balloons and every registration, then tells all clients
    ///
    /// Only a connection registered as a screen may reset. Anyone else is
    /// logged and ignored without a reply.
    pub fn reset(&mut self, connection: ConnectionId, hub: &ConnectionHub) {
        if self.state.registry.lookup(connection) != Some(Role::Display) {
            warn!(
                "Ignoring reset from client {}: not registered as screen",
                connection
            );
            return;
        }

        info!("Client {} reset the game", connection);
        self.state.balloons.clear();
        self.state.registry.clear();
        self.transition(Phase::Idle);
        hub.publish(ServerEvent::GameReset);
    }

    /// Replies with the full balloon table
    pub fn send_results(&self, connection: ConnectionId, hub: &ConnectionHub) {
        hub.reply(
            connection,
            ServerEvent::ResultsData(self.state.balloons.snapshot()),
        );
    }

    /// Forgets a closed connection. Its balloons stay in play.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        if self.state.registry.remove(connection) {
            debug!("Dropped registry entry for client {}", connection);
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.state.phase != next {
            info!("Phase {:?} -> {:?}", self.state.phase, next);
            self.state.phase = next;
        }
    }
}

const UNIDENTIFIED_ACTOR: &str = "Unidentified actor: submit your info first";
