use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PORT: u16 = 3000;
pub const SHOTS_PER_DART: usize = 2;

/// Server-assigned identifier of a submitted balloon. Starts at 1.
pub type BalloonId = u32;

/// Balloon id as a client names it in `shootDart`. Phones send whatever
/// integer they parsed, so negative and oversized values must still decode.
pub type TargetId = i64;

/// Every frame on the wire is a JSON envelope `{"event": ..., "data": ...}`.
/// Events without a payload omit `data`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    RegisterClient(RegisterClient),
    SubmitInfo(SubmitInfo),
    StartGame,
    ShootDart(ShootDart),
    ResetGame,
    GetResultsData,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    NewBalloons(Vec<BalloonInfo>),
    StartGame,
    ShotResult([ShotOutcome; SHOTS_PER_DART]),
    BalloonHit(BalloonHit),
    GameReset,
    ResultsData(BTreeMap<BalloonId, BalloonRecord>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegisterClient {
    /// `"mobile"` or `"screen"`; anything else is refused by the server.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SubmitInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub supplier1: String,
    #[serde(default)]
    pub supplier2: String,
    #[serde(default)]
    pub supplier3: String,
}

impl SubmitInfo {
    pub fn suppliers(&self) -> [&str; 3] {
        [&self.supplier1, &self.supplier2, &self.supplier3]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShootDart {
    pub target_balloon_id1: TargetId,
    pub target_balloon_id2: TargetId,
}

impl ShootDart {
    pub fn targets(&self) -> [TargetId; SHOTS_PER_DART] {
        [self.target_balloon_id1, self.target_balloon_id2]
    }
}

/// Public view of a balloon. The submitter stays hidden until it is hit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BalloonInfo {
    pub id: BalloonId,
    pub supplier: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ShotOutcome {
    /// 1 or 2, matching the position of the target in the request.
    pub shot: u8,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HitDetails>,
}

impl ShotOutcome {
    pub fn failure(shot: u8, message: impl Into<String>) -> Self {
        Self {
            shot,
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HitDetails {
    pub balloon_id: BalloonId,
    pub supplier: String,
    pub submitted_by: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalloonHit {
    pub balloon_id: BalloonId,
    pub supplier: String,
    pub submitter_name: String,
    pub shooter_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalloonRecord {
    pub supplier: String,
    pub submitted_by: String,
    pub hit_by: Option<String>,
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewBalloons(_) => "newBalloons",
            ServerEvent::StartGame => "startGame",
            ServerEvent::ShotResult(_) => "shotResult",
            ServerEvent::BalloonHit(_) => "balloonHit",
            ServerEvent::GameReset => "gameReset",
            ServerEvent::ResultsData(_) => "resultsData",
        }
    }
}
