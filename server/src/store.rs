//! Balloon storage
//!
//! Holds every balloon submitted in the current round, keyed by a
//! monotonically increasing id. The store is the only place `hit_by` is
//! written, and it is written at most once per balloon.

use shared::{BalloonId, BalloonInfo, BalloonRecord, TargetId};
use std::collections::BTreeMap;

/// A submitted target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balloon {
    pub id: BalloonId,
    /// Supplier label shown on the balloon
    pub supplier: String,
    /// Display name of the submitter, revealed only once the balloon is hit
    pub submitted_by: String,
    /// Display name of the shooter; `None` while the balloon is still up
    pub hit_by: Option<String>,
}

impl Balloon {
    /// Fields that are safe to show before the balloon is hit
    pub fn public_info(&self) -> BalloonInfo {
        BalloonInfo {
            id: self.id,
            supplier: self.supplier.clone(),
        }
    }

    pub fn record(&self) -> BalloonRecord {
        BalloonRecord {
            supplier: self.supplier.clone(),
            submitted_by: self.submitted_by.clone(),
            hit_by: self.hit_by.clone(),
        }
    }
}

/// Outcome of trying to hit one balloon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The balloon was up and now belongs to the shooter
    Hit(Balloon),
    /// Someone else got there first
    AlreadyHit { by: String },
    NotFound,
}

#[derive(Debug)]
pub struct BalloonStore {
    balloons: BTreeMap<BalloonId, Balloon>,
    next_id: BalloonId,
}

impl Default for BalloonStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BalloonStore {
    pub fn new() -> Self {
        Self {
            balloons: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocates the next id and stores an unhit balloon under it
    pub fn create(&mut self, supplier: &str, submitted_by: &str) -> Balloon {
        let id = self.next_id;
        self.next_id += 1;

        let balloon = Balloon {
            id,
            supplier: supplier.to_string(),
            submitted_by: submitted_by.to_string(),
            hit_by: None,
        };
        self.balloons.insert(id, balloon.clone());
        balloon
    }

    pub fn get(&self, id: BalloonId) -> Option<&Balloon> {
        self.balloons.get(&id)
    }

    /// Claims a balloon for `shooter` if nobody has hit it yet
    ///
    /// Check and write happen under the same exclusive borrow, so a balloon
    /// can only ever transition from unhit to hit once. Targets that cannot
    /// be a balloon id at all are simply not found.
    pub fn resolve(&mut self, target: TargetId, shooter: &str) -> Resolution {
        let Some(balloon) = BalloonId::try_from(target)
            .ok()
            .and_then(|id| self.balloons.get_mut(&id))
        else {
            return Resolution::NotFound;
        };

        match &balloon.hit_by {
            Some(by) => Resolution::AlreadyHit { by: by.clone() },
            None => {
                balloon.hit_by = Some(shooter.to_string());
                Resolution::Hit(balloon.clone())
            }
        }
    }

    /// Full table of balloons, ordered by id
    pub fn snapshot(&self) -> BTreeMap<BalloonId, BalloonRecord> {
        self.balloons
            .iter()
            .map(|(id, balloon)| (*id, balloon.record()))
            .collect()
    }

    /// Removes every balloon and restarts ids at 1
    pub fn clear(&mut self) {
        self.balloons.clear();
        self.next_id = 1;
    }

    pub fn len(&self) -> usize {
        self.balloons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balloons.is_empty()
    }
}
