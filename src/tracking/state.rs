//! Shared tracking state and the lock arbitration pass.
//!
//! Both source sets and the lock live behind one mutex. Replacing a set
//! and re-arbitrating happen under a single acquisition, and readers only
//! ever get a whole [`LockState`] copy, so a torn azimuth/elevation pair
//! cannot be observed.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::matcher::find_best_match;
use super::{Angles, Category, Source};
use crate::config::ArbitrationConfig;

/// The currently selected source and the angles sent to the actuator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LockState {
    pub locked_id: Option<i64>,
    pub angles: Angles,
    /// Time of the last lock event; `None` until the first one.
    pub last_update_time: Option<DateTime<Utc>>,
}

impl LockState {
    /// Actuator command line, e.g. `AZ 90.0 EL -12.5\n`.
    pub fn command(&self) -> String {
        format!("AZ {:.1} EL {:.1}\n", self.angles.azimuth, self.angles.elevation)
    }
}

/// Outcome of an arbitration pass that touched the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockEvent {
    /// A matching source was found while no usable lock was held.
    NewLock { id: i64, angles: Angles },
    /// A candidate beat the locked source by the switch margin.
    Switched { from: i64, to: Option<i64>, angles: Angles },
    /// The locked source is still the one to follow.
    Continuing { id: i64, angles: Angles },
}

#[derive(Debug, Default)]
struct Inner {
    candidates: Vec<Source>,
    tracked: Vec<Source>,
    lock: LockState,
}

/// Concurrency-safe tracker shared by listeners and the sender.
#[derive(Debug)]
pub struct TrackingState {
    cfg: ArbitrationConfig,
    inner: Mutex<Inner>,
}

impl TrackingState {
    pub fn new(cfg: ArbitrationConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace one source set wholesale and re-arbitrate against it.
    pub fn update(&self, category: Category, sources: Vec<Source>) -> Option<LockEvent> {
        let mut inner = self.lock_inner();
        match category {
            Category::Candidate => inner.candidates = sources,
            Category::Tracked => inner.tracked = sources,
        }
        let event = arbitrate(&mut inner, &self.cfg);
        if let Some(event) = &event {
            log_event(event);
        }
        event
    }

    pub fn update_candidates(&self, sources: Vec<Source>) -> Option<LockEvent> {
        self.update(Category::Candidate, sources)
    }

    pub fn update_tracked(&self, sources: Vec<Source>) -> Option<LockEvent> {
        self.update(Category::Tracked, sources)
    }

    /// Consistent copy of the current lock.
    pub fn snapshot(&self) -> LockState {
        self.lock_inner().lock
    }
}

fn arbitrate(inner: &mut Inner, cfg: &ArbitrationConfig) -> Option<LockEvent> {
    let Inner { candidates, tracked, lock } = inner;
    let m = find_best_match(candidates, tracked, cfg)?;
    let now = Utc::now();

    if let Some(locked) = lock.locked_id {
        let current = tracked
            .iter()
            .find(|t| t.id == Some(locked))
            .filter(|t| t.activity > cfg.activity_threshold);

        if let Some(current) = current {
            let current_energy = candidates
                .iter()
                .find(|c| {
                    (c.x - current.x).abs() < cfg.coord_tolerance
                        && (c.y - current.y).abs() < cfg.coord_tolerance
                })
                .map_or(0.0, |c| c.energy);

            if m.best.energy > current_energy * cfg.switch_margin {
                let angles = m.best.angles();
                *lock = LockState {
                    locked_id: m.id,
                    angles,
                    last_update_time: Some(now),
                };
                return Some(LockEvent::Switched { from: locked, to: m.id, angles });
            }

            let angles = current.angles();
            *lock = LockState {
                locked_id: Some(locked),
                angles,
                last_update_time: Some(now),
            };
            return Some(LockEvent::Continuing { id: locked, angles });
        }
    }

    // No match keeps the previous lock as is. A stale id is only ever
    // superseded, so a track that drops out briefly is resumed on return.
    let id = m.id?;
    let angles = m.best.angles();
    *lock = LockState {
        locked_id: Some(id),
        angles,
        last_update_time: Some(now),
    };
    Some(LockEvent::NewLock { id, angles })
}

fn log_event(event: &LockEvent) {
    match *event {
        LockEvent::NewLock { id, angles } => info!(
            id,
            azimuth = format_args!("{:.1}", angles.azimuth),
            elevation = format_args!("{:.1}", angles.elevation),
            "New lock"
        ),
        LockEvent::Switched { from, to, angles } => info!(
            from,
            to = ?to,
            azimuth = format_args!("{:.1}", angles.azimuth),
            elevation = format_args!("{:.1}", angles.elevation),
            "Switched to stronger source"
        ),
        LockEvent::Continuing { id, angles } => debug!(
            id,
            azimuth = format_args!("{:.1}", angles.azimuth),
            elevation = format_args!("{:.1}", angles.elevation),
            "Continuing to track"
        ),
    }
}
