//! Links the strongest candidate peak to a tracked identity.

use super::Source;
use crate::config::ArbitrationConfig;

/// Result of one matching pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Id of the tracked source the best candidate belongs to, if any.
    pub id: Option<i64>,
    /// Highest-energy candidate (first one wins on ties).
    pub best: Source,
}

/// Pick the strongest candidate and find the first active track near it.
///
/// Returns `None` when either set is empty: there is not enough data yet.
/// A best candidate at or below `energy_threshold` never matches, but is
/// still returned so callers can compare its energy.
pub fn find_best_match(
    candidates: &[Source],
    tracked: &[Source],
    cfg: &ArbitrationConfig,
) -> Option<Match> {
    if tracked.is_empty() {
        return None;
    }
    let best = *candidates
        .iter()
        .reduce(|best, c| if c.energy > best.energy { c } else { best })?;

    if best.energy <= cfg.energy_threshold {
        return Some(Match { id: None, best });
    }

    let id = tracked
        .iter()
        .find(|t| best.distance_to(t) < cfg.match_distance && t.activity > cfg.activity_threshold)
        .and_then(|t| t.id);

    Some(Match { id, best })
}
