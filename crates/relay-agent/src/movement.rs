//! Grid movement and target selection.
//!
//! All helpers read the world through the [`World`] trait and never mutate
//! it. Euclidean distance drives movement and congestion, Manhattan distance
//! drives relay selection to stay consistent with the routing heuristic.

use std::cmp::Ordering;

use relay_core::{AgentName, BehaviorConfig, Coord, World, ZoneId, ZoneKind};

/// A zone picked as a walking target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTarget {
    /// Zone identifier.
    pub id: ZoneId,
    /// Zone position.
    pub at: Coord,
}

/// Cell one greedy step closer to `target`.
///
/// Only legal moves are considered, in direction order; the first cell with
/// the smallest Euclidean distance wins. Returns `None` when boxed in.
#[must_use]
pub fn next_step(world: &dyn World, from: Coord, target: Coord) -> Option<Coord> {
    let mut best: Option<(Coord, f64)> = None;
    for (_, to) in world.legal_moves(from) {
        let distance = to.euclidean(target);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((to, distance));
        }
    }
    best.map(|(to, _)| to)
}

/// Congestion-weighted distance from `from` to a zone at `zone`.
#[must_use]
pub fn congestion_score(
    world: &dyn World,
    me: &AgentName,
    from: Coord,
    zone: Coord,
    config: &BehaviorConfig,
) -> f64 {
    let crowd = world.agents_near(zone, config.congestion_radius, Some(me));
    #[allow(clippy::cast_precision_loss)]
    let crowd = crowd as f64;
    from.euclidean(zone) + config.congestion_penalty * crowd
}

fn best_source(
    world: &dyn World,
    me: &AgentName,
    from: Coord,
    config: &BehaviorConfig,
    with_packages: bool,
) -> Option<ZoneTarget> {
    let mut best: Option<(ZoneTarget, f64)> = None;
    for zone in world.zones_of_kind(ZoneKind::Source) {
        if with_packages && zone.is_empty() {
            continue;
        }
        let score = congestion_score(world, me, from, zone.position(), config);
        if best.as_ref().is_none_or(|(_, s)| score < *s) {
            best = Some((
                ZoneTarget {
                    id: zone.id().clone(),
                    at: zone.position(),
                },
                score,
            ));
        }
    }
    best.map(|(target, _)| target)
}

/// Best non-empty source zone by congestion score.
#[must_use]
pub fn nearest_loaded_source(
    world: &dyn World,
    me: &AgentName,
    from: Coord,
    config: &BehaviorConfig,
) -> Option<ZoneTarget> {
    best_source(world, me, from, config, true)
}

/// Least congested source zone, used as an idle spot.
#[must_use]
pub fn idle_source(
    world: &dyn World,
    me: &AgentName,
    from: Coord,
    config: &BehaviorConfig,
) -> Option<ZoneTarget> {
    best_source(world, me, from, config, false)
}

/// Nearest relay zone with free capacity, skipping `except`.
#[must_use]
pub fn nearest_open_relay(world: &dyn World, from: Coord, except: Option<&ZoneId>) -> Option<ZoneTarget> {
    world
        .zones_of_kind(ZoneKind::Relay)
        .into_iter()
        .filter(|z| !z.is_full() && Some(z.id()) != except)
        .min_by_key(|z| from.manhattan(z.position()))
        .map(|z| ZoneTarget {
            id: z.id().clone(),
            at: z.position(),
        })
}

/// Nearest relay zone holding at least one payload.
#[must_use]
pub fn nearest_loaded_relay(world: &dyn World, from: Coord) -> Option<ZoneTarget> {
    let mut best: Option<(ZoneTarget, f64)> = None;
    for zone in world.zones_of_kind(ZoneKind::Relay) {
        if zone.is_empty() {
            continue;
        }
        let distance = from.euclidean(zone.position());
        if best.as_ref().is_none_or(|(_, d)| distance < *d) {
            best = Some((
                ZoneTarget {
                    id: zone.id().clone(),
                    at: zone.position(),
                },
                distance,
            ));
        }
    }
    best.map(|(target, _)| target)
}

/// Zones of `kind` orthogonally adjacent to `from`.
#[must_use]
pub fn adjacent_zones(world: &dyn World, from: Coord, kind: ZoneKind) -> Vec<ZoneId> {
    world
        .zones_of_kind(kind)
        .into_iter()
        .filter(|z| from.is_adjacent(z.position()))
        .map(|z| z.id().clone())
        .collect()
}

fn nearest_distance(at: Coord, points: &[Coord]) -> f64 {
    points
        .iter()
        .map(|p| at.euclidean(*p))
        .fold(f64::INFINITY, f64::min)
}

/// Parameters of a retreat away from a set of cells.
#[derive(Debug, Clone, Copy)]
pub struct Retreat<'a> {
    /// Cells to keep away from.
    pub avoid: &'a [Coord],
    /// Distance that counts as clear.
    pub clearance: f64,
    /// Half-width of the square searched around the agent.
    pub radius: i32,
    /// Cells to drift toward among equally clear candidates.
    pub attract: &'a [Coord],
}

impl Retreat<'_> {
    /// True when `at` is already clear of every avoided cell.
    #[must_use]
    pub fn is_clear(&self, at: Coord) -> bool {
        nearest_distance(at, self.avoid) >= self.clearance
    }

    /// Cell to walk toward, or `None` when already clear.
    ///
    /// Candidates are ranked by clearance (capped at the threshold), then by
    /// distance to the nearest attractor, then by distance from `from`.
    #[must_use]
    pub fn target(&self, world: &dyn World, from: Coord) -> Option<Coord> {
        if self.is_clear(from) {
            return None;
        }
        let mut best: Option<(Coord, (f64, f64, f64))> = None;
        for dy in -self.radius..=self.radius {
            for dx in -self.radius..=self.radius {
                let at = Coord::new(from.x + dx, from.y + dy);
                if at == from || !world.is_free(at) {
                    continue;
                }
                let clear = nearest_distance(at, self.avoid).min(self.clearance);
                let pull = if self.attract.is_empty() {
                    0.0
                } else {
                    nearest_distance(at, self.attract)
                };
                let key = (clear, pull, from.euclidean(at));
                if best.is_none_or(|(_, b)| better(key, b)) {
                    best = Some((at, key));
                }
            }
        }
        best.map(|(at, _)| at)
    }
}

fn better(a: (f64, f64, f64), b: (f64, f64, f64)) -> bool {
    b.0.total_cmp(&a.0)
        .then(a.1.total_cmp(&b.1))
        .then(a.2.total_cmp(&b.2))
        == Ordering::Less
}
