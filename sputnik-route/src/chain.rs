use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sputnik_core::{Leg, Ride, Waypoint};

/// Chain construction failures. All of these mean the stored route data
/// violates an invariant and must not be served.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Route needs at least two waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("Route has {count} waypoints, maximum is {max}")]
    TooManyWaypoints { count: usize, max: usize },

    #[error("Waypoint {0} belongs to another ride")]
    ForeignWaypoint(Uuid),

    #[error("Leg {0} belongs to another ride or references unknown waypoints")]
    ForeignLeg(Uuid),

    #[error("Route has no terminus (waypoint without departure)")]
    NoTerminus,

    #[error("Waypoint {0} has no departure but is not the last stop")]
    EarlyTerminus(Uuid),

    #[error("Waypoint {0} breaks the time ordering")]
    TimesNotOrdered(Uuid),

    #[error("No neighbor leg between waypoints {from} and {to}")]
    MissingNeighborLeg { from: Uuid, to: Uuid },

    #[error("Duplicate neighbor leg between waypoints {from} and {to}")]
    DuplicateNeighborLeg { from: Uuid, to: Uuid },

    #[error("Duplicate manual leg between waypoints {from} and {to}")]
    DuplicateManualLeg { from: Uuid, to: Uuid },

    #[error("Leg {0} does not point forward along the chain")]
    BackwardLeg(Uuid),
}

/// A ride's waypoints as an indexed sequence ordered by arrival time,
/// with its neighbor legs aligned to adjacent pairs and manual legs keyed
/// by waypoint pair.
///
/// The ordering is the route: position `i` departs towards position `i + 1`
/// and nothing else. Construction validates every invariant once, so the
/// walk and the capacity accounting can index without re-checking.
#[derive(Debug, Clone)]
pub struct RouteChain {
    ride: Ride,
    waypoints: Vec<Waypoint>,
    /// `neighbor_legs[i]` joins `waypoints[i]` to `waypoints[i + 1]`
    neighbor_legs: Vec<Leg>,
    manual_legs: HashMap<(Uuid, Uuid), Leg>,
    positions: HashMap<Uuid, usize>,
}

impl RouteChain {
    pub fn new(
        ride: Ride,
        mut waypoints: Vec<Waypoint>,
        legs: Vec<Leg>,
        max_waypoints: usize,
    ) -> Result<Self, ChainError> {
        if waypoints.len() < 2 {
            return Err(ChainError::TooFewWaypoints(waypoints.len()));
        }
        if waypoints.len() > max_waypoints {
            return Err(ChainError::TooManyWaypoints {
                count: waypoints.len(),
                max: max_waypoints,
            });
        }

        // Terminus (no departure) sorts after everything with equal arrival.
        waypoints.sort_by_key(|w| (w.arrives_at, w.departs_at.unwrap_or(DateTime::<Utc>::MAX_UTC)));

        let mut positions = HashMap::with_capacity(waypoints.len());
        for (idx, waypoint) in waypoints.iter().enumerate() {
            if waypoint.ride_id != ride.id {
                return Err(ChainError::ForeignWaypoint(waypoint.id));
            }
            positions.insert(waypoint.id, idx);
        }

        Self::check_times(&waypoints)?;

        let last = waypoints.len() - 1;
        let mut neighbor_slots: Vec<Option<Leg>> = vec![None; last];
        let mut manual_legs = HashMap::new();

        for leg in legs {
            if leg.ride_id != ride.id {
                return Err(ChainError::ForeignLeg(leg.id));
            }
            let from = *positions
                .get(&leg.from_waypoint_id)
                .ok_or(ChainError::ForeignLeg(leg.id))?;
            let to = *positions
                .get(&leg.to_waypoint_id)
                .ok_or(ChainError::ForeignLeg(leg.id))?;
            if to <= from {
                return Err(ChainError::BackwardLeg(leg.id));
            }

            if leg.joins_neighbors {
                if to != from + 1 {
                    return Err(ChainError::ForeignLeg(leg.id));
                }
                if neighbor_slots[from].is_some() {
                    return Err(ChainError::DuplicateNeighborLeg {
                        from: leg.from_waypoint_id,
                        to: leg.to_waypoint_id,
                    });
                }
                neighbor_slots[from] = Some(leg);
            } else {
                let key = (leg.from_waypoint_id, leg.to_waypoint_id);
                if manual_legs.insert(key, leg).is_some() {
                    return Err(ChainError::DuplicateManualLeg {
                        from: key.0,
                        to: key.1,
                    });
                }
            }
        }

        let mut neighbor_legs = Vec::with_capacity(last);
        for (idx, slot) in neighbor_slots.into_iter().enumerate() {
            match slot {
                Some(leg) => neighbor_legs.push(leg),
                None => {
                    return Err(ChainError::MissingNeighborLeg {
                        from: waypoints[idx].id,
                        to: waypoints[idx + 1].id,
                    })
                }
            }
        }

        Ok(Self {
            ride,
            waypoints,
            neighbor_legs,
            manual_legs,
            positions,
        })
    }

    fn check_times(waypoints: &[Waypoint]) -> Result<(), ChainError> {
        let last = waypoints.len() - 1;
        let mut terminus = None;
        for (idx, waypoint) in waypoints.iter().enumerate() {
            match waypoint.departs_at {
                None => {
                    if idx != last {
                        return Err(ChainError::EarlyTerminus(waypoint.id));
                    }
                    terminus = Some(waypoint.id);
                }
                Some(departs) => {
                    if departs < waypoint.arrives_at {
                        return Err(ChainError::TimesNotOrdered(waypoint.id));
                    }
                    if idx < last && waypoints[idx + 1].arrives_at < departs {
                        return Err(ChainError::TimesNotOrdered(waypoints[idx + 1].id));
                    }
                }
            }
        }
        terminus.map(|_| ()).ok_or(ChainError::NoTerminus)
    }

    pub fn ride(&self) -> &Ride {
        &self.ride
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoint(&self, index: usize) -> &Waypoint {
        &self.waypoints[index]
    }

    /// Chain position of a waypoint, if it belongs to this ride.
    pub fn position(&self, waypoint_id: Uuid) -> Option<usize> {
        self.positions.get(&waypoint_id).copied()
    }

    /// The base segment leaving position `index`.
    pub fn neighbor_leg(&self, index: usize) -> &Leg {
        &self.neighbor_legs[index]
    }

    pub fn neighbor_legs(&self) -> &[Leg] {
        &self.neighbor_legs
    }

    pub fn manual_leg(&self, from_id: Uuid, to_id: Uuid) -> Option<&Leg> {
        self.manual_legs.get(&(from_id, to_id))
    }

    /// The stored leg for an exact span, if any: the base segment for an
    /// adjacent pair, otherwise a manual leg.
    pub fn leg_for_span(&self, from: usize, to: usize) -> Option<&Leg> {
        if to == from + 1 {
            Some(&self.neighbor_legs[from])
        } else {
            self.manual_leg(self.waypoints[from].id, self.waypoints[to].id)
        }
    }
}
