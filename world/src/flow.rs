//! Tracking of products travelling from the start point to the end point.

use glam::Vec3;
use roboflow_core::UnitId;

/// Errors raised when addressing a tracked product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No undelivered product with the identifier is being tracked.
    #[error("product {} is not in flight", .0.get())]
    UnknownUnit(UnitId),
}

/// A single product moving through the factory.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryUnit {
    id: UnitId,
    position: Vec3,
    path: Vec<Vec3>,
    current_waypoint: usize,
    delivered: bool,
}

impl DeliveryUnit {
    fn spawn(id: UnitId, position: Vec3) -> Self {
        Self {
            id,
            position,
            path: Vec::new(),
            current_waypoint: 0,
            delivered: false,
        }
    }

    /// Identifier assigned when the product spawned.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Current world-space position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Waypoints the product follows, empty until a route is assigned.
    #[must_use]
    pub fn path(&self) -> &[Vec3] {
        &self.path
    }

    /// Index of the waypoint the product is heading for.
    #[must_use]
    pub const fn current_waypoint(&self) -> usize {
        self.current_waypoint
    }

    /// Whether the product reached the final waypoint.
    #[must_use]
    pub const fn delivered(&self) -> bool {
        self.delivered
    }

    fn step(&mut self, distance_budget: f32, arrival_threshold: f32) {
        let Some(target) = self.path.get(self.current_waypoint).copied() else {
            return;
        };

        let offset = target - self.position;
        let distance = offset.length();
        if distance < arrival_threshold || distance <= f32::EPSILON {
            self.current_waypoint += 1;
            if self.current_waypoint == self.path.len() {
                self.delivered = true;
            }
            return;
        }

        // Never step past the waypoint so large ticks cannot oscillate around it.
        let travel = distance_budget.min(distance);
        self.position += offset / distance * travel;
    }
}

/// Tracks the in-flight products of the current level attempt.
///
/// Only one undelivered product may exist at a time; delivered products are
/// counted and then dropped from tracking.
#[derive(Clone, Debug)]
pub struct ProductFlowTracker {
    units: Vec<DeliveryUnit>,
    next_unit_id: u32,
    delivered: u32,
    speed: f32,
    arrival_threshold: f32,
}

impl ProductFlowTracker {
    /// Creates an empty tracker moving products at `speed` units per second.
    #[must_use]
    pub fn new(speed: f32, arrival_threshold: f32) -> Self {
        Self {
            units: Vec::new(),
            next_unit_id: 0,
            delivered: 0,
            speed,
            arrival_threshold,
        }
    }

    /// Creates a product at the provided position unless one is already in flight.
    pub fn spawn(&mut self, position: Vec3) -> Option<UnitId> {
        if self.in_flight() {
            return None;
        }

        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.wrapping_add(1);
        self.units.push(DeliveryUnit::spawn(id, position));
        Some(id)
    }

    /// Replaces the route of an in-flight product.
    pub fn assign_route(&mut self, unit: UnitId, waypoints: Vec<Vec3>) -> Result<(), RouteError> {
        let tracked = self
            .units
            .iter_mut()
            .find(|candidate| candidate.id == unit && !candidate.delivered)
            .ok_or(RouteError::UnknownUnit(unit))?;
        tracked.path = waypoints;
        tracked.current_waypoint = 0;
        Ok(())
    }

    /// Moves every routed product toward its next waypoint.
    ///
    /// Products reaching their final waypoint are counted, removed from
    /// tracking and pushed onto `out` in spawn order.
    pub fn advance(&mut self, dt_seconds: f32, out: &mut Vec<DeliveryUnit>) {
        let budget = self.speed * dt_seconds.max(0.0);
        let threshold = self.arrival_threshold;
        for unit in self.units.iter_mut().filter(|unit| !unit.delivered) {
            if unit.path.is_empty() {
                continue;
            }
            unit.step(budget, threshold);
        }

        let mut index = 0;
        while index < self.units.len() {
            if self.units[index].delivered {
                let unit = self.units.remove(index);
                self.delivered = self.delivered.saturating_add(1);
                out.push(unit);
            } else {
                index += 1;
            }
        }
    }

    /// Products delivered during the current attempt.
    #[must_use]
    pub const fn delivered_count(&self) -> u32 {
        self.delivered
    }

    /// Reports whether an undelivered product is being tracked.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.units.iter().any(|unit| !unit.delivered)
    }

    /// Products currently tracked.
    #[must_use]
    pub fn units(&self) -> &[DeliveryUnit] {
        &self.units
    }

    /// Drops every product and resets the delivery count.
    pub fn clear(&mut self) {
        self.units.clear();
        self.delivered = 0;
    }
}
