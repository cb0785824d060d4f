#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game session state for RoboFlow.
//!
//! The [`Session`] owns the current level, score, collision budget, countdown,
//! grid occupancy and product flow. Drivers mutate it exclusively through
//! [`apply`] (or the equivalent `Session` methods for direct callers) and read
//! it through the [`query`] module.

mod catalog;
mod flow;
mod grid;
mod schedule;
pub mod scoring;

use std::time::Duration;

use glam::Vec3;
use roboflow_core::{
    CellCoord, Command, Event, GameOverReason, GameState, LevelId, Operation, PlacementError,
    PlacementTarget, RobotKindId, SessionError, UnitId, WELCOME_BANNER,
};
use tracing::{debug, info, warn};

pub use catalog::{CatalogError, Catalogs, Level, LevelCatalog, RobotCatalog, RobotKind};
pub use flow::{DeliveryUnit, ProductFlowTracker, RouteError};
pub use grid::{GridCell, GridError, GridModel, PlacedRobot};
pub use schedule::ScheduledTask;

const DEFAULT_GRID_SIZE: u32 = 10;
const DEFAULT_CELL_SIZE: f32 = 1.0;
const DEFAULT_START_CELL: CellCoord = CellCoord::new(1, 1);
const DEFAULT_END_CELL: CellCoord = CellCoord::new(DEFAULT_GRID_SIZE - 2, DEFAULT_GRID_SIZE - 2);
/// 0.02 units per frame at 60 frames per second.
const DEFAULT_PRODUCT_SPEED: f32 = 1.2;
const DEFAULT_ARRIVAL_THRESHOLD: f32 = 0.1;
const DEFAULT_DELIVERY_REWARD: u32 = 100;
const SPAWN_DELAY: Duration = Duration::from_secs(1);
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Tunable parameters of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Number of cells along each grid axis.
    pub grid_size: u32,
    /// Edge length of one cell in world units.
    pub cell_size: f32,
    /// Cell where products spawn.
    pub start_cell: CellCoord,
    /// Cell products are routed to.
    pub end_cell: CellCoord,
    /// Product travel speed in world units per second.
    pub product_speed: f32,
    /// Distance under which a product counts as having reached a waypoint.
    pub arrival_threshold: f32,
    /// Score awarded per delivered product.
    pub delivery_reward: u32,
    /// Delay between a delivery and the next product spawning.
    pub spawn_delay: Duration,
    /// Real time represented by one countdown decrement.
    pub countdown_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
            start_cell: DEFAULT_START_CELL,
            end_cell: DEFAULT_END_CELL,
            product_speed: DEFAULT_PRODUCT_SPEED,
            arrival_threshold: DEFAULT_ARRIVAL_THRESHOLD,
            delivery_reward: DEFAULT_DELIVERY_REWARD,
            spawn_delay: SPAWN_DELAY,
            countdown_period: COUNTDOWN_PERIOD,
        }
    }
}

/// Represents one playthrough, from the menu to game over or completion.
#[derive(Debug)]
pub struct Session {
    banner: &'static str,
    config: SessionConfig,
    catalogs: Catalogs,
    state: GameState,
    current_level: LevelId,
    score: i64,
    collision_count: u32,
    max_collisions: u32,
    time_remaining: u32,
    grid: GridModel,
    placed: Vec<CellCoord>,
    flow: ProductFlowTracker,
    countdown: ScheduledTask,
    spawn_delay: ScheduledTask,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Catalogs::reference(), SessionConfig::default())
    }
}

impl Session {
    /// Creates a session in the loading state.
    #[must_use]
    pub fn new(catalogs: Catalogs, config: SessionConfig) -> Self {
        let (time_remaining, max_collisions) = catalogs
            .levels()
            .get(LevelId::FIRST)
            .map(|level| (level.time_limit_seconds(), level.max_collisions()))
            .unwrap_or((0, 0));
        Self {
            banner: WELCOME_BANNER,
            grid: GridModel::new(config.grid_size, config.cell_size),
            flow: ProductFlowTracker::new(config.product_speed, config.arrival_threshold),
            countdown: ScheduledTask::repeating(config.countdown_period),
            spawn_delay: ScheduledTask::one_shot(config.spawn_delay),
            config,
            catalogs,
            state: GameState::Loading,
            current_level: LevelId::FIRST,
            score: 0,
            collision_count: 0,
            max_collisions,
            time_remaining,
            placed: Vec::new(),
        }
    }

    /// Leaves the loading screen, or a finished run, for the menu.
    pub fn show_menu(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::ShowMenu, |state| {
            matches!(
                state,
                GameState::Loading | GameState::GameOver | GameState::GameComplete
            )
        })?;
        self.clear_attempt();
        self.transition(GameState::Menu, out);
        Ok(())
    }

    /// Starts a fresh run at `level` with the score and collisions cleared.
    pub fn start_level(&mut self, level: LevelId, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::StartLevel, |state| state == GameState::Menu)?;
        let _ = self.catalogs.levels().get(level)?;

        self.current_level = level;
        self.score = 0;
        self.begin_attempt(out)?;
        info!(level = level.get(), "level started");
        out.push(Event::LevelStarted { level });
        self.spawn_product(out);
        Ok(())
    }

    /// Advances the session by `dt` of real time.
    ///
    /// Within one tick a pending spawn fires first, then products move, arrivals
    /// are scored and the level-complete check runs, and finally the countdown
    /// advances by one second per whole second elapsed.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::Tick, |state| state == GameState::Playing)?;

        if self.spawn_delay.advance(dt) > 0 {
            self.spawn_product(out);
        }

        let mut delivered = Vec::new();
        self.flow.advance(dt.as_secs_f32(), &mut delivered);
        for unit in delivered {
            self.on_delivered(unit.id(), out)?;
            if self.state != GameState::Playing {
                return Ok(());
            }
        }

        for _ in 0..self.countdown.advance(dt) {
            self.time_remaining = self.time_remaining.saturating_sub(1);
            out.push(Event::CountdownAdvanced {
                remaining: self.time_remaining,
            });
            if self.time_remaining == 0 {
                self.game_over(GameOverReason::TimeExpired, out);
                break;
            }
        }
        Ok(())
    }

    /// Purchases a robot and binds it to the target cell.
    ///
    /// Validation runs in a fixed order: the level must unlock `kind`, the score
    /// must cover its cost, and the target must resolve to an empty cell.
    pub fn place_robot(
        &mut self,
        kind: RobotKindId,
        target: PlacementTarget,
        out: &mut Vec<Event>,
    ) -> Result<CellCoord, SessionError> {
        self.ensure(Operation::PlaceRobot, |state| state == GameState::Playing)?;

        if !self.catalogs.levels().get(self.current_level)?.allows(kind) {
            return Err(PlacementError::KindNotAvailable { kind }.into());
        }

        let cost = self.catalogs.robots().get(kind)?.cost();
        if self.score < i64::from(cost) {
            return Err(PlacementError::InsufficientScore {
                score: self.score,
                cost,
            }
            .into());
        }

        let cell = match target {
            PlacementTarget::Cell(cell) => Some(cell).filter(|cell| self.grid.contains(*cell)),
            PlacementTarget::Ground(point) => self.grid.screen_to_grid_coordinate(point),
        }
        .ok_or(PlacementError::InvalidCell)?;
        if self.grid.is_occupied(cell)? {
            return Err(PlacementError::InvalidCell.into());
        }

        self.grid.place(cell, PlacedRobot::new(kind, cell))?;
        self.score -= i64::from(cost);
        self.placed.push(cell);
        debug!(%kind, %cell, cost, score = self.score, "robot placed");
        out.push(Event::RobotPlaced { kind, cell, cost });
        Ok(cell)
    }

    /// Removes the robot on `cell`. The purchase is not refunded.
    pub fn remove_robot(&mut self, cell: CellCoord, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::RemoveRobot, |state| state == GameState::Playing)?;
        let robot = self
            .grid
            .clear(cell)?
            .ok_or(SessionError::EmptyCell(cell))?;
        self.placed.retain(|placed| *placed != cell);
        debug!(kind = %robot.kind(), %cell, "robot removed");
        out.push(Event::RobotRemoved {
            kind: robot.kind(),
            cell,
        });
        Ok(())
    }

    /// Turns the robot on `cell` a quarter turn clockwise.
    pub fn rotate_robot(&mut self, cell: CellCoord, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::RotateRobot, |state| state == GameState::Playing)?;
        if !self.grid.contains(cell) {
            return Err(SessionError::OutOfBounds(cell));
        }
        let rotation = self
            .grid
            .robot_at_mut(cell)
            .ok_or(SessionError::EmptyCell(cell))?
            .rotate_clockwise();
        out.push(Event::RobotRotated { cell, rotation });
        Ok(())
    }

    /// Hands an in-flight product the waypoints computed by the route planner.
    pub fn assign_route(&mut self, unit: UnitId, waypoints: Vec<Vec3>) -> Result<(), SessionError> {
        self.ensure(Operation::AssignRoute, GameState::is_in_level)?;
        self.flow
            .assign_route(unit, waypoints)
            .map_err(|RouteError::UnknownUnit(unit)| SessionError::UnknownUnit(unit))
    }

    /// Charges a collision reported by the physics layer against the budget.
    ///
    /// The level is lost once the count strictly exceeds the level's limit.
    pub fn record_collision(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::RecordCollision, |state| state == GameState::Playing)?;
        self.collision_count = self.collision_count.saturating_add(1);
        debug!(
            count = self.collision_count,
            limit = self.max_collisions,
            "collision recorded"
        );
        out.push(Event::CollisionRecorded {
            count: self.collision_count,
            limit: self.max_collisions,
        });
        if self.collision_count > self.max_collisions {
            self.game_over(GameOverReason::CollisionLimitExceeded, out);
        }
        Ok(())
    }

    /// Freezes a running level. Ignored in every other state.
    pub fn pause(&mut self, out: &mut Vec<Event>) {
        if self.state == GameState::Playing {
            self.transition(GameState::Paused, out);
        }
    }

    /// Resumes a frozen level. Ignored in every other state.
    ///
    /// Time spent paused is not caught up: the countdown restarts a fresh
    /// second and a spawn cancelled by the pause is rescheduled.
    pub fn resume(&mut self, out: &mut Vec<Event>) {
        if self.state != GameState::Paused {
            return;
        }
        self.transition(GameState::Playing, out);
        self.countdown.arm();
        if !self.flow.in_flight() {
            self.spawn_delay.arm();
        }
    }

    /// Pauses a running level or resumes a frozen one.
    pub fn toggle_pause(&mut self, out: &mut Vec<Event>) {
        match self.state {
            GameState::Playing => self.pause(out),
            GameState::Paused => self.resume(out),
            _ => {}
        }
    }

    /// Restarts the current level, keeping the score earned so far.
    pub fn reset_level(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::ResetLevel, |state| {
            matches!(
                state,
                GameState::Playing | GameState::Paused | GameState::LevelComplete
            )
        })?;
        self.begin_attempt(out)?;
        info!(level = self.current_level.get(), "level reset");
        out.push(Event::LevelReset {
            level: self.current_level,
        });
        self.spawn_product(out);
        Ok(())
    }

    /// Moves from a completed level to the next one, or completes the game.
    pub fn next_level(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::NextLevel, |state| state == GameState::LevelComplete)?;
        self.current_level = self.current_level.next();

        if self.current_level > self.catalogs.levels().last_id() {
            self.clear_attempt();
            self.transition(GameState::GameComplete, out);
            info!(score = self.score, "game completed");
            out.push(Event::GameCompleted { score: self.score });
            return Ok(());
        }

        self.begin_attempt(out)?;
        info!(level = self.current_level.get(), "level started");
        out.push(Event::LevelStarted {
            level: self.current_level,
        });
        self.spawn_product(out);
        Ok(())
    }

    /// Returns to the menu with level progress, score and collisions cleared.
    pub fn restart_game(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.ensure(Operation::RestartGame, |state| state != GameState::Loading)?;
        let level = self.catalogs.levels().get(LevelId::FIRST)?;
        let (time_limit, max_collisions) = (level.time_limit_seconds(), level.max_collisions());

        self.current_level = LevelId::FIRST;
        self.score = 0;
        self.clear_attempt();
        self.time_remaining = time_limit;
        self.max_collisions = max_collisions;
        self.transition(GameState::Menu, out);
        info!("game restarted");
        Ok(())
    }

    /// Cancels every scheduled task and drops in-flight products.
    pub fn shutdown(&mut self) {
        self.countdown.cancel();
        self.spawn_delay.cancel();
        self.flow.clear();
        info!("session torn down");
    }

    fn on_delivered(&mut self, unit: UnitId, out: &mut Vec<Event>) -> Result<(), SessionError> {
        self.score += i64::from(self.config.delivery_reward);
        let target = self
            .catalogs
            .levels()
            .get(self.current_level)?
            .products_target();
        let delivered = self.flow.delivered_count();
        debug!(unit = unit.get(), delivered, target, score = self.score, "product delivered");
        out.push(Event::Delivered {
            unit,
            delivered,
            target,
        });

        if delivered >= target {
            self.complete_level(delivered, target, out);
        } else {
            self.spawn_delay.arm();
        }
        Ok(())
    }

    fn complete_level(&mut self, delivered: u32, target: u32, out: &mut Vec<Event>) {
        let breakdown = scoring::level_bonus(
            self.time_remaining,
            self.collision_count,
            delivered,
            target,
        );
        self.score += i64::from(breakdown.total());
        self.transition(GameState::LevelComplete, out);
        info!(
            level = self.current_level.get(),
            bonus = breakdown.total(),
            score = self.score,
            "level completed"
        );
        out.push(Event::LevelCompleted {
            level: self.current_level,
            breakdown,
            score: self.score,
        });
    }

    fn game_over(&mut self, reason: GameOverReason, out: &mut Vec<Event>) {
        self.transition(GameState::GameOver, out);
        info!(
            %reason,
            level = self.current_level.get(),
            score = self.score,
            "game over"
        );
        out.push(Event::GameOver { reason });
    }

    /// Clears the grid and products, reloads the level budgets and starts playing.
    fn begin_attempt(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        let level = self.catalogs.levels().get(self.current_level)?;
        let (time_limit, max_collisions) = (level.time_limit_seconds(), level.max_collisions());

        self.clear_attempt();
        self.collision_count = 0;
        self.time_remaining = time_limit;
        self.max_collisions = max_collisions;
        self.transition(GameState::Playing, out);
        self.countdown.arm();
        Ok(())
    }

    fn clear_attempt(&mut self) {
        self.grid.clear_all();
        self.placed.clear();
        self.flow.clear();
        self.collision_count = 0;
        self.countdown.cancel();
        self.spawn_delay.cancel();
    }

    fn spawn_product(&mut self, out: &mut Vec<Event>) {
        let position = self.grid.cell_center(self.config.start_cell);
        if let Some(unit) = self.flow.spawn(position) {
            debug!(unit = unit.get(), "product spawned");
            out.push(Event::ProductSpawned { unit, position });
        }
    }

    fn transition(&mut self, to: GameState, out: &mut Vec<Event>) {
        let from = self.state;
        if from == to {
            return;
        }
        if from == GameState::Playing {
            self.countdown.cancel();
            self.spawn_delay.cancel();
        }
        self.state = to;
        info!(?from, ?to, "game state changed");
        out.push(Event::GameStateChanged { from, to });
    }

    fn ensure(
        &self,
        operation: Operation,
        permitted: impl Fn(GameState) -> bool,
    ) -> Result<(), SessionError> {
        if permitted(self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidStateTransition {
                operation,
                state: self.state,
            })
        }
    }
}

/// Applies the provided command to the session, mutating state deterministically.
///
/// Rejected placements surface as [`Event::RobotPlacementRejected`], other
/// failures as [`Event::CommandRejected`]. Ticks outside of play are dropped
/// silently, since drivers keep ticking while the session is paused.
pub fn apply(session: &mut Session, command: Command, out_events: &mut Vec<Event>) {
    let result = match command {
        Command::ShowMenu => session.show_menu(out_events),
        Command::StartLevel { level } => session.start_level(level, out_events),
        Command::Tick { dt } => {
            if session.state != GameState::Playing {
                return;
            }
            session.tick(dt, out_events)
        }
        Command::PlaceRobot { kind, target } => {
            match session.place_robot(kind, target, out_events) {
                Ok(_) => Ok(()),
                Err(SessionError::Placement(reason)) => {
                    warn!(%kind, %reason, "robot placement rejected");
                    out_events.push(Event::RobotPlacementRejected { kind, reason });
                    Ok(())
                }
                Err(error) => Err(error),
            }
        }
        Command::RemoveRobot { cell } => session.remove_robot(cell, out_events),
        Command::RotateRobot { cell } => session.rotate_robot(cell, out_events),
        Command::AssignRoute { unit, waypoints } => session.assign_route(unit, waypoints),
        Command::RecordCollision => session.record_collision(out_events),
        Command::Pause => {
            session.pause(out_events);
            Ok(())
        }
        Command::Resume => {
            session.resume(out_events);
            Ok(())
        }
        Command::TogglePause => {
            session.toggle_pause(out_events);
            Ok(())
        }
        Command::ResetLevel => session.reset_level(out_events),
        Command::NextLevel => session.next_level(out_events),
        Command::RestartGame => session.restart_game(out_events),
        Command::Shutdown => {
            session.shutdown();
            Ok(())
        }
    };

    if let Err(reason) = result {
        warn!(%reason, "command rejected");
        out_events.push(Event::CommandRejected { reason });
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use glam::Vec3;
    use roboflow_core::{CellCoord, GameState, LevelId, SessionError};

    use super::{
        scoring, Catalogs, DeliveryUnit, GridError, Level, PlacedRobot, Session,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(session: &Session) -> &'static str {
        session.banner
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn game_state(session: &Session) -> GameState {
        session.state
    }

    /// Ordinal of the current level. Points one past the last level once the
    /// game is complete.
    #[must_use]
    pub fn current_level(session: &Session) -> LevelId {
        session.current_level
    }

    /// Catalog entry of the current level.
    pub fn level(session: &Session) -> Result<&Level, SessionError> {
        session.catalogs.levels().get(session.current_level)
    }

    /// Level and robot catalogs the session was built with.
    #[must_use]
    pub fn catalogs(session: &Session) -> &Catalogs {
        &session.catalogs
    }

    /// Current score.
    #[must_use]
    pub fn score(session: &Session) -> i64 {
        session.score
    }

    /// Whole seconds left on the countdown.
    #[must_use]
    pub fn time_remaining(session: &Session) -> u32 {
        session.time_remaining
    }

    /// Collisions charged during the current attempt.
    #[must_use]
    pub fn collision_count(session: &Session) -> u32 {
        session.collision_count
    }

    /// Highest collision count the current level tolerates.
    #[must_use]
    pub fn max_collisions(session: &Session) -> u32 {
        session.max_collisions
    }

    /// Products delivered during the current attempt.
    #[must_use]
    pub fn delivered_count(session: &Session) -> u32 {
        session.flow.delivered_count()
    }

    /// Share of the current level's delivery target met so far.
    #[must_use]
    pub fn efficiency_percent(session: &Session) -> u32 {
        level(session).map_or(0, |level| {
            scoring::efficiency_percent(delivered_count(session), level.products_target())
        })
    }

    /// Reports whether a robot stands on the cell.
    pub fn is_occupied(session: &Session, cell: CellCoord) -> Result<bool, GridError> {
        session.grid.is_occupied(cell)
    }

    /// Robot standing on the cell, if any.
    #[must_use]
    pub fn robot_at(session: &Session, cell: CellCoord) -> Option<&PlacedRobot> {
        session.grid.robot_at(cell)
    }

    /// Maps a pointer ray intersection with the ground plane to a grid cell.
    #[must_use]
    pub fn screen_to_grid_coordinate(session: &Session, intersection: Vec3) -> Option<CellCoord> {
        session.grid.screen_to_grid_coordinate(intersection)
    }

    /// Robots on the grid in placement order.
    #[must_use]
    pub fn placed_robots(session: &Session) -> Vec<PlacedRobot> {
        session
            .placed
            .iter()
            .filter_map(|cell| session.grid.robot_at(*cell).copied())
            .collect()
    }

    /// Products currently in flight.
    #[must_use]
    pub fn products(session: &Session) -> &[DeliveryUnit] {
        session.flow.units()
    }

    /// Cell where products spawn.
    #[must_use]
    pub fn start_cell(session: &Session) -> CellCoord {
        session.config.start_cell
    }

    /// Cell products are routed to.
    #[must_use]
    pub fn end_cell(session: &Session) -> CellCoord {
        session.config.end_cell
    }

    /// World-space centre of the end cell.
    #[must_use]
    pub fn end_position(session: &Session) -> Vec3 {
        session.grid.cell_center(session.config.end_cell)
    }

    /// Reports whether the countdown is running.
    #[must_use]
    pub fn countdown_running(session: &Session) -> bool {
        session.countdown.is_armed()
    }

    /// Reports whether a product spawn is scheduled.
    #[must_use]
    pub fn spawn_pending(session: &Session) -> bool {
        session.spawn_delay.is_armed()
    }
}
