#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the RoboFlow engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative game session, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the session executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for the
//! presentation layer to react to. Systems consume event streams, query
//! immutable snapshots, and respond exclusively with new command batches.

use std::{fmt, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to RoboFlow.";

/// Lifecycle states of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Collaborators are still being composed; nothing is playable yet.
    Loading,
    /// The start screen is shown and a level may be started.
    Menu,
    /// A level is running and accepts ticks, placements and collisions.
    Playing,
    /// A level is frozen; neither the countdown nor products advance.
    Paused,
    /// The current level's delivery target was met.
    LevelComplete,
    /// The level was lost; only a restart or a return to the menu is possible.
    GameOver,
    /// Every level in the catalog was completed.
    GameComplete,
}

impl GameState {
    /// Reports whether the state only accepts a restart or a return to the menu.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::GameComplete)
    }

    /// Reports whether a level is loaded and running or frozen.
    #[must_use]
    pub const fn is_in_level(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the loading screen, or a finished run, for the start menu.
    ShowMenu,
    /// Starts a fresh run at the provided level.
    StartLevel {
        /// Ordinal of the level to load.
        level: LevelId,
    },
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a robot at the provided target.
    PlaceRobot {
        /// Kind of robot to purchase and place.
        kind: RobotKindId,
        /// Cell or ground-plane point where the robot should be placed.
        target: PlacementTarget,
    },
    /// Removes the robot standing on the provided cell.
    RemoveRobot {
        /// Cell holding the robot.
        cell: CellCoord,
    },
    /// Rotates the robot standing on the provided cell a quarter turn clockwise.
    RotateRobot {
        /// Cell holding the robot.
        cell: CellCoord,
    },
    /// Hands an in-flight product the ordered waypoints it should follow.
    AssignRoute {
        /// Identifier of the product receiving the route.
        unit: UnitId,
        /// Waypoints expressed in world units on the ground plane.
        waypoints: Vec<Vec3>,
    },
    /// Charges one collision against the level's collision budget.
    RecordCollision,
    /// Freezes a running level.
    Pause,
    /// Resumes a frozen level.
    Resume,
    /// Pauses a running level or resumes a frozen one.
    TogglePause,
    /// Restarts the current level while keeping the accumulated score.
    ResetLevel,
    /// Advances from a completed level to the next one.
    NextLevel,
    /// Returns to the menu with the score and level progress cleared.
    RestartGame,
    /// Tears the session down, cancelling every scheduled task.
    Shutdown,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the session entered a new state.
    GameStateChanged {
        /// State that was active before the transition.
        from: GameState,
        /// State that became active.
        to: GameState,
    },
    /// Confirms that a level was loaded and is now playing.
    LevelStarted {
        /// Ordinal of the loaded level.
        level: LevelId,
    },
    /// Confirms that a robot was purchased and placed on the grid.
    RobotPlaced {
        /// Kind of robot that was placed.
        kind: RobotKindId,
        /// Cell the robot now occupies.
        cell: CellCoord,
        /// Score debited for the purchase.
        cost: u32,
    },
    /// Reports that a robot placement request was rejected.
    RobotPlacementRejected {
        /// Kind of robot requested for placement.
        kind: RobotKindId,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a robot was removed from the grid.
    RobotRemoved {
        /// Kind of robot that was removed.
        kind: RobotKindId,
        /// Cell the robot previously occupied.
        cell: CellCoord,
    },
    /// Confirms that a placed robot changed orientation.
    RobotRotated {
        /// Cell holding the robot.
        cell: CellCoord,
        /// Orientation after the rotation.
        rotation: Rotation,
    },
    /// Confirms that a product appeared at the start point.
    ProductSpawned {
        /// Identifier assigned to the product.
        unit: UnitId,
        /// World-space position of the product.
        position: Vec3,
    },
    /// Reports that a product reached the end of its route.
    Delivered {
        /// Identifier of the delivered product.
        unit: UnitId,
        /// Number of products delivered during the current attempt.
        delivered: u32,
        /// Number of deliveries required to complete the level.
        target: u32,
    },
    /// Reports that one whole second elapsed on the level countdown.
    CountdownAdvanced {
        /// Seconds left after the decrement.
        remaining: u32,
    },
    /// Reports that a collision was charged against the level budget.
    CollisionRecorded {
        /// Collisions charged during the current attempt.
        count: u32,
        /// Highest collision count the level tolerates.
        limit: u32,
    },
    /// Confirms that the current level was restarted.
    LevelReset {
        /// Ordinal of the restarted level.
        level: LevelId,
    },
    /// Reports that the level target was met and bonuses were awarded.
    LevelCompleted {
        /// Ordinal of the completed level.
        level: LevelId,
        /// Bonuses added to the score.
        breakdown: ScoreBreakdown,
        /// Score after the bonuses were applied.
        score: i64,
    },
    /// Reports that the level was lost.
    GameOver {
        /// Condition that ended the level.
        reason: GameOverReason,
    },
    /// Reports that the final level was completed.
    GameCompleted {
        /// Final score of the run.
        score: i64,
    },
    /// Reports that a command other than a placement was rejected.
    CommandRejected {
        /// Specific reason the command failed.
        reason: SessionError,
    },
}

/// Ordinal identifying a level, starting at one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LevelId(u32);

impl LevelId {
    /// Ordinal of the first level.
    pub const FIRST: Self = Self(1);

    /// Creates a new level identifier with the provided ordinal.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric ordinal of the level.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Ordinal of the level that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Types of robots that can be placed on the production grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RobotKindId {
    /// Belt that moves products in a straight line.
    Conveyor,
    /// Articulated arm for precise handling.
    Arm,
    /// Forklift for heavy, bulky loads.
    Forklift,
}

impl RobotKindId {
    /// Every robot kind in catalog order.
    pub const ALL: [Self; 3] = [Self::Conveyor, Self::Arm, Self::Forklift];

    /// Stable lowercase identifier used in catalogs and scripts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conveyor => "conveyor",
            Self::Arm => "arm",
            Self::Forklift => "forklift",
        }
    }
}

impl fmt::Display for RobotKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier assigned to a product travelling through the factory.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new product identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as `x` and `z` indices.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    x: u32,
    z: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }

    /// Zero-based index along the grid's x axis.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based index along the grid's z axis.
    #[must_use]
    pub const fn z(&self) -> u32 {
        self.z
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Where a placement request should land.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlacementTarget {
    /// A cell already resolved by the caller.
    Cell(CellCoord),
    /// A raw pointer ray intersection with the ground plane.
    Ground(Vec3),
}

/// Cardinal orientation of a placed robot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// Facing toward decreasing z.
    #[default]
    North,
    /// Facing toward increasing x.
    East,
    /// Facing toward increasing z.
    South,
    /// Facing toward decreasing x.
    West,
}

impl Rotation {
    /// Orientation reached after a quarter turn clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Number of clockwise quarter turns away from [`Rotation::North`].
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }
}

/// Bonuses awarded when a level's delivery target is met.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Ten points for every second left on the countdown.
    pub time_bonus: u32,
    /// Awarded when the level finished without a single collision.
    pub collision_bonus: u32,
    /// Awarded when the delivery target was met.
    pub efficiency_bonus: u32,
}

impl ScoreBreakdown {
    /// Sum of every bonus in the breakdown, saturating at `u32::MAX`.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.time_bonus
            .saturating_add(self.collision_bonus)
            .saturating_add(self.efficiency_bonus)
    }
}

/// Conditions that end a level in defeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// The countdown reached zero.
    TimeExpired,
    /// More collisions were recorded than the level tolerates.
    CollisionLimitExceeded,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeExpired => f.write_str("time expired"),
            Self::CollisionLimitExceeded => f.write_str("collision limit exceeded"),
        }
    }
}

/// Reasons a robot placement request may be rejected.
///
/// Checks run in declaration order: availability, then funds, then the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum PlacementError {
    /// The current level does not unlock the requested robot kind.
    #[error("robot kind `{kind}` is not available on this level")]
    KindNotAvailable {
        /// Kind that was requested.
        kind: RobotKindId,
    },
    /// The score does not cover the robot's cost.
    #[error("insufficient score: {score} available, {cost} required")]
    InsufficientScore {
        /// Score at the time of the request.
        score: i64,
        /// Cost of the requested robot.
        cost: u32,
    },
    /// The target lies outside the grid or on an occupied cell.
    #[error("invalid or occupied position")]
    InvalidCell,
}

/// Session operations, used to report which request hit a forbidden state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// [`Command::ShowMenu`].
    ShowMenu,
    /// [`Command::StartLevel`].
    StartLevel,
    /// [`Command::Tick`].
    Tick,
    /// [`Command::PlaceRobot`].
    PlaceRobot,
    /// [`Command::RemoveRobot`].
    RemoveRobot,
    /// [`Command::RotateRobot`].
    RotateRobot,
    /// [`Command::AssignRoute`].
    AssignRoute,
    /// [`Command::RecordCollision`].
    RecordCollision,
    /// [`Command::ResetLevel`].
    ResetLevel,
    /// [`Command::NextLevel`].
    NextLevel,
    /// [`Command::RestartGame`].
    RestartGame,
}

/// Catalog entry that a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogKey {
    /// A level ordinal.
    Level(LevelId),
    /// A robot kind.
    Robot(RobotKindId),
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => write!(f, "level {level}"),
            Self::Robot(kind) => write!(f, "robot `{kind}`"),
        }
    }
}

/// Errors returned by session operations.
///
/// Every error is recoverable: a failed operation leaves the session untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum SessionError {
    /// A catalog lookup missed.
    #[error("{0} is not defined in the catalog")]
    NotFound(CatalogKey),
    /// A cell lies outside the grid.
    #[error("cell {0} lies outside the grid")]
    OutOfBounds(CellCoord),
    /// A cell already holds a robot.
    #[error("cell {0} is already occupied")]
    CellOccupied(CellCoord),
    /// A cell holds no robot to act on.
    #[error("cell {0} holds no robot")]
    EmptyCell(CellCoord),
    /// A route was addressed to a product that is not in flight.
    #[error("product {} is not in flight", .0.get())]
    UnknownUnit(UnitId),
    /// A robot placement failed validation.
    #[error(transparent)]
    Placement(#[from] PlacementError),
    /// The operation is not permitted in the current state.
    #[error("{operation:?} is not permitted while {state:?}")]
    InvalidStateTransition {
        /// Operation that was attempted.
        operation: Operation,
        /// State the session was in.
        state: GameState,
    },
}

#[cfg(test)]
mod tests {
    use super::{
        CatalogKey, CellCoord, GameOverReason, GameState, LevelId, Operation, PlacementError,
        RobotKindId, Rotation, ScoreBreakdown, SessionError,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn rotation_cycles_clockwise_through_all_orientations() {
        let mut rotation = Rotation::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rotation.quarter_turns());
            rotation = rotation.clockwise();
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(rotation, Rotation::North);
    }

    #[test]
    fn score_breakdown_total_sums_every_bonus() {
        let breakdown = ScoreBreakdown {
            time_bonus: 450,
            collision_bonus: 500,
            efficiency_bonus: 300,
        };
        assert_eq!(breakdown.total(), 1250);
    }

    #[test]
    fn score_breakdown_total_saturates() {
        let breakdown = ScoreBreakdown {
            time_bonus: u32::MAX,
            collision_bonus: 500,
            efficiency_bonus: 300,
        };
        assert_eq!(breakdown.total(), u32::MAX);
    }

    #[test]
    fn game_over_reasons_render_presentation_text() {
        assert_eq!(GameOverReason::TimeExpired.to_string(), "time expired");
        assert_eq!(
            GameOverReason::CollisionLimitExceeded.to_string(),
            "collision limit exceeded"
        );
    }

    #[test]
    fn terminal_states_are_game_over_and_game_complete() {
        assert!(GameState::GameOver.is_terminal());
        assert!(GameState::GameComplete.is_terminal());
        assert!(!GameState::LevelComplete.is_terminal());
        assert!(GameState::Paused.is_in_level());
        assert!(!GameState::Menu.is_in_level());
    }

    #[test]
    fn robot_kind_identifiers_match_catalog_names() {
        let names: Vec<_> = RobotKindId::ALL.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(names, vec!["conveyor", "arm", "forklift"]);
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::InsufficientScore {
            score: 40,
            cost: 100,
        });
    }

    #[test]
    fn session_error_round_trips_through_bincode() {
        assert_round_trip(&SessionError::InvalidStateTransition {
            operation: Operation::PlaceRobot,
            state: GameState::Paused,
        });
        assert_round_trip(&SessionError::NotFound(CatalogKey::Level(LevelId::new(9))));
        assert_round_trip(&SessionError::OutOfBounds(CellCoord::new(10, 3)));
    }

    #[test]
    fn session_error_messages_name_the_offending_input() {
        let error = SessionError::CellOccupied(CellCoord::new(2, 3));
        assert_eq!(error.to_string(), "cell (2, 3) is already occupied");

        let error = SessionError::from(PlacementError::KindNotAvailable {
            kind: RobotKindId::Forklift,
        });
        assert_eq!(
            error.to_string(),
            "robot kind `forklift` is not available on this level"
        );
    }
}
