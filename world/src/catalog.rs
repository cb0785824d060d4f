//! Read-only level and robot catalogs.
//!
//! Catalogs are either the built-in reference set or a TOML document with the
//! same shape:
//!
//! ```toml
//! version = 1
//!
//! [[robots]]
//! id = "conveyor"
//! name = "Conveyor Belt"
//! cost = 100
//! speed = 0.02
//! capacity = 1
//! visual_tag = "#00FFFF"
//!
//! [[levels]]
//! id = 1
//! name = "First Day at the Factory"
//! description = "Learn the basics: place a conveyor belt"
//! products_target = 5
//! time_limit_seconds = 180
//! max_collisions = 3
//! robots = ["conveyor"]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use roboflow_core::{CatalogKey, LevelId, RobotKindId, SessionError};
use serde::Deserialize;

const SUPPORTED_CATALOG_VERSION: u32 = 1;

/// Errors raised while building or parsing a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The TOML document could not be parsed.
    #[error("failed to parse catalog toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document declares a version this build does not understand.
    #[error("unsupported catalog version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
    /// The catalog defines no levels.
    #[error("catalog defines no levels")]
    NoLevels,
    /// Two levels share an ordinal.
    #[error("level {0} is defined more than once")]
    DuplicateLevel(LevelId),
    /// Two robots share a kind.
    #[error("robot `{0}` is defined more than once")]
    DuplicateRobot(RobotKindId),
    /// Level ordinals do not run 1..=N without gaps.
    #[error("level ordinals must be contiguous from 1; expected {expected}, found {found}")]
    NonContiguousLevels {
        /// Ordinal that should have come next.
        expected: LevelId,
        /// Ordinal that was found instead.
        found: LevelId,
    },
    /// A level parameter is out of range.
    #[error("level {level}: {reason}")]
    InvalidLevel {
        /// Offending level.
        level: LevelId,
        /// Constraint that was violated.
        reason: &'static str,
    },
    /// A robot parameter is out of range.
    #[error("robot `{robot}`: {reason}")]
    InvalidRobot {
        /// Offending robot.
        robot: RobotKindId,
        /// Constraint that was violated.
        reason: &'static str,
    },
    /// A level unlocks a robot that the catalog does not define.
    #[error("level {level} unlocks undefined robot `{robot}`")]
    UndefinedRobot {
        /// Level naming the robot.
        level: LevelId,
        /// Robot missing from the catalog.
        robot: RobotKindId,
    },
}

/// Immutable description of a single level.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Level {
    id: LevelId,
    name: String,
    #[serde(default)]
    description: String,
    products_target: u32,
    time_limit_seconds: u32,
    max_collisions: u32,
    #[serde(rename = "robots")]
    available_robots: BTreeSet<RobotKindId>,
}

impl Level {
    /// Creates a level description.
    #[must_use]
    pub fn new(
        id: LevelId,
        name: impl Into<String>,
        description: impl Into<String>,
        products_target: u32,
        time_limit_seconds: u32,
        max_collisions: u32,
        available_robots: impl IntoIterator<Item = RobotKindId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            products_target,
            time_limit_seconds,
            max_collisions,
            available_robots: available_robots.into_iter().collect(),
        }
    }

    /// Ordinal of the level.
    #[must_use]
    pub const fn id(&self) -> LevelId {
        self.id
    }

    /// Display name of the level.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line briefing shown before the level starts.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Deliveries required to complete the level.
    #[must_use]
    pub const fn products_target(&self) -> u32 {
        self.products_target
    }

    /// Countdown budget in whole seconds.
    #[must_use]
    pub const fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    /// Highest collision count the level tolerates.
    #[must_use]
    pub const fn max_collisions(&self) -> u32 {
        self.max_collisions
    }

    /// Robot kinds that may be placed on this level.
    pub fn available_robots(&self) -> impl Iterator<Item = RobotKindId> + '_ {
        self.available_robots.iter().copied()
    }

    /// Reports whether the level unlocks the provided robot kind.
    #[must_use]
    pub fn allows(&self, kind: RobotKindId) -> bool {
        self.available_robots.contains(&kind)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.products_target < 1 {
            return Err(CatalogError::InvalidLevel {
                level: self.id,
                reason: "products_target must be at least 1",
            });
        }
        if self.time_limit_seconds == 0 {
            return Err(CatalogError::InvalidLevel {
                level: self.id,
                reason: "time_limit_seconds must be positive",
            });
        }
        Ok(())
    }
}

/// Immutable description of a robot kind.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RobotKind {
    id: RobotKindId,
    name: String,
    cost: u32,
    speed: f32,
    capacity: u32,
    visual_tag: String,
}

impl RobotKind {
    /// Creates a robot description.
    #[must_use]
    pub fn new(
        id: RobotKindId,
        name: impl Into<String>,
        cost: u32,
        speed: f32,
        capacity: u32,
        visual_tag: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            speed,
            capacity,
            visual_tag: visual_tag.into(),
        }
    }

    /// Kind described by this entry.
    #[must_use]
    pub const fn id(&self) -> RobotKindId {
        self.id
    }

    /// Display name of the robot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score debited when the robot is placed.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Handling speed in world units per frame.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Number of products the robot can carry at once.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Presentation hint, a hex colour in the reference catalog.
    #[must_use]
    pub fn visual_tag(&self) -> &str {
        &self.visual_tag
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.capacity < 1 {
            return Err(CatalogError::InvalidRobot {
                robot: self.id,
                reason: "capacity must be at least 1",
            });
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(CatalogError::InvalidRobot {
                robot: self.id,
                reason: "speed must be a finite, non-negative number",
            });
        }
        Ok(())
    }
}

/// Lookup table of levels keyed by ordinal.
#[derive(Clone, Debug)]
pub struct LevelCatalog {
    entries: BTreeMap<LevelId, Level>,
}

impl LevelCatalog {
    /// Retrieves the level with the provided ordinal.
    pub fn get(&self, id: LevelId) -> Result<&Level, SessionError> {
        self.entries
            .get(&id)
            .ok_or(SessionError::NotFound(CatalogKey::Level(id)))
    }

    /// Ordinal of the final level.
    #[must_use]
    pub fn last_id(&self) -> LevelId {
        self.entries
            .keys()
            .next_back()
            .copied()
            .unwrap_or(LevelId::FIRST)
    }

    /// Iterates over the levels in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.entries.values()
    }
}

/// Lookup table of robot kinds.
#[derive(Clone, Debug)]
pub struct RobotCatalog {
    entries: BTreeMap<RobotKindId, RobotKind>,
}

impl RobotCatalog {
    /// Retrieves the robot description for the provided kind.
    pub fn get(&self, id: RobotKindId) -> Result<&RobotKind, SessionError> {
        self.entries
            .get(&id)
            .ok_or(SessionError::NotFound(CatalogKey::Robot(id)))
    }

    /// Iterates over the robots in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &RobotKind> {
        self.entries.values()
    }
}

/// Validated pair of level and robot catalogs.
#[derive(Clone, Debug)]
pub struct Catalogs {
    levels: LevelCatalog,
    robots: RobotCatalog,
}

impl Catalogs {
    /// Builds catalogs from raw entries, validating every cross-reference.
    pub fn new(levels: Vec<Level>, robots: Vec<RobotKind>) -> Result<Self, CatalogError> {
        let mut robot_entries = BTreeMap::new();
        for robot in robots {
            robot.validate()?;
            let id = robot.id;
            if robot_entries.insert(id, robot).is_some() {
                return Err(CatalogError::DuplicateRobot(id));
            }
        }

        let mut level_entries = BTreeMap::new();
        for level in levels {
            level.validate()?;
            if let Some(robot) = level
                .available_robots()
                .find(|robot| !robot_entries.contains_key(robot))
            {
                return Err(CatalogError::UndefinedRobot {
                    level: level.id,
                    robot,
                });
            }
            let id = level.id;
            if level_entries.insert(id, level).is_some() {
                return Err(CatalogError::DuplicateLevel(id));
            }
        }

        if level_entries.is_empty() {
            return Err(CatalogError::NoLevels);
        }

        let mut expected = LevelId::FIRST;
        for found in level_entries.keys().copied() {
            if found != expected {
                return Err(CatalogError::NonContiguousLevels { expected, found });
            }
            expected = expected.next();
        }

        Ok(Self {
            levels: LevelCatalog {
                entries: level_entries,
            },
            robots: RobotCatalog {
                entries: robot_entries,
            },
        })
    }

    /// Parses and validates catalogs from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = toml::from_str(contents)?;
        if document.version != SUPPORTED_CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: document.version,
                expected: SUPPORTED_CATALOG_VERSION,
            });
        }
        Self::new(document.levels, document.robots)
    }

    /// The five-level campaign and three robot kinds the game ships with.
    #[must_use]
    pub fn reference() -> Self {
        let levels = vec![
            Level::new(
                LevelId::new(1),
                "First Day at the Factory",
                "Learn the basics: place a conveyor belt",
                5,
                180,
                3,
                [RobotKindId::Conveyor],
            ),
            Level::new(
                LevelId::new(2),
                "Ramping Up Production",
                "Use a robotic arm for extra precision",
                8,
                150,
                3,
                [RobotKindId::Conveyor, RobotKindId::Arm],
            ),
            Level::new(
                LevelId::new(3),
                "Advanced Optimisation",
                "Handle heavy loads with the forklift",
                10,
                120,
                2,
                RobotKindId::ALL,
            ),
            Level::new(
                LevelId::new(4),
                "Assembly Line",
                "Several robots working in coordination",
                12,
                100,
                2,
                RobotKindId::ALL,
            ),
            Level::new(
                LevelId::new(5),
                "Production Master",
                "The final challenge: peak efficiency, no mistakes",
                15,
                90,
                1,
                RobotKindId::ALL,
            ),
        ];
        let robots = vec![
            RobotKind::new(
                RobotKindId::Conveyor,
                "Conveyor Belt",
                100,
                0.02,
                1,
                "#00FFFF",
            ),
            RobotKind::new(RobotKindId::Arm, "Robotic Arm", 150, 0.03, 1, "#FF00FF"),
            RobotKind::new(RobotKindId::Forklift, "Forklift", 200, 0.015, 3, "#FFFF00"),
        ];

        Self {
            levels: LevelCatalog {
                entries: levels.into_iter().map(|level| (level.id, level)).collect(),
            },
            robots: RobotCatalog {
                entries: robots.into_iter().map(|robot| (robot.id, robot)).collect(),
            },
        }
    }

    /// Level lookup table.
    #[must_use]
    pub fn levels(&self) -> &LevelCatalog {
        &self.levels
    }

    /// Robot lookup table.
    #[must_use]
    pub fn robots(&self) -> &RobotCatalog {
        &self.robots
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: u32,
    #[serde(default)]
    levels: Vec<Level>,
    #[serde(default)]
    robots: Vec<RobotKind>,
}
