#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure presentation-model system that prepares the RoboFlow heads-up display.

use roboflow_core::{GameState, LevelId, RobotKindId};
use roboflow_world::{query, Session};

/// Countdown value at or below which the timer is flagged as running low.
pub const LOW_TIME_THRESHOLD_SECONDS: u32 = 30;

/// Toolbar entry describing whether a robot kind can be bought right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotButton {
    /// Kind the button purchases.
    pub kind: RobotKindId,
    /// Display name of the robot.
    pub name: String,
    /// Score debited on purchase.
    pub cost: u32,
    /// Colour tag used to tint the robot.
    pub visual_tag: String,
    /// Whether the current level unlocks the kind.
    pub unlocked: bool,
    /// Whether the current score covers the cost.
    pub affordable: bool,
}

/// Everything the HUD displays for a single frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HudSnapshot {
    /// Lifecycle state of the session.
    pub state: GameState,
    /// Whether the run ended and only a restart or the menu remain.
    pub run_over: bool,
    /// Ordinal of the current level.
    pub level: LevelId,
    /// Name of the current level, empty once the campaign is over.
    pub level_name: String,
    /// One-line description of the current level.
    pub level_description: String,
    /// Score with thousands separators, never below zero.
    pub score: String,
    /// Countdown formatted as `mm:ss`.
    pub timer: String,
    /// Whether the countdown is at or below the warning threshold.
    pub low_time: bool,
    /// Collisions charged so far.
    pub collisions: u32,
    /// Collisions the level still tolerates.
    pub collisions_remaining: u32,
    /// Products delivered during the attempt.
    pub delivered: u32,
    /// Deliveries required to finish the level.
    pub products_target: u32,
    /// Share of the target delivered, in whole percent.
    pub efficiency_percent: u32,
    /// Robot toolbar in catalog order.
    pub robots: Vec<RobotButton>,
}

/// Produces the data required to draw the heads-up display.
#[derive(Debug, Default)]
pub struct Hud;

impl Hud {
    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner(&self, session: &Session) -> &'static str {
        query::welcome_banner(session)
    }

    /// Captures the current HUD contents from the session.
    #[must_use]
    pub fn snapshot(&self, session: &Session) -> HudSnapshot {
        let level = query::level(session).ok();
        let score = query::score(session);
        let time_remaining = query::time_remaining(session);
        let collisions = query::collision_count(session);

        let robots = query::catalogs(session)
            .robots()
            .iter()
            .map(|robot| RobotButton {
                kind: robot.id(),
                name: robot.name().to_owned(),
                cost: robot.cost(),
                visual_tag: robot.visual_tag().to_owned(),
                unlocked: level.is_some_and(|level| level.allows(robot.id())),
                affordable: score >= i64::from(robot.cost()),
            })
            .collect();

        let state = query::game_state(session);
        HudSnapshot {
            state,
            run_over: state.is_terminal(),
            level: query::current_level(session),
            level_name: level.map(|level| level.name().to_owned()).unwrap_or_default(),
            level_description: level
                .map(|level| level.description().to_owned())
                .unwrap_or_default(),
            score: format_score(score),
            timer: format_timer(time_remaining),
            low_time: time_remaining <= LOW_TIME_THRESHOLD_SECONDS,
            collisions,
            collisions_remaining: query::max_collisions(session).saturating_sub(collisions),
            delivered: query::delivered_count(session),
            products_target: level.map_or(0, |level| level.products_target()),
            efficiency_percent: query::efficiency_percent(session),
            robots,
        }
    }
}

/// Formats whole seconds as zero-padded `mm:ss`.
#[must_use]
pub fn format_timer(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Formats a score with comma thousands separators, clamping negatives to zero.
#[must_use]
pub fn format_score(score: i64) -> String {
    let digits = score.max(0).to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    formatted
}
