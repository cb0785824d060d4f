//! Level completion bonuses.

use roboflow_core::ScoreBreakdown;

/// Points awarded per second left on the countdown.
pub const TIME_BONUS_PER_SECOND: u32 = 10;
/// Bonus for finishing a level without a single collision.
pub const COLLISION_FREE_BONUS: u32 = 500;
/// Bonus for meeting the delivery target.
pub const EFFICIENCY_BONUS: u32 = 300;

/// Computes the bonuses owed when a level ends with the provided statistics.
#[must_use]
pub fn level_bonus(
    time_remaining: u32,
    collision_count: u32,
    delivered: u32,
    products_target: u32,
) -> ScoreBreakdown {
    ScoreBreakdown {
        time_bonus: time_remaining.saturating_mul(TIME_BONUS_PER_SECOND),
        collision_bonus: if collision_count == 0 {
            COLLISION_FREE_BONUS
        } else {
            0
        },
        efficiency_bonus: if delivered >= products_target {
            EFFICIENCY_BONUS
        } else {
            0
        },
    }
}

/// Share of the delivery target met so far, rounded to a whole percent.
#[must_use]
pub fn efficiency_percent(delivered: u32, products_target: u32) -> u32 {
    if delivered == 0 || products_target == 0 {
        return 0;
    }
    (f64::from(delivered) / f64::from(products_target) * 100.0).round() as u32
}
