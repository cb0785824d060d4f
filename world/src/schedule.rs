//! Cancellable timers driven by the session clock.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cadence {
    Repeating,
    OneShot,
}

/// Timer owned by the session and advanced only by its ticks.
///
/// A task does nothing until armed. Cancelling drops any accumulated time, so
/// re-arming always starts a fresh period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    period: Duration,
    cadence: Cadence,
    elapsed: Option<Duration>,
}

impl ScheduledTask {
    /// Creates a disarmed task firing once every `period` while armed.
    #[must_use]
    pub const fn repeating(period: Duration) -> Self {
        Self {
            period,
            cadence: Cadence::Repeating,
            elapsed: None,
        }
    }

    /// Creates a disarmed task firing once, `delay` after being armed.
    #[must_use]
    pub const fn one_shot(delay: Duration) -> Self {
        Self {
            period: delay,
            cadence: Cadence::OneShot,
            elapsed: None,
        }
    }

    /// Starts a fresh period.
    pub fn arm(&mut self) {
        self.elapsed = Some(Duration::ZERO);
    }

    /// Disarms the task and drops any accumulated time.
    pub fn cancel(&mut self) {
        self.elapsed = None;
    }

    /// Reports whether the task is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.elapsed.is_some()
    }

    /// Accumulates `dt` and returns how many times the task fired.
    ///
    /// Repeating tasks fire once per whole period elapsed, clamped to
    /// `u32::MAX`; one-shot tasks fire at most once and disarm themselves. A
    /// zero period never fires.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        let Some(elapsed) = self.elapsed.as_mut() else {
            return 0;
        };
        if self.period.is_zero() {
            return 0;
        }

        *elapsed = elapsed.saturating_add(dt);
        match self.cadence {
            Cadence::Repeating => {
                let period = self.period.as_nanos();
                let fired = elapsed.as_nanos() / period;
                let remainder = elapsed.as_nanos() % period;
                *elapsed = Duration::from_nanos(u64::try_from(remainder).unwrap_or(u64::MAX));
                u32::try_from(fired).unwrap_or(u32::MAX)
            }
            Cadence::OneShot => {
                if *elapsed >= self.period {
                    self.elapsed = None;
                    1
                } else {
                    0
                }
            }
        }
    }
}
