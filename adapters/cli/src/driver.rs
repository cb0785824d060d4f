//! Headless driver that feeds commands into a session and logs what happens.

use std::time::Duration;

use glam::Vec3;
use roboflow_core::{Command, Event, GameState, LevelId};
use roboflow_system_builder::{Builder, BuilderInput};
use roboflow_world::{self as world, query, PlacedRobot, Session};
use tracing::{debug, info, warn};

use crate::script::Step;

/// Owns the session together with the systems that observe it.
#[derive(Debug)]
pub(crate) struct Driver {
    session: Session,
    builder: Builder,
    dt: Duration,
}

impl Driver {
    /// Wraps a session that will be advanced in steps of `dt`.
    pub(crate) fn new(session: Session, dt: Duration) -> Self {
        Self {
            session,
            builder: Builder::new(),
            dt,
        }
    }

    /// Read-only access to the driven session.
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Applies a command, logs the resulting events and shows them to the builder.
    pub(crate) fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.session, command, &mut events);
        for event in &events {
            log_event(event);
        }

        let mut ignored = Vec::new();
        self.builder
            .handle(&events, BuilderInput::default(), |_| None, &mut ignored);
    }

    /// Replays a single scripted step.
    pub(crate) fn run_step(&mut self, step: &Step) {
        match step {
            Step::ShowMenu => self.submit(Command::ShowMenu),
            Step::StartLevel { level } => self.submit(Command::StartLevel {
                level: LevelId::new(*level),
            }),
            Step::Tick { ms, repeat } => {
                for _ in 0..*repeat {
                    self.submit(Command::Tick {
                        dt: Duration::from_millis(*ms),
                    });
                }
            }
            Step::Click { tool, robot, x, z } => {
                let Ok(tool) = tool.build_tool(*robot) else {
                    warn!(?step, "skipping click without a robot");
                    return;
                };
                let point = Vec3::new(*x, 0.0, *z);
                let input = BuilderInput::new(
                    tool,
                    true,
                    Some(point),
                    query::screen_to_grid_coordinate(&self.session, point),
                );
                self.click(input);
            }
            Step::RouteToEnd => self.route_to_end(),
            Step::Collide => self.submit(Command::RecordCollision),
            Step::TogglePause => self.submit(Command::TogglePause),
            Step::Reset => self.submit(Command::ResetLevel),
            Step::NextLevel => self.submit(Command::NextLevel),
            Step::Restart => self.submit(Command::RestartGame),
        }
    }

    /// Plays the campaign unattended for at most `ticks` ticks.
    ///
    /// Every product is routed straight to the end cell and completed levels
    /// are followed by the next one. Returns the number of ticks consumed.
    pub(crate) fn autoplay(&mut self, ticks: u32) -> u32 {
        if query::game_state(&self.session) == GameState::Loading {
            self.submit(Command::ShowMenu);
        }
        if query::game_state(&self.session) == GameState::Menu {
            self.submit(Command::StartLevel {
                level: LevelId::FIRST,
            });
        }

        let mut consumed = 0;
        while consumed < ticks {
            match query::game_state(&self.session) {
                GameState::Playing => {
                    self.route_to_end();
                    self.submit(Command::Tick { dt: self.dt });
                    consumed += 1;
                }
                GameState::LevelComplete => self.submit(Command::NextLevel),
                state => {
                    debug!(?state, "autoplay finished");
                    break;
                }
            }
        }
        consumed
    }

    /// Advances a running level by `ticks` fixed steps without player input.
    pub(crate) fn idle(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.submit(Command::Tick { dt: self.dt });
        }
    }

    /// Tears the session down.
    pub(crate) fn shutdown(&mut self) {
        self.submit(Command::Shutdown);
    }

    fn click(&mut self, input: BuilderInput) {
        let mut commands = Vec::new();
        let session = &self.session;
        self.builder.handle(
            &[],
            input,
            |cell| query::robot_at(session, cell).map(PlacedRobot::kind),
            &mut commands,
        );
        for command in commands {
            self.submit(command);
        }
    }

    fn route_to_end(&mut self) {
        let end = query::end_position(&self.session);
        let unrouted: Vec<_> = query::products(&self.session)
            .iter()
            .filter(|product| product.path().is_empty())
            .map(|product| product.id())
            .collect();
        for unit in unrouted {
            self.submit(Command::AssignRoute {
                unit,
                waypoints: vec![end],
            });
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::GameStateChanged { from, to } => debug!(?from, ?to, "state changed"),
        Event::LevelStarted { level } => info!(%level, "level started"),
        Event::LevelReset { level } => info!(%level, "level reset"),
        Event::RobotPlaced { kind, cell, cost } => info!(%kind, %cell, cost, "robot placed"),
        Event::RobotPlacementRejected { kind, reason } => {
            warn!(%kind, %reason, "placement rejected");
        }
        Event::RobotRemoved { kind, cell } => info!(%kind, %cell, "robot removed"),
        Event::RobotRotated { cell, rotation } => info!(
            %cell,
            ?rotation,
            quarter_turns = rotation.quarter_turns(),
            "robot rotated"
        ),
        Event::ProductSpawned { unit, position } => {
            debug!(unit = unit.get(), ?position, "product spawned");
        }
        Event::Delivered {
            delivered, target, ..
        } => info!(delivered, target, "product delivered"),
        Event::CountdownAdvanced { remaining } => debug!(remaining, "countdown"),
        Event::CollisionRecorded { count, limit } => warn!(count, limit, "collision"),
        Event::LevelCompleted {
            level,
            breakdown,
            score,
        } => info!(
            %level,
            time_bonus = breakdown.time_bonus,
            collision_bonus = breakdown.collision_bonus,
            efficiency_bonus = breakdown.efficiency_bonus,
            score,
            "level complete"
        ),
        Event::GameOver { reason } => info!(%reason, "game over"),
        Event::GameCompleted { score } => info!(score, "game complete"),
        Event::CommandRejected { reason } => warn!(%reason, "command rejected"),
    }
}
