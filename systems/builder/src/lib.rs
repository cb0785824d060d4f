#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure build-tool system responsible for emitting robot placement, rotation and removal commands.

use glam::Vec3;
use roboflow_core::{CellCoord, Command, Event, GameState, PlacementTarget, RobotKindId};

/// Tool currently selected in the build toolbar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildTool {
    /// Purchases and places a robot of the given kind.
    Place(RobotKindId),
    /// Turns the hovered robot a quarter turn clockwise.
    Rotate,
    /// Removes the hovered robot.
    Delete,
}

impl Default for BuildTool {
    fn default() -> Self {
        Self::Place(RobotKindId::Conveyor)
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BuilderInput {
    /// Tool selected when the frame was captured.
    pub tool: BuildTool,
    /// Indicates whether the player clicked the ground on this frame.
    pub confirm_action: bool,
    /// Point where the pointer ray meets the ground plane, if it does.
    pub cursor_ground: Option<Vec3>,
    /// Cell beneath the pointer, as resolved by the session grid.
    pub cursor_cell: Option<CellCoord>,
}

impl BuilderInput {
    /// Creates a new input descriptor with explicit field values.
    #[must_use]
    pub const fn new(
        tool: BuildTool,
        confirm_action: bool,
        cursor_ground: Option<Vec3>,
        cursor_cell: Option<CellCoord>,
    ) -> Self {
        Self {
            tool,
            confirm_action,
            cursor_ground,
            cursor_cell,
        }
    }
}

/// Build-tool system that translates pointer input into grid commands.
#[derive(Debug, Clone)]
pub struct Builder {
    state: GameState,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new builder system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: GameState::Loading,
        }
    }

    /// Consumes session events and adapter-derived input to emit build commands.
    ///
    /// The `robot_at` closure should mirror the semantics of the session's
    /// `query::robot_at` helper so the system can identify the hovered robot.
    /// Placement requests are forwarded unvalidated; the session rejects them
    /// with a reason the presentation layer can surface.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        input: BuilderInput,
        mut robot_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<RobotKindId>,
    {
        for event in events {
            if let Event::GameStateChanged { to, .. } = event {
                self.state = *to;
            }
        }

        if self.state != GameState::Playing || !input.confirm_action {
            return;
        }

        match input.tool {
            BuildTool::Place(kind) => {
                if let Some(point) = input.cursor_ground {
                    out.push(Command::PlaceRobot {
                        kind,
                        target: PlacementTarget::Ground(point),
                    });
                }
            }
            BuildTool::Rotate => {
                if let Some(cell) = hovered_robot(input.cursor_cell, &mut robot_at) {
                    out.push(Command::RotateRobot { cell });
                }
            }
            BuildTool::Delete => {
                if let Some(cell) = hovered_robot(input.cursor_cell, &mut robot_at) {
                    out.push(Command::RemoveRobot { cell });
                }
            }
        }
    }

    /// State last announced by the session.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }
}

fn hovered_robot<F>(cursor_cell: Option<CellCoord>, robot_at: &mut F) -> Option<CellCoord>
where
    F: FnMut(CellCoord) -> Option<RobotKindId>,
{
    let cell = cursor_cell?;
    robot_at(cell).map(|_| cell)
}
