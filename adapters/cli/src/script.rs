//! Scripted play sessions loaded from TOML.
//!
//! ```toml
//! version = 1
//!
//! [[steps]]
//! action = "start_level"
//! level = 1
//!
//! [[steps]]
//! action = "click"
//! tool = "place"
//! robot = "conveyor"
//! x = 1.2
//! z = 2.7
//!
//! [[steps]]
//! action = "tick"
//! ms = 500
//! repeat = 20
//! ```

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use roboflow_core::RobotKindId;
use roboflow_system_builder::BuildTool;
use serde::Deserialize;

const SUPPORTED_SCRIPT_VERSION: u32 = 1;

/// Ordered list of player actions replayed against a session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct Script {
    version: u32,
    #[serde(default)]
    steps: Vec<Step>,
}

impl Script {
    /// Reads and validates a script file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid script {}", path.display()))
    }

    /// Parses and validates a script document.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let script: Self = toml::from_str(contents).context("failed to parse script toml")?;
        if script.version != SUPPORTED_SCRIPT_VERSION {
            bail!(
                "script version {} is not supported (expected {SUPPORTED_SCRIPT_VERSION})",
                script.version
            );
        }
        for (index, step) in script.steps.iter().enumerate() {
            if let Step::Click { tool, robot, .. } = step {
                let _ = tool
                    .build_tool(*robot)
                    .with_context(|| format!("step {} is malformed", index + 1))?;
            }
        }
        Ok(script)
    }

    /// Steps in replay order.
    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// A single scripted action.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    /// Leaves the loading screen or a finished run for the menu.
    ShowMenu,
    /// Starts a level from the menu.
    StartLevel { level: u32 },
    /// Advances time by `ms`, `repeat` times over.
    Tick {
        ms: u64,
        #[serde(default = "default_repeat")]
        repeat: u32,
    },
    /// Clicks the ground at `(x, z)` with the selected tool.
    Click {
        #[serde(default)]
        tool: ClickTool,
        #[serde(default)]
        robot: Option<RobotKindId>,
        x: f32,
        z: f32,
    },
    /// Routes the product in flight straight to the end cell.
    RouteToEnd,
    /// Reports a collision from the physics layer.
    Collide,
    /// Toggles the pause button.
    TogglePause,
    /// Retries the current level.
    Reset,
    /// Continues to the next level.
    NextLevel,
    /// Returns to the menu with progress cleared.
    Restart,
}

fn default_repeat() -> u32 {
    1
}

/// Toolbar tool used by a scripted click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ClickTool {
    /// Buys and places the robot named by the step.
    #[default]
    Place,
    /// Rotates the clicked robot.
    Rotate,
    /// Removes the clicked robot.
    Delete,
}

impl ClickTool {
    /// Resolves the builder tool, requiring a robot kind for placements.
    pub(crate) fn build_tool(self, robot: Option<RobotKindId>) -> Result<BuildTool> {
        match (self, robot) {
            (Self::Place, Some(kind)) => Ok(BuildTool::Place(kind)),
            (Self::Place, None) => bail!("place clicks must name a robot"),
            (Self::Rotate, _) => Ok(BuildTool::Rotate),
            (Self::Delete, _) => Ok(BuildTool::Delete),
        }
    }
}
