//! Occupancy tracking over the fixed production grid.

use glam::Vec3;
use roboflow_core::{CellCoord, RobotKindId, Rotation, SessionError};

/// Errors raised by grid access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The cell lies outside the grid.
    #[error("cell {0} lies outside the grid")]
    OutOfBounds(CellCoord),
    /// The cell already holds a robot.
    #[error("cell {0} is already occupied")]
    CellOccupied(CellCoord),
}

impl From<GridError> for SessionError {
    fn from(error: GridError) -> Self {
        match error {
            GridError::OutOfBounds(cell) => Self::OutOfBounds(cell),
            GridError::CellOccupied(cell) => Self::CellOccupied(cell),
        }
    }
}

/// Robot bound to a grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedRobot {
    kind: RobotKindId,
    position: CellCoord,
    rotation: Rotation,
    active: bool,
}

impl PlacedRobot {
    /// Creates an active, north-facing robot at the provided cell.
    #[must_use]
    pub const fn new(kind: RobotKindId, position: CellCoord) -> Self {
        Self {
            kind,
            position,
            rotation: Rotation::North,
            active: true,
        }
    }

    /// Kind of the robot.
    #[must_use]
    pub const fn kind(&self) -> RobotKindId {
        self.kind
    }

    /// Cell the robot stands on.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Current orientation.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Whether the robot takes part in the simulation.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    /// Turns the robot a quarter turn clockwise and returns the new orientation.
    pub fn rotate_clockwise(&mut self) -> Rotation {
        self.rotation = self.rotation.clockwise();
        self.rotation
    }
}

/// Single cell of the production grid. Occupied exactly when it holds a robot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridCell {
    robot: Option<PlacedRobot>,
}

impl GridCell {
    /// Reports whether a robot stands on the cell.
    #[must_use]
    pub const fn occupied(&self) -> bool {
        self.robot.is_some()
    }

    /// Robot standing on the cell, if any.
    #[must_use]
    pub const fn placed_robot(&self) -> Option<&PlacedRobot> {
        self.robot.as_ref()
    }
}

/// Square grid of cells laid out on the ground plane, centred on the origin.
#[derive(Clone, Debug)]
pub struct GridModel {
    size: u32,
    cell_size: f32,
    cells: Vec<GridCell>,
}

impl GridModel {
    /// Creates an empty `size` x `size` grid.
    #[must_use]
    pub fn new(size: u32, cell_size: f32) -> Self {
        let capacity_u64 = u64::from(size) * u64::from(size);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            size,
            cell_size,
            cells: vec![GridCell::default(); capacity],
        }
    }

    /// Edge length of the whole grid in world units.
    #[must_use]
    pub fn extent(&self) -> f32 {
        self.size as f32 * self.cell_size
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether a robot stands on the cell.
    pub fn is_occupied(&self, cell: CellCoord) -> Result<bool, GridError> {
        Ok(self.cell(cell)?.occupied())
    }

    /// Read access to a single cell.
    pub fn cell(&self, cell: CellCoord) -> Result<&GridCell, GridError> {
        self.index(cell)
            .and_then(|index| self.cells.get(index))
            .ok_or(GridError::OutOfBounds(cell))
    }

    /// Binds a robot to an empty cell.
    pub fn place(&mut self, cell: CellCoord, robot: PlacedRobot) -> Result<(), GridError> {
        let slot = self.cell_mut(cell)?;
        if slot.occupied() {
            return Err(GridError::CellOccupied(cell));
        }
        slot.robot = Some(robot);
        Ok(())
    }

    /// Empties the cell, returning the robot that stood on it. Clearing an empty
    /// cell is a no-op.
    pub fn clear(&mut self, cell: CellCoord) -> Result<Option<PlacedRobot>, GridError> {
        Ok(self.cell_mut(cell)?.robot.take())
    }

    /// Empties every cell.
    pub fn clear_all(&mut self) {
        self.cells.fill(GridCell::default());
    }

    /// Robot standing on the cell, if the cell exists and is occupied.
    #[must_use]
    pub fn robot_at(&self, cell: CellCoord) -> Option<&PlacedRobot> {
        self.cell(cell).ok().and_then(GridCell::placed_robot)
    }

    /// Mutable access to the robot standing on the cell.
    pub fn robot_at_mut(&mut self, cell: CellCoord) -> Option<&mut PlacedRobot> {
        self.cell_mut(cell).ok().and_then(|slot| slot.robot.as_mut())
    }

    /// Maps a ground-plane ray intersection to the cell beneath it.
    ///
    /// Each axis uses `round((coord + extent / 2) / cell_size) - 1`, with halves
    /// rounding up. Results outside `[0, size)` on either axis, and non-finite
    /// input, yield `None`.
    #[must_use]
    pub fn screen_to_grid_coordinate(&self, intersection: Vec3) -> Option<CellCoord> {
        let x = self.axis_index(intersection.x)?;
        let z = self.axis_index(intersection.z)?;
        Some(CellCoord::new(x, z))
    }

    /// World-space centre of a cell on the ground plane.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec3 {
        let half = self.size as f32 / 2.0;
        Vec3::new(
            (cell.x() as f32 - half) * self.cell_size + self.cell_size / 2.0,
            0.0,
            (cell.z() as f32 - half) * self.cell_size + self.cell_size / 2.0,
        )
    }

    fn axis_index(&self, coord: f32) -> Option<u32> {
        if !coord.is_finite() || self.cell_size <= 0.0 {
            return None;
        }
        let scaled = (coord + self.extent() / 2.0) / self.cell_size;
        let index = (scaled + 0.5).floor() - 1.0;
        if index >= 0.0 && index < self.size as f32 {
            Some(index as u32)
        } else {
            None
        }
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Result<&mut GridCell, GridError> {
        self.index(cell)
            .and_then(|index| self.cells.get_mut(index))
            .ok_or(GridError::OutOfBounds(cell))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.x() < self.size && cell.z() < self.size {
            let z = usize::try_from(cell.z()).ok()?;
            let x = usize::try_from(cell.x()).ok()?;
            let width = usize::try_from(self.size).ok()?;
            Some(z * width + x)
        } else {
            None
        }
    }
}
