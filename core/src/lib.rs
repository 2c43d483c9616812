#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the biofilm animation pipeline.
//!
//! The history loader turns a long-format simulation record stream into an
//! immutable table, the frame builder reshapes that table into per-step
//! [`Grid2D`] values, and rendering adapters consume [`FramePair`]s in
//! ascending [`Step`] order. Every crate in the workspace speaks in terms of
//! the types defined here.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete simulation time index. One animation frame is produced per step.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Step(u32);

impl Step {
    /// Creates a new step with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the step.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linear identifier of a cell within a row-major simulation grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CellId(u32);

impl CellId {
    /// Creates a new cell identifier with the provided numeric value.
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

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a single grid cell expressed as row and column indices.
///
/// Row zero is the top row of the rendered image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

/// Dimensions of the simulation grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GridShapeParts")]
pub struct GridShape {
    rows: u32,
    columns: u32,
}

#[derive(Deserialize)]
struct GridShapeParts {
    rows: u32,
    columns: u32,
}

impl TryFrom<GridShapeParts> for GridShape {
    type Error = ShapeError;

    fn try_from(parts: GridShapeParts) -> Result<Self, Self::Error> {
        Self::new(parts.rows, parts.columns)
    }
}

impl GridShape {
    /// Largest number of cells a grid may hold; every cell must be
    /// addressable by a `u32` cell identifier.
    pub const MAX_CELLS: u64 = u32::MAX as u64;

    /// Creates a new grid shape.
    ///
    /// Returns an error when either dimension is zero or the grid would hold
    /// more than [`GridShape::MAX_CELLS`] cells.
    pub const fn new(rows: u32, columns: u32) -> Result<Self, ShapeError> {
        if rows == 0 || columns == 0 {
            return Err(ShapeError::ZeroDimension { rows, columns });
        }
        if rows as u64 * columns as u64 > Self::MAX_CELLS {
            return Err(ShapeError::TooManyCells { rows, columns });
        }

        Ok(Self { rows, columns })
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Total number of cells covered by the grid.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Derives the row and column addressed by a linear cell identifier.
    ///
    /// The derivation is plain integer division and modulo by the column
    /// count, so identifiers past the end of the grid yield rows outside
    /// `0..rows`. Use [`GridShape::contains`] to check the result.
    #[must_use]
    pub const fn coord_of(&self, cell_id: CellId) -> CellCoord {
        CellCoord::new(cell_id.get() / self.columns, cell_id.get() % self.columns)
    }

    /// Converts a coordinate back into its linear cell identifier.
    #[must_use]
    pub const fn cell_id_of(&self, coord: CellCoord) -> CellId {
        CellId::new(coord.row() * self.columns + coord.column())
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.row() < self.rows && coord.column() < self.columns
    }

    /// Row-major offset of the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }

        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

/// Errors raised when grid dimensions or grid contents are inconsistent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Grids need at least one row and one column.
    #[error("grid dimensions must be positive (received {rows} rows, {columns} columns)")]
    ZeroDimension {
        /// Requested number of rows.
        rows: u32,
        /// Requested number of columns.
        columns: u32,
    },
    /// The grid holds more cells than `u32` cell identifiers can address.
    #[error("a {rows}x{columns} grid exceeds the {max} addressable cells", max = GridShape::MAX_CELLS)]
    TooManyCells {
        /// Requested number of rows.
        rows: u32,
        /// Requested number of columns.
        columns: u32,
    },
    /// The number of values does not match the grid's cell count.
    #[error("grid of shape {shape} needs {expected} values (received {found})")]
    LengthMismatch {
        /// Shape the values were meant to fill.
        shape: GridShape,
        /// Number of cells in the grid.
        expected: usize,
        /// Number of values provided.
        found: usize,
    },
}

/// Per-cell quantities tracked by the simulation history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Discrete bacterium state of the cell.
    BacteriumState,
    /// Nutrient concentration of the cell.
    NutrientState,
}

impl Field {
    /// Every tracked field, in panel order.
    pub const ALL: [Field; 2] = [Field::BacteriumState, Field::NutrientState];

    /// Column name used by the history file.
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::BacteriumState => "bacterium_state",
            Self::NutrientState => "nutrient_state",
        }
    }

    /// Default panel title for the field.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BacteriumState => "Bacteria",
            Self::NutrientState => "Nutrients",
        }
    }

    /// Value range the field is rendered with unless configured otherwise.
    #[must_use]
    pub const fn default_range(self) -> ValueRange {
        match self {
            Self::BacteriumState => ValueRange { min: 0.0, max: 2.0 },
            Self::NutrientState => ValueRange { min: 0.0, max: 1.0 },
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.column_name() == value)
            .ok_or_else(|| UnknownField(value.to_owned()))
    }
}

/// Error returned when a field name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown field `{0}`; expected `bacterium_state` or `nutrient_state`")]
pub struct UnknownField(pub String);

/// Closed interval of values mapped onto a colour scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueRangeParts")]
pub struct ValueRange {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct ValueRangeParts {
    min: f64,
    max: f64,
}

impl TryFrom<ValueRangeParts> for ValueRange {
    type Error = InvalidRange;

    fn try_from(parts: ValueRangeParts) -> Result<Self, Self::Error> {
        Self::new(parts.min, parts.max)
    }
}

impl ValueRange {
    /// Creates a new value range.
    ///
    /// Returns an error unless both bounds are finite and `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, InvalidRange> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(InvalidRange { min, max });
        }

        Ok(Self { min, max })
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Maps a value into `0.0..=1.0`, clamping values outside the range.
    ///
    /// `NaN` has no position on the scale and yields `None`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }

        Some(((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0))
    }
}

/// Error returned when a value range is empty or not finite.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
#[error("value range must be finite with min < max (received {min}..{max})")]
pub struct InvalidRange {
    /// Requested lower bound.
    pub min: f64,
    /// Requested upper bound.
    pub max: f64,
}

/// One row of the simulation history: the state of one cell at one step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Simulation time index.
    pub step: Step,
    /// Linear index of the cell within the grid.
    pub cell_id: CellId,
    /// Bacterium state of the cell.
    pub bacterium_state: f64,
    /// Nutrient concentration of the cell.
    pub nutrient_state: f64,
}

impl SimulationRecord {
    /// Creates a new record.
    #[must_use]
    pub const fn new(
        step: Step,
        cell_id: CellId,
        bacterium_state: f64,
        nutrient_state: f64,
    ) -> Self {
        Self {
            step,
            cell_id,
            bacterium_state,
            nutrient_state,
        }
    }

    /// Value stored for the requested field.
    #[must_use]
    pub const fn value(&self, field: Field) -> f64 {
        match field {
            Field::BacteriumState => self.bacterium_state,
            Field::NutrientState => self.nutrient_state,
        }
    }
}

/// Dense row-major grid of per-cell values for one field at one step.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2D {
    shape: GridShape,
    values: Vec<f64>,
}

impl Grid2D {
    /// Wraps row-major values into a grid of the provided shape.
    ///
    /// Returns an error when the value count differs from the cell count.
    pub fn from_values(shape: GridShape, values: Vec<f64>) -> Result<Self, ShapeError> {
        if values.len() != shape.cell_count() {
            return Err(ShapeError::LengthMismatch {
                shape,
                expected: shape.cell_count(),
                found: values.len(),
            });
        }

        Ok(Self { shape, values })
    }

    /// Shape of the grid.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Value stored at the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn get(&self, coord: CellCoord) -> Option<f64> {
        self.shape
            .index_of(coord)
            .and_then(|index| self.values.get(index).copied())
    }

    /// Row-major view of every value in the grid.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterator over the grid rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.shape.columns() as usize)
    }

    /// Copies the grid into nested row vectors.
    #[must_use]
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }
}

/// Grids for every tracked field at a single step.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePair {
    /// Step the grids were built from.
    pub step: Step,
    /// Bacterium state grid.
    pub bacteria: Grid2D,
    /// Nutrient concentration grid.
    pub nutrients: Grid2D,
}

impl FramePair {
    /// Creates a new frame from its two grids.
    #[must_use]
    pub const fn new(step: Step, bacteria: Grid2D, nutrients: Grid2D) -> Self {
        Self {
            step,
            bacteria,
            nutrients,
        }
    }

    /// Grid associated with the requested field.
    #[must_use]
    pub const fn grid(&self, field: Field) -> &Grid2D {
        match field {
            Field::BacteriumState => &self.bacteria,
            Field::NutrientState => &self.nutrients,
        }
    }

    /// Shape of the bacteria grid, which the frame builder keeps equal to the
    /// nutrient grid's shape.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.bacteria.shape()
    }
}
