#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame grid builder that reshapes a loaded history into per-step grids.
//!
//! Grids are rebuilt from the immutable [`HistoryTable`] every time a frame is
//! requested and are discarded by the caller once rendered. Frame `i` always
//! corresponds to the `i`-th ascending distinct step of the table.

use biofilm_animation_core::{Field, FramePair, Grid2D, GridShape, ShapeError, Step};
use biofilm_animation_system_history::HistoryTable;
use log::trace;
use thiserror::Error;

/// Errors raised while building frame grids.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The requested step has no records in the table.
    #[error("no records exist for step {step}")]
    MissingFrame {
        /// Step that was requested.
        step: Step,
    },
    /// The requested frame index lies past the last distinct step.
    #[error("frame {index} requested but the history only holds {frame_count} frames")]
    FrameOutOfRange {
        /// Frame index that was requested.
        index: usize,
        /// Number of frames available.
        frame_count: usize,
    },
    /// The records of a step could not fill the table's grid.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Distinct steps of the table in strictly ascending order.
#[must_use]
pub fn distinct_steps(table: &HistoryTable) -> Vec<Step> {
    table.steps().collect()
}

/// Shape every grid built from the table will have.
///
/// This is the caller-supplied shape the loader validated the records
/// against, so it agrees with the distinct rows and columns observed in the
/// data.
#[must_use]
pub fn grid_shape(table: &HistoryTable) -> GridShape {
    table.shape()
}

/// Builds the dense grid of `field` values recorded at `step`.
///
/// Rows run top to bottom in ascending order and columns run left to right.
pub fn grid_for_step(
    table: &HistoryTable,
    step: Step,
    field: Field,
) -> Result<Grid2D, FrameError> {
    let cells = table
        .cells_at(step)
        .ok_or(FrameError::MissingFrame { step })?;
    let values = cells.map(|entry| entry.value(field)).collect();
    let grid = Grid2D::from_values(table.shape(), values)?;
    trace!("built {field} grid for step {step}");
    Ok(grid)
}

/// Builds the bacteria and nutrient grids recorded at `step`.
pub fn frame_for_step(table: &HistoryTable, step: Step) -> Result<FramePair, FrameError> {
    Ok(FramePair::new(
        step,
        grid_for_step(table, step, Field::BacteriumState)?,
        grid_for_step(table, step, Field::NutrientState)?,
    ))
}

/// Ordered view over the frames of a history.
///
/// The sequence is the frame-count source handed to renderers, which keeps the
/// number of frames and the steps they map to consistent.
#[derive(Clone, Debug)]
pub struct FrameSequence<'a> {
    table: &'a HistoryTable,
    steps: Vec<Step>,
}

impl<'a> FrameSequence<'a> {
    /// Captures the distinct steps of `table`.
    #[must_use]
    pub fn new(table: &'a HistoryTable) -> Self {
        Self {
            table,
            steps: distinct_steps(table),
        }
    }

    /// Number of frames, one per distinct step.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.steps.len()
    }

    /// Steps backing each frame, in frame order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Shape shared by every frame.
    #[must_use]
    pub fn shape(&self) -> GridShape {
        grid_shape(self.table)
    }

    /// Step rendered as frame `index`.
    pub fn step_at(&self, index: usize) -> Result<Step, FrameError> {
        self.steps
            .get(index)
            .copied()
            .ok_or(FrameError::FrameOutOfRange {
                index,
                frame_count: self.steps.len(),
            })
    }

    /// Builds both grids for frame `index`.
    pub fn frame(&self, index: usize) -> Result<FramePair, FrameError> {
        frame_for_step(self.table, self.step_at(index)?)
    }

    /// Builds every frame in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<FramePair, FrameError>> + '_ {
        self.steps
            .iter()
            .map(move |&step| frame_for_step(self.table, step))
    }
}
