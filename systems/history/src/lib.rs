#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! History loader that turns a biofilm simulation record file into an
//! immutable, grid-addressable table.
//!
//! The loader trusts the caller-supplied [`GridShape`] as the single source of
//! truth for the grid and validates the observed records against it: every
//! `cell_id` must fall inside the grid and every step must cover each cell
//! exactly once. A table that loads successfully can therefore be reshaped into
//! dense per-step grids without further checks.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use biofilm_animation_core::{
    CellCoord, CellId, Field, GridShape, SimulationRecord, Step,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use thiserror::Error;

/// Columns every history file must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["step", "cell_id", "bacterium_state", "nutrient_state"];

/// Single record of the history together with its derived grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryEntry {
    record: SimulationRecord,
    coord: CellCoord,
}

impl HistoryEntry {
    /// Record exactly as it was parsed from the source.
    #[must_use]
    pub const fn record(&self) -> &SimulationRecord {
        &self.record
    }

    /// Step the record belongs to.
    #[must_use]
    pub const fn step(&self) -> Step {
        self.record.step
    }

    /// Linear cell identifier of the record.
    #[must_use]
    pub const fn cell_id(&self) -> CellId {
        self.record.cell_id
    }

    /// Grid coordinate derived from the cell identifier.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Derived row, `cell_id div columns`.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.coord.row()
    }

    /// Derived column, `cell_id mod columns`.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.coord.column()
    }

    /// Value of the requested field.
    #[must_use]
    pub const fn value(&self, field: Field) -> f64 {
        self.record.value(field)
    }
}

/// Immutable in-memory simulation history.
#[derive(Clone, Debug)]
pub struct HistoryTable {
    shape: GridShape,
    entries: Vec<HistoryEntry>,
    /// Entry positions per step, ordered by row-major cell index.
    steps: BTreeMap<Step, Vec<usize>>,
}

impl HistoryTable {
    /// Grid shape the table was loaded and validated against.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Every entry in source order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of records in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the source contained no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct steps in ascending order.
    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.keys().copied()
    }

    /// Number of distinct steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Entries recorded at `step`, ordered row by row, or `None` when the step
    /// is absent from the table.
    pub fn cells_at(&self, step: Step) -> Option<impl Iterator<Item = &HistoryEntry> + '_> {
        let positions = self.steps.get(&step)?;
        Some(positions.iter().map(move |&position| &self.entries[position]))
    }
}

/// Errors raised while loading a simulation history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The history file could not be opened.
    #[error("failed to open simulation history at {}", .path.display())]
    Open {
        /// Location of the history file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Reading from the record source failed part way through.
    #[error("failed to read simulation history")]
    Read(#[source] io::Error),
    /// The records do not match the expected schema or grid.
    #[error(transparent)]
    MalformedInput(#[from] MalformedInputError),
}

/// Ways in which a history source can be malformed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MalformedInputError {
    /// The header row lacks one or more required columns.
    #[error("history is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        /// Required columns absent from the header.
        columns: Vec<&'static str>,
    },
    /// A row could not be parsed into a record.
    #[error("invalid record{}: {message}", line_suffix(.line))]
    InvalidRecord {
        /// One-based line number of the row, when known.
        line: Option<u64>,
        /// Parser diagnostic describing the problem.
        message: String,
    },
    /// A cell identifier addresses a cell outside the grid.
    #[error("cell_id {cell_id} on line {line} is outside the {shape} grid")]
    CellOutOfRange {
        /// One-based line number of the row.
        line: u64,
        /// Offending cell identifier.
        cell_id: CellId,
        /// Grid the identifier was checked against.
        shape: GridShape,
    },
    /// The same cell appears twice within one step.
    #[error("cell_id {cell_id} appears more than once in step {step} (line {line})")]
    DuplicateCell {
        /// Step containing the duplicate.
        step: Step,
        /// Repeated cell identifier.
        cell_id: CellId,
        /// One-based line number of the repeated row.
        line: u64,
    },
    /// A step does not cover every cell of the grid.
    #[error("step {step} covers {found} of {expected} cells")]
    IncompleteStep {
        /// Step with missing cells.
        step: Step,
        /// Number of distinct cells present.
        found: usize,
        /// Number of cells in the grid.
        expected: usize,
    },
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|line| format!(" on line {line}"))
        .unwrap_or_default()
}

/// Loads the history stored at `path`.
pub fn load_path(path: impl AsRef<Path>, shape: GridShape) -> Result<HistoryTable, HistoryError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| HistoryError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("reading simulation history from {}", path.display());
    load(BufReader::new(file), shape)
}

/// Parses every record from `source` and derives each record's grid
/// coordinate from its `cell_id` and the column count of `shape`.
pub fn load<R: io::Read>(source: R, shape: GridShape) -> Result<HistoryTable, HistoryError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);
    let headers = reader.headers().map_err(classify_csv_error)?.clone();
    check_columns(&headers)?;
    debug!("history columns: {}", headers.iter().collect::<Vec<_>>().join(", "));

    let mut entries = Vec::new();
    let mut steps = StepIndexBuilder::new(shape);
    let mut raw = StringRecord::new();
    while reader.read_record(&mut raw).map_err(classify_csv_error)? {
        let line = raw.position().map_or(0, csv::Position::line);
        let record: SimulationRecord =
            raw.deserialize(Some(&headers))
                .map_err(|error| MalformedInputError::InvalidRecord {
                    line: Some(line),
                    message: error.to_string(),
                })?;

        let coord = shape.coord_of(record.cell_id);
        if !shape.contains(coord) {
            return Err(MalformedInputError::CellOutOfRange {
                line,
                cell_id: record.cell_id,
                shape,
            }
            .into());
        }

        steps.insert(record.step, record.cell_id, coord, entries.len(), line)?;
        entries.push(HistoryEntry { record, coord });
    }

    let steps = steps.finish()?;
    info!(
        "loaded {} records across {} steps on a {} grid",
        entries.len(),
        steps.len(),
        shape
    );

    Ok(HistoryTable {
        shape,
        entries,
        steps,
    })
}

fn check_columns(headers: &StringRecord) -> Result<(), MalformedInputError> {
    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MalformedInputError::MissingColumns { columns: missing })
    }
}

fn classify_csv_error(error: csv::Error) -> HistoryError {
    let line = error.position().map(csv::Position::line);
    let message = error.to_string();
    match error.into_kind() {
        csv::ErrorKind::Io(source) => HistoryError::Read(source),
        _ => MalformedInputError::InvalidRecord { line, message }.into(),
    }
}

/// Accumulates per-step cell positions while records stream in.
///
/// Cells are tracked sparsely so memory follows the records read rather than
/// the size of the caller's grid.
#[derive(Debug)]
struct StepIndexBuilder {
    shape: GridShape,
    cells: BTreeMap<Step, BTreeMap<usize, usize>>,
}

impl StepIndexBuilder {
    fn new(shape: GridShape) -> Self {
        Self {
            shape,
            cells: BTreeMap::new(),
        }
    }

    fn insert(
        &mut self,
        step: Step,
        cell_id: CellId,
        coord: CellCoord,
        position: usize,
        line: u64,
    ) -> Result<(), MalformedInputError> {
        let shape = self.shape;
        let Some(index) = shape.index_of(coord) else {
            return Err(MalformedInputError::CellOutOfRange {
                line,
                cell_id,
                shape,
            });
        };

        let cells = self.cells.entry(step).or_default();
        if cells.insert(index, position).is_some() {
            return Err(MalformedInputError::DuplicateCell {
                step,
                cell_id,
                line,
            });
        }
        Ok(())
    }

    fn finish(self) -> Result<BTreeMap<Step, Vec<usize>>, MalformedInputError> {
        let expected = self.shape.cell_count();
        let mut steps = BTreeMap::new();
        for (step, cells) in self.cells {
            if cells.len() != expected {
                return Err(MalformedInputError::IncompleteStep {
                    step,
                    found: cells.len(),
                    expected,
                });
            }
            let _ = steps.insert(step, cells.into_values().collect());
        }
        Ok(steps)
    }
}
