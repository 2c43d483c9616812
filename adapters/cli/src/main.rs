#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that turns a biofilm simulation history into an
//! animation.

mod style;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use biofilm_animation_core::GridShape;
use biofilm_animation_rendering::{
    AnimationBackend, AnimationWriter, FigureLayout, FrameTiming, Presentation,
};
use biofilm_animation_rendering_plotters::PlottersBackend;
use biofilm_animation_system_frames::FrameSequence;
use biofilm_animation_system_history::load_path;
use clap::{value_parser, Parser};
use env_logger::{Builder, Env};
use log::info;

use self::style::StyleFile;

/// Renders a biofilm simulation history as a two-panel animation.
#[derive(Debug, Parser)]
#[command(name = "biofilm-animation", version)]
struct Args {
    /// CSV history with step, cell_id, bacterium_state and nutrient_state columns.
    datafile: PathBuf,
    /// Number of rows in the simulation grid.
    #[arg(value_parser = value_parser!(u32).range(1..))]
    rows: u32,
    /// Number of columns in the simulation grid.
    #[arg(value_parser = value_parser!(u32).range(1..))]
    columns: u32,
    /// Encoder: imagemagick writes a GIF, ffmpeg writes an MP4.
    #[arg(long, default_value_t = AnimationWriter::ImageMagick)]
    writer: AnimationWriter,
    /// Resolution of every frame in dots per inch.
    #[arg(long, default_value_t = FigureLayout::DEFAULT_DPI, value_parser = value_parser!(u32).range(1..))]
    dpi: u32,
    /// Milliseconds between GIF frames.
    #[arg(long, default_value_t = FrameTiming::DEFAULT_INTERVAL_MS, value_parser = value_parser!(u64).range(1..=FrameTiming::MAX_INTERVAL_MS))]
    interval: u64,
    /// Frame rate of MP4 output.
    #[arg(long, default_value_t = FrameTiming::DEFAULT_FPS, value_parser = value_parser!(u32).range(1..))]
    fps: u32,
    /// TOML file overriding figure size, panel titles, ranges and colormaps.
    #[arg(long)]
    style: Option<PathBuf>,
    /// Output path; defaults to biofilm_animation.gif or biofilm_animation.mp4.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Entry point for the biofilm animation command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    Builder::from_env(Env::default().default_filter_or("info")).init();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let shape = GridShape::new(args.rows, args.columns)?;
    let presentation = presentation_from(&args)?;
    info!(
        "animating {} as a {} grid with the {} writer",
        args.datafile.display(),
        shape,
        presentation.writer
    );

    let table = load_path(&args.datafile, shape)
        .with_context(|| format!("failed to load history from {}", args.datafile.display()))?;
    let frames = FrameSequence::new(&table);

    PlottersBackend::new()
        .render(&presentation, frames.frame_count(), |index| {
            Ok(frames.frame(index)?)
        })
        .with_context(|| format!("failed to write {}", presentation.output.display()))
}

fn presentation_from(args: &Args) -> Result<Presentation> {
    let style = match &args.style {
        Some(path) => StyleFile::load(path)?,
        None => StyleFile::default(),
    };
    let timing = FrameTiming::new(Duration::from_millis(args.interval), args.fps);

    let mut presentation = Presentation::new(style.figure(args.dpi)?, args.writer, timing)
        .with_panels(style.panels()?)
        .with_title_font(style.font_path());
    if let Some(output) = &args.output {
        presentation = presentation.with_output(output);
    }
    Ok(presentation)
}
