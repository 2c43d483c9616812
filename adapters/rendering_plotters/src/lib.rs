#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Plotters-backed rendering adapter for biofilm animations.
//!
//! Frames are rasterised with plotters' bitmap backend. GIF output is encoded
//! in-process while MP4 output streams raw RGB frames into an `ffmpeg` child
//! process. Plotters is used without its default `ttf` feature so the build
//! does not depend on fontconfig; panel titles are drawn with a TrueType font
//! registered at runtime and are skipped when no font can be found.

mod ffmpeg;
mod fonts;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use biofilm_animation_core::{FramePair, Grid2D, GridShape};
use biofilm_animation_rendering::{
    AnimationBackend, Color, FrameFeed, FrameTiming, OutputFormat, PanelPresentation,
    Presentation,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use plotters::{
    coord::Shift,
    prelude::{
        BitMapBackend, DrawingArea, DrawingAreaErrorKind, DrawingBackend, IntoDrawingArea,
        Rectangle,
    },
    style::{Color as _, RGBColor, BLACK, WHITE},
};

use self::{ffmpeg::FfmpegEncoder, fonts::TitleFont};

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}] {msg}";

/// Rendering backend implemented on top of plotters.
#[derive(Debug)]
pub struct PlottersBackend {
    titles: bool,
    show_progress: bool,
    ffmpeg_program: PathBuf,
}

impl Default for PlottersBackend {
    fn default() -> Self {
        Self {
            titles: true,
            show_progress: true,
            ffmpeg_program: PathBuf::from("ffmpeg"),
        }
    }
}

impl PlottersBackend {
    /// Returns a backend that draws titles and reports progress on stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures whether panel titles are drawn above each heatmap.
    #[must_use]
    pub fn with_titles(mut self, enabled: bool) -> Self {
        self.titles = enabled;
        self
    }

    /// Configures whether a progress bar is shown while frames are encoded.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Overrides the `ffmpeg` executable used for MP4 output.
    #[must_use]
    pub fn with_ffmpeg_program(mut self, program: impl AsRef<Path>) -> Self {
        self.ffmpeg_program = program.as_ref().to_path_buf();
        self
    }

    /// Rasterises a single frame into a packed RGB24 buffer of the figure's
    /// pixel size.
    pub fn rasterize(&self, presentation: &Presentation, frame: &FramePair) -> Result<Vec<u8>> {
        let titles = self.prepare_titles(presentation)?;
        let size = presentation.figure.pixel_size();
        let mut buffer = vec![0; rgb_len(size)];
        rasterize_into(&mut buffer, size, &presentation.panels, frame, titles)?;
        Ok(buffer)
    }

    fn prepare_titles(&self, presentation: &Presentation) -> Result<bool> {
        if !self.titles {
            return Ok(false);
        }
        match TitleFont::locate(presentation.title_font.as_deref())? {
            Some(font) => {
                font.register()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn progress_bar(&self, frame_count: usize) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let bar = ProgressBar::new(frame_count as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)?
                .progress_chars("#>-"),
        );
        Ok(bar)
    }
}

impl AnimationBackend for PlottersBackend {
    fn render<F>(self, presentation: &Presentation, frame_count: usize, next_frame: F) -> Result<()>
    where
        F: FnMut(usize) -> Result<FramePair>,
    {
        let mut feed = FrameFeed::open(frame_count, next_frame)?;
        let titles = self.prepare_titles(presentation)?;
        let (width, height) = presentation.figure.pixel_size();
        info!(
            "rendering {} frames of a {} grid at {}x{} px to {}",
            feed.frame_count(),
            feed.shape(),
            width,
            height,
            presentation.output.display()
        );

        let progress = self.progress_bar(feed.frame_count())?;
        match presentation.writer.output_format() {
            OutputFormat::Gif => write_gif(presentation, &mut feed, titles, &progress)?,
            OutputFormat::Mp4 => {
                write_mp4(
                    &self.ffmpeg_program,
                    presentation,
                    &mut feed,
                    titles,
                    &progress,
                )?;
            }
        }
        progress.finish_with_message(format!("wrote {}", presentation.output.display()));

        info!("wrote {}", presentation.output.display());
        Ok(())
    }
}

fn write_gif<F>(
    presentation: &Presentation,
    feed: &mut FrameFeed<F>,
    titles: bool,
    progress: &ProgressBar,
) -> Result<()>
where
    F: FnMut(usize) -> Result<FramePair>,
{
    let delay_ms = u32::try_from(
        presentation
            .timing
            .interval
            .as_millis()
            .min(u128::from(FrameTiming::MAX_INTERVAL_MS)),
    )?;
    let root = BitMapBackend::gif(
        &presentation.output,
        presentation.figure.pixel_size(),
        delay_ms,
    )
    .with_context(|| {
        format!(
            "failed to create animation at {}",
            presentation.output.display()
        )
    })?
    .into_drawing_area();

    while let Some((index, frame)) = feed.next_frame()? {
        draw_frame(&root, &presentation.panels, &frame, titles)
            .with_context(|| format!("failed to draw frame {index}"))?;
        root.present()
            .with_context(|| format!("failed to encode frame {index}"))?;
        debug!("encoded frame {index} (step {})", frame.step);
        progress.inc(1);
    }
    Ok(())
}

fn write_mp4<F>(
    program: &Path,
    presentation: &Presentation,
    feed: &mut FrameFeed<F>,
    titles: bool,
    progress: &ProgressBar,
) -> Result<()>
where
    F: FnMut(usize) -> Result<FramePair>,
{
    let size = presentation.figure.pixel_size();
    let mut encoder = FfmpegEncoder::spawn(
        program,
        &presentation.output,
        size,
        presentation.timing.fps,
    )?;
    let mut buffer = vec![0; rgb_len(size)];

    while let Some((index, frame)) = feed.next_frame()? {
        rasterize_into(&mut buffer, size, &presentation.panels, &frame, titles)
            .with_context(|| format!("failed to draw frame {index}"))?;
        encoder.write_frame(&buffer)?;
        debug!("encoded frame {index} (step {})", frame.step);
        progress.inc(1);
    }
    encoder.finish()
}

fn rgb_len((width, height): (u32, u32)) -> usize {
    width as usize * height as usize * 3
}

fn rasterize_into(
    buffer: &mut [u8],
    size: (u32, u32),
    panels: &[PanelPresentation],
    frame: &FramePair,
    titles: bool,
) -> Result<()> {
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    draw_frame(&root, panels, frame, titles).context("failed to draw frame")?;
    root.present().context("failed to flush frame buffer")?;
    Ok(())
}

/// Draws the panels side by side, each showing its field as a heatmap.
fn draw_frame<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    panels: &[PanelPresentation],
    frame: &FramePair,
    titles: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    if panels.is_empty() {
        return Ok(());
    }

    let (_, height) = root.dim_in_pixel();
    let title_size = f64::from(height) * 0.06;
    let areas = root.split_evenly((1, panels.len()));
    for (area, panel) in areas.iter().zip(panels) {
        let area = if titles {
            area.titled(&panel.title, (fonts::TITLE_FAMILY, title_size))?
        } else {
            area.clone()
        };
        draw_heatmap(&area, frame.grid(panel.field), panel)?;
    }
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    grid: &Grid2D,
    panel: &PanelPresentation,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let geometry = HeatmapGeometry::fit(area.dim_in_pixel(), grid.shape());
    for (row, values) in grid.rows().enumerate() {
        for (column, &value) in values.iter().enumerate() {
            let color = to_rgb(panel.colormap.color_for(value, panel.range));
            area.draw(&Rectangle::new(
                geometry.cell_bounds(row, column),
                color.filled(),
            ))?;
        }
    }
    area.draw(&Rectangle::new(geometry.bounds(), BLACK.stroke_width(1)))?;
    Ok(())
}

fn to_rgb(color: Color) -> RGBColor {
    RGBColor(color.red, color.green, color.blue)
}

/// Placement of square cells centred inside a panel.
#[derive(Clone, Copy, Debug, PartialEq)]
struct HeatmapGeometry {
    left: f64,
    top: f64,
    cell: f64,
    shape: GridShape,
}

impl HeatmapGeometry {
    const MARGIN: f64 = 0.06;

    fn fit((width, height): (u32, u32), shape: GridShape) -> Self {
        let (width, height) = (f64::from(width), f64::from(height));
        let margin = Self::MARGIN * width.min(height);
        let columns = f64::from(shape.columns());
        let rows = f64::from(shape.rows());
        let cell = ((width - 2.0 * margin) / columns)
            .min((height - 2.0 * margin) / rows)
            .max(f64::MIN_POSITIVE);

        Self {
            left: (width - cell * columns) / 2.0,
            top: (height - cell * rows) / 2.0,
            cell,
            shape,
        }
    }

    fn edge(origin: f64, cell: f64, index: usize) -> i32 {
        (origin + cell * index as f64).round() as i32
    }

    /// Inclusive pixel corners of the cell at `row`, `column`.
    fn cell_bounds(&self, row: usize, column: usize) -> [(i32, i32); 2] {
        let x0 = Self::edge(self.left, self.cell, column);
        let y0 = Self::edge(self.top, self.cell, row);
        let x1 = (Self::edge(self.left, self.cell, column + 1) - 1).max(x0);
        let y1 = (Self::edge(self.top, self.cell, row + 1) - 1).max(y0);
        [(x0, y0), (x1, y1)]
    }

    fn bounds(&self) -> [(i32, i32); 2] {
        let [top_left, _] = self.cell_bounds(0, 0);
        let [_, bottom_right] = self.cell_bounds(
            self.shape.rows() as usize - 1,
            self.shape.columns() as usize - 1,
        );
        [top_left, bottom_right]
    }

    #[cfg(test)]
    fn cell_center(&self, row: usize, column: usize) -> (i32, i32) {
        let [(x0, y0), (x1, y1)] = self.cell_bounds(row, column);
        ((x0 + x1) / 2, (y0 + y1) / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biofilm_animation_core::{Field, Step};
    use biofilm_animation_rendering::{AnimationWriter, FigureLayout, FrameTiming};

    fn presentation() -> Presentation {
        let figure = FigureLayout::new(8.0, 4.0, 25).expect("valid layout");
        Presentation::new(figure, AnimationWriter::ImageMagick, FrameTiming::default())
    }

    fn frame() -> FramePair {
        let shape = GridShape::new(2, 2).expect("positive dimensions");
        let bacteria = Grid2D::from_values(shape, vec![0.0, 1.0, 2.0, f64::NAN])
            .expect("value count matches shape");
        let nutrients =
            Grid2D::from_values(shape, vec![0.0, 0.25, 0.5, 1.0]).expect("value count matches shape");
        FramePair::new(Step::new(0), bacteria, nutrients)
    }

    fn pixel(buffer: &[u8], width: u32, (x, y): (i32, i32)) -> Color {
        let offset = (y as usize * width as usize + x as usize) * 3;
        Color::from_rgb_u8(buffer[offset], buffer[offset + 1], buffer[offset + 2])
    }

    #[test]
    fn progress_template_reports_the_finish_message() {
        assert!(PROGRESS_TEMPLATE.contains("{msg}"));
        assert!(ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .is_ok());
    }

    #[test]
    fn geometry_keeps_cells_square_and_centred() {
        let shape = GridShape::new(2, 4).expect("positive dimensions");
        let geometry = HeatmapGeometry::fit((100, 100), shape);

        let [(x0, y0), (x1, y1)] = geometry.cell_bounds(0, 0);
        assert_eq!(x1 - x0, y1 - y0);
        let [(left, top), (right, bottom)] = geometry.bounds();
        assert_eq!(left, 100 - 1 - right);
        assert_eq!(top, 100 - 1 - bottom);
        assert!(right - left > bottom - top);
    }

    #[test]
    fn geometry_never_collapses_cells() {
        let shape = GridShape::new(1, 1000).expect("positive dimensions");
        let geometry = HeatmapGeometry::fit((50, 50), shape);

        let [(x0, _), (x1, _)] = geometry.cell_bounds(0, 999);
        assert!(x1 >= x0);
    }

    #[test]
    fn rasterized_cells_use_panel_colormaps() {
        let presentation = presentation();
        let backend = PlottersBackend::new().with_titles(false);
        let buffer = backend
            .rasterize(&presentation, &frame())
            .expect("frame rasterises");

        let (width, height) = presentation.figure.pixel_size();
        assert_eq!(buffer.len(), rgb_len((width, height)));

        let panel_width = width / 2;
        let geometry =
            HeatmapGeometry::fit((panel_width, height), GridShape::new(2, 2).expect("shape"));
        let bacteria = &presentation.panels[0];
        let nutrients = &presentation.panels[1];
        assert_eq!(bacteria.field, Field::BacteriumState);

        let grid = frame();
        for row in 0..2 {
            for column in 0..2 {
                let (x, y) = geometry.cell_center(row, column);
                let coord = biofilm_animation_core::CellCoord::new(row as u32, column as u32);

                let expected = bacteria.colormap.color_for(
                    grid.bacteria.get(coord).expect("cell in grid"),
                    bacteria.range,
                );
                assert_eq!(pixel(&buffer, width, (x, y)), expected);

                let expected = nutrients.colormap.color_for(
                    grid.nutrients.get(coord).expect("cell in grid"),
                    nutrients.range,
                );
                let shifted = (x + panel_width as i32, y);
                assert_eq!(pixel(&buffer, width, shifted), expected);
            }
        }
    }

    #[test]
    fn nan_cells_render_white() {
        let presentation = presentation();
        let buffer = PlottersBackend::new()
            .with_titles(false)
            .rasterize(&presentation, &frame())
            .expect("frame rasterises");

        let (width, height) = presentation.figure.pixel_size();
        let geometry =
            HeatmapGeometry::fit((width / 2, height), GridShape::new(2, 2).expect("shape"));
        assert_eq!(
            pixel(&buffer, width, geometry.cell_center(1, 1)),
            Color::WHITE
        );
    }
}
