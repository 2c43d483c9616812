#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for biofilm animation backends.

use anyhow::Result as AnyResult;
use biofilm_animation_core::{Field, FramePair, GridShape, ValueRange};
use glam::Vec3;
use std::{
    error::Error,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Opaque RGB color used when rasterising frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel intensity.
    pub red: u8,
    /// Green channel intensity.
    pub green: u8,
    /// Blue channel intensity.
    pub blue: u8,
}

impl Color {
    /// Pure white, also used for values without a position on a scale.
    pub const WHITE: Self = Self::from_rgb_u8(255, 255, 255);

    /// Pure black, used for panel outlines and titles.
    pub const BLACK: Self = Self::from_rgb_u8(0, 0, 0);

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses a `#rrggbb` hex string.
    pub fn from_hex(value: &str) -> Result<Self, RenderingError> {
        let invalid = || RenderingError::InvalidColor {
            value: value.to_owned(),
        };
        let digits = value.strip_prefix('#').unwrap_or(value);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Self::from_rgb_u8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linearly interpolates towards `other` by `amount` in `0.0..=1.0`.
    #[must_use]
    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let mixed = self.to_vec3().lerp(other.to_vec3(), amount.clamp(0.0, 1.0));
        Self::from_vec3(mixed)
    }

    fn to_vec3(self) -> Vec3 {
        Vec3::new(
            f32::from(self.red),
            f32::from(self.green),
            f32::from(self.blue),
        )
    }

    fn from_vec3(value: Vec3) -> Self {
        let channel = |component: f32| component.round().clamp(0.0, 255.0) as u8;
        Self::from_rgb_u8(channel(value.x), channel(value.y), channel(value.z))
    }
}

/// Anchor of a [`Colormap`] at a normalised position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    /// Position on the normalised scale, `0.0..=1.0`.
    pub position: f32,
    /// Color at the position.
    pub color: Color,
}

impl ColorStop {
    /// Creates a new color stop.
    #[must_use]
    pub const fn new(position: f32, color: Color) -> Self {
        Self { position, color }
    }
}

/// Piecewise-linear colormap over the normalised range `0.0..=1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    stops: Vec<ColorStop>,
}

impl Colormap {
    /// Creates a colormap from its stops.
    ///
    /// Returns an error unless there are at least two stops, the first sits at
    /// `0.0`, the last at `1.0`, and positions never decrease.
    pub fn from_stops(stops: Vec<ColorStop>) -> Result<Self, RenderingError> {
        let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
            return Err(RenderingError::InvalidColormap {
                reason: "at least two stops are required",
            });
        };
        if stops.len() < 2 {
            return Err(RenderingError::InvalidColormap {
                reason: "at least two stops are required",
            });
        }
        if first.position != 0.0 || last.position != 1.0 {
            return Err(RenderingError::InvalidColormap {
                reason: "stops must start at 0.0 and end at 1.0",
            });
        }
        if stops
            .windows(2)
            .any(|pair| pair[1].position < pair[0].position)
        {
            return Err(RenderingError::InvalidColormap {
                reason: "stop positions must be ascending",
            });
        }

        Ok(Self { stops })
    }

    /// Light-dark-light blue map used for the bacteria panel.
    #[must_use]
    pub fn biofilm() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.0, Color::from_rgb_u8(0xde, 0xeb, 0xf7)),
                ColorStop::new(0.5, Color::from_rgb_u8(0x31, 0x82, 0xbd)),
                ColorStop::new(1.0, Color::from_rgb_u8(0x9e, 0xca, 0xe1)),
            ],
        }
    }

    /// Perceptually uniform viridis map used for the nutrients panel.
    #[must_use]
    pub fn viridis() -> Self {
        const ANCHORS: [(u8, u8, u8); 8] = [
            (0x44, 0x01, 0x54),
            (0x46, 0x33, 0x7e),
            (0x36, 0x5c, 0x8d),
            (0x27, 0x7f, 0x8e),
            (0x1f, 0xa1, 0x87),
            (0x4a, 0xc1, 0x6d),
            (0x9f, 0xda, 0x3a),
            (0xfd, 0xe7, 0x25),
        ];
        let last = (ANCHORS.len() - 1) as f32;
        let stops = ANCHORS
            .iter()
            .enumerate()
            .map(|(index, &(red, green, blue))| {
                ColorStop::new(index as f32 / last, Color::from_rgb_u8(red, green, blue))
            })
            .collect();
        Self { stops }
    }

    /// Looks up a built-in colormap by name.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "biofilm" => Some(Self::biofilm()),
            "viridis" => Some(Self::viridis()),
            _ => None,
        }
    }

    /// Stops defining the map.
    #[must_use]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalised position `t`, clamped into `0.0..=1.0`.
    #[must_use]
    pub fn sample(&self, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0) as f32;
        for pair in self.stops.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if t <= upper.position {
                let span = upper.position - lower.position;
                if span <= f32::EPSILON {
                    return upper.color;
                }
                return lower.color.lerp(upper.color, (t - lower.position) / span);
            }
        }
        self.stops.last().map_or(Color::WHITE, |stop| stop.color)
    }

    /// Color for `value` on the scale spanned by `range`. `NaN` renders white.
    #[must_use]
    pub fn color_for(&self, value: f64, range: ValueRange) -> Color {
        range
            .normalize(value)
            .map_or(Color::WHITE, |t| self.sample(t))
    }
}

/// Describes one heatmap panel of the figure.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelPresentation {
    /// Field whose grid the panel displays.
    pub field: Field,
    /// Title drawn above the heatmap.
    pub title: String,
    /// Values mapped onto the ends of the colormap.
    pub range: ValueRange,
    /// Colormap applied to the normalised values.
    pub colormap: Colormap,
}

impl PanelPresentation {
    /// Creates a new panel descriptor.
    #[must_use]
    pub fn new<T>(field: Field, title: T, range: ValueRange, colormap: Colormap) -> Self
    where
        T: Into<String>,
    {
        Self {
            field,
            title: title.into(),
            range,
            colormap,
        }
    }

    /// Default bacteria or nutrients panel.
    #[must_use]
    pub fn default_for(field: Field) -> Self {
        let colormap = match field {
            Field::BacteriumState => Colormap::biofilm(),
            Field::NutrientState => Colormap::viridis(),
        };
        Self::new(field, field.title(), field.default_range(), colormap)
    }
}

/// Physical size and resolution of the rendered figure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigureLayout {
    width_in: f32,
    height_in: f32,
    dpi: u32,
}

impl FigureLayout {
    /// Default figure width in inches.
    pub const DEFAULT_WIDTH_IN: f32 = 8.0;

    /// Default figure height in inches.
    pub const DEFAULT_HEIGHT_IN: f32 = 4.0;

    /// Default resolution in dots per inch, shared by every configuration surface.
    pub const DEFAULT_DPI: u32 = 150;

    /// Largest frame width or height in pixels.
    pub const MAX_DIMENSION_PX: u32 = 8192;

    /// Creates a new figure layout.
    ///
    /// Returns an error when the resolution is zero, the figure would be less
    /// than one pixel along either axis, or either side would exceed
    /// [`FigureLayout::MAX_DIMENSION_PX`].
    pub fn new(width_in: f32, height_in: f32, dpi: u32) -> Result<Self, RenderingError> {
        if dpi == 0 {
            return Err(RenderingError::InvalidResolution { dpi });
        }
        let layout = Self {
            width_in,
            height_in,
            dpi,
        };
        let too_small = |inches: f32| !inches.is_finite() || inches * dpi as f32 <= 1.0;
        if too_small(width_in) || too_small(height_in) {
            return Err(RenderingError::InvalidFigureSize {
                width_in,
                height_in,
            });
        }
        let (width_px, height_px) = layout.pixel_size();
        if width_px > Self::MAX_DIMENSION_PX || height_px > Self::MAX_DIMENSION_PX {
            return Err(RenderingError::FigureTooLarge {
                width_px,
                height_px,
            });
        }

        Ok(layout)
    }

    /// Figure width in inches.
    #[must_use]
    pub const fn width_in(&self) -> f32 {
        self.width_in
    }

    /// Figure height in inches.
    #[must_use]
    pub const fn height_in(&self) -> f32 {
        self.height_in
    }

    /// Resolution in dots per inch.
    #[must_use]
    pub const fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Size of a rendered frame in pixels as `(width, height)`.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        let scale = |inches: f32| (inches * self.dpi as f32).round() as u32;
        (scale(self.width_in), scale(self.height_in))
    }
}

impl Default for FigureLayout {
    fn default() -> Self {
        Self {
            width_in: Self::DEFAULT_WIDTH_IN,
            height_in: Self::DEFAULT_HEIGHT_IN,
            dpi: Self::DEFAULT_DPI,
        }
    }
}

/// Container format produced by an animation writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Animated GIF image.
    Gif,
    /// MP4 movie.
    Mp4,
}

/// Encoder used to write the animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationWriter {
    /// Writes an animated GIF.
    #[default]
    ImageMagick,
    /// Writes an MP4 movie through the `ffmpeg` binary.
    Ffmpeg,
}

impl AnimationWriter {
    /// Format of the file the writer produces.
    #[must_use]
    pub const fn output_format(self) -> OutputFormat {
        match self {
            Self::ImageMagick => OutputFormat::Gif,
            Self::Ffmpeg => OutputFormat::Mp4,
        }
    }

    /// File name written to the working directory when no path is configured.
    #[must_use]
    pub const fn default_file_name(self) -> &'static str {
        match self.output_format() {
            OutputFormat::Gif => "biofilm_animation.gif",
            OutputFormat::Mp4 => "biofilm_animation.mp4",
        }
    }

    /// Name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ImageMagick => "imagemagick",
            Self::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for AnimationWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnimationWriter {
    type Err = RenderingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "imagemagick" => Ok(Self::ImageMagick),
            "ffmpeg" => Ok(Self::Ffmpeg),
            other => Err(RenderingError::UnknownWriter {
                name: other.to_owned(),
            }),
        }
    }
}

/// Timing applied between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    /// Delay between GIF frames.
    pub interval: Duration,
    /// Frame rate of MP4 output.
    pub fps: u32,
}

impl FrameTiming {
    /// Default delay between GIF frames in milliseconds.
    pub const DEFAULT_INTERVAL_MS: u64 = 30;

    /// Default MP4 frame rate.
    pub const DEFAULT_FPS: u32 = 30;

    /// Longest GIF frame delay; GIF stores delays as 16-bit hundredths of a second.
    pub const MAX_INTERVAL_MS: u64 = 655_350;

    /// Creates a new timing descriptor.
    #[must_use]
    pub const fn new(interval: Duration, fps: u32) -> Self {
        Self { interval, fps }
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(Self::DEFAULT_INTERVAL_MS),
            Self::DEFAULT_FPS,
        )
    }
}

/// Presentation descriptor consumed by animation backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Size and resolution of every frame.
    pub figure: FigureLayout,
    /// Panels drawn left to right.
    pub panels: Vec<PanelPresentation>,
    /// Encoder used to write the animation.
    pub writer: AnimationWriter,
    /// Location of the written animation.
    pub output: PathBuf,
    /// Frame delay and rate.
    pub timing: FrameTiming,
    /// TrueType font used for panel titles, if one should be loaded from disk.
    pub title_font: Option<PathBuf>,
}

impl Presentation {
    /// Constructs a presentation with the default bacteria and nutrients panels.
    #[must_use]
    pub fn new(figure: FigureLayout, writer: AnimationWriter, timing: FrameTiming) -> Self {
        Self {
            figure,
            panels: Field::ALL
                .into_iter()
                .map(PanelPresentation::default_for)
                .collect(),
            writer,
            output: PathBuf::from(writer.default_file_name()),
            timing,
            title_font: None,
        }
    }

    /// Overrides the output location.
    #[must_use]
    pub fn with_output(mut self, output: impl AsRef<Path>) -> Self {
        self.output = output.as_ref().to_path_buf();
        self
    }

    /// Overrides the panels.
    #[must_use]
    pub fn with_panels(mut self, panels: Vec<PanelPresentation>) -> Self {
        self.panels = panels;
        self
    }

    /// Configures the font file used for panel titles.
    #[must_use]
    pub fn with_title_font(mut self, path: Option<PathBuf>) -> Self {
        self.title_font = path;
        self
    }
}

/// Frame supplier that enforces the frame ordering and shape contract.
///
/// Frame 0 is fetched when the feed opens so backends can size their output
/// before the first frame is drawn. Every later frame must share frame 0's
/// grid shape.
pub struct FrameFeed<F> {
    next_frame: F,
    frame_count: usize,
    shape: GridShape,
    pending: Option<FramePair>,
    next_index: usize,
}

impl<F> fmt::Debug for FrameFeed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameFeed")
            .field("frame_count", &self.frame_count)
            .field("shape", &self.shape)
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

impl<F> FrameFeed<F>
where
    F: FnMut(usize) -> AnyResult<FramePair>,
{
    /// Opens the feed by requesting frame 0.
    pub fn open(frame_count: usize, mut next_frame: F) -> AnyResult<Self> {
        if frame_count == 0 {
            return Err(RenderingError::EmptyAnimation.into());
        }

        let first = next_frame(0)?;
        let shape = first.shape();
        check_shape(0, shape, &first)?;

        Ok(Self {
            next_frame,
            frame_count,
            shape,
            pending: Some(first),
            next_index: 0,
        })
    }

    /// Number of frames the feed will yield.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Grid shape shared by every frame.
    #[must_use]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Yields the next frame with its index, or `None` once every frame was
    /// produced.
    pub fn next_frame(&mut self) -> AnyResult<Option<(usize, FramePair)>> {
        if self.next_index >= self.frame_count {
            return Ok(None);
        }

        let index = self.next_index;
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => (self.next_frame)(index)?,
        };
        check_shape(index, self.shape, &frame)?;
        self.next_index += 1;
        Ok(Some((index, frame)))
    }
}

fn check_shape(index: usize, expected: GridShape, frame: &FramePair) -> Result<(), RenderingError> {
    for field in Field::ALL {
        let found = frame.grid(field).shape();
        if found != expected {
            return Err(RenderingError::FrameShapeMismatch {
                index,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Backend capable of rendering and encoding a biofilm animation.
pub trait AnimationBackend {
    /// Renders `frame_count` frames and writes the encoded animation.
    ///
    /// The provided `next_frame` closure receives the frame index and returns
    /// the grids for the corresponding step. Backends request frames strictly
    /// in order starting at 0.
    fn render<F>(self, presentation: &Presentation, frame_count: usize, next_frame: F) -> AnyResult<()>
    where
        F: FnMut(usize) -> AnyResult<FramePair>;
}

/// Errors that can occur when constructing or driving presentations.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Resolution must be positive.
    InvalidResolution {
        /// Provided resolution that failed validation.
        dpi: u32,
    },
    /// Figure must cover at least one pixel in each direction.
    InvalidFigureSize {
        /// Provided width in inches.
        width_in: f32,
        /// Provided height in inches.
        height_in: f32,
    },
    /// Figure exceeds the largest supported frame size.
    FigureTooLarge {
        /// Requested width in pixels.
        width_px: u32,
        /// Requested height in pixels.
        height_px: u32,
    },
    /// A color string was not in `#rrggbb` form.
    InvalidColor {
        /// Provided color string.
        value: String,
    },
    /// Colormap stops were inconsistent.
    InvalidColormap {
        /// Description of the inconsistency.
        reason: &'static str,
    },
    /// Writer name was not recognised.
    UnknownWriter {
        /// Provided writer name.
        name: String,
    },
    /// There were no frames to render.
    EmptyAnimation,
    /// A frame's grids differ in shape from frame 0.
    FrameShapeMismatch {
        /// Index of the offending frame.
        index: usize,
        /// Shape of frame 0.
        expected: GridShape,
        /// Shape of the offending grid.
        found: GridShape,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidResolution { dpi } => {
                write!(f, "dpi must be positive (received {dpi})")
            }
            Self::InvalidFigureSize {
                width_in,
                height_in,
            } => write!(
                f,
                "figure size {width_in}x{height_in} in does not cover a pixel at this resolution"
            ),
            Self::FigureTooLarge {
                width_px,
                height_px,
            } => write!(
                f,
                "figure of {width_px}x{height_px} px exceeds the {} px limit per side",
                FigureLayout::MAX_DIMENSION_PX
            ),
            Self::InvalidColor { value } => {
                write!(f, "color '{value}' is not a #rrggbb hex string")
            }
            Self::InvalidColormap { reason } => write!(f, "invalid colormap: {reason}"),
            Self::UnknownWriter { name } => {
                write!(f, "writer '{name}' is not supported; use imagemagick or ffmpeg")
            }
            Self::EmptyAnimation => write!(f, "simulation history contains no steps to animate"),
            Self::FrameShapeMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "frame {index} has a {found} grid but frame 0 established {expected}"
            ),
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use biofilm_animation_core::{Grid2D, Step};

    fn frame(step: u32, rows: u32, columns: u32) -> FramePair {
        let shape = GridShape::new(rows, columns).expect("positive dimensions");
        let grid = Grid2D::from_values(shape, vec![0.0; shape.cell_count()])
            .expect("value count matches shape");
        FramePair::new(Step::new(step), grid.clone(), grid)
    }

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(
            Color::from_hex("#3182bd"),
            Ok(Color::from_rgb_u8(0x31, 0x82, 0xbd))
        );
        assert_eq!(
            Color::from_hex("9ECAE1"),
            Ok(Color::from_rgb_u8(0x9e, 0xca, 0xe1))
        );
        assert!(Color::from_hex("#3182b").is_err());
        assert!(Color::from_hex("#31g2bd").is_err());
    }

    #[test]
    fn biofilm_colormap_hits_its_stops() {
        let colormap = Colormap::biofilm();
        assert_eq!(colormap.sample(0.0), Color::from_rgb_u8(0xde, 0xeb, 0xf7));
        assert_eq!(colormap.sample(0.5), Color::from_rgb_u8(0x31, 0x82, 0xbd));
        assert_eq!(colormap.sample(1.0), Color::from_rgb_u8(0x9e, 0xca, 0xe1));
    }

    #[test]
    fn colormap_interpolates_between_stops() {
        let colormap = Colormap::from_stops(vec![
            ColorStop::new(0.0, Color::BLACK),
            ColorStop::new(1.0, Color::from_rgb_u8(200, 100, 50)),
        ])
        .expect("valid stops");

        assert_eq!(colormap.sample(0.5), Color::from_rgb_u8(100, 50, 25));
        assert_eq!(colormap.sample(-1.0), Color::BLACK);
        assert_eq!(colormap.sample(4.0), Color::from_rgb_u8(200, 100, 50));
    }

    #[test]
    fn color_for_uses_the_value_range() {
        let colormap = Colormap::biofilm();
        let range = Field::BacteriumState.default_range();

        assert_eq!(colormap.color_for(1.0, range), colormap.sample(0.5));
        assert_eq!(colormap.color_for(f64::NAN, range), Color::WHITE);
    }

    #[test]
    fn viridis_spans_dark_purple_to_yellow() {
        let colormap = Colormap::viridis();
        assert_eq!(colormap.sample(0.0), Color::from_rgb_u8(0x44, 0x01, 0x54));
        assert_eq!(colormap.sample(1.0), Color::from_rgb_u8(0xfd, 0xe7, 0x25));
        assert_eq!(colormap.stops().len(), 8);
    }

    #[test]
    fn colormap_rejects_inconsistent_stops() {
        assert!(Colormap::from_stops(vec![ColorStop::new(0.0, Color::BLACK)]).is_err());
        assert!(Colormap::from_stops(vec![
            ColorStop::new(0.1, Color::BLACK),
            ColorStop::new(1.0, Color::WHITE),
        ])
        .is_err());
        assert!(Colormap::from_stops(vec![
            ColorStop::new(0.0, Color::BLACK),
            ColorStop::new(0.7, Color::WHITE),
            ColorStop::new(0.3, Color::BLACK),
            ColorStop::new(1.0, Color::WHITE),
        ])
        .is_err());
    }

    #[test]
    fn figure_layout_scales_inches_by_dpi() {
        let layout = FigureLayout::default();
        assert_eq!(layout.dpi(), 150);
        assert_eq!(layout.pixel_size(), (1200, 600));

        let sharp = FigureLayout::new(8.0, 4.0, 300).expect("valid layout");
        assert_eq!(sharp.pixel_size(), (2400, 1200));
    }

    #[test]
    fn figure_layout_rejects_degenerate_sizes() {
        assert_eq!(
            FigureLayout::new(8.0, 4.0, 0),
            Err(RenderingError::InvalidResolution { dpi: 0 })
        );
        assert!(FigureLayout::new(0.0, 4.0, 150).is_err());
        assert!(FigureLayout::new(8.0, f32::NAN, 150).is_err());
    }

    #[test]
    fn figure_layout_rejects_oversized_frames() {
        assert_eq!(
            FigureLayout::new(8.0, 4.0, 1_000_000),
            Err(RenderingError::FigureTooLarge {
                width_px: 8_000_000,
                height_px: 4_000_000,
            })
        );
        assert!(FigureLayout::new(8.0, 4.0, 1024).is_ok());
        assert!(FigureLayout::new(8.0, 4.0, 1025).is_err());
    }

    #[test]
    fn writers_select_output_names() {
        assert_eq!(
            AnimationWriter::ImageMagick.default_file_name(),
            "biofilm_animation.gif"
        );
        assert_eq!(
            AnimationWriter::Ffmpeg.default_file_name(),
            "biofilm_animation.mp4"
        );
        assert_eq!(
            "ffmpeg".parse::<AnimationWriter>(),
            Ok(AnimationWriter::Ffmpeg)
        );
        assert!("pillow".parse::<AnimationWriter>().is_err());
    }

    #[test]
    fn presentation_defaults_to_two_panels() {
        let presentation = Presentation::new(
            FigureLayout::default(),
            AnimationWriter::default(),
            FrameTiming::default(),
        );

        let titles: Vec<&str> = presentation
            .panels
            .iter()
            .map(|panel| panel.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Bacteria", "Nutrients"]);
        assert_eq!(presentation.output, PathBuf::from("biofilm_animation.gif"));
        assert_eq!(presentation.timing.interval, Duration::from_millis(30));
    }

    #[test]
    fn frame_feed_requests_frame_zero_on_open() {
        let mut requested = Vec::new();
        let mut feed = FrameFeed::open(3, |index| {
            requested.push(index);
            Ok(frame(index as u32, 2, 2))
        })
        .expect("feed opens");
        assert_eq!(feed.shape(), GridShape::new(2, 2).expect("valid shape"));

        let mut yielded = Vec::new();
        while let Some((index, frame)) = feed.next_frame().expect("frame builds") {
            yielded.push((index, frame.step.get()));
        }
        drop(feed);

        assert_eq!(yielded, vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(requested, vec![0, 1, 2]);
    }

    #[test]
    fn frame_feed_rejects_empty_animation() {
        let error = FrameFeed::open(0, |index| Ok(frame(index as u32, 1, 1)))
            .expect_err("nothing to animate");
        assert_eq!(
            error.downcast_ref::<RenderingError>(),
            Some(&RenderingError::EmptyAnimation)
        );
    }

    #[test]
    fn frame_feed_rejects_shape_changes() {
        let mut feed = FrameFeed::open(2, |index| {
            Ok(if index == 0 {
                frame(0, 2, 2)
            } else {
                frame(1, 3, 2)
            })
        })
        .expect("feed opens");

        assert!(feed.next_frame().expect("frame 0").is_some());
        let error = feed.next_frame().expect_err("frame 1 changes shape");
        assert!(matches!(
            error.downcast_ref::<RenderingError>(),
            Some(RenderingError::FrameShapeMismatch { index: 1, .. })
        ));
    }
}
