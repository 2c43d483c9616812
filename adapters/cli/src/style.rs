use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use biofilm_animation_core::{Field, ValueRange};
use biofilm_animation_rendering::{
    Color, ColorStop, Colormap, FigureLayout, PanelPresentation,
};
use serde::Deserialize;

const SUPPORTED_STYLE_VERSION: u32 = 1;

/// Presentation overrides read from a TOML style file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StyleFile {
    version: Option<u32>,
    #[serde(default)]
    figure: FigureSection,
    #[serde(default)]
    font: FontSection,
    #[serde(default)]
    panels: PanelsSection,
    #[serde(skip)]
    base_path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct FigureSection {
    width_in: Option<f32>,
    height_in: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct FontSection {
    path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelsSection {
    bacteria: Option<PanelSection>,
    nutrients: Option<PanelSection>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelSection {
    title: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    colormap: Option<ColormapSection>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
enum ColormapSection {
    Named(String),
    Stops(Vec<(f32, String)>),
}

impl StyleFile {
    /// Reads and validates the style file at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read style file at {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        parse_style(&contents, &base)
            .with_context(|| format!("invalid style file {}", path.display()))
    }

    /// Figure layout at `dpi` with any size overrides applied.
    pub(crate) fn figure(&self, dpi: u32) -> Result<FigureLayout> {
        let width_in = self
            .figure
            .width_in
            .unwrap_or(FigureLayout::DEFAULT_WIDTH_IN);
        let height_in = self
            .figure
            .height_in
            .unwrap_or(FigureLayout::DEFAULT_HEIGHT_IN);
        Ok(FigureLayout::new(width_in, height_in, dpi)?)
    }

    /// Bacteria and nutrients panels, left to right.
    pub(crate) fn panels(&self) -> Result<Vec<PanelPresentation>> {
        Field::ALL
            .into_iter()
            .map(|field| {
                let section = match field {
                    Field::BacteriumState => self.panels.bacteria.as_ref(),
                    Field::NutrientState => self.panels.nutrients.as_ref(),
                };
                resolve_panel(field, section)
                    .with_context(|| format!("invalid {} panel", field.title().to_lowercase()))
            })
            .collect()
    }

    /// Title font, resolved relative to the style file's directory.
    pub(crate) fn font_path(&self) -> Option<PathBuf> {
        self.font
            .path
            .as_ref()
            .map(|path| self.base_path.join(path))
    }
}

fn parse_style(contents: &str, base_path: &Path) -> Result<StyleFile> {
    let mut style: StyleFile =
        toml::from_str(contents).context("failed to parse style toml contents")?;
    if let Some(version) = style.version {
        if version != SUPPORTED_STYLE_VERSION {
            bail!(
                "unsupported style version {version}; expected {SUPPORTED_STYLE_VERSION}"
            );
        }
    }
    style.base_path = base_path.to_path_buf();
    Ok(style)
}

fn resolve_panel(field: Field, section: Option<&PanelSection>) -> Result<PanelPresentation> {
    let mut panel = PanelPresentation::default_for(field);
    let Some(section) = section else {
        return Ok(panel);
    };

    if let Some(title) = &section.title {
        panel.title = title.clone();
    }
    if section.min.is_some() || section.max.is_some() {
        let min = section.min.unwrap_or(panel.range.min());
        let max = section.max.unwrap_or(panel.range.max());
        panel.range = ValueRange::new(min, max)?;
    }
    if let Some(colormap) = &section.colormap {
        panel.colormap = resolve_colormap(colormap)?;
    }
    Ok(panel)
}

fn resolve_colormap(section: &ColormapSection) -> Result<Colormap> {
    match section {
        ColormapSection::Named(name) => Colormap::named(name)
            .with_context(|| format!("unknown colormap `{name}`; use viridis or biofilm")),
        ColormapSection::Stops(stops) => {
            let stops = stops
                .iter()
                .map(|(position, hex)| Ok(ColorStop::new(*position, Color::from_hex(hex)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Colormap::from_stops(stops)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_style_keeps_defaults() {
        let style = parse_style("", Path::new(".")).expect("empty style parses");

        assert_eq!(
            style.figure(FigureLayout::DEFAULT_DPI).expect("default figure"),
            FigureLayout::default()
        );
        let panels = style.panels().expect("default panels");
        assert_eq!(
            panels,
            vec![
                PanelPresentation::default_for(Field::BacteriumState),
                PanelPresentation::default_for(Field::NutrientState),
            ]
        );
        assert_eq!(style.font_path(), None);
    }

    #[test]
    fn full_style_overrides_every_panel_setting() {
        let contents = r##"
            version = 1

            [figure]
            width_in = 10.0
            height_in = 5.0

            [font]
            path = "fonts/title.ttf"

            [panels.bacteria]
            title = "Cells"
            min = 0.0
            max = 3.0
            colormap = [[0.0, "#000000"], [1.0, "#ffffff"]]

            [panels.nutrients]
            colormap = "biofilm"
        "##;
        let style = parse_style(contents, Path::new("styles")).expect("style parses");

        assert_eq!(
            style.figure(100).expect("figure").pixel_size(),
            (1000, 500)
        );
        assert_eq!(
            style.font_path(),
            Some(PathBuf::from("styles/fonts/title.ttf"))
        );

        let panels = style.panels().expect("panels resolve");
        assert_eq!(panels[0].title, "Cells");
        assert_eq!(panels[0].range.max(), 3.0);
        assert_eq!(panels[0].colormap.sample(1.0), Color::WHITE);
        assert_eq!(panels[1].title, "Nutrients");
        assert_eq!(panels[1].colormap, Colormap::biofilm());
    }

    #[test]
    fn style_rejects_unknown_keys() {
        let contents = r#"
            [figure]
            width_in = 8.0
            depth_in = 2.0
        "#;

        assert!(parse_style(contents, Path::new(".")).is_err());
    }

    #[test]
    fn style_rejects_unsupported_versions() {
        let result = parse_style("version = 2", Path::new("."));

        let error = result.expect_err("version 2 is not supported");
        assert!(error.to_string().contains("unsupported style version"));
    }

    #[test]
    fn style_rejects_unknown_colormaps() {
        let contents = r#"
            [panels.nutrients]
            colormap = "plasma"
        "#;
        let style = parse_style(contents, Path::new(".")).expect("style parses");

        assert!(style.panels().is_err());
    }

    #[test]
    fn style_rejects_inverted_ranges() {
        let contents = r#"
            [panels.bacteria]
            min = 2.0
            max = 0.0
        "#;
        let style = parse_style(contents, Path::new(".")).expect("style parses");

        assert!(style.panels().is_err());
    }

    #[test]
    fn style_rejects_malformed_stops() {
        let contents = r##"
            [panels.bacteria]
            colormap = [[0.0, "#000000"], [0.5, "#ffffff"]]
        "##;
        let style = parse_style(contents, Path::new(".")).expect("style parses");

        assert!(style.panels().is_err());
    }
}
