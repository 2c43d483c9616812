use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use plotters::style::{register_font, FontStyle};

/// Family name panel titles are drawn with once a font is registered.
pub(crate) const TITLE_FAMILY: &str = "sans-serif";

const SYSTEM_FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// TrueType font bytes used for panel titles.
#[derive(Debug)]
pub(crate) struct TitleFont {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl TitleFont {
    /// Loads the configured font, or the first system font that exists.
    ///
    /// A configured path that cannot be read is an error. Returns `Ok(None)`
    /// when nothing is configured and no system font is installed.
    pub(crate) fn locate(configured: Option<&Path>) -> Result<Option<Self>> {
        let candidates: Vec<PathBuf> = SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .collect();
        Self::locate_with_loader(configured, &candidates, |path| {
            fs::read(path).with_context(|| format!("failed to read font at {}", path.display()))
        })
    }

    fn locate_with_loader(
        configured: Option<&Path>,
        candidates: &[PathBuf],
        mut loader: impl FnMut(&Path) -> Result<Vec<u8>>,
    ) -> Result<Option<Self>> {
        if let Some(path) = configured {
            let bytes = loader(path)?;
            return Ok(Some(Self {
                path: path.to_path_buf(),
                bytes,
            }));
        }

        for candidate in candidates {
            match loader(candidate) {
                Ok(bytes) => {
                    return Ok(Some(Self {
                        path: candidate.clone(),
                        bytes,
                    }))
                }
                Err(error) => debug!("skipping font candidate: {error:#}"),
            }
        }

        warn!("no title font found; panel titles will be omitted");
        Ok(None)
    }

    /// Registers the font under [`TITLE_FAMILY`].
    ///
    /// The font bytes are leaked because plotters keeps registered fonts for
    /// the life of the process.
    pub(crate) fn register(self) -> Result<()> {
        let path = self.path;
        let bytes: &'static [u8] = Box::leak(self.bytes.into_boxed_slice());
        register_font(TITLE_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| anyhow!("{} is not a usable TrueType font", path.display()))?;
        debug!("registered title font from {}", path.display());
        Ok(())
    }
}
