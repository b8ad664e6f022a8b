//! Seed grid sources. Any failure here is fatal: nothing starts without a seed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{error::LoadError, pos, CellGrid, Grid};

pub trait SeedLoader {
    fn load(&self) -> Result<Grid, LoadError>;
}

/// Parses text art: `#`, `O`, `*` and `X` are alive, anything else is dead.
/// Lines starting with `!` are comments.
fn deserialize(str: &str) -> Result<Grid, LoadError> {
    let mut actives = vec![];
    let mut width = 0;
    let mut height = 0;
    for line in str.lines().filter(|line| !line.starts_with('!')) {
        let line = line.trim_end_matches('\r');
        for (x, c) in line.chars().enumerate() {
            if matches!(c, '#' | 'O' | '*' | 'X') {
                actives.push(pos!(x, height));
            }
        }
        width = width.max(line.chars().count());
        height += 1;
    }
    Grid::from_actives(width, height, actives).map_err(|_| LoadError::Empty)
}

/// A pattern held in memory.
#[derive(Debug, Clone)]
pub struct PatternLoader {
    pattern: String,
}

impl PatternLoader {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl SeedLoader for PatternLoader {
    fn load(&self) -> Result<Grid, LoadError> {
        deserialize(&self.pattern)
    }
}

#[derive(Debug, Clone)]
pub struct PlainTextLoader {
    path: PathBuf,
}

impl PlainTextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeedLoader for PlainTextLoader {
    fn load(&self) -> Result<Grid, LoadError> {
        let content = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let grid = deserialize(&content)?;
        tracing::info!(
            "loaded {} ({}x{}, {} alive)",
            self.path.display(),
            grid.width(),
            grid.height(),
            grid.population()
        );
        Ok(grid)
    }
}

/// Below this fraction of full intensity a channel counts as dark.
const DARK_THRESHOLD: f32 = 0.01;

/// Reads an image; a pixel is alive when any RGB channel is dark.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    path: PathBuf,
}

impl ImageLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeedLoader for ImageLoader {
    fn load(&self) -> Result<Grid, LoadError> {
        let image = image::open(&self.path).map_err(|source| LoadError::Image {
            path: self.path.clone(),
            source,
        })?;
        let rgb = image.to_rgb8();
        let actives = rgb.enumerate_pixels().filter_map(|(x, y, pixel)| {
            let dark = pixel
                .0
                .iter()
                .any(|&channel| (channel as f32 / 255.0) < DARK_THRESHOLD);
            dark.then_some(pos!(x as usize, y as usize))
        });
        let grid = Grid::from_actives(rgb.width() as usize, rgb.height() as usize, actives)
            .map_err(|_| LoadError::Empty)?;
        tracing::info!(
            "loaded {} ({}x{}, {} alive)",
            self.path.display(),
            rgb.width(),
            rgb.height(),
            grid.population()
        );
        Ok(grid)
    }
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "pbm", "pgm", "ppm"];

/// Picks a loader from the file extension: images for bitmap formats, text otherwise.
pub fn for_path(path: &Path) -> Box<dyn SeedLoader> {
    let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if is_image {
        Box::new(ImageLoader::new(path))
    } else {
        Box::new(PlainTextLoader::new(path))
    }
}
