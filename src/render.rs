//! # Rendering Configuration Module
//!
//! Parameters a user tunes through the menu, and the `Generator` seam that
//! turns a source photo plus those parameters into an output artifact.
//! The production generator shells out to the `primitive` executable.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// Accepted range for a typed iteration count
pub const ITERATIONS_RANGE: RangeInclusive<u32> = 1..=1000;
/// Accepted range for a typed alpha value
pub const ALPHA_RANGE: RangeInclusive<u32> = 1..=255;
/// Accepted range for a typed output size in pixels
pub const SIZE_RANGE: RangeInclusive<u32> = 256..=1920;
/// Accepted range for shapes drawn per iteration
pub const REPEAT_RANGE: RangeInclusive<u32> = 1..=5;
/// Input photos are downscaled to this size before fitting
pub const INPUT_RESIZE: u32 = 256;

/// Shape family the generator is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Any,
    Triangle,
    Rectangle,
    Ellipse,
    Circle,
    RotatedRectangle,
    Bezier,
    RotatedEllipse,
    Polygon,
}

impl Shape {
    pub const ALL: [Shape; 9] = [
        Shape::Any,
        Shape::Triangle,
        Shape::Rectangle,
        Shape::Ellipse,
        Shape::Circle,
        Shape::RotatedRectangle,
        Shape::Bezier,
        Shape::RotatedEllipse,
        Shape::Polygon,
    ];

    /// Mode number understood by `primitive -m`
    pub fn code(self) -> u8 {
        match self {
            Shape::Any => 0,
            Shape::Triangle => 1,
            Shape::Rectangle => 2,
            Shape::Ellipse => 3,
            Shape::Circle => 4,
            Shape::RotatedRectangle => 5,
            Shape::Bezier => 6,
            Shape::RotatedEllipse => 7,
            Shape::Polygon => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Localization key of the shape's display name
    pub fn message_key(self) -> &'static str {
        match self {
            Shape::Any => "shape-any",
            Shape::Triangle => "shape-triangles",
            Shape::Rectangle => "shape-rectangles",
            Shape::Ellipse => "shape-ellipses",
            Shape::Circle => "shape-circles",
            Shape::RotatedRectangle => "shape-rotated-rectangles",
            Shape::Bezier => "shape-beziers",
            Shape::RotatedEllipse => "shape-rotated-ellipses",
            Shape::Polygon => "shape-polygons",
        }
    }
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Jpg,
    Png,
    Svg,
    Gif,
}

impl Extension {
    pub const ALL: [Extension; 4] = [Extension::Jpg, Extension::Png, Extension::Svg, Extension::Gif];

    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Jpg => "jpg",
            Extension::Png => "png",
            Extension::Svg => "svg",
            Extension::Gif => "gif",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Extension::ALL
            .into_iter()
            .find(|ext| ext.as_str() == s)
            .ok_or_else(|| anyhow!("unsupported extension: {s}"))
    }
}

/// Rendering parameters collected through the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub shape: Shape,
    pub iterations: u32,
    /// Shapes added per iteration
    pub repeat: u32,
    /// 0 lets the generator pick alpha per shape
    pub alpha: u8,
    pub output_size: u32,
    pub extension: Extension,
    pub workers: usize,
}

impl RenderConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }

    /// Arguments for one `primitive` invocation
    pub fn primitive_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "-n".to_string(),
            self.iterations.to_string(),
            "-m".to_string(),
            self.shape.code().to_string(),
            "-a".to_string(),
            self.alpha.to_string(),
            "-r".to_string(),
            INPUT_RESIZE.to_string(),
            "-s".to_string(),
            self.output_size.to_string(),
            "-rep".to_string(),
            self.repeat.saturating_sub(1).to_string(),
            "-j".to_string(),
            self.workers.to_string(),
        ]
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shape: Shape::Triangle,
            iterations: 200,
            repeat: 1,
            alpha: 128,
            output_size: 1280,
            extension: Extension::Jpg,
            workers: 1,
        }
    }
}

/// Produces an artifact from a source image.
///
/// Implementations are synchronous and may run for minutes; callers are
/// expected to move them off the async runtime.
pub trait Generator: Send + Sync + 'static {
    fn create(&self, input: &Path, output: &Path, config: &RenderConfig) -> Result<()>;
}

/// Runs the `primitive` command line tool
#[derive(Debug, Clone)]
pub struct PrimitiveCli {
    binary: PathBuf,
}

impl PrimitiveCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Generator for PrimitiveCli {
    fn create(&self, input: &Path, output: &Path, config: &RenderConfig) -> Result<()> {
        let args = config.primitive_args(input, output);
        debug!(binary = %self.binary.display(), args = ?args, "Running generator");

        let out = Command::new(&self.binary)
            .args(&args)
            .output()
            .with_context(|| format!("failed to start {}", self.binary.display()))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.binary.display(),
                out.status,
                stderr.trim()
            ));
        }

        if !output.exists() {
            return Err(anyhow!("generator produced no file at {}", output.display()));
        }

        Ok(())
    }
}
