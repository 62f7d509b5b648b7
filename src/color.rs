//! Iris tints: parsing, blend modes and the selectable palette.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiny_skia::{BlendMode, Color};

/// An opaque tint color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a color specification.
    ///
    /// Accepts `#rrggbb`, `#rgb`, `r,g,b`, `rgb(r,g,b)` and `rgba(r,g,b,a)`.
    /// Tints are opaque: an alpha component must be a number in `[0, 1]` and
    /// is otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the string matches none of the forms or a channel
    /// is out of range.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if let Some(hex) = spec.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| Error::InvalidTint(spec.to_string()));
        }

        let lower = spec.to_ascii_lowercase();
        let (body, allow_alpha) = if let Some(inner) = strip_call(&lower, "rgba") {
            (inner, true)
        } else if let Some(inner) = strip_call(&lower, "rgb") {
            (inner, false)
        } else {
            (lower.as_str(), false)
        };

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        match (parts.as_slice(), allow_alpha) {
            ([r, g, b, a], true) if is_unit_alpha(a) => Ok(Self::new(
                parse_channel(r, spec)?,
                parse_channel(g, spec)?,
                parse_channel(b, spec)?,
            )),
            ([r, g, b], false) => Ok(Self::new(
                parse_channel(r, spec)?,
                parse_channel(g, spec)?,
                parse_channel(b, spec)?,
            )),
            _ => Err(Error::InvalidTint(spec.to_string())),
        }
    }

    /// Paint color with the given alpha, clamped to `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Alpha is clamped to [0, 1]
    pub fn to_color(self, alpha: f64) -> Color {
        let mut color = Color::from_rgba8(self.r, self.g, self.b, 255);
        color.set_alpha(alpha.clamp(0.0, 1.0) as f32);
        color
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::new(42, 168, 255)
    }
}

impl FromStr for Tint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Tint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn strip_call<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')
}

fn parse_channel(part: &str, spec: &str) -> Result<u8> {
    part.parse::<u8>().map_err(|_| Error::InvalidTint(spec.to_string()))
}

fn is_unit_alpha(part: &str) -> bool {
    part.parse::<f64>().is_ok_and(|a| (0.0..=1.0).contains(&a))
}

fn parse_hex(hex: &str) -> Option<Tint> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
    match hex.len() {
        6 => {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            Some(Tint::new(byte(0)?, byte(2)?, byte(4)?))
        }
        3 => Some(Tint::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        _ => None,
    }
}

/// How the tint is laid over the painted iris
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TintBlend {
    /// Plain color laid over existing pixels
    #[default]
    SourceAtop,
    /// Hue and saturation of the tint with the luminosity of the iris
    Color,
}

impl TintBlend {
    /// Compositing operator used to lay the tint over the painted iris
    #[must_use]
    pub const fn blend_mode(self) -> BlendMode {
        match self {
            Self::SourceAtop => BlendMode::SourceAtop,
            Self::Color => BlendMode::Color,
        }
    }
}

/// Selectable tint set with a current selection
#[derive(Debug, Clone, PartialEq)]
pub struct TintPalette {
    tints: Vec<Tint>,
    selected: usize,
}

impl TintPalette {
    /// Build a palette from color specifications
    ///
    /// # Errors
    ///
    /// Returns an error if the palette is empty, a color does not parse, or
    /// the selection is out of range.
    pub fn from_specs<S: AsRef<str>>(specs: &[S], selected: usize) -> Result<Self> {
        let tints = specs.iter().map(|s| Tint::parse(s.as_ref())).collect::<Result<Vec<_>>>()?;
        if tints.is_empty() {
            return Err(Error::InvalidInput("Tint palette is empty".to_string()));
        }
        if selected >= tints.len() {
            return Err(Error::InvalidInput(format!(
                "Selected tint {selected} out of range for {} tints",
                tints.len()
            )));
        }
        Ok(Self { tints, selected })
    }

    #[must_use]
    pub fn current(&self) -> Tint {
        self.tints[self.selected]
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn tints(&self) -> &[Tint] {
        &self.tints
    }

    /// Select by index; returns the new tint, or `None` if out of range
    pub fn select(&mut self, index: usize) -> Option<Tint> {
        if index < self.tints.len() {
            self.selected = index;
            Some(self.current())
        } else {
            None
        }
    }

    /// Select `tint`, appending it if the palette does not hold it yet
    pub fn choose(&mut self, tint: Tint) -> usize {
        let index = self.tints.iter().position(|&t| t == tint).unwrap_or_else(|| {
            self.tints.push(tint);
            self.tints.len() - 1
        });
        self.selected = index;
        index
    }

    /// Advance to the next tint, wrapping around
    pub fn cycle(&mut self) -> Tint {
        self.selected = (self.selected + 1) % self.tints.len();
        self.current()
    }
}

impl Default for TintPalette {
    fn default() -> Self {
        Self {
            tints: crate::config::DEFAULT_TINTS
                .iter()
                .filter_map(|s| Tint::parse(s).ok())
                .collect(),
            selected: 0,
        }
    }
}
