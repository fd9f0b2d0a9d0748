//! Command line arguments and the validated settings built from them.

use std::ops::RangeInclusive;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;

use crate::sketch::terrain::{FalloffKernel, FalloffShape};

pub const STROKE_WIDTH_RANGE: RangeInclusive<f32> = 0.01..=0.05;
pub const FALLOFF_RADIUS_RANGE: RangeInclusive<f32> = 0.5..=25.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("ground needs at least one segment per side")]
    NoGroundSegments,
}

/// sRGB color with components in 0..=1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_srgb_u8([r, g, b]: [u8; 3]) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn to_srgb_u8(self) -> [u8; 3] {
        [self.r, self.g, self.b].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_srgb_u8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Linear RGBA for the shader; the swapchain re-encodes to sRGB.
    pub fn to_linear_rgba(self) -> [f32; 4] {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [decode(self.r), decode(self.g), decode(self.b), 1.0]
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::from_srgb_u8([channel(0)?, channel(2)?, channel(4)?]))
    }
}

/// Harold's crayons: sketch strokes into a 3D world
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// stroke width in normalized device units
    #[arg(long, default_value_t = 0.02)]
    pub stroke_width: f32,

    /// crayon color as #rrggbb
    #[arg(long, default_value = "#219d20")]
    pub crayon_color: String,

    /// sky color as #rrggbb
    #[arg(long, default_value = "#bfeafc")]
    pub sky_color: String,

    /// ground color as #rrggbb
    #[arg(long, default_value = "#400040")]
    pub ground_color: String,

    /// edge length of the square ground grid
    #[arg(long, default_value_t = 100.0)]
    pub ground_size: f32,

    /// grid cells per ground edge
    #[arg(long, default_value_t = 100)]
    pub ground_segments: u32,

    /// edge length of the sky box
    #[arg(long, default_value_t = 500.0)]
    pub sky_size: f32,

    /// eye height above the ground
    #[arg(long, default_value_t = 2.0)]
    pub camera_height: f32,

    /// fewest stroke points accepted as a terrain edit
    #[arg(long, default_value_t = 6)]
    pub min_terrain_points: usize,

    /// lateral falloff of terrain edits
    #[arg(long, value_enum, default_value_t = FalloffShape::Quadratic)]
    pub falloff: FalloffShape,

    /// distance from the stroke plane where terrain edits fade out
    #[arg(long, default_value_t = 5.0)]
    pub falloff_radius: f32,

    /// how far sky strokes are pulled in front of the sky box
    #[arg(long, default_value_t = 0.5)]
    pub sky_offset: f32,

    /// display debug information
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SketchConfig {
    pub stroke_width: f32,
    pub crayon_color: Color,
    pub sky_color: Color,
    pub ground_color: Color,
    pub ground_size: f32,
    pub ground_segments: u32,
    pub sky_size: f32,
    pub camera_height: f32,
    pub min_terrain_points: usize,
    pub falloff: FalloffKernel,
    pub sky_offset: f32,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            stroke_width: 0.02,
            crayon_color: Color::from_srgb_u8([0x21, 0x9d, 0x20]),
            sky_color: Color::from_srgb_u8([0xbf, 0xea, 0xfc]),
            ground_color: Color::from_srgb_u8([0x40, 0x00, 0x40]),
            ground_size: 100.0,
            ground_segments: 100,
            sky_size: 500.0,
            camera_height: 2.0,
            min_terrain_points: 6,
            falloff: FalloffKernel::default(),
            sky_offset: 0.5,
        }
    }
}

impl CliArgs {
    pub fn into_config(self) -> Result<SketchConfig, ConfigError> {
        check_range("stroke width", self.stroke_width, STROKE_WIDTH_RANGE)?;
        check_range("falloff radius", self.falloff_radius, FALLOFF_RADIUS_RANGE)?;
        check_positive("ground size", self.ground_size)?;
        check_positive("sky size", self.sky_size)?;
        check_positive("camera height", self.camera_height)?;
        if self.sky_offset < 0.0 {
            return Err(ConfigError::NotPositive {
                name: "sky offset",
                value: self.sky_offset,
            });
        }
        if self.ground_segments == 0 {
            return Err(ConfigError::NoGroundSegments);
        }

        Ok(SketchConfig {
            stroke_width: self.stroke_width,
            crayon_color: self.crayon_color.parse()?,
            sky_color: self.sky_color.parse()?,
            ground_color: self.ground_color.parse()?,
            ground_size: self.ground_size,
            ground_segments: self.ground_segments,
            sky_size: self.sky_size,
            camera_height: self.camera_height,
            min_terrain_points: self.min_terrain_points,
            falloff: FalloffKernel::new(self.falloff, self.falloff_radius),
            sky_offset: self.sky_offset,
        })
    }
}

fn check_range(name: &'static str, value: f32, range: RangeInclusive<f32>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let c: Color = "#219d20".parse().unwrap();
        assert_eq!(c.to_srgb_u8(), [0x21, 0x9d, 0x20]);
        assert_eq!(c.to_hex(), "#219d20");
        assert_eq!("#BFEAFC".parse::<Color>().unwrap().to_srgb_u8(), [0xbf, 0xea, 0xfc]);
    }

    #[test]
    fn rejects_bad_colors() {
        for bad in ["219d20", "#219d2", "#zz9d20", "#219d20ff", "#ééé"] {
            assert_eq!(
                bad.parse::<Color>(),
                Err(ConfigError::InvalidColor(bad.to_string()))
            );
        }
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let args = CliArgs::parse_from(["crayon3d"]);
        assert_eq!(args.into_config().unwrap(), SketchConfig::default());
    }

    #[test]
    fn rejects_out_of_range_width() {
        let args = CliArgs::parse_from(["crayon3d", "--stroke-width", "0.2"]);
        assert!(matches!(
            args.into_config(),
            Err(ConfigError::OutOfRange { name: "stroke width", .. })
        ));
    }

    #[test]
    fn falloff_flags_reach_the_kernel() {
        let args = CliArgs::parse_from(["crayon3d", "--falloff", "cosine", "--falloff-radius", "8"]);
        let config = args.into_config().unwrap();
        assert_eq!(config.falloff, FalloffKernel::new(FalloffShape::Cosine, 8.0));
    }
}
