use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::CameraPose;
use crate::foundation::error::{FlythroughError, FlythroughResult};

/// Opaque RGB8 colour. Accepts `"#RRGGBB"` strings or `[r, g, b]` arrays in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb8(pub [u8; 3]);

impl<'de> Deserialize<'de> for Rgb8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Arr([u8; 3]),
            Hex(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Arr(rgb) => Ok(Self(rgb)),
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
        }
    }
}

fn parse_hex(s: &str) -> Result<Rgb8, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if s.len() != 6 || !s.is_ascii() {
        return Err("hex color must be #RRGGBB (case-insensitive)".to_owned());
    }

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    Ok(Rgb8([
        hex_byte(&s[0..2])?,
        hex_byte(&s[2..4])?,
        hex_byte(&s[4..6])?,
    ]))
}

/// Everything the preview renderer draws besides the camera itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Sky colour at the zenith.
    pub sky: Rgb8,
    /// Sky and fog colour at the horizon.
    pub horizon: Rgb8,
    /// Primary ground tile colour.
    pub ground: Rgb8,
    /// Alternate ground tile colour.
    pub ground_alt: Rgb8,
    /// Edge length of a ground tile in scene units.
    pub tile_size: f64,
    /// Distance at which the ground fully fades into the horizon colour.
    pub fog_distance: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            sky: Rgb8([64, 120, 204]),
            horizon: Rgb8([204, 222, 240]),
            ground: Rgb8([122, 104, 84]),
            ground_alt: Rgb8([168, 150, 126]),
            tile_size: 100.0,
            fog_distance: 20_000.0,
        }
    }
}

/// A scene description: the keyframe camera path and its environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Author-supplied keyframes, in playback order.
    pub camera_path: Vec<CameraPose>,
    /// Rendering environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Scene {
    /// Parse and validate a scene from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> FlythroughResult<Self> {
        let scene: Scene = serde_json::from_reader(r)
            .map_err(|e| FlythroughError::scene_read(format!("parse scene JSON: {e}")))?;
        scene.validate()?;
        Ok(scene)
    }

    /// Parse and validate a scene from a JSON string.
    pub fn from_json_str(s: &str) -> FlythroughResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse and validate a scene from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> FlythroughResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FlythroughError::scene_read(format!("open scene '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check the invariants the interpolator and renderer rely on.
    pub fn validate(&self) -> FlythroughResult<()> {
        if self.camera_path.is_empty() {
            return Err(FlythroughError::scene_read(
                "scene has an empty camera_path (at least one keyframe is required)",
            ));
        }
        if let Some(i) = self.camera_path.iter().position(|k| !k.is_finite()) {
            return Err(FlythroughError::scene_read(format!(
                "camera_path keyframe {i} has a non-finite attribute"
            )));
        }
        let env = &self.environment;
        if !(env.tile_size.is_finite() && env.tile_size > 0.0) {
            return Err(FlythroughError::scene_read(
                "environment.tile_size must be a finite value > 0",
            ));
        }
        if !(env.fog_distance.is_finite() && env.fog_distance > 0.0) {
            return Err(FlythroughError::scene_read(
                "environment.fog_distance must be a finite value > 0",
            ));
        }
        Ok(())
    }

    /// The keyframe camera path, never empty for a validated scene.
    pub fn keyframes(&self) -> &[CameraPose] {
        &self.camera_path
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
