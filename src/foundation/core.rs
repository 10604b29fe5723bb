use crate::foundation::error::{FlythroughError, FlythroughResult};

/// Absolute 0-based frame index along a camera path.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Projection used by the renderer for a pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lens {
    /// Plain perspective projection. Every interpolated pose uses it.
    #[default]
    Pinhole,
    /// Perspective with depth of field.
    Normal,
    /// Fisheye projection.
    Fisheye,
    /// Full spherical projection.
    Spherical,
}

/// One camera pose: position, orientation, field of view, scene time and lens.
///
/// Positions are scene units (centimetres), angles are radians and `time` is in the scene's time
/// unit (milliseconds for JSON scenes).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraPose {
    /// Position along the x axis.
    pub x: f64,
    /// Position along the y axis.
    pub y: f64,
    /// Elevation.
    pub z: f64,
    /// Rotation around the vertical axis.
    pub yaw: f64,
    /// Rotation around the horizontal axis; positive values look down.
    pub pitch: f64,
    /// Horizontal field of view.
    pub field_of_view: f64,
    /// Scene timestamp (drives sun position and similar time-of-day effects).
    #[serde(default)]
    pub time: i64,
    /// Projection mode.
    #[serde(default)]
    pub lens: Lens,
}

impl CameraPose {
    /// Euclidean 3D distance between the two camera positions.
    pub fn distance_to(&self, other: &CameraPose) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Return `true` when every floating-point attribute is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.z,
            self.yaw,
            self.pitch,
            self.field_of_view,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Create a validated, non-empty frame size.
    pub fn new(width: u32, height: u32) -> FlythroughResult<Self> {
        if width == 0 || height == 0 {
            return Err(FlythroughError::validation(
                "frame width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Width over height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Return `true` when both dimensions are even (needed by yuv420p codecs).
    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
