use std::f64::consts::PI;

use crate::foundation::core::{CameraPose, Lens};
use crate::foundation::error::{FlythroughError, FlythroughResult};

/// Upper bound on the number of poses a single path may contain.
pub const MAX_PATH_FRAMES: u64 = 10_000_000;

/// Maximum per-frame change budgeted for each pose attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathQuanta {
    /// Scene distance units (centimetres) travelled per frame.
    pub move_per_frame: f64,
    /// Radians of yaw, pitch or field-of-view change per frame.
    pub angle_per_frame: f64,
    /// Scene time units elapsed per frame. 250 frames cover one day at 25 fps.
    pub time_per_frame: f64,
}

impl PathQuanta {
    /// Derive the quanta from a camera speed in metres per second and an output frame rate.
    pub fn new(speed_m_per_s: f64, fps: u32) -> FlythroughResult<Self> {
        if !speed_m_per_s.is_finite() || speed_m_per_s <= 0.0 {
            return Err(FlythroughError::validation(
                "camera speed must be a finite value > 0",
            ));
        }
        if fps == 0 {
            return Err(FlythroughError::validation("fps must be non-zero"));
        }

        let fps = f64::from(fps);
        Ok(Self {
            move_per_frame: speed_m_per_s * 100.0 / fps,
            angle_per_frame: PI / 120.0 * 30.0 * speed_m_per_s / fps,
            time_per_frame: 345_600.0 / fps * 25.0,
        })
    }

    /// Number of poses inserted between `a` and `b` (the last one lands on `b`).
    ///
    /// This is the floor of the largest attribute count, with a minimum of one so `b` is never
    /// dropped.
    pub fn segment_frame_count(&self, a: &CameraPose, b: &CameraPose) -> u64 {
        let counts = [
            a.distance_to(b) / self.move_per_frame,
            (b.yaw - a.yaw).abs() / self.angle_per_frame,
            (b.pitch - a.pitch).abs() / self.angle_per_frame,
            (b.field_of_view - a.field_of_view).abs() / self.angle_per_frame,
            (b.time as f64 - a.time as f64).abs() / self.time_per_frame,
        ];
        let max = counts.into_iter().fold(0.0_f64, f64::max);
        // Float-to-int casts saturate, so absurd counts end up at u64::MAX and trip the path limit.
        (max.floor() as u64).max(1)
    }
}

/// Dense, immutable sequence of camera poses sampled at a fixed frame rate.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraPath {
    poses: Vec<CameraPose>,
    fps: u32,
}

impl CameraPath {
    /// Frame rate the path was computed for.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of poses (frames) in the path. Always at least one.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Always `false`: a computed path holds at least the first keyframe.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Pose at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&CameraPose> {
        self.poses.get(index)
    }

    /// Borrow all poses in order.
    pub fn poses(&self) -> &[CameraPose] {
        &self.poses
    }

    /// Iterate over the poses in order.
    pub fn iter(&self) -> std::slice::Iter<'_, CameraPose> {
        self.poses.iter()
    }

    /// Playback duration of the path in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.poses.len() as f64 / f64::from(self.fps)
    }
}

impl std::ops::Index<usize> for CameraPath {
    type Output = CameraPose;

    fn index(&self, index: usize) -> &Self::Output {
        &self.poses[index]
    }
}

/// Interpolate `keyframes` into a path whose consecutive poses move by at most one quantum.
///
/// The first pose is `keyframes[0]` unchanged. Every later pose is linearly interpolated and uses
/// the [`Lens::Pinhole`] projection; each segment ends exactly on its target keyframe.
#[tracing::instrument(skip(keyframes), fields(keyframes = keyframes.len()))]
pub fn compute_path(
    keyframes: &[CameraPose],
    speed_m_per_s: f64,
    fps: u32,
) -> FlythroughResult<CameraPath> {
    let quanta = PathQuanta::new(speed_m_per_s, fps)?;
    let Some(first) = keyframes.first() else {
        return Err(FlythroughError::validation(
            "camera path needs at least one keyframe",
        ));
    };
    if let Some(i) = keyframes.iter().position(|k| !k.is_finite()) {
        return Err(FlythroughError::validation(format!(
            "keyframe {i} has a non-finite attribute"
        )));
    }

    let counts: Vec<u64> = keyframes
        .windows(2)
        .map(|pair| quanta.segment_frame_count(&pair[0], &pair[1]))
        .collect();
    let total = counts.iter().fold(1_u64, |acc, &n| acc.saturating_add(n));
    if total > MAX_PATH_FRAMES {
        return Err(FlythroughError::validation(format!(
            "camera path would need {total} frames (limit {MAX_PATH_FRAMES}); \
             raise the speed or lower the fps"
        )));
    }

    let mut poses = Vec::with_capacity(total as usize);
    poses.push(*first);
    for (pair, &n) in keyframes.windows(2).zip(&counts) {
        let (a, b) = (&pair[0], &pair[1]);
        poses.extend((1..=n).map(|j| interpolate_pose(a, b, j, n)));
    }

    tracing::debug!(frames = poses.len(), ?quanta, "computed camera path");
    Ok(CameraPath { poses, fps })
}

fn interpolate_pose(a: &CameraPose, b: &CameraPose, j: u64, n: u64) -> CameraPose {
    if j == n {
        return CameraPose {
            lens: Lens::Pinhole,
            ..*b
        };
    }

    let (j, n) = (j as f64, n as f64);
    let lerp = |from: f64, to: f64| from + (to - from) * j / n;
    let dt = b.time as f64 - a.time as f64;
    CameraPose {
        x: lerp(a.x, b.x),
        y: lerp(a.y, b.y),
        z: lerp(a.z, b.z),
        yaw: lerp(a.yaw, b.yaw),
        pitch: lerp(a.pitch, b.pitch),
        field_of_view: lerp(a.field_of_view, b.field_of_view),
        time: a.time.saturating_add((dt * j / n).round() as i64),
        lens: Lens::Pinhole,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/path/interpolate.rs"]
mod tests;
