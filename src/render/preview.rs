use rayon::prelude::*;

use crate::foundation::core::{CameraPose, FrameSize};
use crate::foundation::interrupt::InterruptFlag;
use crate::render::backend::{FrameRenderer, RasterImage, RenderError};
use crate::scene::model::{Environment, Rgb8};

/// Headless software renderer: a checkerboard ground plane at `z = 0` under a sky gradient.
///
/// Rows are shaded in parallel on the rayon pool; frames are still rendered one at a time. When an
/// [`InterruptFlag`] is attached, a raised flag fails the next frame with
/// [`RenderError::Interrupted`].
pub struct PreviewRenderer {
    env: Environment,
    interrupt: Option<InterruptFlag>,
    frames_rendered: u64,
}

impl PreviewRenderer {
    /// Create a renderer for `env`.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            interrupt: None,
            frames_rendered: 0,
        }
    }

    /// Observe `flag` before every frame.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl FrameRenderer for PreviewRenderer {
    fn render(
        &mut self,
        pose: &CameraPose,
        width: u32,
        height: u32,
    ) -> Result<RasterImage, RenderError> {
        if self.interrupt.as_ref().is_some_and(InterruptFlag::is_raised) {
            return Err(RenderError::Interrupted);
        }
        if width == 0 || height == 0 {
            return Err(RenderError::failed("frame width/height must be non-zero"));
        }
        if !pose.is_finite() {
            return Err(RenderError::failed("camera pose has a non-finite attribute"));
        }
        if !(pose.field_of_view > 0.0 && pose.field_of_view < std::f64::consts::PI) {
            return Err(RenderError::failed(format!(
                "field of view {} is outside (0, pi)",
                pose.field_of_view
            )));
        }

        let camera = CameraBasis::new(pose, width, height);
        let env = &self.env;
        let mut img = RasterImage::new(width, height);
        let row_len = width as usize * 3;
        let buf: &mut [u8] = &mut img;
        buf.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(py, row)| {
                for (px, pixel) in row.chunks_exact_mut(3).enumerate() {
                    let dir = camera.ray(px as u32, py as u32);
                    pixel.copy_from_slice(&shade(&camera.origin, dir, env));
                }
            });

        self.frames_rendered += 1;
        Ok(img)
    }

    fn dispose(&mut self) {
        tracing::debug!(frames = self.frames_rendered, "preview renderer disposed");
    }
}

type Vec3 = [f64; 3];

struct CameraBasis {
    origin: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    tan_half_h: f64,
    tan_half_v: f64,
    width: f64,
    height: f64,
}

impl CameraBasis {
    fn new(pose: &CameraPose, w: u32, h: u32) -> Self {
        let (sy, cy) = pose.yaw.sin_cos();
        let (sp, cp) = pose.pitch.sin_cos();
        let width = f64::from(w);
        let height = f64::from(h);
        let tan_half_h = (pose.field_of_view / 2.0).tan();
        Self {
            origin: [pose.x, pose.y, pose.z],
            forward: [-sy * cp, cy * cp, -sp],
            right: [cy, sy, 0.0],
            // right x forward
            up: [-sy * sp, cy * sp, cp],
            tan_half_h,
            tan_half_v: tan_half_h / FrameSize { width: w, height: h }.aspect(),
            width,
            height,
        }
    }

    fn ray(&self, px: u32, py: u32) -> Vec3 {
        let sx = (2.0 * (f64::from(px) + 0.5) / self.width - 1.0) * self.tan_half_h;
        let sy = (1.0 - 2.0 * (f64::from(py) + 0.5) / self.height) * self.tan_half_v;
        [
            self.forward[0] + self.right[0] * sx + self.up[0] * sy,
            self.forward[1] + self.right[1] * sx + self.up[1] * sy,
            self.forward[2] + self.right[2] * sx + self.up[2] * sy,
        ]
    }
}

fn shade(origin: &Vec3, dir: Vec3, env: &Environment) -> [u8; 3] {
    let len = (dir[0] * dir[0] + dir[1] * dir[1] + dir[2] * dir[2]).sqrt();
    let hits_ground = dir[2] != 0.0 && (origin[2] > 0.0) == (dir[2] < 0.0);

    if hits_ground {
        let t = -origin[2] / dir[2];
        let hx = origin[0] + dir[0] * t;
        let hy = origin[1] + dir[1] * t;
        let tile = (hx / env.tile_size).floor() as i64 + (hy / env.tile_size).floor() as i64;
        let base = if tile.rem_euclid(2) == 0 {
            env.ground
        } else {
            env.ground_alt
        };
        let fog = (t * len / env.fog_distance).min(1.0);
        return mix(base, env.horizon, fog);
    }

    let elevation = (dir[2] / len).clamp(0.0, 1.0);
    mix(env.horizon, env.sky, elevation.sqrt())
}

fn mix(a: Rgb8, b: Rgb8, t: f64) -> [u8; 3] {
    let channel = |i: usize| {
        let (a, b) = (f64::from(a.0[i]), f64::from(b.0[i]));
        (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
    };
    [channel(0), channel(1), channel(2)]
}

#[cfg(test)]
#[path = "../../tests/unit/render/preview.rs"]
mod tests;
