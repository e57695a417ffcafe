//! Reference view renderer for preview and export.
//!
//! Ray-casts a checkerboard ground plane under a gradient sky from a fixed
//! eye, using the camera's angles of view. Enough to see the framing change
//! when ratio or fov change; not a scene renderer.

use glam::{Quat, Vec3};
use image::RgbaImage;
use rayon::prelude::*;

use crate::core::aspect;
use crate::entities::camera::CameraFraming;
use crate::utils::numeric::MAX_PIXELS;

/// Eye height above the ground plane (scene units).
const EYE_HEIGHT: f32 = 1.6;
/// Downward pitch of the view (degrees).
const PITCH_DEG: f32 = 10.0;
/// Ground checker cell size (scene units).
const CELL: f32 = 1.0;
/// Fog density toward the horizon.
const FOG: f32 = 0.015;

const SKY_TOP: [f32; 3] = [0.33, 0.52, 0.80];
const SKY_HORIZON: [f32; 3] = [0.82, 0.88, 0.95];
const GROUND_A: [f32; 3] = [0.35, 0.38, 0.36];
const GROUND_B: [f32; 3] = [0.55, 0.58, 0.55];

/// Sample offsets inside a pixel
const SAMPLES_1X: &[(f32, f32)] = &[(0.5, 0.5)];
const SAMPLES_AA: &[(f32, f32)] = &[(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// 2x2 supersampling
    pub antialias: bool,
    /// Sky pixels get alpha 0
    pub transparent: bool,
}

/// Render `view` into a `width` x `height` image.
///
/// The vertical angle of view comes from the camera; the horizontal extent
/// follows the output ratio. Each edge is clamped into 1..=`MAX_PIXELS`.
pub fn render_view(view: &CameraFraming, width: u32, height: u32, opts: RenderOptions) -> RgbaImage {
    let width = width.clamp(1, MAX_PIXELS);
    let height = height.clamp(1, MAX_PIXELS);

    let v_aov = aspect::angles_of_view(view)
        .map(|(_, v)| v)
        .unwrap_or(view.field_of_view);
    let tan_y = (v_aov.to_radians() as f32 / 2.0).tan();
    let tan_x = tan_y * width as f32 / height as f32;

    let pitch = Quat::from_rotation_x(-PITCH_DEG.to_radians());
    let samples = if opts.antialias { SAMPLES_AA } else { SAMPLES_1X };
    let row_len = width as usize * 4;

    let mut buf = vec![0u8; row_len * height as usize];
    buf.par_chunks_mut(row_len).enumerate().for_each(|(py, row)| {
        for px in 0..width as usize {
            let mut acc = [0.0f32; 4];
            for &(sx, sy) in samples {
                let x = (2.0 * (px as f32 + sx) / width as f32 - 1.0) * tan_x;
                let y = (1.0 - 2.0 * (py as f32 + sy) / height as f32) * tan_y;
                let dir = pitch * Vec3::new(x, y, -1.0).normalize();
                let c = shade(dir, opts.transparent);
                for (a, v) in acc.iter_mut().zip(c) {
                    *a += v;
                }
            }
            let n = samples.len() as f32;
            let out = &mut row[px * 4..px * 4 + 4];
            for (o, a) in out.iter_mut().zip(acc) {
                *o = ((a / n).clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    });

    RgbaImage::from_raw(width, height, buf).unwrap_or_else(|| RgbaImage::new(width, height))
}

/// Color along one view ray, straight (non-premultiplied) RGBA.
fn shade(dir: Vec3, transparent: bool) -> [f32; 4] {
    if dir.y < -1.0e-4 {
        let t = EYE_HEIGHT / -dir.y;
        let hit = Vec3::new(0.0, EYE_HEIGHT, 0.0) + dir * t;
        let parity = ((hit.x / CELL).floor() as i64 + (hit.z / CELL).floor() as i64) & 1;
        let base = if parity == 0 { GROUND_A } else { GROUND_B };
        let fog = 1.0 - (-t * FOG).exp();
        let rgb = lerp3(base, SKY_HORIZON, fog);
        return [rgb[0], rgb[1], rgb[2], 1.0];
    }
    if transparent {
        return [0.0, 0.0, 0.0, 0.0];
    }
    let rgb = lerp3(SKY_HORIZON, SKY_TOP, dir.y.clamp(0.0, 1.0).sqrt());
    [rgb[0], rgb[1], rgb[2], 1.0]
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Safe frame inside a viewport: (x, y, width, height) in viewport pixels.
///
/// Letterboxed (bars top/bottom) when the camera ratio is wider than the
/// viewport, pillarboxed otherwise. Unset ratio covers the whole viewport.
pub fn safe_frame_rect(viewport_width: f32, viewport_height: f32, camera_ratio: f64) -> (f32, f32, f32, f32) {
    if camera_ratio <= 0.0 || viewport_width <= 0.0 || viewport_height <= 0.0 {
        return (0.0, 0.0, viewport_width, viewport_height);
    }
    let ratio = camera_ratio as f32;
    let viewport_ratio = viewport_width / viewport_height;
    if ratio > viewport_ratio {
        let h = viewport_width / ratio;
        (0.0, (viewport_height - h) / 2.0, viewport_width, h)
    } else {
        let w = viewport_height * ratio;
        ((viewport_width - w) / 2.0, 0.0, w, viewport_height)
    }
}
