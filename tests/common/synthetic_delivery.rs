//! Synthetic delivery footage for end-to-end tests.
//!
//! Renders a red ball moving in a straight pixel line over a green pitch
//! and serves each frame as in-memory JPEG, the way a real video backend
//! would. The default scene uses a symmetric trapezoid of pitch corners
//! centered on x = 400, so a ball travelling straight down that column maps
//! onto the world center line.

use lbw_tracker::frames::{FrameFetchError, FrameProvider};

pub const BACKGROUND_RGB: [u8; 3] = [46, 110, 52];
pub const BALL_RGB: [u8; 3] = [190, 40, 36];
pub const BALL_RADIUS_PX: f64 = 9.0;

/// Pitch corners matching the rendered scene, ordered striker-left,
/// striker-right, bowler-right, bowler-left.
pub const PITCH_CORNERS_PX: [[f64; 2]; 4] = [
    [150.0, 850.0],
    [650.0, 850.0],
    [530.0, 150.0],
    [270.0, 150.0],
];

pub struct SyntheticDelivery {
    pub width: u32,
    pub height: u32,
    /// Ball center at `start_ms`.
    pub start_px: [f64; 2],
    /// Ball center at `start_ms + duration_ms`.
    pub end_px: [f64; 2],
    pub start_ms: i64,
    pub duration_ms: i64,
}

impl SyntheticDelivery {
    /// Ball travelling from near the bowler's end straight toward the
    /// striker along pixel column 400 (the world center line).
    pub fn straight() -> Self {
        Self {
            width: 800,
            height: 900,
            start_px: [400.0, 180.0],
            end_px: [400.0, 840.0],
            start_ms: 0,
            duration_ms: 1500,
        }
    }

    pub fn ball_center(&self, time_ms: i64) -> [f64; 2] {
        let t = ((time_ms - self.start_ms) as f64 / self.duration_ms as f64).clamp(0.0, 1.0);
        [
            self.start_px[0] + t * (self.end_px[0] - self.start_px[0]),
            self.start_px[1] + t * (self.end_px[1] - self.start_px[1]),
        ]
    }
}

impl FrameProvider for SyntheticDelivery {
    fn frame_jpeg(&self, time_ms: i64, quality: u8) -> Result<Vec<u8>, FrameFetchError> {
        let [cx, cy] = self.ball_center(time_ms);
        let r2 = BALL_RADIUS_PX * BALL_RADIUS_PX;

        let img = image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            if dx * dx + dy * dy <= r2 {
                image::Rgb(BALL_RGB)
            } else {
                image::Rgb(BACKGROUND_RGB)
            }
        });

        let mut out = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.max(70))
            .encode_image(&img)
            .map_err(|e| FrameFetchError {
                time_ms,
                reason: e.to_string(),
            })?;
        Ok(out)
    }
}
