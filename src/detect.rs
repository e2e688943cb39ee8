//! Per-frame ball measurement.
//!
//! Two detection strategies, tried in order inside a search window:
//! 1. color-signature matching against a reference color sampled at the
//!    user's seed tap (sum of per-channel absolute differences),
//! 2. frame-difference motion detection against the previous sampled frame
//!    (intensity-weighted centroid of moving pixels).
//!
//! When both fail the frame yields no measurement and the filter coasts.

use log::debug;

use crate::frames::FrameRgb8;

/// Detection tunables.
#[derive(Clone, Copy, Debug)]
pub struct DetectorParams {
    /// Half-size of the square search window around the predicted position.
    pub search_radius_px: usize,
    /// Maximum summed per-channel absolute difference for a pixel to match
    /// the color signature.
    pub color_tolerance: f64,
    /// Minimum number of matching pixels before the color centroid is
    /// trusted.
    pub min_color_pixels: usize,
    /// Per-pixel grayscale difference below which motion is ignored.
    pub motion_pixel_threshold: f64,
    /// Minimum aggregate motion weight for the motion centroid.
    pub min_motion_weight: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            search_radius_px: 160,
            color_tolerance: 90.0,
            min_color_pixels: 20,
            motion_pixel_threshold: 25.0,
            min_motion_weight: 400.0,
        }
    }
}

/// Stateful per-frame detector. Feed frames in temporal order.
pub struct BallDetector {
    params: DetectorParams,
    signature: Option<[f64; 3]>,
    prev_luma: Option<Vec<f64>>,
    width: usize,
    height: usize,
}

impl BallDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            params,
            signature: None,
            prev_luma: None,
            width: 0,
            height: 0,
        }
    }

    /// Record frame dimensions and, when a seed pixel is supplied, the
    /// reference color signature. Call once with the first sampled frame.
    pub fn begin(&mut self, frame: &FrameRgb8, seed_px: Option<[f64; 2]>) {
        self.width = frame.width();
        self.height = frame.height();
        if let Some([sx, sy]) = seed_px {
            let x = (sx.round().max(0.0) as usize).min(self.width.saturating_sub(1));
            let y = (sy.round().max(0.0) as usize).min(self.height.saturating_sub(1));
            let [r, g, b] = frame.pixel(x, y);
            self.signature = Some([r as f64, g as f64, b as f64]);
            debug!("ball color signature seeded at ({x}, {y}): ({r}, {g}, {b})");
        }
    }

    /// One measurement attempt. `predicted_px` centers the search window;
    /// without a prediction the full frame is scanned.
    pub fn detect(&mut self, frame: &FrameRgb8, predicted_px: Option<[f64; 2]>) -> Option<[f64; 2]> {
        let window = self.window(predicted_px);
        let found = self
            .detect_by_color(frame, window)
            .or_else(|| self.detect_by_motion(frame, window));
        self.store_luma(frame);
        found
    }

    /// Clipped search window as (x0, y0, x1, y1), exclusive upper bounds.
    fn window(&self, predicted_px: Option<[f64; 2]>) -> (usize, usize, usize, usize) {
        match predicted_px {
            None => (0, 0, self.width, self.height),
            Some([px, py]) => {
                let r = self.params.search_radius_px as f64;
                let x0 = (px - r).floor().max(0.0) as usize;
                let y0 = (py - r).floor().max(0.0) as usize;
                let x1 = ((px + r).ceil() as usize + 1).min(self.width);
                let y1 = ((py + r).ceil() as usize + 1).min(self.height);
                (x0.min(x1), y0.min(y1), x1, y1)
            }
        }
    }

    fn detect_by_color(
        &self,
        frame: &FrameRgb8,
        (x0, y0, x1, y1): (usize, usize, usize, usize),
    ) -> Option<[f64; 2]> {
        let [sr, sg, sb] = self.signature?;
        let mut count = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for y in y0..y1 {
            for x in x0..x1 {
                let [r, g, b] = frame.pixel(x, y);
                let diff =
                    (r as f64 - sr).abs() + (g as f64 - sg).abs() + (b as f64 - sb).abs();
                if diff < self.params.color_tolerance {
                    count += 1;
                    sum_x += x as f64;
                    sum_y += y as f64;
                }
            }
        }
        if count < self.params.min_color_pixels {
            return None;
        }
        Some([sum_x / count as f64, sum_y / count as f64])
    }

    fn detect_by_motion(
        &self,
        frame: &FrameRgb8,
        (x0, y0, x1, y1): (usize, usize, usize, usize),
    ) -> Option<[f64; 2]> {
        let prev = self.prev_luma.as_ref()?;
        let mut weight = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for y in y0..y1 {
            for x in x0..x1 {
                let diff = (frame.luma(x, y) - prev[y * self.width + x]).abs();
                if diff > self.params.motion_pixel_threshold {
                    weight += diff;
                    sum_x += diff * x as f64;
                    sum_y += diff * y as f64;
                }
            }
        }
        if weight < self.params.min_motion_weight {
            return None;
        }
        Some([sum_x / weight, sum_y / weight])
    }

    fn store_luma(&mut self, frame: &FrameRgb8) {
        let mut luma = match self.prev_luma.take() {
            Some(buf) if buf.len() == self.width * self.height => buf,
            _ => vec![0.0; self.width * self.height],
        };
        for y in 0..self.height {
            for x in 0..self.width {
                luma[y * self.width + x] = frame.luma(x, y);
            }
        }
        self.prev_luma = Some(luma);
    }
}
