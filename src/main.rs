use lbw_tracker::frames::{FrameFetchError, FrameProvider};
use lbw_tracker::prelude::*;

/// Demo provider: renders a red ball travelling down a green pitch and
/// hands frames over as in-memory JPEG, the way a real video backend would.
struct SyntheticDelivery {
    width: u32,
    height: u32,
}

impl FrameProvider for SyntheticDelivery {
    fn frame_jpeg(&self, time_ms: i64, quality: u8) -> Result<Vec<u8>, FrameFetchError> {
        let t = (time_ms as f64 / 1500.0).clamp(0.0, 1.0);
        let cx = 400.0;
        let cy = 180.0 + t * 620.0;

        let img = image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            if dx * dx + dy * dy <= 81.0 {
                image::Rgb([190, 40, 36])
            } else {
                image::Rgb([46, 110, 52])
            }
        });

        let mut out = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&img)
            .map_err(|e| FrameFetchError {
                time_ms,
                reason: e.to_string(),
            })?;
        Ok(out)
    }
}

fn main() {
    env_logger::init();

    let provider = SyntheticDelivery {
        width: 800,
        height: 900,
    };
    let request = TrackingRequest {
        start_ms: 0,
        end_ms: 1500,
        sample_fps: 30,
        seed_px: Some([400.0, 180.0]),
        calibration: Some(PitchCalibration::from_pixel_corners([
            [150.0, 850.0],
            [650.0, 850.0],
            [530.0, 150.0],
            [270.0, 150.0],
        ])),
        ..Default::default()
    };

    match run_tracking(&provider, &request, Some(&|pct, stage| {
        eprintln!("[{pct:3}%] {stage}");
    })) {
        Ok(outcome) => {
            println!(
                "tracked {} points over a {}x{} frame",
                outcome.track.len(),
                outcome.image_size.width,
                outcome.image_size.height
            );
            if let Some(lbw) = &outcome.lbw {
                println!(
                    "{} (predicted lateral {:.3} m)",
                    lbw.reason, lbw.predicted_lateral_m
                );
            }
            for w in &outcome.warnings {
                println!("warning: {w}");
            }
        }
        Err(err) => eprintln!("tracking failed: {err}"),
    }
}
