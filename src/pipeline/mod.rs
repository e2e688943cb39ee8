//! End-to-end tracking orchestration.
//!
//! One tracking request is one ordered pass over sampled timestamps: decode
//! each frame, run the detector and filter, map the track into the pitch
//! plane, estimate bounce/impact, synthesize the 3D trajectory and assess
//! LBW. The run fails with a single terminal [`PipelineError`]; recovered
//! hiccups (a skipped frame, a degraded calibration) become warning strings
//! in the outcome.

pub mod events;

use std::sync::mpsc;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::calibration::{CalibrationSolveError, PitchCalibration};
use crate::detect::{BallDetector, DetectorParams};
use crate::error::{PipelineError, TrackingError};
use crate::frames::{FrameProvider, FrameRgb8, FrameStore, FrameStoreParams};
use crate::kalman::{Kalman2D, Kalman2DParams};
use crate::lbw::{self, LbwAssessment};
use crate::trajectory::{
    extend_to_stumps, fit_lateral_trend, synthesize_heights, HeightModelParams,
    LATERAL_FIT_WINDOW,
};
use crate::types::{EventEstimate, ImageSize, PitchPlanePoint, TrackPoint, TrajectoryPoint3D};

/// Confidence attached to directly detected samples.
const DETECTED_CONFIDENCE: f64 = 1.0;
/// Confidence attached to coasted (predicted-only) samples.
const COASTED_CONFIDENCE: f64 = 0.35;
/// Number of synthetic samples appended between impact and the stumps.
const STUMP_EXTENSION_STEPS: usize = 6;

/// Progress callback: percentage in [0, 100] and a short stage name.
pub type ProgressFn<'a> = &'a dyn Fn(u8, &str);

/// Everything one tracking run needs.
#[derive(Clone, Debug)]
pub struct TrackingRequest {
    /// Segment start within the source video, milliseconds.
    pub start_ms: i64,
    /// Segment end, milliseconds; must come after `start_ms`.
    pub end_ms: i64,
    /// Sampling rate over the segment.
    pub sample_fps: u32,
    /// Hard cap on sampled frames regardless of segment length.
    pub max_frames: usize,
    /// Optional user tap on the ball in the first frame.
    pub seed_px: Option<[f64; 2]>,
    /// Pitch-corner calibration; without it the run stops after the
    /// image-plane track.
    pub calibration: Option<PitchCalibration>,
    pub pitch_length_m: f64,
    pub pitch_width_m: f64,
    /// Caller-supplied bounce sample index, overriding the heuristic.
    pub bounce_index: Option<usize>,
    /// Caller-supplied impact sample index, overriding the heuristic.
    pub impact_index: Option<usize>,
    pub detector: DetectorParams,
    pub filter: Kalman2DParams,
    pub frames: FrameStoreParams,
    pub height: HeightModelParams,
}

impl Default for TrackingRequest {
    fn default() -> Self {
        Self {
            start_ms: 0,
            end_ms: 0,
            sample_fps: 30,
            max_frames: 180,
            seed_px: None,
            calibration: None,
            pitch_length_m: crate::config::PITCH_LENGTH_M,
            pitch_width_m: crate::config::PITCH_WIDTH_M,
            bounce_index: None,
            impact_index: None,
            detector: DetectorParams::default(),
            filter: Kalman2DParams::default(),
            frames: FrameStoreParams::default(),
            height: HeightModelParams::default(),
        }
    }
}

/// Bounce and impact estimates of one run.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct EventsReport {
    pub bounce: EventEstimate,
    pub impact: EventEstimate,
}

/// Result payload of one tracking run.
#[derive(Clone, Debug, Serialize)]
pub struct TrackingOutcome {
    pub image_size: ImageSize,
    /// Ordered image-plane track.
    pub track: Vec<TrackPoint>,
    /// Track mapped into pitch-plane meters; `None` without calibration.
    pub pitch_plane: Option<Vec<PitchPlanePoint>>,
    /// 3D trajectory including the extension to the stumps plane.
    pub trajectory: Option<Vec<TrajectoryPoint3D>>,
    pub events: EventsReport,
    /// Row-major image→pitch homography coefficients.
    pub homography: Option<[f64; 9]>,
    pub lbw: Option<LbwAssessment>,
    /// Non-fatal degradations encountered during the run.
    pub warnings: Vec<String>,
}

/// Sampled timestamps: every `round(1000/fps)` ms (clamped to [1, 1000]),
/// capped at `max_frames`.
fn sample_times(start_ms: i64, end_ms: i64, sample_fps: u32, max_frames: usize) -> Vec<i64> {
    let dt_ms = ((1000.0 / sample_fps.max(1) as f64).round() as i64).clamp(1, 1000);
    let mut times = Vec::new();
    let mut t = start_ms;
    while t <= end_ms && times.len() < max_frames {
        times.push(t);
        t += dt_ms;
    }
    times
}

fn report(progress: Option<ProgressFn<'_>>, pct: u8, stage: &str) {
    if let Some(f) = progress {
        f(pct.min(100), stage);
    }
}

fn resolve_events(
    y_px: &[f64],
    bounce_override: Option<usize>,
    impact_override: Option<usize>,
) -> EventsReport {
    let n = y_px.len();
    let clamp = |i: usize| i.min(n.saturating_sub(1));

    let mut bounce = match bounce_override {
        Some(index) => EventEstimate {
            index,
            confidence: 1.0,
        },
        None => events::estimate_bounce_index(y_px),
    };
    let mut impact = match impact_override {
        Some(index) => EventEstimate {
            index,
            confidence: 1.0,
        },
        None => events::estimate_impact_index(n),
    };
    bounce.index = clamp(bounce.index);
    impact.index = clamp(impact.index);
    EventsReport { bounce, impact }
}

/// Run the full pipeline synchronously against `provider`.
pub fn run_tracking(
    provider: &dyn FrameProvider,
    request: &TrackingRequest,
    progress: Option<ProgressFn<'_>>,
) -> Result<TrackingOutcome, PipelineError> {
    if request.start_ms < 0 || request.end_ms <= request.start_ms {
        return Err(TrackingError::InvalidSegment {
            start_ms: request.start_ms,
            end_ms: request.end_ms,
        }
        .into());
    }

    let times = sample_times(
        request.start_ms,
        request.end_ms,
        request.sample_fps,
        request.max_frames,
    );
    let dt_s = (times.get(1).map(|t| t - times[0]).unwrap_or(33)) as f64 / 1000.0;
    info!(
        "tracking {} samples in [{}, {}] ms",
        times.len(),
        request.start_ms,
        request.end_ms
    );

    let mut warnings = Vec::new();
    let store = FrameStore::new(provider, request.frames);

    report(progress, 5, "decode");
    report(progress, 35, "tracking");

    let mut detector = BallDetector::new(request.detector);
    let mut filter: Option<Kalman2D> = None;
    let mut track: Vec<TrackPoint> = Vec::new();
    let mut image_size = None;
    let mut last_frame: Option<FrameRgb8> = None;

    for (i, &t_ms) in times.iter().enumerate() {
        let frame = match store.frame_at(t_ms) {
            Ok(frame) => frame,
            Err(TrackingError::Disposed) => return Err(TrackingError::Disposed.into()),
            Err(err) => match &last_frame {
                // A dropped frame mid-run degrades, repeating the last good
                // frame; a run that never decodes anything fails.
                Some(prev) => {
                    warnings.push(err.to_string());
                    prev.clone()
                }
                None => return Err(err.into()),
            },
        };

        if i == 0 {
            let size = frame.size();
            if let Some([sx, sy]) = request.seed_px {
                if sx < 0.0 || sy < 0.0 || sx >= size.width as f64 || sy >= size.height as f64 {
                    return Err(TrackingError::SeedOutOfFrame {
                        x: sx,
                        y: sy,
                        width: size.width,
                        height: size.height,
                    }
                    .into());
                }
            }
            detector.begin(&frame, request.seed_px);
            image_size = Some(size);
        }

        let predicted = filter.as_mut().map(|f| f.predict(dt_s));
        match detector.detect(&frame, predicted) {
            Some(measured) => {
                match filter.as_mut() {
                    Some(f) => f.update(measured),
                    None => filter = Some(Kalman2D::from_measurement(measured, request.filter)),
                }
                let [x, y] = filter.as_ref().map(|f| f.position()).unwrap_or(measured);
                track.push(TrackPoint {
                    t_ms,
                    x_px: x,
                    y_px: y,
                    confidence: DETECTED_CONFIDENCE,
                });
            }
            None => {
                // Coast on the prediction once initialized; before the first
                // detection there is nothing to record.
                if let Some([x, y]) = predicted {
                    track.push(TrackPoint {
                        t_ms,
                        x_px: x,
                        y_px: y,
                        confidence: COASTED_CONFIDENCE,
                    });
                }
            }
        }
        last_frame = Some(frame);
    }

    if track.is_empty() {
        return Err(TrackingError::EmptyTrack.into());
    }
    let image_size = image_size.expect("first frame decoded when track is non-empty");
    debug!("tracked {} of {} sampled frames", track.len(), times.len());

    report(progress, 60, "calibration");
    let mut homography = None;
    let mut pitch_plane = None;
    if let Some(cal) = &request.calibration {
        let (h, notes) = cal
            .solve(
                Some(image_size),
                request.pitch_length_m,
                request.pitch_width_m,
            )
            .map_err(flatten_solve_error)?;
        warnings.extend(notes);

        let mut dropped = 0usize;
        let mapped: Vec<PitchPlanePoint> = track
            .iter()
            .filter_map(|p| {
                let [x_m, y_m] = h.apply([p.x_px, p.y_px]);
                if x_m.is_finite() && y_m.is_finite() {
                    Some(PitchPlanePoint {
                        t_ms: p.t_ms,
                        x_m,
                        y_m,
                    })
                } else {
                    dropped += 1;
                    None
                }
            })
            .collect();
        if dropped > 0 {
            warnings.push(format!(
                "{dropped} track points mapped outside the pitch plane and were dropped"
            ));
        }
        homography = Some(h.coefficients());
        pitch_plane = Some(mapped);
    }

    report(progress, 75, "events");
    let y_px: Vec<f64> = track.iter().map(|p| p.y_px).collect();
    let events = resolve_events(&y_px, request.bounce_index, request.impact_index);

    let mut lbw = None;
    let mut trajectory = None;
    if let Some(plane) = &pitch_plane {
        report(progress, 85, "lbw");
        let bounce = events.bounce.index.min(plane.len().saturating_sub(1));
        let impact = events.impact.index.min(plane.len().saturating_sub(1));

        match lbw::assess(plane, bounce, impact) {
            Ok(assessment) => lbw = Some(assessment),
            Err(err) => {
                warn!("LBW assessment skipped: {err}");
                warnings.push(format!("LBW assessment skipped: {err}"));
            }
        }

        match synthesize_heights(plane, bounce, impact, &request.height) {
            Ok(mut traj) => {
                let fit = fit_lateral_trend(plane, bounce, impact, LATERAL_FIT_WINDOW);
                let ext =
                    extend_to_stumps(&traj, impact, fit.as_ref(), STUMP_EXTENSION_STEPS);
                traj.extend(ext);
                trajectory = Some(traj);
            }
            Err(err) => {
                warnings.push(format!("trajectory synthesis skipped: {err}"));
            }
        }
    }

    report(progress, 98, "finalize");
    let outcome = TrackingOutcome {
        image_size,
        track,
        pitch_plane,
        trajectory,
        events,
        homography,
        lbw,
        warnings,
    };
    report(progress, 100, "done");
    Ok(outcome)
}

fn flatten_solve_error(err: CalibrationSolveError) -> PipelineError {
    match err {
        CalibrationSolveError::Invalid(e) => PipelineError::Calibration(e),
        CalibrationSolveError::Numerical(e) => PipelineError::Homography(e),
    }
}

/// Run the pipeline on a worker thread.
///
/// The request is moved to the worker and the outcome comes back over the
/// returned channel; the frame provider is the only shared boundary.
pub fn spawn_tracking(
    provider: Arc<dyn FrameProvider>,
    request: TrackingRequest,
) -> mpsc::Receiver<Result<TrackingOutcome, PipelineError>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = run_tracking(provider.as_ref(), &request, None);
        // The receiver may be gone if the session was torn down.
        let _ = tx.send(result);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_respects_rate_and_cap() {
        let times = sample_times(1000, 2000, 30, 180);
        assert_eq!(times[0], 1000);
        assert_eq!(times[1], 1033);
        assert_eq!(times.len(), 31);

        let capped = sample_times(0, 100_000, 30, 10);
        assert_eq!(capped.len(), 10);

        // Extreme rates clamp the step into [1, 1000].
        let fast = sample_times(0, 5, 10_000, 100);
        assert_eq!(fast, vec![0, 1, 2, 3, 4, 5]);
        let slow = sample_times(0, 3000, 0, 100);
        assert_eq!(slow, vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn overrides_beat_heuristics_and_are_clamped() {
        let y: Vec<f64> = (0..8).map(|i| 100.0 + i as f64).collect();
        let report = resolve_events(&y, Some(3), Some(99));
        assert_eq!(report.bounce.index, 3);
        assert_eq!(report.bounce.confidence, 1.0);
        assert_eq!(report.impact.index, 7);
        assert_eq!(report.impact.confidence, 1.0);

        let heuristic = resolve_events(&y, None, None);
        assert_eq!(heuristic.impact.index, 7);
        assert_eq!(heuristic.impact.confidence, 0.5);
    }

    #[test]
    fn invalid_segment_fails_before_any_decode() {
        struct NeverProvider;
        impl FrameProvider for NeverProvider {
            fn frame_jpeg(
                &self,
                _time_ms: i64,
                _quality: u8,
            ) -> Result<Vec<u8>, crate::frames::FrameFetchError> {
                panic!("provider must not be called");
            }
        }
        let request = TrackingRequest {
            start_ms: 500,
            end_ms: 200,
            ..TrackingRequest::default()
        };
        match run_tracking(&NeverProvider, &request, None) {
            Err(PipelineError::Tracking(TrackingError::InvalidSegment { start_ms, end_ms })) => {
                assert_eq!((start_ms, end_ms), (500, 200));
            }
            other => panic!("expected invalid segment, got {other:?}"),
        }
    }
}
