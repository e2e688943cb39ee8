#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod calibration;
pub mod config;
pub mod error;
pub mod frames;
pub mod homography;
pub mod lbw;
pub mod pipeline;
pub mod types;

// Lower-level building blocks, public for tools and tests but considered
// unstable internals.
pub mod detect;
pub mod kalman;
pub mod trajectory;

// --- High-level re-exports -------------------------------------------------

// Main entry points: one request in, one outcome out.
pub use crate::pipeline::{run_tracking, spawn_tracking, TrackingOutcome, TrackingRequest};

// The decision surface consumers render.
pub use crate::lbw::{Decision, LbwAssessment};

// Session-level inputs.
pub use crate::calibration::PitchCalibration;
pub use crate::config::ReviewConfig;
pub use crate::error::PipelineError;
pub use crate::frames::{FrameProvider, FrameStore};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use lbw_tracker::prelude::*;
///
/// # fn demo(provider: &dyn FrameProvider) -> Result<(), PipelineError> {
/// let request = TrackingRequest {
///     start_ms: 0,
///     end_ms: 1500,
///     sample_fps: 30,
///     calibration: Some(PitchCalibration::from_pixel_corners([
///         [150.0, 850.0],
///         [650.0, 850.0],
///         [530.0, 150.0],
///         [270.0, 150.0],
///     ])),
///     ..Default::default()
/// };
///
/// let outcome = run_tracking(provider, &request, None)?;
/// if let Some(lbw) = &outcome.lbw {
///     println!("{:?}: {}", lbw.decision, lbw.reason);
/// }
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::calibration::PitchCalibration;
    pub use crate::error::PipelineError;
    pub use crate::frames::FrameProvider;
    pub use crate::lbw::{Decision, LbwAssessment};
    pub use crate::pipeline::{run_tracking, spawn_tracking, TrackingOutcome, TrackingRequest};
    pub use crate::types::{ImageSize, PitchPlanePoint, TrackPoint, TrajectoryPoint3D};
}
