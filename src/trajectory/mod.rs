//! 3D trajectory synthesis from the pitch-plane track.
//!
//! Pitch-plane (x, y) positions are directly observable through the
//! homography; height is not. The [`height`] module anchors a piecewise
//! vertical profile at the bounce and impact samples, and [`predict`] fits
//! the lateral trend and extends the path to the stumps plane.

pub mod height;
pub mod predict;

pub use height::{synthesize_heights, HeightModelParams};
pub use predict::{extend_to_stumps, fit_lateral_trend, LinearFit, LATERAL_FIT_WINDOW};
