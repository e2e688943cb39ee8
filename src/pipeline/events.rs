//! Bounce and impact frame heuristics.
//!
//! Used when the caller supplies no overrides. In image coordinates Y grows
//! downward, so a bounce typically shows as a short upward move (Y delta
//! flips negative) after a run of downward motion. Heuristics, not certified
//! detections; their confidence travels with the estimate.

use crate::types::EventEstimate;

/// Estimate the bounce sample from image-Y motion.
///
/// Returns the first down-to-up sign change of the Y deltas (confidence
/// 0.6). Short tracks fall back to the last sample (0.1); tracks without a
/// sign change fall back to a plausible early point at one third of the
/// track (0.2).
pub fn estimate_bounce_index(y_px: &[f64]) -> EventEstimate {
    let n = y_px.len();
    if n < 5 {
        return EventEstimate {
            index: n.saturating_sub(1),
            confidence: 0.1,
        };
    }

    let dy: Vec<f64> = y_px.windows(2).map(|w| w[1] - w[0]).collect();
    for i in 2..dy.len() - 1 {
        if dy[i - 1] > 0.0 && dy[i] < 0.0 {
            return EventEstimate {
                index: i,
                confidence: 0.6,
            };
        }
    }

    EventEstimate {
        index: (n / 3).max(1),
        confidence: 0.2,
    }
}

/// Estimate the impact sample: the last tracked point, at moderate
/// confidence.
pub fn estimate_impact_index(n_points: usize) -> EventEstimate {
    if n_points == 0 {
        return EventEstimate {
            index: 0,
            confidence: 0.0,
        };
    }
    EventEstimate {
        index: n_points - 1,
        confidence: 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_down_to_up_turn() {
        // Descends for six samples, pops up, settles.
        let y = [100.0, 120.0, 140.0, 160.0, 180.0, 200.0, 190.0, 195.0];
        let est = estimate_bounce_index(&y);
        assert_eq!(est.index, 5);
        assert_eq!(est.confidence, 0.6);
    }

    #[test]
    fn monotone_track_falls_back_to_a_third() {
        let y: Vec<f64> = (0..12).map(|i| 100.0 + 10.0 * i as f64).collect();
        let est = estimate_bounce_index(&y);
        assert_eq!(est.index, 4);
        assert_eq!(est.confidence, 0.2);
    }

    #[test]
    fn short_track_falls_back_to_the_end() {
        let est = estimate_bounce_index(&[10.0, 20.0, 30.0]);
        assert_eq!(est.index, 2);
        assert_eq!(est.confidence, 0.1);
    }

    #[test]
    fn impact_is_the_last_sample() {
        let est = estimate_impact_index(9);
        assert_eq!(est.index, 8);
        assert_eq!(est.confidence, 0.5);
        assert_eq!(estimate_impact_index(0).confidence, 0.0);
    }
}
