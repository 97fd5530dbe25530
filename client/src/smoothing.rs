//! Exponential smoothing of the render engine toward the reconciliation
//! engine. Corrections are absorbed over several frames instead of
//! snapping the ball across the board.

use tiltball_shared::vec2::{vec2, Vec2};

/// Convergence rate, 1/s. Higher closes the gap faster.
pub const SMOOTHING_RATE: f32 = 12.0;

/// Frame-rate independent smoothing factor for a frame of `dt_ms`.
pub fn smoothing_factor(dt_ms: f64) -> f32 {
    1.0 - (-SMOOTHING_RATE * (dt_ms as f32) / 1000.0).exp()
}

/// Nudge `current` toward `target` for a frame of `dt_ms`.
pub fn smooth_position(current: Vec2, target: Vec2, dt_ms: f64) -> Vec2 {
    let t = smoothing_factor(dt_ms);
    vec2(
        current.x + (target.x - current.x) * t,
        current.y + (target.y - current.y) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiltball_shared::vec2::distance;

    #[test]
    fn factor_stays_inside_unit_interval() {
        for dt in [1.0, 8.0, 16.7, 33.0, 250.0] {
            let t = smoothing_factor(dt);
            assert!(t > 0.0 && t < 1.0, "dt {dt} gave factor {t}");
        }
    }

    #[test]
    fn longer_frames_close_more_of_the_gap() {
        assert!(smoothing_factor(33.0) > smoothing_factor(16.0));
    }

    #[test]
    fn converges_without_overshooting() {
        let target = vec2(100.0, 50.0);
        let mut current = vec2(0.0, 0.0);
        let mut previous_gap = distance(current, target);

        for _ in 0..120 {
            current = smooth_position(current, target, 16.7);
            let gap = distance(current, target);
            assert!(gap <= previous_gap, "gap grew: {gap} > {previous_gap}");
            previous_gap = gap;
        }
        assert!(previous_gap < 0.1, "still {previous_gap} px away");
    }
}
