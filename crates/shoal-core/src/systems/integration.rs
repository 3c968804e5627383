//! Heading smoothing and motion integration.

use crate::components::Vec3;

/// Critically damped spring from `current` toward `target`.
///
/// `velocity` is the spring's state and is updated in place. Uses the
/// polynomial approximation of `exp(-omega * dt)`; the result never
/// overshoots the target.
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    let smooth_time = smooth_time.max(1.0e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + change * omega) * dt;
    *velocity = (*velocity - temp * omega) * decay;
    let mut output = target + (change + temp) * decay;

    // Passed the target this step: stop on it
    let to_target = target - current;
    let past = output - target;
    if dt > 0.0 && to_target.dot(&past) > 0.0 {
        output = target;
        *velocity = (output - target) / dt;
    }

    if output.is_finite() && velocity.is_finite() {
        output
    } else {
        *velocity = Vec3::ZERO;
        target
    }
}

/// Final heading for the tick: the smoothed vector, or the current
/// forward when smoothing collapsed to zero.
pub fn resolve_heading(smoothed: Vec3, forward: Vec3) -> Vec3 {
    smoothed.normalize_or(forward).normalize_or(Vec3::FORWARD)
}

/// Advance a position by `velocity` over `dt`, scaled down by linear damping.
pub fn integrate_position(position: Vec3, velocity: Vec3, linear_damping: f32, dt: f32) -> Vec3 {
    let damping = 1.0 / (1.0 + dt * linear_damping.max(0.0));
    position + velocity * (dt * damping)
}
