//! Per-frame motion primitives.
//!
//! Bounded state producing unbounded looping motion: a cursor that wraps at a
//! boundary, a sine wave keyed off that cursor and a monotonically growing spin.

/// A scalar advanced by a fixed step each tick that wraps to `reset` once it
/// would exceed `upper`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationCursor {
    value: f32,
    step: f32,
    upper: f32,
    reset: f32,
}

impl AnimationCursor {
    pub fn new(value: f32, step: f32, upper: f32, reset: f32) -> Self {
        Self {
            value,
            step,
            upper,
            reset,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Replaces the current value, e.g. with an asset's initial position.
    pub fn set(&mut self, value: f32) {
        self.value = value;
    }

    /// Advances one tick and returns the new value, which is never above `upper`.
    pub fn advance(&mut self) -> f32 {
        let next = self.value + self.step;
        self.value = if next > self.upper { self.reset } else { next };
        self.value
    }
}

/// Vertical offset of the wave motion: `sin(x) * amplitude`.
pub fn wave(x: f32, amplitude: f32) -> f32 {
    x.sin() * amplitude
}

/// An angle growing by `step` radians per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spin {
    step: f32,
}

impl Spin {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    pub fn advance(&self, angle: f32) -> f32 {
        angle + self.step
    }
}
