use crate::foundation::error::{OnionError, OnionResult};

/// Integer frame number on the host timeline. Negative frames are valid.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Frame(pub i32);

impl Frame {
    /// Absolute frame distance between `self` and `other`.
    pub fn distance(self, other: Frame) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Convert a fractional host key time into a frame, truncating toward zero.
    ///
    /// Times that are not finite or fall outside the `i32` frame range are rejected.
    pub fn from_key_time(t: f64) -> OnionResult<Self> {
        let f = t.trunc();
        if !f.is_finite() || f < f64::from(i32::MIN) || f > f64::from(i32::MAX) {
            return Err(OnionError::validation(format!(
                "key time {t} is outside the frame range"
            )));
        }
        Ok(Self(f as i32))
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame span `[first, last]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameSpan {
    pub first: Frame,
    pub last: Frame,
}

impl FrameSpan {
    pub fn new(first: Frame, last: Frame) -> OnionResult<Self> {
        if first > last {
            return Err(OnionError::validation("FrameSpan first must be <= last"));
        }
        Ok(Self { first, last })
    }

    /// Every frame in the span, ascending.
    pub fn frames(self) -> impl Iterator<Item = Frame> {
        (self.first.0..=self.last.0).map(Frame)
    }

    /// `first, first + step, ...` while `<= last`. `step` must be non-zero.
    pub fn stepped(self, step: u32) -> impl Iterator<Item = Frame> {
        (self.first.0..=self.last.0)
            .step_by(step.max(1) as usize)
            .map(Frame)
    }
}

/// Linear RGB color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn with_alpha(self, a: f32) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    pub fn validate(self, what: &str) -> OnionResult<()> {
        for c in [self.r, self.g, self.b] {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(OnionError::validation(format!(
                    "{what} components must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Straight (non-premultiplied) RGBA uniform color.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}
