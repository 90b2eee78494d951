use std::collections::BTreeSet;

use crate::{
    foundation::core::{Frame, FrameSpan},
    foundation::error::{OnionError, OnionResult},
};

/// How the frames to bake are derived from the keyframe timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMode {
    /// Every frame between the first and last key.
    PerFrame,
    /// Every `step`-th frame starting at the first key.
    PerFrameStepped,
    /// Only frames that carry a key.
    DirectKeys,
    /// Every frame, with keyed frames tinted apart from interpolated ones.
    Inbetweening,
}

impl SamplingMode {
    pub const ALL: [SamplingMode; 4] = [
        SamplingMode::PerFrame,
        SamplingMode::PerFrameStepped,
        SamplingMode::DirectKeys,
        SamplingMode::Inbetweening,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::PerFrame => "per-frame",
            Self::PerFrameStepped => "per-frame-stepped",
            Self::DirectKeys => "direct-keys",
            Self::Inbetweening => "inbetweening",
        }
    }
}

impl std::str::FromStr for SamplingMode {
    type Err = OnionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.label() == s)
            .ok_or_else(|| OnionError::validation(format!("unknown sampling mode '{s}'")))
    }
}

/// Sorted, deduplicated frames that carry at least one key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyframeSet(BTreeSet<Frame>);

impl KeyframeSet {
    /// Truncate each key time to a frame. Fails on the first time that has no frame.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> OnionResult<Self> {
        times
            .into_iter()
            .map(Frame::from_key_time)
            .collect::<OnionResult<_>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.0.iter().copied()
    }

    /// `[min, max]`, or `None` when empty.
    pub fn span(&self) -> Option<FrameSpan> {
        let first = *self.0.first()?;
        let last = *self.0.last()?;
        FrameSpan::new(first, last).ok()
    }

    pub fn into_set(self) -> BTreeSet<Frame> {
        self.0
    }
}

impl FromIterator<Frame> for KeyframeSet {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Frames to bake plus the subset that are true keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FramePlan {
    pub frames: Vec<Frame>,
    /// Only populated in [`SamplingMode::Inbetweening`].
    pub exact_keys: BTreeSet<Frame>,
}

impl FramePlan {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Derive the frame list for `mode`. `step` only matters for
/// [`SamplingMode::PerFrameStepped`] and must be at least 1.
pub fn plan_frames(keys: &KeyframeSet, mode: SamplingMode, step: u32) -> OnionResult<FramePlan> {
    if step == 0 {
        return Err(OnionError::validation("skin_step must be >= 1"));
    }
    let Some(span) = keys.span() else {
        return Ok(FramePlan::default());
    };

    let plan = match mode {
        SamplingMode::PerFrame => FramePlan {
            frames: span.frames().collect(),
            exact_keys: BTreeSet::new(),
        },
        SamplingMode::PerFrameStepped => FramePlan {
            frames: span.stepped(step).collect(),
            exact_keys: BTreeSet::new(),
        },
        SamplingMode::DirectKeys => FramePlan {
            frames: keys.iter().collect(),
            exact_keys: BTreeSet::new(),
        },
        SamplingMode::Inbetweening => FramePlan {
            frames: span.frames().collect(),
            exact_keys: keys.iter().collect(),
        },
    };
    Ok(plan)
}
