use crate::{
    foundation::core::Rgb,
    foundation::error::{OnionError, OnionResult},
    sampling::SamplingMode,
};

/// Tint and opacity ramp for one temporal direction.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DirectionStyle {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub color: Rgb,
    /// Opacity at distance 0 from the playhead.
    #[serde(default = "default_opacity_start")]
    pub opacity_start: f32,
    /// Opacity at distance `skin_count`.
    #[serde(default = "default_opacity_end")]
    pub opacity_end: f32,
}

fn default_enabled() -> bool {
    true
}

fn default_opacity_start() -> f32 {
    0.5
}

fn default_opacity_end() -> f32 {
    0.1
}

impl DirectionStyle {
    pub const PAST: Self = Self {
        enabled: true,
        color: Rgb::new(1.0, 0.1, 0.1),
        opacity_start: 0.5,
        opacity_end: 0.1,
    };

    pub const FUTURE: Self = Self {
        enabled: true,
        color: Rgb::new(0.1, 0.4, 1.0),
        opacity_start: 0.5,
        opacity_end: 0.1,
    };

    /// Linear ramp from `opacity_start` to `opacity_end` over `skin_count` frames.
    ///
    /// Not clamped. `skin_count` is at least 1 once settings are validated.
    pub fn opacity_at(&self, distance: u32, skin_count: u32) -> f32 {
        let slope = (self.opacity_start - self.opacity_end) / skin_count as f32;
        self.opacity_start - slope * distance as f32
    }

    pub fn validate(&self, which: &str) -> OnionResult<()> {
        self.color.validate(&format!("{which} color"))?;
        for (name, v) in [
            ("opacity_start", self.opacity_start),
            ("opacity_end", self.opacity_end),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(OnionError::validation(format!(
                    "{which} {name} must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// User-facing onion-skin configuration. Read on every bake and every redraw.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OnionSettings {
    /// How many frames into the past and future are shown.
    pub skin_count: u32,
    /// Stride used by [`SamplingMode::PerFrameStepped`].
    pub skin_step: u32,
    /// `None` means no mode is selected and bakes do nothing.
    pub mode: Option<SamplingMode>,
    /// Draw skins through the object (no depth test).
    pub use_xray: bool,
    /// Opaque colors: no blending, no culling.
    pub use_flat: bool,
    /// Show the source objects in front of the skins.
    pub in_front: bool,
    pub past: DirectionStyle,
    pub future: DirectionStyle,
}

impl Default for OnionSettings {
    fn default() -> Self {
        Self {
            skin_count: 1,
            skin_step: 1,
            mode: Some(SamplingMode::PerFrame),
            use_xray: false,
            use_flat: false,
            in_front: false,
            past: DirectionStyle::PAST,
            future: DirectionStyle::FUTURE,
        }
    }
}

impl OnionSettings {
    pub fn from_json(s: &str) -> OnionResult<Self> {
        let settings: Self = serde_json::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> OnionResult<()> {
        if self.skin_count == 0 {
            return Err(OnionError::validation("skin_count must be >= 1"));
        }
        if self.skin_step == 0 {
            return Err(OnionError::validation("skin_step must be >= 1"));
        }
        self.past.validate("past")?;
        self.future.validate("future")?;
        Ok(())
    }
}
