use std::collections::BTreeSet;

use crate::{
    bake::BakedFrames,
    config::{DirectionStyle, OnionSettings},
    foundation::core::{Frame, Rgba},
    host::{OverlayRenderer, RenderState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Past,
    Future,
}

impl Direction {
    /// With an exact-key set (inbetweening), keyed frames are "future" and interpolated
    /// frames "past" regardless of time. Otherwise frames before the playhead are past.
    pub fn classify(frame: Frame, playhead: Frame, exact_keys: &BTreeSet<Frame>) -> Self {
        if !exact_keys.is_empty() {
            return if exact_keys.contains(&frame) {
                Self::Future
            } else {
                Self::Past
            };
        }
        if frame < playhead {
            Self::Past
        } else {
            Self::Future
        }
    }

    pub fn style(self, settings: &OnionSettings) -> &DirectionStyle {
        match self {
            Self::Past => &settings.past,
            Self::Future => &settings.future,
        }
    }
}

/// One skin the compositor will draw this tick.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SkinDraw {
    pub frame: Frame,
    pub direction: Direction,
    pub distance: u32,
    pub color: Rgba,
}

/// Why a cached frame produced no draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkinSkip {
    /// The frame under the playhead.
    Current,
    /// Farther than `skin_count` from the playhead.
    OutOfRange,
    /// Its direction is switched off.
    Hidden,
}

/// Decide whether and how `frame` is drawn with the playhead at `playhead`.
pub fn resolve_skin(
    frame: Frame,
    playhead: Frame,
    exact_keys: &BTreeSet<Frame>,
    settings: &OnionSettings,
) -> Result<SkinDraw, SkinSkip> {
    let distance = frame.distance(playhead);
    if frame == playhead {
        return Err(SkinSkip::Current);
    }
    if distance > settings.skin_count {
        return Err(SkinSkip::OutOfRange);
    }

    let direction = Direction::classify(frame, playhead, exact_keys);
    let style = direction.style(settings);
    if !style.enabled {
        return Err(SkinSkip::Hidden);
    }

    let alpha = style.opacity_at(distance, settings.skin_count);
    Ok(SkinDraw {
        frame,
        direction,
        distance,
        color: style.color.with_alpha(alpha),
    })
}

/// Every skin to draw for `playhead`, in ascending frame order.
pub fn plan_skins<B>(
    frames: &BakedFrames<B>,
    playhead: Frame,
    settings: &OnionSettings,
) -> Vec<SkinDraw> {
    frames
        .keys()
        .filter_map(|f| resolve_skin(f, playhead, frames.exact_keys(), settings).ok())
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub drawn: u32,
    pub current: u32,
    pub out_of_range: u32,
    pub hidden: u32,
}

/// Apply `state`, run `f`, and reset to [`RenderState::NEUTRAL`].
pub fn with_render_state<R: OverlayRenderer + ?Sized, T>(
    renderer: &mut R,
    state: RenderState,
    f: impl FnOnce(&mut R) -> T,
) -> T {
    renderer.apply_state(state);
    let out = f(&mut *renderer);
    renderer.apply_state(RenderState::NEUTRAL);
    out
}

/// Draw every in-range skin of `frames` for the playhead at `playhead`.
pub fn composite<R: OverlayRenderer>(
    renderer: &mut R,
    frames: &BakedFrames<R::Batch>,
    playhead: Frame,
    settings: &OnionSettings,
) -> CompositeStats {
    let state = RenderState::for_overlay(settings.use_flat, settings.use_xray);
    let mut stats = CompositeStats::default();

    for (frame, baked) in frames.iter() {
        match resolve_skin(frame, playhead, frames.exact_keys(), settings) {
            Ok(skin) => {
                with_render_state(renderer, state, |r| r.draw(&baked.batch, skin.color));
                stats.drawn += 1;
            }
            Err(SkinSkip::Current) => stats.current += 1,
            Err(SkinSkip::OutOfRange) => stats.out_of_range += 1,
            Err(SkinSkip::Hidden) => stats.hidden += 1,
        }
    }

    tracing::trace!(
        playhead = playhead.0,
        drawn = stats.drawn,
        hidden = stats.hidden,
        "composited onion skins"
    );
    stats
}
