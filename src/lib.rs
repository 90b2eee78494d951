//! Onion skinning for animated meshes.
//!
//! The crate bakes an animated object's keyframe timeline into immutable per-frame triangle
//! snapshots, then composites them each redraw as tinted, fading silhouettes around the
//! playhead. The host application stays behind the traits in [`host`]:
//!
//! - [`bake()`] samples a [`OnionSource`] per [`SamplingMode`]
//! - [`composite`] draws the published frames
//! - [`OnionSkin`] ties source, cache, settings, and the draw loop together
#![forbid(unsafe_code)]

mod foundation;

pub mod bake;
pub mod compositor;
pub mod config;
pub mod controller;
pub mod extract;
pub mod host;
pub mod memory;
pub mod sampling;
pub mod snapshot;
pub mod source;

pub use crate::foundation::core::{Frame, FrameSpan, Rgb, Rgba};
pub use crate::foundation::error::{OnionError, OnionResult};

pub use crate::bake::{
    BakeOutcome, BakedFrame, BakedFrames, FrameStore, bake, collect_keyframes,
    with_playhead_restored,
};
pub use crate::compositor::{
    CompositeStats, Direction, SkinDraw, SkinSkip, composite, plan_skins, resolve_skin,
};
pub use crate::config::{DirectionStyle, OnionSettings};
pub use crate::controller::{
    BakeReport, LoopStatus, OnionSkin, SelectionOutcome, StopReason, TICK_INTERVAL,
};
pub use crate::extract::extract;
pub use crate::host::{
    BlendMode, DepthTest, FaceCulling, HandlerId, ObjectId, ObjectKind, OverlayHost,
    OverlayRenderer, RenderState, SceneHost, TimerId,
};
pub use crate::memory::{
    DrawRecord, ManualOverlayHost, MemoryScene, RecordedBatch, RecordingRenderer, SceneObject,
};
pub use crate::sampling::{FramePlan, KeyframeSet, SamplingMode, plan_frames};
pub use crate::snapshot::MeshSnapshot;
pub use crate::source::{OnionSource, Sampleable, with_sampleable};
