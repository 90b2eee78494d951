use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use arc_swap::ArcSwap;

use crate::{
    extract::extract,
    foundation::core::Frame,
    foundation::error::OnionResult,
    host::{OverlayRenderer, SceneHost},
    sampling::{FramePlan, KeyframeSet, SamplingMode, plan_frames},
    snapshot::MeshSnapshot,
    source::{OnionSource, with_sampleable},
};

/// One baked frame: the world-space snapshot and the batch compiled from it.
#[derive(Debug)]
pub struct BakedFrame<B> {
    pub snapshot: MeshSnapshot,
    pub batch: B,
}

/// The complete result of one bake. Immutable once built.
///
/// Frames iterate in ascending frame order.
#[derive(Debug)]
pub struct BakedFrames<B> {
    mode: Option<SamplingMode>,
    frames: BTreeMap<Frame, BakedFrame<B>>,
    exact_keys: BTreeSet<Frame>,
}

impl<B> BakedFrames<B> {
    pub fn empty() -> Self {
        Self {
            mode: None,
            frames: BTreeMap::new(),
            exact_keys: BTreeSet::new(),
        }
    }

    /// Mode the frames were baked with; `None` for the empty cache.
    pub fn mode(&self) -> Option<SamplingMode> {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Frame, &BakedFrame<B>)> + '_ {
        self.frames.iter().map(|(f, b)| (*f, b))
    }

    pub fn get(&self, frame: Frame) -> Option<&BakedFrame<B>> {
        self.frames.get(&frame)
    }

    pub fn exact_keys(&self) -> &BTreeSet<Frame> {
        &self.exact_keys
    }

    pub fn is_exact_key(&self, frame: Frame) -> bool {
        self.exact_keys.contains(&frame)
    }
}

/// Holds the published [`BakedFrames`].
///
/// Readers get an `Arc` to a complete bake; a new bake replaces it with a single pointer
/// swap, so a reader never sees a half-built cache.
pub struct FrameStore<B> {
    current: ArcSwap<BakedFrames<B>>,
}

impl<B> FrameStore<B> {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(BakedFrames::empty()),
        }
    }

    pub fn load(&self) -> Arc<BakedFrames<B>> {
        self.current.load_full()
    }

    /// Replace the published frames, returning the previous ones.
    pub fn publish(&self, frames: BakedFrames<B>) -> Arc<BakedFrames<B>> {
        self.current.swap(Arc::new(frames))
    }

    pub fn clear(&self) {
        self.current.store(Arc::new(BakedFrames::empty()));
    }
}

impl<B> Default for FrameStore<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum BakeOutcome<B> {
    Baked(BakedFrames<B>),
    /// No source object carries a key; nothing was sampled.
    NoKeyframes,
}

/// Every key time of every source object, truncated to frames.
pub fn collect_keyframes(
    scene: &dyn SceneHost,
    source: &OnionSource,
) -> OnionResult<KeyframeSet> {
    KeyframeSet::from_times(
        source
            .objects()
            .iter()
            .flat_map(|id| scene.keyframe_times(id)),
    )
}

/// Run `f`, then put the playhead back where it was, even if `f` failed.
pub fn with_playhead_restored<R>(
    scene: &mut dyn SceneHost,
    f: impl FnOnce(&mut dyn SceneHost) -> OnionResult<R>,
) -> OnionResult<R> {
    let saved = scene.current_frame();
    let out = f(&mut *scene);
    let restored = scene.set_frame(saved);
    let out = out?;
    restored?;
    Ok(out)
}

/// Sample `source` at every frame `mode` asks for and compile the results.
///
/// The returned frames are a fresh cache; publishing them is up to the caller. An empty
/// keyframe set is a no-op.
#[tracing::instrument(skip(scene, renderer, source), fields(objects = source.objects().len()))]
pub fn bake<R: OverlayRenderer>(
    scene: &mut dyn SceneHost,
    renderer: &mut R,
    source: &OnionSource,
    mode: SamplingMode,
    step: u32,
) -> OnionResult<BakeOutcome<R::Batch>> {
    source.validate()?;

    let keys = collect_keyframes(scene, source)?;
    if keys.is_empty() {
        tracing::warn!("onion source has no keyframes; nothing to bake");
        return Ok(BakeOutcome::NoKeyframes);
    }

    let FramePlan { frames, exact_keys } = plan_frames(&keys, mode, step)?;
    let snapshots = with_playhead_restored(scene, |scene| {
        with_sampleable(source, scene, |scene, objects| {
            let mut out = Vec::with_capacity(frames.len());
            for &frame in &frames {
                let snap = extract(scene, objects, frame)?;
                tracing::debug!(
                    frame = frame.0,
                    vertices = snap.vertex_count(),
                    triangles = snap.triangle_count(),
                    "sampled frame"
                );
                out.push((frame, snap));
            }
            Ok(out)
        })
    })?;

    let mut baked = BTreeMap::new();
    for (frame, snapshot) in snapshots {
        let batch = renderer.compile(&snapshot.vertices, &snapshot.triangles)?;
        baked.insert(frame, BakedFrame { snapshot, batch });
    }

    tracing::info!(
        keys = keys.len(),
        frames = baked.len(),
        exact = exact_keys.len(),
        "baked onion frames"
    );
    Ok(BakeOutcome::Baked(BakedFrames {
        mode: Some(mode),
        frames: baked,
        exact_keys,
    }))
}
