//! Capabilities the host application provides.
//!
//! The host owns the scene graph, animation curves, mesh evaluation, and the viewport. The
//! onion-skin core only talks to it through the three traits here:
//!
//! - [`SceneHost`]: playhead, keyframes, posed geometry, temporary objects
//! - [`OverlayRenderer`]: compiling triangle batches and drawing them with a uniform color
//! - [`OverlayHost`]: draw-handler and timer registration for the redraw loop

use std::time::Duration;

use crate::{
    foundation::core::{Frame, Rgba},
    foundation::error::OnionResult,
    snapshot::MeshSnapshot,
};

/// Stable name of an object in the host scene.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    /// Renderable mesh object.
    Mesh,
    /// Linked placeholder that must be made local before it can be evaluated.
    Proxy,
    /// Anything else (cameras, lights, empties).
    Other,
}

pub trait SceneHost {
    fn current_frame(&self) -> Frame;

    /// Move the playhead. Deformation and transforms re-evaluate for the new time.
    fn set_frame(&mut self, frame: Frame) -> OnionResult<()>;

    /// `None` when no object with this id exists.
    fn object_kind(&self, id: &ObjectId) -> Option<ObjectKind>;

    fn object_exists(&self, id: &ObjectId) -> bool {
        self.object_kind(id).is_some()
    }

    /// Times of every key on every animation curve of `id`. Empty if unanimated.
    fn keyframe_times(&self, id: &ObjectId) -> Vec<f64>;

    /// Posed, world-space triangles of `id` at the current playhead.
    ///
    /// Returns `Ok(None)` when the object has no renderable geometry. Any temporary
    /// evaluated mesh the host allocates is released before this returns.
    fn evaluate_mesh(&mut self, id: &ObjectId) -> OnionResult<Option<MeshSnapshot>>;

    /// Duplicate a proxy into a temporary, sampleable mesh object and return its id.
    fn make_local_mesh(&mut self, id: &ObjectId) -> OnionResult<ObjectId>;

    /// Remove an object previously created by [`SceneHost::make_local_mesh`].
    fn remove_object(&mut self, id: &ObjectId) -> OnionResult<()>;

    fn set_show_in_front(&mut self, id: &ObjectId, in_front: bool);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    None,
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaceCulling {
    None,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepthTest {
    None,
    Less,
}

/// Fixed-function state for one overlay draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderState {
    pub blend: BlendMode,
    pub culling: FaceCulling,
    pub depth: DepthTest,
}

impl RenderState {
    pub const NEUTRAL: Self = Self {
        blend: BlendMode::None,
        culling: FaceCulling::None,
        depth: DepthTest::None,
    };

    /// Blending and back-face culling unless `use_flat`; depth testing unless `use_xray`.
    pub fn for_overlay(use_flat: bool, use_xray: bool) -> Self {
        let (blend, culling) = if use_flat {
            (BlendMode::None, FaceCulling::None)
        } else {
            (BlendMode::Alpha, FaceCulling::Back)
        };
        let depth = if use_xray {
            DepthTest::None
        } else {
            DepthTest::Less
        };
        Self {
            blend,
            culling,
            depth,
        }
    }
}

/// GPU-side capability: compile fixed-topology triangle batches and draw them.
pub trait OverlayRenderer {
    type Batch;

    /// Compile positions plus a triangle index buffer. Color is not baked in.
    fn compile(
        &mut self,
        positions: &[[f32; 3]],
        triangles: &[[u32; 3]],
    ) -> OnionResult<Self::Batch>;

    /// Draw `batch` with a uniform color.
    fn draw(&mut self, batch: &Self::Batch, color: Rgba);

    fn set_blend(&mut self, mode: BlendMode);
    fn set_face_culling(&mut self, mode: FaceCulling);
    fn set_depth_test(&mut self, mode: DepthTest);

    fn apply_state(&mut self, state: RenderState) {
        self.set_blend(state.blend);
        self.set_face_culling(state.culling);
        self.set_depth_test(state.depth);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Viewport redraw and event-timer registration.
pub trait OverlayHost {
    fn register_draw_handler(&mut self) -> OnionResult<HandlerId>;
    fn unregister_draw_handler(&mut self, id: HandlerId);
    fn add_timer(&mut self, interval: Duration) -> OnionResult<TimerId>;
    fn remove_timer(&mut self, id: TimerId);
}
