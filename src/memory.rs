//! In-memory reference implementations of the host capabilities.
//!
//! [`MemoryScene`] is a tiny keyframed scene that can be loaded from JSON, [`RecordingRenderer`]
//! records batches and draws instead of touching a GPU, and [`ManualOverlayHost`] records
//! handler and timer registrations. The CLI and the test-suite drive the core through these.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::{
    foundation::core::{Frame, Rgba},
    foundation::error::{OnionError, OnionResult},
    host::{
        BlendMode, DepthTest, FaceCulling, HandlerId, ObjectId, ObjectKind, OverlayHost,
        OverlayRenderer, RenderState, SceneHost, TimerId,
    },
    snapshot::MeshSnapshot,
};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Key<T> {
    pub frame: f64,
    pub value: T,
}

/// Keys sorted by frame, linearly interpolated and held past either end.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Track(pub Vec<Key<Vec3>>);

impl Track {
    pub fn validate(&self) -> OnionResult<()> {
        if !self.0.windows(2).all(|w| w[0].frame <= w[1].frame) {
            return Err(OnionError::validation("track keys must be sorted by frame"));
        }
        Ok(())
    }

    pub fn sample(&self, frame: f64, default: Vec3) -> Vec3 {
        let keys = &self.0;
        if keys.is_empty() {
            return default;
        }

        let idx = keys.partition_point(|k| k.frame <= frame);
        if idx == 0 {
            return keys[0].value;
        }
        if idx >= keys.len() {
            return keys[keys.len() - 1].value;
        }

        let a = &keys[idx - 1];
        let b = &keys[idx];
        let denom = b.frame - a.frame;
        if denom <= 0.0 {
            return a.value;
        }
        let t = ((frame - a.frame) / denom) as f32;
        a.value.lerp(b.value, t)
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformTracks {
    pub translation: Track,
    /// XYZ Euler angles in radians.
    pub rotation: Track,
    pub scale: Track,
}

impl TransformTracks {
    pub fn world_matrix(&self, frame: f64) -> Mat4 {
        let t = self.translation.sample(frame, Vec3::ZERO);
        let r = self.rotation.sample(frame, Vec3::ZERO);
        let s = self.scale.sample(frame, Vec3::ONE);
        Mat4::from_scale_rotation_translation(s, Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z), t)
    }

    pub fn key_times(&self) -> impl Iterator<Item = f64> + '_ {
        [&self.translation, &self.rotation, &self.scale]
            .into_iter()
            .flat_map(|track| track.0.iter().map(|k| k.frame))
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneObject {
    pub kind: ObjectKind,
    /// Local-space geometry.
    #[serde(default)]
    pub mesh: Option<MeshSnapshot>,
    /// For proxies: the mesh object the proxy stands in for.
    #[serde(default)]
    pub links: Option<ObjectId>,
    #[serde(default)]
    pub transform: TransformTracks,
    #[serde(default)]
    pub in_front: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub temporary: bool,
}

impl SceneObject {
    pub fn mesh(mesh: MeshSnapshot, transform: TransformTracks) -> Self {
        Self {
            kind: ObjectKind::Mesh,
            mesh: Some(mesh),
            links: None,
            transform,
            in_front: false,
            temporary: false,
        }
    }

    pub fn proxy(links: ObjectId, transform: TransformTracks) -> Self {
        Self {
            kind: ObjectKind::Proxy,
            mesh: None,
            links: Some(links),
            transform,
            in_front: false,
            temporary: false,
        }
    }

    pub fn empty(transform: TransformTracks) -> Self {
        Self {
            kind: ObjectKind::Other,
            mesh: None,
            links: None,
            transform,
            in_front: false,
            temporary: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCounters {
    pub frame_changes: u64,
    pub evaluations: u64,
    pub temporaries_created: u64,
    pub temporaries_removed: u64,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MemoryScene {
    #[serde(default)]
    pub frame: Frame,
    pub objects: BTreeMap<ObjectId, SceneObject>,
    #[serde(skip)]
    pub counters: SceneCounters,
    /// Make `evaluate_mesh` fail while the playhead sits on this frame.
    #[serde(skip)]
    pub fail_evaluation_at: Option<Frame>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(s: &str) -> OnionResult<Self> {
        let scene: Self = serde_json::from_str(s)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> OnionResult<()> {
        for (id, obj) in &self.objects {
            if let Some(mesh) = &obj.mesh {
                mesh.validate()?;
            }
            obj.transform.translation.validate()?;
            obj.transform.rotation.validate()?;
            obj.transform.scale.validate()?;
            if obj.kind == ObjectKind::Proxy {
                let target = obj.links.as_ref().ok_or_else(|| {
                    OnionError::validation(format!("proxy '{id}' must link a mesh object"))
                })?;
                if !self.objects.contains_key(target) {
                    return Err(OnionError::validation(format!(
                        "proxy '{id}' links missing object '{target}'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, name: &str, obj: SceneObject) -> ObjectId {
        let id = ObjectId::new(name);
        self.objects.insert(id.clone(), obj);
        id
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        self.objects.remove(id)
    }

    pub fn in_front(&self, id: &ObjectId) -> bool {
        self.objects.get(id).is_some_and(|o| o.in_front)
    }

    pub fn temporary_count(&self) -> usize {
        self.objects.values().filter(|o| o.temporary).count()
    }

    fn get(&self, id: &ObjectId) -> OnionResult<&SceneObject> {
        self.objects
            .get(id)
            .ok_or_else(|| OnionError::host(format!("unknown object '{id}'")))
    }
}

impl SceneHost for MemoryScene {
    fn current_frame(&self) -> Frame {
        self.frame
    }

    fn set_frame(&mut self, frame: Frame) -> OnionResult<()> {
        self.frame = frame;
        self.counters.frame_changes += 1;
        Ok(())
    }

    fn object_kind(&self, id: &ObjectId) -> Option<ObjectKind> {
        self.objects.get(id).map(|o| o.kind)
    }

    fn keyframe_times(&self, id: &ObjectId) -> Vec<f64> {
        self.objects
            .get(id)
            .map(|o| o.transform.key_times().collect())
            .unwrap_or_default()
    }

    fn evaluate_mesh(&mut self, id: &ObjectId) -> OnionResult<Option<MeshSnapshot>> {
        if self.fail_evaluation_at == Some(self.frame) {
            return Err(OnionError::host(format!(
                "evaluation of '{id}' failed at frame {}",
                self.frame
            )));
        }
        self.counters.evaluations += 1;

        let obj = self.get(id)?;
        if obj.kind != ObjectKind::Mesh {
            return Ok(None);
        }
        let Some(local) = &obj.mesh else {
            return Ok(None);
        };

        let world = obj.transform.world_matrix(f64::from(self.frame.0));
        let vertices = local
            .vertices
            .iter()
            .map(|&v| world.transform_point3(Vec3::from_array(v)).to_array())
            .collect();
        Ok(Some(MeshSnapshot {
            vertices,
            triangles: local.triangles.clone(),
        }))
    }

    fn make_local_mesh(&mut self, id: &ObjectId) -> OnionResult<ObjectId> {
        let proxy = self.get(id)?;
        let target = proxy
            .links
            .as_ref()
            .ok_or_else(|| OnionError::host(format!("'{id}' is not a linked proxy")))?;
        let mesh = self.get(target)?.mesh.clone();
        let local = SceneObject {
            kind: ObjectKind::Mesh,
            mesh,
            links: None,
            transform: proxy.transform.clone(),
            in_front: false,
            temporary: true,
        };

        let mut n = 0u32;
        let local_id = loop {
            let candidate = ObjectId(format!("{}.local.{n:03}", id.as_str()));
            if !self.objects.contains_key(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.objects.insert(local_id.clone(), local);
        self.counters.temporaries_created += 1;
        Ok(local_id)
    }

    fn remove_object(&mut self, id: &ObjectId) -> OnionResult<()> {
        match self.objects.remove(id) {
            Some(_) => {
                self.counters.temporaries_removed += 1;
                Ok(())
            }
            None => Err(OnionError::host(format!("cannot remove unknown object '{id}'"))),
        }
    }

    fn set_show_in_front(&mut self, id: &ObjectId, in_front: bool) {
        if let Some(obj) = self.objects.get_mut(id) {
            obj.in_front = in_front;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedBatch {
    pub id: u64,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct DrawRecord {
    pub batch: u64,
    pub triangle_count: usize,
    pub color: Rgba,
    pub state: RenderState,
}

/// Renderer that records what would have reached the GPU.
#[derive(Debug)]
pub struct RecordingRenderer {
    next_batch: u64,
    state: RenderState,
    pub compiled: u64,
    pub draws: Vec<DrawRecord>,
    pub state_changes: u64,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self {
            next_batch: 0,
            state: RenderState::NEUTRAL,
            compiled: 0,
            draws: Vec::new(),
            state_changes: 0,
        }
    }
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }
}

impl OverlayRenderer for RecordingRenderer {
    type Batch = RecordedBatch;

    fn compile(
        &mut self,
        positions: &[[f32; 3]],
        triangles: &[[u32; 3]],
    ) -> OnionResult<Self::Batch> {
        let id = self.next_batch;
        self.next_batch += 1;
        self.compiled += 1;
        Ok(RecordedBatch {
            id,
            vertex_count: positions.len(),
            triangle_count: triangles.len(),
        })
    }

    fn draw(&mut self, batch: &Self::Batch, color: Rgba) {
        self.draws.push(DrawRecord {
            batch: batch.id,
            triangle_count: batch.triangle_count,
            color,
            state: self.state,
        });
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        self.state_changes += 1;
    }

    fn set_face_culling(&mut self, mode: FaceCulling) {
        self.state.culling = mode;
        self.state_changes += 1;
    }

    fn set_depth_test(&mut self, mode: DepthTest) {
        self.state.depth = mode;
        self.state_changes += 1;
    }
}

/// Overlay host that hands out ids and remembers what is registered.
#[derive(Debug, Default)]
pub struct ManualOverlayHost {
    next_id: u64,
    pub handlers: BTreeSet<u64>,
    pub timers: BTreeMap<u64, Duration>,
}

impl ManualOverlayHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.handlers.is_empty() && self.timers.is_empty()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl OverlayHost for ManualOverlayHost {
    fn register_draw_handler(&mut self) -> OnionResult<HandlerId> {
        let id = self.next();
        self.handlers.insert(id);
        Ok(HandlerId(id))
    }

    fn unregister_draw_handler(&mut self, id: HandlerId) {
        self.handlers.remove(&id.0);
    }

    fn add_timer(&mut self, interval: Duration) -> OnionResult<TimerId> {
        let id = self.next();
        self.timers.insert(id, interval);
        Ok(TimerId(id))
    }

    fn remove_timer(&mut self, id: TimerId) {
        self.timers.remove(&id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(frame: f64, x: f32) -> Key<Vec3> {
        Key {
            frame,
            value: Vec3::new(x, 0.0, 0.0),
        }
    }

    fn unit_tri() -> MeshSnapshot {
        MeshSnapshot::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn track_interpolates_and_holds() {
        let track = Track(vec![key(0.0, 0.0), key(10.0, 10.0)]);
        assert_eq!(track.sample(-5.0, Vec3::ZERO).x, 0.0);
        assert_eq!(track.sample(5.0, Vec3::ZERO).x, 5.0);
        assert_eq!(track.sample(20.0, Vec3::ZERO).x, 10.0);
        assert_eq!(Track::default().sample(3.0, Vec3::ONE), Vec3::ONE);
    }

    #[test]
    fn evaluate_applies_world_transform_at_playhead() {
        let mut scene = MemoryScene::new();
        let id = scene.insert(
            "cube",
            SceneObject::mesh(
                unit_tri(),
                TransformTracks {
                    translation: Track(vec![key(0.0, 0.0), key(10.0, 10.0)]),
                    ..TransformTracks::default()
                },
            ),
        );
        scene.set_frame(Frame(4)).unwrap();
        let snap = scene.evaluate_mesh(&id).unwrap().unwrap();
        assert_eq!(snap.vertices[0], [4.0, 0.0, 0.0]);
        assert_eq!(snap.vertices[1], [5.0, 0.0, 0.0]);
    }

    #[test]
    fn non_mesh_objects_have_no_geometry() {
        let mut scene = MemoryScene::new();
        let id = scene.insert("empty", SceneObject::empty(TransformTracks::default()));
        assert!(scene.evaluate_mesh(&id).unwrap().is_none());
    }

    #[test]
    fn make_local_mesh_copies_linked_geometry() {
        let mut scene = MemoryScene::new();
        let rig = scene.insert("rig", SceneObject::mesh(unit_tri(), TransformTracks::default()));
        let proxy = scene.insert("rig_proxy", SceneObject::proxy(rig, TransformTracks::default()));
        let local = scene.make_local_mesh(&proxy).unwrap();
        assert_eq!(scene.object_kind(&local), Some(ObjectKind::Mesh));
        assert_eq!(scene.temporary_count(), 1);
        scene.remove_object(&local).unwrap();
        assert_eq!(scene.temporary_count(), 0);
    }

    #[test]
    fn scene_json_rejects_dangling_proxy() {
        let s = r#"{"objects":{"p":{"kind":"proxy","links":"missing"}}}"#;
        assert!(MemoryScene::from_json(s).is_err());
    }

    #[test]
    fn recording_renderer_tracks_state_per_draw() {
        let mut r = RecordingRenderer::new();
        let b = r.compile(&[[0.0; 3]; 3], &[[0, 1, 2]]).unwrap();
        r.apply_state(RenderState::for_overlay(false, false));
        r.draw(
            &b,
            Rgba {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 0.5,
            },
        );
        assert_eq!(r.draws[0].state.blend, BlendMode::Alpha);
        assert_eq!(r.draws[0].triangle_count, 1);
    }
}
