use crate::{
    foundation::core::Frame,
    foundation::error::OnionResult,
    host::{ObjectId, ObjectKind, SceneHost},
    snapshot::MeshSnapshot,
};

/// Evaluate `objects` at `frame` and merge them into one world-space snapshot.
///
/// Moves the playhead to `frame`; restoring it is the caller's job. Objects that are not
/// meshes, or that evaluate to no geometry, are skipped. Nothing renderable yields an empty
/// snapshot.
#[tracing::instrument(level = "trace", skip(scene, objects), fields(objects = objects.len()))]
pub fn extract(
    scene: &mut dyn SceneHost,
    objects: &[ObjectId],
    frame: Frame,
) -> OnionResult<MeshSnapshot> {
    scene.set_frame(frame)?;

    let mut merged = MeshSnapshot::empty();
    for id in objects {
        if scene.object_kind(id) != Some(ObjectKind::Mesh) {
            continue;
        }
        let Some(part) = scene.evaluate_mesh(id)? else {
            continue;
        };
        part.validate()?;
        merged.append(&part)?;
    }
    Ok(merged)
}
