use crate::{
    foundation::error::{OnionError, OnionResult},
    host::{ObjectId, ObjectKind, SceneHost},
};

/// What the onion skin samples.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnionSource {
    /// Mesh objects joined into one synthetic mesh per frame.
    Group(Vec<ObjectId>),
    /// One tracked object, possibly a linked proxy.
    Single(ObjectId),
}

/// Concrete objects ready for evaluation, plus temporaries created to get there.
#[derive(Debug, Default)]
pub struct Sampleable {
    pub objects: Vec<ObjectId>,
    temporaries: Vec<ObjectId>,
}

impl Sampleable {
    pub fn temporaries(&self) -> &[ObjectId] {
        &self.temporaries
    }

    /// Remove every temporary object. Keeps going past failures and reports the first.
    pub fn release(self, scene: &mut dyn SceneHost) -> OnionResult<()> {
        let mut first_err = None;
        for id in &self.temporaries {
            if let Err(e) = scene.remove_object(id) {
                tracing::warn!(object = %id, error = %e, "failed to remove temporary object");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl OnionSource {
    pub fn validate(&self) -> OnionResult<()> {
        match self {
            Self::Group(ids) if ids.is_empty() => {
                Err(OnionError::validation("onion group must not be empty"))
            }
            Self::Group(_) | Self::Single(_) => Ok(()),
        }
    }

    /// Objects whose animation curves define the keyframe set.
    pub fn objects(&self) -> &[ObjectId] {
        match self {
            Self::Group(ids) => ids,
            Self::Single(id) => std::slice::from_ref(id),
        }
    }

    /// A group stays live while any member exists; a single source while its object exists.
    pub fn is_live(&self, scene: &dyn SceneHost) -> bool {
        match self {
            Self::Group(ids) => ids.iter().any(|id| scene.object_exists(id)),
            Self::Single(id) => scene.object_exists(id),
        }
    }

    /// Resolve into objects the extractor can evaluate.
    ///
    /// Missing group members are dropped. A single proxy is duplicated into a temporary
    /// local mesh, which the caller must release.
    pub fn resolve_to_sampleable(&self, scene: &mut dyn SceneHost) -> OnionResult<Sampleable> {
        match self {
            Self::Group(ids) => Ok(Sampleable {
                objects: ids
                    .iter()
                    .filter(|id| scene.object_exists(id))
                    .cloned()
                    .collect(),
                temporaries: Vec::new(),
            }),
            Self::Single(id) => match scene.object_kind(id) {
                None => Err(OnionError::host(format!("object '{id}' no longer exists"))),
                Some(ObjectKind::Proxy) => {
                    let local = scene.make_local_mesh(id)?;
                    tracing::debug!(proxy = %id, local = %local, "resolved proxy to local mesh");
                    Ok(Sampleable {
                        objects: vec![local.clone()],
                        temporaries: vec![local],
                    })
                }
                Some(ObjectKind::Mesh | ObjectKind::Other) => Ok(Sampleable {
                    objects: vec![id.clone()],
                    temporaries: Vec::new(),
                }),
            },
        }
    }
}

/// Resolve `source`, run `f` on the sampleable objects, then release temporaries even when
/// `f` fails. An error from `f` wins over a release error.
pub fn with_sampleable<R>(
    source: &OnionSource,
    scene: &mut dyn SceneHost,
    f: impl FnOnce(&mut dyn SceneHost, &[ObjectId]) -> OnionResult<R>,
) -> OnionResult<R> {
    let sampleable = source.resolve_to_sampleable(scene)?;
    let out = f(&mut *scene, &sampleable.objects);
    let released = sampleable.release(scene);
    let out = out?;
    released?;
    Ok(out)
}
