use crate::foundation::error::{OnionError, OnionResult};

/// World-space triangle soup for one object (or merged group) at one frame.
///
/// Triangle indices reference only vertices of the same snapshot. Snapshots of different
/// frames never share vertex storage.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshSnapshot {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshSnapshot {
    pub fn new(vertices: Vec<[f32; 3]>, triangles: Vec<[u32; 3]>) -> OnionResult<Self> {
        let snap = Self {
            vertices,
            triangles,
        };
        snap.validate()?;
        Ok(snap)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn validate(&self) -> OnionResult<()> {
        let n = self.vertices.len();
        if let Some(tri) = self
            .triangles
            .iter()
            .find(|tri| tri.iter().any(|&i| i as usize >= n))
        {
            return Err(OnionError::validation(format!(
                "triangle {tri:?} references a vertex outside 0..{n}"
            )));
        }
        Ok(())
    }

    /// Append `other`, renumbering its indices into this buffer.
    pub fn append(&mut self, other: &MeshSnapshot) -> OnionResult<()> {
        let base = u32::try_from(self.vertices.len())
            .map_err(|_| OnionError::bake("merged snapshot exceeds u32 vertex indices"))?;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|[a, b, c]| [a + base, b + base, c + base]),
        );
        Ok(())
    }
}
