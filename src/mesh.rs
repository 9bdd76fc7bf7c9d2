use glam::*;

use crate::Error;

/// Identifier of a registered mesh.
///
/// Ids are assigned densely in registration order, so they double as the
/// index into the mesh buffer arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u32);

impl MeshId {
    /// Create a mesh id from an arena index.
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the arena index of the mesh.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The primitive topology of a mesh's index array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Lines,
    LineStrip,
    Triangles,
    TriangleFan,
    TriangleStrip,
}

impl Topology {
    /// The number of indices required for `primitive_count` primitives.
    pub fn index_count(&self, primitive_count: usize) -> usize {
        match self {
            Self::Lines => primitive_count * 2,
            Self::LineStrip => primitive_count + 1,
            Self::Triangles => primitive_count * 3,
            Self::TriangleFan | Self::TriangleStrip => primitive_count + 2,
        }
    }

    /// The number of independently addressable triangles in an index array
    /// of `index_count` indices.
    ///
    /// Only [`Topology::Triangles`] stores each triangle as a contiguous
    /// index triple, which is what the intersection kernel addresses; every
    /// other topology returns `None` and is skipped by picking.
    pub fn triangle_count(&self, index_count: usize) -> Option<u32> {
        match self {
            Self::Triangles => Some((index_count / 3) as u32),
            _ => None,
        }
    }

    /// Whether `index_count` satisfies this topology's arity rule for some
    /// whole number of primitives.
    fn is_valid_index_count(&self, index_count: usize) -> bool {
        match self {
            Self::Lines => index_count % 2 == 0,
            Self::LineStrip => index_count >= 2,
            Self::Triangles => index_count % 3 == 0,
            Self::TriangleFan | Self::TriangleStrip => index_count >= 3,
        }
    }
}

/// The vertex attribute semantics recognized by the mesh store.
///
/// Asset formats key attribute arrays by semantic name; the names are
/// resolved once at load time so nothing string-keyed survives into the
/// per-pick path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
}

impl VertexSemantic {
    /// Resolve an asset-file semantic name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "POSITION" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            _ => None,
        }
    }
}

impl std::fmt::Display for VertexSemantic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position => write!(f, "POSITION"),
            Self::Normal => write!(f, "NORMAL"),
        }
    }
}

/// A mesh as produced by the asset loader.
///
/// Immutable after load. The rendering subsystem uploads GPU copies of the
/// positions and indices at registration; picking only ever borrows those
/// copies.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u16>,
    pub topology: Topology,
}

impl Mesh {
    /// Create a new mesh, validating the topology's arity rule.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u16>,
        topology: Topology,
    ) -> Result<Self, Error> {
        if !topology.is_valid_index_count(indices.len()) {
            return Err(Error::IndexCountMismatch {
                topology,
                index_count: indices.len(),
            });
        }

        Ok(Self {
            name: name.into(),
            positions,
            normals,
            indices,
            topology,
        })
    }

    /// Create a mesh from loader output: attribute arrays keyed by semantic
    /// name, resolved here once into the fixed fields.
    ///
    /// Unrecognized semantics are ignored. A missing `POSITION` array is an
    /// error; a missing `NORMAL` array yields an empty normal set.
    pub fn from_attributes<'a>(
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (&'a str, Vec<f32>)>,
        indices: Vec<u16>,
        topology: Topology,
    ) -> Result<Self, Error> {
        let mut positions = None;
        let mut normals = None;

        for (semantic_name, values) in attributes {
            let Some(semantic) = VertexSemantic::from_name(semantic_name) else {
                log::debug!("Ignoring unrecognized vertex semantic {semantic_name:?}");
                continue;
            };

            let array = Self::vec3_array(semantic, values)?;
            match semantic {
                VertexSemantic::Position => positions = Some(array),
                VertexSemantic::Normal => normals = Some(array),
            }
        }

        let positions =
            positions.ok_or(Error::MissingAttribute(VertexSemantic::Position))?;

        Self::new(
            name,
            positions,
            normals.unwrap_or_default(),
            indices,
            topology,
        )
    }

    /// The number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// The number of triangles addressable by the intersection kernel, or
    /// `None` for non-triangle-list topologies.
    pub fn triangle_count(&self) -> Option<u32> {
        self.topology.triangle_count(self.indices.len())
    }

    fn vec3_array(semantic: VertexSemantic, values: Vec<f32>) -> Result<Vec<Vec3>, Error> {
        if values.len() % 3 != 0 {
            return Err(Error::AttributeLength {
                semantic,
                len: values.len(),
            });
        }

        Ok(values
            .chunks_exact(3)
            .map(|v| vec3(v[0], v[1], v[2]))
            .collect())
    }
}
