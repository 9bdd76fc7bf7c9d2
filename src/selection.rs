use crate::{GroupHitPod, MeshId};

/// The published pick result, read by the renderer every frame to recolor
/// the selected mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionState {
    /// The selected mesh, or `None` when the last pick hit empty space.
    pub selected: Option<MeshId>,
}

impl SelectionState {
    /// The state with nothing selected.
    pub const NONE: Self = Self { selected: None };
}

/// Reduce the per-group candidates of every mesh to the globally nearest
/// hit.
///
/// Meshes must be supplied in registration order and groups in index
/// order; the strict less-than comparison then keeps the first mesh
/// encountered on ties. Candidates without the hit flag are never
/// considered, regardless of their distance field.
///
/// This is a pure reduction: identical kernel outputs always produce the
/// same selection.
pub fn reduce<'a>(
    results: impl IntoIterator<Item = (MeshId, &'a [GroupHitPod])>,
) -> SelectionState {
    let mut nearest: Option<(MeshId, f32)> = None;

    for (id, groups) in results {
        for group in groups {
            if !group.is_hit() {
                continue;
            }

            if nearest.is_none_or(|(_, distance)| group.distance < distance) {
                nearest = Some((id, group.distance));
            }
        }
    }

    SelectionState {
        selected: nearest.map(|(id, _)| id),
    }
}
