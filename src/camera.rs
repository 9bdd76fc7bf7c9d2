use glam::*;

/// An orthographic camera.
///
/// Picking only consumes the inverse of the combined view-projection
/// transform, so this type is a thin collaborator producing that transform
/// the way the renderer would.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    /// The view transform (world to view space).
    pub view: Mat4,
    /// The left/right/bottom/top bounds of the projection volume.
    pub bounds: Vec4,
    /// The z range of the projection volume.
    pub z: std::ops::Range<f32>,
}

impl OrthographicCamera {
    /// Create a new camera with an identity view transform.
    pub fn new(bounds: Vec4, z: std::ops::Range<f32>) -> Self {
        Self {
            view: Mat4::IDENTITY,
            bounds,
            z,
        }
    }

    /// Set the view transform.
    pub fn with_view(mut self, view: Mat4) -> Self {
        self.view = view;
        self
    }

    /// Get the projection matrix.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.bounds.x,
            self.bounds.y,
            self.bounds.z,
            self.bounds.w,
            self.z.start,
            self.z.end,
        )
    }

    /// Get the combined view-projection matrix.
    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view
    }
}
