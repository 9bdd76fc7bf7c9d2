use glam::*;

/// The viewport half-dimensions used to map click pixels to normalized
/// device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub half_width: f32,
    pub half_height: f32,
}

impl Viewport {
    /// Create a viewport from a pixel size.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }
}

/// A world-space picking ray, alive for one pick request.
///
/// `origin.w` and `direction.w` are always 0, matching the layout the
/// intersection kernel consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec4,
    pub direction: Vec4,
}

impl Ray {
    /// Build the ray for a click at pixel `(x, y)`.
    ///
    /// The click is mapped to normalized device coordinates, the origin is
    /// the unprojected near-plane point (wgpu clip space, near at z = 0),
    /// and the direction is the normalized unprojection of the forward clip
    /// axis. With an orthographic projection every ray shares that
    /// direction and only the origin varies per pixel.
    pub fn from_click(click: Vec2, viewport: Viewport, view_proj_inverse: Mat4) -> Self {
        let ndc = vec2(
            (click.x - viewport.half_width) / viewport.half_width,
            (viewport.half_height - click.y) / viewport.half_height,
        );

        let origin = view_proj_inverse * vec4(ndc.x, ndc.y, 0.0, 1.0);
        let direction = view_proj_inverse * vec4(0.0, 0.0, 1.0, 0.0);

        Self {
            origin: origin.truncate().extend(0.0),
            direction: direction.truncate().normalize().extend(0.0),
        }
    }
}

/// The POD representation of a ray, the kernel's first uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RayPod {
    pub origin: Vec4,
    pub direction: Vec4,
}

impl RayPod {
    /// Create a new ray POD.
    pub fn new(ray: &Ray) -> Self {
        Self {
            origin: ray.origin,
            direction: ray.direction,
        }
    }
}

impl From<&Ray> for RayPod {
    fn from(ray: &Ray) -> Self {
        Self::new(ray)
    }
}
