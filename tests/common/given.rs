use glam::*;

use wgpu_mesh_picker::{Mesh, OrthographicCamera, Topology, Viewport};

/// The pixel size of the pick viewport used throughout the suite.
pub const VIEWPORT_SIZE: f32 = 300.0;

/// World units per pixel under [`camera`] and [`viewport`].
pub const WORLD_PER_PIXEL: f32 = 5.0 / VIEWPORT_SIZE;

pub fn viewport() -> Viewport {
    Viewport::from_size(VIEWPORT_SIZE, VIEWPORT_SIZE)
}

/// An axis-aligned orthographic camera looking down -Z: the near plane is
/// at z = -3.5 and picking rays travel toward negative z.
pub fn camera() -> OrthographicCamera {
    OrthographicCamera::new(vec4(-2.5, 2.5, -2.5, 2.5), 3.5..20.0)
}

/// The pixel that unprojects to world `(x, y)` on the near plane.
pub fn click_at_world(x: f32, y: f32) -> Vec2 {
    vec2(
        VIEWPORT_SIZE / 2.0 + x / WORLD_PER_PIXEL,
        VIEWPORT_SIZE / 2.0 - y / WORLD_PER_PIXEL,
    )
}

/// A single-triangle mesh.
pub fn triangle(name: &str, v0: Vec3, v1: Vec3, v2: Vec3) -> Mesh {
    let normal = (v1 - v0).cross(v2 - v0).normalize_or(Vec3::Z);

    Mesh::new(
        name,
        vec![v0, v1, v2],
        vec![normal; 3],
        vec![0, 1, 2],
        Topology::Triangles,
    )
    .expect("triangle mesh")
}

/// A unit-radius UV sphere centered at `center`.
pub fn unit_sphere(name: &str, center: Vec3) -> Mesh {
    const STACKS: usize = 16;
    const SECTORS: usize = 24;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for stack in 0..=STACKS {
        let phi = std::f32::consts::PI * stack as f32 / STACKS as f32;
        for sector in 0..=SECTORS {
            let theta = std::f32::consts::TAU * sector as f32 / SECTORS as f32;
            let normal = vec3(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            normals.push(normal);
            positions.push(center + normal);
        }
    }

    let mut indices = Vec::new();
    for stack in 0..STACKS {
        for sector in 0..SECTORS {
            let a = (stack * (SECTORS + 1) + sector) as u16;
            let b = a + (SECTORS + 1) as u16;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    Mesh::new(name, positions, normals, indices, Topology::Triangles).expect("sphere mesh")
}

/// A two-point line mesh; registers fine but has no triangles to pick.
pub fn line(name: &str, from: Vec3, to: Vec3) -> Mesh {
    Mesh::new(
        name,
        vec![from, to],
        vec![],
        vec![0, 1],
        Topology::Lines,
    )
    .expect("line mesh")
}
