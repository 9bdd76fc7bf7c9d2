use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use glam::*;

use wgpu_mesh_picker::{
    Error, GroupHitPod, GroupHitsBuffer, Intersector, Mesh, MeshBufferArena, MeshId, MeshSlot,
    PickingEngine, Ray, RayBuffer, SelectionState,
};

use crate::common::{TestContext, given};

/// The kernel's "no intersection" distance.
const SENTINEL: f32 = 1000.0;

/// A ray from the near plane of [`given::camera`] toward -Z.
fn ray_toward_neg_z(x: f32, y: f32) -> Ray {
    Ray {
        origin: vec4(x, y, -3.5, 0.0),
        direction: vec4(0.0, 0.0, -1.0, 0.0),
    }
}

/// Run the intersection kernel over a single mesh and read back the raw
/// per-group candidates.
fn dispatch_and_download(ctx: &TestContext, mesh: &Mesh, ray: &Ray) -> Vec<GroupHitPod> {
    let intersector = Intersector::new(&ctx.device);
    let ray_buffer = RayBuffer::new(&ctx.device);
    ray_buffer.update(&ctx.queue, ray);

    let mut arena = MeshBufferArena::new();
    let id = arena.insert(MeshSlot::new(&ctx.device, mesh).expect("mesh slot"));
    let guard = arena.acquire(id).expect("acquire");

    let group_count = intersector.group_count(guard.triangle_count());
    let group_hits = GroupHitsBuffer::new(&ctx.device, group_count);
    let bind_group = intersector.create_bind_group(
        &ctx.device,
        &ray_buffer,
        guard.info_buffer(),
        guard.vertex_buffer(),
        guard.index_buffer(),
        &group_hits,
    );

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Command Encoder"),
        });
    intersector.dispatch(&mut encoder, &bind_group, group_count);
    ctx.queue.submit(Some(encoder.finish()));

    pollster::block_on(group_hits.download(&ctx.device, &ctx.queue)).expect("download")
}

fn engine_with_meshes(ctx: &TestContext, meshes: &[Mesh]) -> (PickingEngine, Vec<MeshId>) {
    let mut engine = PickingEngine::new(&ctx.device);
    let ids = meshes
        .iter()
        .map(|mesh| engine.register_mesh(&ctx.device, mesh).expect("register"))
        .collect();

    engine.update_view(given::viewport(), given::camera().view_proj());

    (engine, ids)
}

fn pick(engine: &mut PickingEngine, ctx: &TestContext, click: Vec2) -> SelectionState {
    pollster::block_on(engine.pick(&ctx.device, &ctx.queue, click)).expect("pick")
}

#[test]
fn test_ray_through_empty_space_yields_sentinel_in_every_group() {
    let ctx = TestContext::new();
    let sphere = given::unit_sphere("sphere", vec3(5.0, 0.0, -8.0));

    let groups = dispatch_and_download(&ctx, &sphere, &ray_toward_neg_z(0.0, 0.0));

    assert!(!groups.is_empty());
    for group in groups {
        assert_eq!(group.distance, SENTINEL);
        assert_eq!(group.hit, 0);
    }
}

#[test]
fn test_single_triangle_hit_reduces_to_its_distance() {
    let ctx = TestContext::new();
    let triangle = given::triangle(
        "triangle",
        vec3(-1.0, -1.0, -8.5),
        vec3(1.0, -1.0, -8.5),
        vec3(0.0, 1.5, -8.5),
    );

    let groups = dispatch_and_download(&ctx, &triangle, &ray_toward_neg_z(0.0, 0.0));

    let nearest = groups
        .iter()
        .filter(|group| group.hit != 0)
        .map(|group| group.distance)
        .fold(f32::INFINITY, f32::min);

    // Ray starts on the near plane at z = -3.5; the triangle lies in the
    // z = -8.5 plane.
    assert!((nearest - 5.0).abs() < 1e-3);
}

#[test]
fn test_pick_selects_triangle_under_cursor() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[given::triangle(
            "triangle",
            vec3(-1.0, -1.0, -8.5),
            vec3(1.0, -1.0, -8.5),
            vec3(0.0, 1.5, -8.5),
        )],
    );

    let state = pick(&mut engine, &ctx, given::click_at_world(0.0, 0.0));

    assert_eq!(state.selected, Some(ids[0]));
    assert_eq!(engine.selection(), state);
}

#[test]
fn test_pick_ties_select_lower_registration_index() {
    let ctx = TestContext::new();
    let make = |name: &str| {
        given::triangle(
            name,
            vec3(-1.0, -1.0, -8.5),
            vec3(1.0, -1.0, -8.5),
            vec3(0.0, 1.5, -8.5),
        )
    };
    let (mut engine, ids) = engine_with_meshes(&ctx, &[make("first"), make("second")]);

    let state = pick(&mut engine, &ctx, given::click_at_world(0.0, 0.0));

    assert_eq!(state.selected, Some(ids[0]));
}

#[test]
fn test_pick_is_idempotent_for_unchanged_scene() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[
            given::unit_sphere("left", vec3(-1.5, 0.0, -8.0)),
            given::unit_sphere("right", vec3(1.5, 0.0, -8.0)),
        ],
    );

    let click = given::click_at_world(1.5, 0.1);
    let first = pick(&mut engine, &ctx, click);
    let second = pick(&mut engine, &ctx, click);

    assert_eq!(first.selected, Some(ids[1]));
    assert_eq!(first, second);
}

#[test]
fn test_pick_skips_meshes_without_triangles() {
    let ctx = TestContext::new();
    let (mut engine, _) = engine_with_meshes(
        &ctx,
        &[given::line(
            "line",
            vec3(0.0, -2.0, -8.0),
            vec3(0.0, 2.0, -8.0),
        )],
    );

    let state = pick(&mut engine, &ctx, given::click_at_world(0.0, 0.0));

    assert_eq!(state.selected, None);
}

#[test]
fn test_acquires_and_releases_balance_after_each_request() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[
            given::unit_sphere("a", vec3(0.0, 0.0, -8.0)),
            given::unit_sphere("b", vec3(3.0, 0.0, -8.0)),
        ],
    );

    pick(&mut engine, &ctx, given::click_at_world(0.1, 0.0));
    pick(&mut engine, &ctx, given::click_at_world(-0.1, 0.0));

    for id in ids {
        let acquires = engine.arena().acquire_count(id).expect("acquires");
        let releases = engine.arena().release_count(id).expect("releases");
        assert_eq!(acquires, releases);
        assert_eq!(acquires, 2);
    }
}

#[test]
fn test_failed_request_releases_buffers_and_keeps_selection() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[
            given::unit_sphere("a", vec3(0.0, 0.0, -8.0)),
            given::unit_sphere("b", vec3(3.0, 0.0, -8.0)),
        ],
    );

    let before = pick(&mut engine, &ctx, given::click_at_world(0.1, 0.0));
    assert_eq!(before.selected, Some(ids[0]));

    // Holding a compute acquisition on the first mesh makes the next
    // request fail mid-protocol.
    let guard = engine.arena().acquire(ids[0]).expect("acquire");
    let result =
        pollster::block_on(engine.pick(&ctx.device, &ctx.queue, given::click_at_world(3.0, 0.1)));
    assert!(matches!(result, Err(Error::BufferAlreadyAcquired(id)) if id == ids[0]));

    // The failed request leaves the previous selection in place.
    assert_eq!(engine.selection(), before);
    drop(guard);

    for id in ids {
        assert_eq!(
            engine.arena().acquire_count(id),
            engine.arena().release_count(id),
        );
    }
}

#[test]
fn test_completed_pick_requests_redraw_hit_or_miss() {
    let ctx = TestContext::new();
    let (mut engine, _) =
        engine_with_meshes(&ctx, &[given::unit_sphere("sphere", vec3(0.0, 0.0, -8.0))]);

    let redraws = Arc::new(AtomicUsize::new(0));
    let counter = redraws.clone();
    engine.set_redraw_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    pick(&mut engine, &ctx, given::click_at_world(0.1, 0.0));
    assert_eq!(redraws.load(Ordering::SeqCst), 1);

    // A miss still completes the request and still signals redraw.
    let state = pick(&mut engine, &ctx, given::click_at_world(10.0, 0.0));
    assert_eq!(state.selected, None);
    assert_eq!(redraws.load(Ordering::SeqCst), 2);
}

#[test]
fn test_three_spheres_end_to_end() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[
            given::unit_sphere("far left", vec3(-20.0, 0.0, -8.0)),
            given::unit_sphere("center", vec3(0.0, 0.0, -8.0)),
            given::unit_sphere("far right", vec3(20.0, 0.0, -8.0)),
        ],
    );

    let hit = pick(&mut engine, &ctx, given::click_at_world(0.1, 0.1));
    assert_eq!(hit.selected, Some(ids[1]));

    let miss = pick(&mut engine, &ctx, given::click_at_world(10.0, 0.1));
    assert_eq!(miss.selected, None);
}

#[test]
fn test_nearer_mesh_wins_along_the_ray() {
    let ctx = TestContext::new();
    let (mut engine, ids) = engine_with_meshes(
        &ctx,
        &[
            given::unit_sphere("behind", vec3(0.0, 0.0, -14.0)),
            given::unit_sphere("in front", vec3(0.0, 0.0, -8.0)),
        ],
    );

    // Both spheres lie on the ray's path; the nearer one must win even
    // though it registered later.
    let state = pick(&mut engine, &ctx, given::click_at_world(0.1, 0.1));

    assert_eq!(state.selected, Some(ids[1]));
}
