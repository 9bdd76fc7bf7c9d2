//! A GPU-accelerated mesh picking library.
//!
//! A click on the window becomes a world-space ray; a compute kernel tests
//! the ray against every triangle of every registered mesh, reading the
//! same GPU buffers the renderer draws from; a work-group then host
//! reduction finds the single nearest hit and publishes it as the
//! [`SelectionState`] the renderer reads each frame.

mod bridge;
mod buffer;
mod camera;
mod error;
mod intersector;
mod mesh;
mod ray;
mod selection;

use glam::*;

pub use bridge::*;
pub use buffer::*;
pub use camera::*;
pub use error::*;
pub use intersector::*;
pub use mesh::*;
pub use ray::*;
pub use selection::*;

/// Request a compute-capable device for picking.
///
/// Failing here means no picking can ever occur; callers are expected to
/// treat the error as fatal at startup.
pub async fn request_picking_device(
    instance: &wgpu::Instance,
) -> Result<(wgpu::Device, wgpu::Queue), Error> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        })
        .await?;

    log::debug!("Using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Picking Device"),
            required_limits: adapter.limits(),
            ..Default::default()
        })
        .await?;

    Ok((device, queue))
}

/// The picking engine.
///
/// Owns the full request lifecycle: ray build, per-mesh buffer
/// acquisition, kernel dispatch, result read-back, release, and the final
/// reduction into [`SelectionState`].
///
/// At most one pick request is in flight per engine; [`PickingEngine::pick`]
/// takes `&mut self`, so a caller that wants rapid successive clicks must
/// queue them.
pub struct PickingEngine {
    arena: MeshBufferArena,
    intersector: Intersector,
    ray_buffer: RayBuffer,
    selection: SelectionState,
    viewport: Viewport,
    view_proj_inverse: Mat4,
    redraw_handler: Option<Box<dyn Fn() + Send + Sync>>,
}

impl PickingEngine {
    /// Create a new picking engine.
    pub fn new(device: &wgpu::Device) -> Self {
        log::debug!("Creating intersector");
        let intersector = Intersector::new(device);

        log::debug!("Creating ray buffer");
        let ray_buffer = RayBuffer::new(device);

        log::info!("Picking engine created");

        Self {
            arena: MeshBufferArena::new(),
            intersector,
            ray_buffer,
            selection: SelectionState::NONE,
            viewport: Viewport::from_size(1.0, 1.0),
            view_proj_inverse: Mat4::IDENTITY,
            redraw_handler: None,
        }
    }

    /// Register a mesh, uploading its render buffer copies.
    ///
    /// Ids are assigned in registration order; ties in hit distance are
    /// broken toward the earlier id.
    pub fn register_mesh(&mut self, device: &wgpu::Device, mesh: &Mesh) -> Result<MeshId, Error> {
        let slot = MeshSlot::new(device, mesh)?;
        let id = self.arena.insert(slot);

        log::debug!(
            "Registered mesh {:?} as {id} with {} triangles",
            mesh.name,
            mesh.triangle_count().unwrap_or(0),
        );

        Ok(id)
    }

    /// Update the viewport and view-projection transform consumed by the
    /// ray builder. The inverse is computed once here.
    pub fn update_view(&mut self, viewport: Viewport, view_proj: Mat4) {
        self.viewport = viewport;
        self.view_proj_inverse = view_proj.inverse();
    }

    /// Set the collaborator invoked after every completed pick, hit or
    /// miss, so the highlight change becomes visible.
    pub fn set_redraw_handler(&mut self, handler: impl Fn() + Send + Sync + 'static) {
        self.redraw_handler = Some(Box::new(handler));
    }

    /// Get the current selection, for the renderer's per-frame read.
    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    /// Get the mesh buffer arena, for the renderer to draw from.
    pub fn arena(&self) -> &MeshBufferArena {
        &self.arena
    }

    /// Get the number of registered meshes.
    pub fn mesh_count(&self) -> usize {
        self.arena.len()
    }

    /// Run one pick request for a click at pixel `(x, y)`.
    ///
    /// A device failure during any mesh's cycle aborts the whole request:
    /// partial results are discarded, every acquired buffer is released,
    /// and the previous selection is left unchanged.
    pub async fn pick(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        click: Vec2,
    ) -> Result<SelectionState, Error> {
        let ray = Ray::from_click(click, self.viewport, self.view_proj_inverse);
        self.ray_buffer.update(queue, &ray);

        let mut results = Vec::with_capacity(self.arena.len());
        match self.collect_group_hits(device, queue, &mut results).await {
            Ok(()) => {}
            Err(e) => {
                log::error!("Pick request aborted: {e}");
                return Err(e);
            }
        }

        self.selection = selection::reduce(
            results.iter().map(|(id, groups)| (*id, groups.as_slice())),
        );

        log::debug!("Pick selected {:?}", self.selection.selected);

        if let Some(handler) = &self.redraw_handler {
            handler();
        }

        Ok(self.selection)
    }

    /// Dispatch the kernel and read back the per-group candidates for every
    /// registered mesh, in registration order.
    async fn collect_group_hits(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        results: &mut Vec<(MeshId, Vec<GroupHitPod>)>,
    ) -> Result<(), Error> {
        // The rendering pipeline must be done with the buffers before the
        // first acquire.
        self.arena.synchronize(device)?;

        for id in self.arena.ids() {
            let triangle_count = self
                .arena
                .get(id)
                .ok_or(Error::MeshNotRegistered(id))?
                .triangle_count();
            if triangle_count == 0 {
                log::debug!("Skipping mesh {id} without kernel-addressable triangles");
                continue;
            }

            let guard = self.arena.acquire(id)?;

            let group_count = self.intersector.group_count(triangle_count);
            let group_hits = GroupHitsBuffer::new(device, group_count);
            let bind_group = self.intersector.create_bind_group(
                device,
                &self.ray_buffer,
                guard.info_buffer(),
                guard.vertex_buffer(),
                guard.index_buffer(),
                &group_hits,
            );

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Encoder"),
            });
            self.intersector.dispatch(&mut encoder, &bind_group, group_count);
            group_hits.prepare_download(&mut encoder);
            queue.submit(Some(encoder.finish()));

            // The guard releases the buffers when this scope exits, on the
            // error path included.
            let groups = group_hits.map_download(device).await?;
            drop(guard);

            results.push((id, groups));
        }

        Ok(())
    }
}

impl std::fmt::Debug for PickingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickingEngine")
            .field("arena", &self.arena)
            .field("intersector", &self.intersector)
            .field("selection", &self.selection)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}
