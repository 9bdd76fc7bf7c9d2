use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::{Error, IndexBuffer, Mesh, MeshId, MeshInfoBuffer, VertexBuffer};

/// The GPU-resident buffers of one registered mesh.
///
/// Created once at registration, owned by the arena for the lifetime of the
/// engine. The picking protocol never allocates or frees these, it only
/// borrows them through [`MeshBufferArena::acquire`].
#[derive(Debug)]
pub struct MeshSlot {
    vertex: VertexBuffer,
    index: IndexBuffer,
    info: MeshInfoBuffer,
    triangle_count: u32,
    /// Whether the compute pipeline currently owns the buffers.
    compute_owned: AtomicBool,
    acquires: AtomicU64,
    releases: AtomicU64,
}

impl MeshSlot {
    /// Upload the render copies of a mesh.
    pub fn new(device: &wgpu::Device, mesh: &Mesh) -> Result<Self, Error> {
        let mesh_size = std::mem::size_of_val(mesh.positions.as_slice()) as wgpu::BufferAddress;
        let device_limit = device.limits().max_storage_buffer_binding_size;
        if mesh_size > device_limit as wgpu::BufferAddress {
            return Err(Error::MeshSizeExceedsDeviceLimit {
                mesh_size,
                device_limit,
            });
        }

        let triangle_count = mesh.triangle_count().unwrap_or(0);

        Ok(Self {
            vertex: VertexBuffer::new(device, &mesh.positions),
            index: IndexBuffer::new(device, &mesh.indices),
            info: MeshInfoBuffer::new(device, triangle_count),
            triangle_count,
            compute_owned: AtomicBool::new(false),
            acquires: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        })
    }

    /// Get the vertex position buffer, for the renderer to draw from.
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        self.vertex.buffer()
    }

    /// Get the index buffer, for the renderer to draw from.
    pub fn index_buffer(&self) -> &wgpu::Buffer {
        self.index.buffer()
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> u32 {
        self.index.index_count()
    }

    /// Get the number of kernel-addressable triangles.
    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }
}

/// The interop bridge between the rendering and compute pipelines: an arena
/// of per-mesh buffer slots, indexed by [`MeshId`], with explicit
/// compute-side acquisition.
///
/// Ownership of a slot's buffers toggles between the rendering pipeline and
/// the compute kernel. Acquire/release pairs are strictly nested per mesh;
/// release happens in [`ComputeGuard`]'s drop, so it runs exactly once per
/// successful acquire on every exit path.
#[derive(Debug, Default)]
pub struct MeshBufferArena {
    slots: Vec<Arc<MeshSlot>>,
}

impl MeshBufferArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slot, assigning the next id in registration order.
    pub fn insert(&mut self, slot: MeshSlot) -> MeshId {
        let id = MeshId::from_index(self.slots.len());
        self.slots.push(Arc::new(slot));
        id
    }

    /// Get the number of registered meshes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate the registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = MeshId> + use<> {
        (0..self.slots.len()).map(MeshId::from_index)
    }

    /// Get a slot.
    pub fn get(&self, id: MeshId) -> Option<&MeshSlot> {
        self.slots.get(id.index()).map(Arc::as_ref)
    }

    /// Block until the device has completed all submitted rendering work.
    ///
    /// Must be called once per pick request before the first acquire, so no
    /// in-flight draw still reads the buffers a kernel is about to bind.
    pub fn synchronize(&self, device: &wgpu::Device) -> Result<(), Error> {
        device.poll(wgpu::PollType::wait_indefinitely())?;
        Ok(())
    }

    /// Acquire a mesh's buffers for the compute pipeline.
    ///
    /// Fails if the mesh is unknown or its buffers are already
    /// compute-owned. The returned guard hands ownership back to the
    /// rendering pipeline when dropped.
    pub fn acquire(&self, id: MeshId) -> Result<ComputeGuard, Error> {
        let slot = self
            .slots
            .get(id.index())
            .ok_or(Error::MeshNotRegistered(id))?;

        if slot.compute_owned.swap(true, Ordering::AcqRel) {
            return Err(Error::BufferAlreadyAcquired(id));
        }

        slot.acquires.fetch_add(1, Ordering::AcqRel);

        Ok(ComputeGuard { slot: slot.clone() })
    }

    /// Get the number of acquires performed on a mesh's buffers.
    pub fn acquire_count(&self, id: MeshId) -> Option<u64> {
        self.get(id).map(|slot| slot.acquires.load(Ordering::Acquire))
    }

    /// Get the number of releases performed on a mesh's buffers.
    pub fn release_count(&self, id: MeshId) -> Option<u64> {
        self.get(id).map(|slot| slot.releases.load(Ordering::Acquire))
    }
}

/// Scoped compute-side ownership of one mesh's buffers.
///
/// Holds its own handle to the slot, so it outlives any borrow of the
/// arena and can be carried across await points or onto another task.
#[derive(Debug)]
pub struct ComputeGuard {
    slot: Arc<MeshSlot>,
}

impl ComputeGuard {
    /// Get the vertex position buffer.
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        self.slot.vertex.buffer()
    }

    /// Get the index buffer.
    pub fn index_buffer(&self) -> &wgpu::Buffer {
        self.slot.index.buffer()
    }

    /// Get the mesh info uniform buffer.
    pub fn info_buffer(&self) -> &wgpu::Buffer {
        self.slot.info.buffer()
    }

    /// Get the number of kernel-addressable triangles.
    pub fn triangle_count(&self) -> u32 {
        self.slot.triangle_count
    }
}

impl Drop for ComputeGuard {
    fn drop(&mut self) {
        self.slot.compute_owned.store(false, Ordering::Release);
        self.slot.releases.fetch_add(1, Ordering::AcqRel);
    }
}
