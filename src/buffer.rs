use glam::*;

use wgpu::util::DeviceExt;

use crate::{Error, Ray, RayPod};

/// The vertex position buffer of one mesh.
///
/// Uploaded once at registration by the rendering subsystem; bound to the
/// intersection kernel as a read-only storage buffer without any host
/// round-trip.
#[derive(Debug)]
pub struct VertexBuffer(wgpu::Buffer);

impl VertexBuffer {
    /// Create a new vertex buffer.
    pub fn new(device: &wgpu::Device, positions: &[Vec3]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        });

        Self(buffer)
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }

    /// Get the number of vertices.
    pub fn len(&self) -> usize {
        self.0.size() as usize / std::mem::size_of::<Vec3>()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The index buffer of one mesh.
///
/// Indices are stored as `u16` exactly as the renderer draws them; the
/// intersection kernel reads the same buffer as packed 32-bit words and
/// unpacks two indices per word. An odd index count is padded with one
/// trailing zero to keep the buffer size word-aligned.
#[derive(Debug)]
pub struct IndexBuffer {
    buffer: wgpu::Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Create a new index buffer.
    pub fn new(device: &wgpu::Device, indices: &[u16]) -> Self {
        let mut contents = indices.to_vec();
        if contents.len() % 2 != 0 {
            contents.push(0);
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&contents),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE,
        });

        Self {
            buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get the number of indices, excluding alignment padding.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// The ray uniform buffer, written once per pick request.
#[derive(Debug)]
pub struct RayBuffer(wgpu::Buffer);

impl RayBuffer {
    /// Create a new ray buffer.
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ray Buffer"),
            size: std::mem::size_of::<RayPod>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self(buffer)
    }

    /// Update the ray buffer.
    pub fn update(&self, queue: &wgpu::Queue, ray: &Ray) {
        queue.write_buffer(&self.0, 0, bytemuck::bytes_of(&RayPod::new(ray)));
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }
}

/// The POD representation of one mesh's kernel parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshInfoPod {
    pub triangle_count: u32,
    _padding: [u32; 3],
}

impl MeshInfoPod {
    /// Create a new mesh info.
    pub const fn new(triangle_count: u32) -> Self {
        Self {
            triangle_count,
            _padding: [0; 3],
        }
    }
}

/// The per-mesh kernel parameter uniform buffer.
///
/// The triangle count never changes after load, so the buffer is filled at
/// registration and only read afterwards.
#[derive(Debug)]
pub struct MeshInfoBuffer(wgpu::Buffer);

impl MeshInfoBuffer {
    /// Create a new mesh info buffer.
    pub fn new(device: &wgpu::Device, triangle_count: u32) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Info Buffer"),
            contents: bytemuck::bytes_of(&MeshInfoPod::new(triangle_count)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        Self(buffer)
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }
}

/// The POD representation of one work-group's intersection candidate.
///
/// `hit` is an explicit validity flag; the host never decides "no hit" by
/// comparing `distance` against the sentinel's magnitude.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GroupHitPod {
    pub distance: f32,
    pub hit: u32,
}

impl GroupHitPod {
    /// Check whether the group found any intersection.
    pub fn is_hit(&self) -> bool {
        self.hit != 0
    }
}

/// The per-group hit output storage buffer of one kernel dispatch, paired
/// with its download buffer for host read-back.
#[derive(Debug)]
pub struct GroupHitsBuffer {
    data: wgpu::Buffer,
    download: wgpu::Buffer,
    group_count: u32,
}

impl GroupHitsBuffer {
    /// Create a new group hits buffer sized to `group_count` work-groups.
    pub fn new(device: &wgpu::Device, group_count: u32) -> Self {
        let size = (group_count as u64) * std::mem::size_of::<GroupHitPod>() as u64;

        let data = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Group Hits Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let download = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Group Hits Download Buffer"),
            size: data.size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            data,
            download,
            group_count,
        }
    }

    /// Download the group hits.
    pub async fn download(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<GroupHitPod>, Error> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Group Hits Download Encoder"),
        });
        self.prepare_download(&mut encoder);
        queue.submit(Some(encoder.finish()));

        self.map_download(device).await
    }

    /// Prepare for downloading the group hits.
    pub fn prepare_download(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(self.buffer(), 0, &self.download, 0, self.buffer().size());
    }

    /// Map the download buffer to read the group hits.
    pub async fn map_download(&self, device: &wgpu::Device) -> Result<Vec<GroupHitPod>, Error> {
        let (tx, rx) = oneshot::channel();
        let buffer_slice = self.download.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            if let Err(e) = tx.send(result) {
                log::error!("Error occurred while sending group hits: {e:?}");
            }
        });
        device.poll(wgpu::PollType::wait_indefinitely())?;
        rx.await??;

        let hits = bytemuck::allocation::pod_collect_to_vec(&buffer_slice.get_mapped_range());
        self.download.unmap();

        Ok(hits)
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.data
    }

    /// Get the number of work-groups the buffer is sized for.
    pub fn group_count(&self) -> u32 {
        self.group_count
    }
}
