use thiserror::Error;

use crate::{MeshId, Topology, VertexSemantic};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no compute-capable adapter found: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),
    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("mesh is missing the {0} attribute")]
    MissingAttribute(VertexSemantic),
    #[error("the {semantic} attribute has {len} values, which is not a multiple of 3")]
    AttributeLength { semantic: VertexSemantic, len: usize },
    #[error("{index_count} indices do not satisfy the arity rule of {topology:?}")]
    IndexCountMismatch {
        topology: Topology,
        index_count: usize,
    },
    #[error("mesh size {mesh_size} exceeds device limit {device_limit}")]
    MeshSizeExceedsDeviceLimit {
        mesh_size: wgpu::BufferAddress,
        device_limit: u32,
    },
    #[error("mesh {0} is not registered")]
    MeshNotRegistered(MeshId),
    #[error("buffers of mesh {0} are already acquired by the compute pipeline")]
    BufferAlreadyAcquired(MeshId),
    #[error("{0}")]
    DeviceSync(#[from] wgpu::PollError),
    #[error("{0}")]
    HitDownloadOneShotReceive(#[from] oneshot::RecvError),
    #[error("{0}")]
    HitDownloadAsync(#[from] wgpu::BufferAsyncError),
}
