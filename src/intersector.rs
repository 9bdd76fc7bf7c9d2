use crate::{GroupHitsBuffer, RayBuffer};

/// The intersection kernel.
///
/// Tests every triangle of one mesh against the current pick ray and writes
/// one minimal-distance candidate per work-group. The work-group size is
/// fixed at pipeline build time to the device's reported maximum (rounded
/// down to a power of two so the in-group tree reduction halves cleanly).
#[derive(Debug)]
pub struct Intersector {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    workgroup_size: u32,
}

impl Intersector {
    /// The label.
    const LABEL: &str = "Intersector";

    /// The kernel source, with the work-group size left to substitute.
    const SHADER: &str = include_str!("shader/intersect.wgsl");

    /// The substitution marker in [`Intersector::SHADER`].
    const WORKGROUP_SIZE_MARKER: &str = "{{workgroup_size}}";

    /// The bind group layout descriptor.
    pub const BIND_GROUP_LAYOUT_DESCRIPTOR: wgpu::BindGroupLayoutDescriptor<'static> =
        wgpu::BindGroupLayoutDescriptor {
            label: Some("Intersector Bind Group Layout"),
            entries: &[
                // Ray uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Mesh info uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Vertex position storage buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Index storage buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Group hits storage buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        };

    /// Create a new intersector.
    pub fn new(device: &wgpu::Device) -> Self {
        let workgroup_size = max_workgroup_size(&device.limits());
        log::debug!("Building intersection kernel with work-group size {workgroup_size}");

        let bind_group_layout =
            device.create_bind_group_layout(&Self::BIND_GROUP_LAYOUT_DESCRIPTOR);

        let source = Self::SHADER.replace(
            Self::WORKGROUP_SIZE_MARKER,
            workgroup_size.to_string().as_str(),
        );
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{} Shader", Self::LABEL).as_str()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(format!("{} Pipeline Layout", Self::LABEL).as_str()),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(format!("{} Pipeline", Self::LABEL).as_str()),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::info!("Intersector created");

        Self {
            bind_group_layout,
            pipeline,
            workgroup_size,
        }
    }

    /// Get the number of invocations in one work-group.
    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Get the number of work-groups dispatched for `triangle_count`
    /// triangles.
    pub fn group_count(&self, triangle_count: u32) -> u32 {
        triangle_count.div_ceil(self.workgroup_size)
    }

    /// Get the bind group layout.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Create the bind group for one mesh's dispatch.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        ray: &RayBuffer,
        mesh_info: &wgpu::Buffer,
        positions: &wgpu::Buffer,
        indices: &wgpu::Buffer,
        group_hits: &GroupHitsBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Intersector Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                // Ray uniform buffer
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ray.buffer().as_entire_binding(),
                },
                // Mesh info uniform buffer
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: mesh_info.as_entire_binding(),
                },
                // Vertex position storage buffer
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: positions.as_entire_binding(),
                },
                // Index storage buffer
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: indices.as_entire_binding(),
                },
                // Group hits storage buffer
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: group_hits.buffer().as_entire_binding(),
                },
            ],
        })
    }

    /// Dispatch the kernel for one mesh.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        group_count: u32,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(format!("{} Compute Pass", Self::LABEL).as_str()),
            timestamp_writes: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(group_count, 1, 1);
    }
}

/// The largest power-of-two work-group size the device supports.
fn max_workgroup_size(limits: &wgpu::Limits) -> u32 {
    let max = limits
        .max_compute_invocations_per_workgroup
        .min(limits.max_compute_workgroup_size_x)
        .max(1);

    // Round down to a power of two for the tree reduction.
    1 << (u32::BITS - 1 - max.leading_zeros())
}
