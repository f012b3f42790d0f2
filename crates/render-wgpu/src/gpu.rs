use crate::camera::CameraUniforms;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use noisetorus_common::PixelSize;
use noisetorus_scene::{BackendError, Mesh, TorusVertex, UniformSet};
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Material block as laid out in the `Material` WGSL struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub color: [f32; 3],
    pub light_intensity: f32,
    pub light_pos: [f32; 3],
    pub noise_coef: f32,
    pub light_color: [f32; 3],
    pub noise_min: f32,
    pub noise_max: f32,
    pub noise_scale: f32,
    _pad: [f32; 2],
}

impl From<&UniformSet> for MaterialUniforms {
    fn from(u: &UniformSet) -> Self {
        Self {
            color: u.color().to_linear().to_array(),
            light_intensity: u.light_intensity(),
            light_pos: u.light_pos().to_array(),
            noise_coef: u.noise_coef(),
            light_color: u.light_color().to_linear().to_array(),
            noise_min: u.noise_min(),
            noise_max: u.noise_max(),
            noise_scale: u.noise_scale(),
            _pad: [0.0; 2],
        }
    }
}

/// GPU resources for the displaced torus: pipeline, buffers, and the
/// depth/multisample targets sized to the surface.
pub struct TorusRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
    uploaded_revision: Option<u64>,
}

impl TorusRenderer {
    /// Compile the noise material and upload the mesh.
    ///
    /// Validation errors raised by the driver while the shaders and pipeline
    /// are created are captured and returned instead of aborting.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        size: PixelSize,
        mesh: &Mesh,
    ) -> Result<Self, BackendError> {
        let vertex_src = shaders::vertex_source().map_err(|e| shader_error("noise_vertex", e))?;
        let fragment_src =
            shaders::fragment_source().map_err(|e| shader_error("noise_fragment", e))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&CameraUniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                eye: [0.0, 0.0, 0.0, 1.0],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let material = &mesh.material.uniforms;
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("material_buffer"),
            contents: bytemuck::bytes_of(&MaterialUniforms::from(material)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("torus_bind_group_layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("torus_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: material_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("torus_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("noise_vertex"),
            source: wgpu::ShaderSource::Wgsl(vertex_src.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("noise_fragment"),
            source: wgpu::ShaderSource::Wgsl(fragment_src.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("torus_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TorusVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });

        let data = mesh.geometry.build();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("torus_vertex_buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("torus_index_buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BackendError::ShaderCompilation {
                label: "torus_pipeline".into(),
                message: err.to_string(),
            });
        }

        tracing::debug!(
            vertices = data.vertices.len(),
            indices = data.indices.len(),
            sample_count,
            "torus pipeline ready"
        );

        Ok(Self {
            pipeline,
            camera_buffer,
            material_buffer,
            bind_group,
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            depth_view: create_target(device, "depth_texture", DEPTH_FORMAT, size, sample_count),
            msaa_view: (sample_count > 1).then(|| {
                create_target(device, "msaa_texture", surface_format, size, sample_count)
            }),
            surface_format,
            sample_count,
            uploaded_revision: Some(material.revision()),
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PixelSize) {
        self.depth_view = create_target(
            device,
            "depth_texture",
            DEPTH_FORMAT,
            size,
            self.sample_count,
        );
        if self.sample_count > 1 {
            self.msaa_view = Some(create_target(
                device,
                "msaa_texture",
                self.surface_format,
                size,
                self.sample_count,
            ));
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Write the camera block, and the material block if its revision moved.
    pub fn upload(&mut self, queue: &wgpu::Queue, camera: &CameraUniforms, uniforms: &UniformSet) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        if self.uploaded_revision != Some(uniforms.revision()) {
            queue.write_buffer(
                &self.material_buffer,
                0,
                bytemuck::bytes_of(&MaterialUniforms::from(uniforms)),
            );
            self.uploaded_revision = Some(uniforms.revision());
            tracing::trace!(revision = uniforms.revision(), "material uniforms uploaded");
        }
    }

    /// Record the torus pass into `encoder`, clearing `target` first.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(target)),
            None => (target, None),
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("torus_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Clear-only pass for frames with nothing prepared to draw.
pub fn encode_clear(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    clear: wgpu::Color,
) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("clear_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
}

fn shader_error(label: &str, err: shaders::ShaderError) -> BackendError {
    BackendError::ShaderCompilation {
        label: label.to_string(),
        message: err.to_string(),
    }
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: PixelSize,
    sample_count: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
