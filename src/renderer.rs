// Renderer module: wgpu backend and the window event loop

use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::app::Application;
use crate::camera::Camera;
use crate::error::RenderError;
use crate::input::InputState;
use crate::light::Light;
use crate::model::{Model, ModelId, ModelRegistry, TextureData};
use crate::scene::RenderBackend;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// Vertex layout shared by every model
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    tex_coord: [f32; 2],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

fn vertices(model: &Model) -> Vec<Vertex> {
    let mesh = &model.mesh;
    mesh.positions
        .iter()
        .zip(&mesh.tex_coords)
        .zip(&mesh.normals)
        .map(|((position, tex_coord), normal)| Vertex {
            position: position.to_array(),
            tex_coord: tex_coord.to_array(),
            normal: normal.to_array(),
        })
        .collect()
}

// Per-draw uniforms; mirrors `Instance` in shader.wgsl
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceUniforms {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    camera_position: [f32; 4],
    material_ambient: [f32; 4],
    material_diffuse: [f32; 4],
    material_specular: [f32; 4],
    light_position: [f32; 4],
    light_diffuse: [f32; 4],
    light_specular: [f32; 4],
    light_ambient: [f32; 4],
    params: [f32; 4],
}

impl InstanceUniforms {
    fn new(model: &Model, world: Mat4, camera: &Camera, light: &Light) -> Self {
        let material = &model.material;
        Self {
            model: world.to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            projection: camera.projection().to_cols_array_2d(),
            normal_matrix: normal_matrix(world).to_cols_array_2d(),
            camera_position: camera.position().extend(1.0).to_array(),
            material_ambient: material.ambient.to_array(),
            material_diffuse: material.diffuse.to_array(),
            material_specular: material.specular.to_array(),
            light_position: light.position.extend(1.0).to_array(),
            light_diffuse: light.diffuse.to_array(),
            light_specular: light.specular.to_array(),
            light_ambient: light.ambient.to_array(),
            params: Vec4::new(material.shininess, light.attenuation, 0.0, 0.0).to_array(),
        }
    }
}

/// Inverse transpose of the world matrix, or identity when it is singular.
fn normal_matrix(world: Mat4) -> Mat4 {
    if world.determinant().abs() < 1e-6 {
        Mat4::IDENTITY
    } else {
        world.inverse().transpose()
    }
}

fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// Collects draw calls during traversal; the GPU work happens afterwards in one pass.
struct FrameRecorder<'a> {
    models: &'a ModelRegistry,
    draws: Vec<(ModelId, InstanceUniforms)>,
}

impl RenderBackend for FrameRecorder<'_> {
    fn draw(&mut self, model: ModelId, world: Mat4, camera: &Camera, light: &Light) {
        let data = self
            .models
            .get(model)
            .unwrap_or_else(|| panic!("scene references unknown model {model:?}"));
        self.draws
            .push((model, InstanceUniforms::new(data, world, camera, light)));
    }
}

struct GpuModel {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    // Shared by every model using the same texture; freed with the last one.
    texture_bind_group: Rc<wgpu::BindGroup>,
}

/// Growable uniform buffer addressed with dynamic offsets.
struct InstanceBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, stride: u64, capacity: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Uniform Buffer"),
            size: stride * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Instance Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<InstanceUniforms>() as u64),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity: capacity.max(1),
        }
    }
}

pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    instance_layout: wgpu::BindGroupLayout,
    instances: InstanceBuffer,
    models: Vec<GpuModel>,
    app: Application,
    input: InputState,
    last_frame: Instant,
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<()>, app: Application) -> Result<Self, RenderError> {
        let config = app.config();
        // Create window with Arc for shared ownership
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Robot")
                .with_inner_size(PhysicalSize::new(config.window_width, config.window_height))
                .build(event_loop)
                .map_err(|e| RenderError::Window(e.to_string()))?,
        );

        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("wgpu error: {error}");
            panic!("unrecoverable render backend error: {error}");
        }));

        // Get surface capabilities
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        configure_surface(&surface, &adapter, &device, surface_format, size);
        let depth_view = create_depth_view(&device, size);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let instance_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Instance Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<InstanceUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&instance_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Room walls are seen from inside, so both faces are drawn.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let models = upload_models(&device, &queue, &texture_layout, app.models());
        log::info!("uploaded {} models to the GPU", models.len());

        let stride = aligned_stride(
            std::mem::size_of::<InstanceUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let instances = InstanceBuffer::new(&device, &instance_layout, stride, models.len());

        let mut app = app;
        app.resize(size.width, size.height);

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            surface_format,
            pipeline,
            depth_view,
            instance_layout,
            instances,
            models,
            app,
            input: InputState::new(),
            last_frame: Instant::now(),
        })
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<(), RenderError> {
        self.grab_cursor();
        self.last_frame = Instant::now();

        event_loop
            .run(move |event, target| {
                target.set_control_flow(ControlFlow::Poll);

                match event {
                    Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                        self.handle_window_event(event, target);
                    }
                    Event::DeviceEvent {
                        event: DeviceEvent::MouseMotion { delta },
                        ..
                    } => {
                        self.input.on_pointer_moved(delta.0 as f32, delta.1 as f32);
                    }
                    Event::AboutToWait => {
                        self.window.request_redraw();
                    }
                    _ => {}
                }
            })
            .map_err(|e| RenderError::Window(e.to_string()))
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::Resized(physical_size) => self.resize(physical_size),
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event),
            WindowEvent::RedrawRequested => {
                if !self.update() {
                    target.exit();
                    return;
                }
                if !self.render() {
                    target.exit();
                }
            }
            _ => {}
        }
    }

    fn grab_cursor(&self) {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grabbed {
            log::warn!("could not grab cursor: {e}");
        }
        self.window.set_cursor_visible(false);
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        configure_surface(&self.surface, &self.adapter, &self.device, self.surface_format, new_size);
        self.depth_view = create_depth_view(&self.device, new_size);
        self.app.resize(new_size.width, new_size.height);
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        if let PhysicalKey::Code(keycode) = event.physical_key {
            let is_pressed = event.state == ElementState::Pressed;
            self.input.on_key(keycode, is_pressed, event.repeat);
        }
    }

    /// Applies this frame's input. Returns `false` once exit was requested.
    fn update(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        for action in self.input.take_actions() {
            if !self.app.handle_action(action) {
                return false;
            }
        }
        let snapshot = self.input.take_snapshot();
        self.app.update(elapsed, &snapshot);
        true
    }

    /// Draws one frame. Returns `false` on an unrecoverable surface error.
    fn render(&mut self) -> bool {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.resize(self.window.inner_size());
                return true;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the next frame");
                return true;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                return false;
            }
        };

        let mut recorder = FrameRecorder {
            models: self.app.models(),
            draws: Vec::with_capacity(self.models.len()),
        };
        self.app.render(&mut recorder);
        let draws = recorder.draws;

        if draws.len() > self.instances.capacity {
            self.instances = InstanceBuffer::new(
                &self.device,
                &self.instance_layout,
                self.instances.stride,
                draws.len(),
            );
        }
        let stride = self.instances.stride as usize;
        let mut staging = vec![0u8; stride * draws.len()];
        for (slot, (_, uniforms)) in staging.chunks_exact_mut(stride).zip(&draws) {
            let bytes = bytemuck::bytes_of(uniforms);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.instances.buffer, 0, &staging);

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
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
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for (slot, (model, _)) in draws.iter().enumerate() {
                let gpu = &self.models[model.index()];
                let offset = (slot * stride) as wgpu::DynamicOffset;
                render_pass.set_bind_group(0, &self.instances.bind_group, &[offset]);
                render_pass.set_bind_group(1, &gpu.texture_bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        true
    }
}

fn configure_surface(
    surface: &wgpu::Surface<'static>,
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
) {
    let surface_caps = surface.get_capabilities(adapter);
    surface.configure(
        device,
        &wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        },
    );
}

fn create_depth_view(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    data: &TextureData,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Model Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Model Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Texture Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

/// GPU resources created once per decoded texture, matched by `Rc` identity.
struct TextureResources<V> {
    entries: Vec<(Rc<TextureData>, Rc<V>)>,
}

impl<V> TextureResources<V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn get_or_create(&mut self, texture: &Rc<TextureData>, create: impl FnOnce() -> V) -> Rc<V> {
        if let Some((_, resource)) = self
            .entries
            .iter()
            .find(|(known, _)| Rc::ptr_eq(known, texture))
        {
            return Rc::clone(resource);
        }
        let resource = Rc::new(create());
        self.entries.push((Rc::clone(texture), Rc::clone(&resource)));
        resource
    }
}

/// Uploads every model, in registry order so `ModelId` indexes the result.
fn upload_models(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture_layout: &wgpu::BindGroupLayout,
    registry: &ModelRegistry,
) -> Vec<GpuModel> {
    let white = Rc::new(create_texture_bind_group(
        device,
        queue,
        texture_layout,
        &TextureData::white(),
    ));
    let mut shared = TextureResources::new();

    registry
        .iter()
        .map(|(_, model)| {
            let texture_bind_group = match &model.texture {
                Some(texture) => shared.get_or_create(texture, || {
                    create_texture_bind_group(device, queue, texture_layout, texture)
                }),
                None => Rc::clone(&white),
            };

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", model.name)),
                contents: bytemuck::cast_slice(&vertices(model)),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", model.name)),
                contents: bytemuck::cast_slice(&model.mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            GpuModel {
                vertex_buffer,
                index_buffer,
                index_count: model.mesh.indices.len() as u32,
                texture_bind_group,
            }
        })
        .collect()
}
