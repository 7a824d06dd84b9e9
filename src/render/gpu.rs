//! wgpu implementation of [`TexturePresenter`].

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{self, SurfaceError};

use crate::error::Error;
use crate::processing::decode::PaddedPixelBuffer;
use crate::processing::layout::{ImageGeometry, ScreenGeometry};
use crate::render::presenter::TexturePresenter;
use crate::render::window::KioskWindow;
use crate::slots::SlotId;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

// Texture row 0 is the top scanline, so v grows downward.
const QUAD: [Vertex; 4] = [
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

/// Matches `struct Slide` in `slide.wgsl` (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct SlideUniform {
    extent: [f32; 2],
    sample_extent: [f32; 2],
    color: [f32; 4],
}

impl SlideUniform {
    #[allow(clippy::cast_possible_truncation)]
    fn from_geometry(geometry: &ImageGeometry) -> Self {
        Self {
            extent: [
                geometry.vertex_half_width as f32,
                geometry.vertex_half_height as f32,
            ],
            sample_extent: [
                geometry.sample_width_fraction as f32,
                geometry.sample_height_fraction as f32,
            ],
            color: [0.0; 4],
        }
    }
}

// Slot textures and the render target are both non-sRGB, so opacity
// scaling and blending act on the stored gamma-encoded values.
const SLIDE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Surface format to configure and the view format to render through.
///
/// A non-sRGB surface format is preferred. Failing that, the first format
/// is used and rendered through its non-sRGB view.
fn pick_surface_formats(
    available: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, wgpu::TextureFormat)> {
    let encoded = available.iter().copied().find(|format| !format.is_srgb());
    let surface = encoded.or_else(|| available.first().copied())?;
    Some((surface, surface.remove_srgb_suffix()))
}

// src * 1 + dst * 1 on every channel.
const ADDITIVE: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
};

struct SlotTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

struct SlotState {
    uniform_buf: wgpu::Buffer,
    uniform: SlideUniform,
    texture: Option<SlotTexture>,
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Draws two persistent slot textures into a fullscreen surface.
pub struct GpuPresenter {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    view_format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vbuf: wgpu::Buffer,
    slots: [SlotState; 2],
    frame: Option<Frame>,
    // dropped after the surface
    window: KioskWindow,
}

impl GpuPresenter {
    /// Bring up the GPU against `window`'s surface.
    pub fn new(window: KioskWindow) -> Result<Self, Error> {
        init(window).map_err(Error::Display)
    }

    /// Screen size as reported by the window at startup.
    #[must_use]
    pub fn screen_geometry(&self) -> ScreenGeometry {
        self.window.screen_geometry()
    }

    /// Largest texture width or height the device accepts.
    #[must_use]
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(
            width = self.config.width,
            height = self.config.height,
            "surface reconfigured"
        );
    }

    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, Error> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("surface lost; reconfiguring");
                self.reconfigure(self.config.width, self.config.height);
                Ok(None)
            }
            Err(SurfaceError::OutOfMemory) => {
                Err(Error::Display(anyhow!("surface out of memory")))
            }
            Err(SurfaceError::Timeout) => {
                warn!("surface acquisition timed out");
                Ok(None)
            }
            Err(SurfaceError::Other) => {
                warn!("surface reported an unknown error; reconfiguring");
                self.reconfigure(self.config.width, self.config.height);
                Ok(None)
            }
        }
    }

    fn ensure_texture(&mut self, slot: SlotId, width: u32, height: u32) {
        let state = &mut self.slots[slot.index()];
        if state
            .texture
            .as_ref()
            .is_some_and(|tex| tex.width == width && tex.height == height)
        {
            return;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("slide-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SLIDE_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("slide-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: state.uniform_buf.as_entire_binding(),
                },
            ],
        });
        debug!(%slot, width, height, "allocated slot texture");
        state.texture = Some(SlotTexture {
            texture,
            bind_group,
            width,
            height,
        });
    }
}

impl TexturePresenter for GpuPresenter {
    fn upload(
        &mut self,
        slot: SlotId,
        geometry: &ImageGeometry,
        pixels: PaddedPixelBuffer,
    ) -> Result<(), Error> {
        let (width, height) = (pixels.width(), pixels.height());
        let max = self.max_texture_dimension();
        if width > max || height > max {
            return Err(Error::Upload {
                slot,
                reason: format!("{width}x{height} exceeds the {max}px texture limit"),
            });
        }

        self.ensure_texture(slot, width, height);
        let rgba = pixels.to_rgba8();
        drop(pixels);

        let state = &mut self.slots[slot.index()];
        let Some(tex) = state.texture.as_ref() else {
            return Err(Error::Upload {
                slot,
                reason: "texture was not allocated".into(),
            });
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.queue.write_texture(
            tex.texture.as_image_copy(),
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Upload {
                slot,
                reason: err.to_string(),
            });
        }

        state.uniform = SlideUniform::from_geometry(geometry);
        debug!(%slot, width, height, "uploaded slot texture");
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), Error> {
        let Some(surface_texture) = self.acquire()? else {
            self.frame = None;
            return Ok(());
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.view_format),
                ..Default::default()
            });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slide-clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slide-clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.frame = Some(Frame {
            surface_texture,
            view,
        });
        Ok(())
    }

    fn draw(&mut self, slot: SlotId, opacity: f32) -> Result<(), Error> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        let state = &mut self.slots[slot.index()];
        let Some(tex) = state.texture.as_ref() else {
            debug!(%slot, "skipping draw of empty slot");
            return Ok(());
        };

        let opacity = opacity.clamp(0.0, 1.0);
        state.uniform.color = [opacity; 4];
        self.queue
            .write_buffer(&state.uniform_buf, 0, bytemuck::bytes_of(&state.uniform));

        // One submission per draw so each sees its own uniform write.
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slide-draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slide-draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &tex.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vbuf.slice(..));
            pass.draw(0..4, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), Error> {
        if let Some(frame) = self.frame.take() {
            frame.surface_texture.present();
        }
        self.poll()
    }

    fn poll(&mut self) -> Result<(), Error> {
        if let Some(size) = self.window.pump()? {
            self.reconfigure(size.width, size.height);
        }
        Ok(())
    }
}

fn init(window: KioskWindow) -> anyhow::Result<GpuPresenter> {
    let native = window.window()?;
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(native.clone())
        .context("failed to create surface")?;
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .context("failed to acquire GPU adapter")?;

    let caps = surface.get_capabilities(&adapter);
    let (format, view_format) =
        pick_surface_formats(&caps.formats).context("surface reports no texture formats")?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let limits = adapter.limits();
    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("slideshow-device"),
        required_features: wgpu::Features::empty(),
        required_limits: limits,
        memory_hints: wgpu::MemoryHints::default(),
        trace: wgpu::Trace::default(),
    }))
    .context("failed to acquire GPU device")?;

    let size = native.inner_size();
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: if view_format == format { vec![] } else { vec![view_format] },
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);
    info!(
        width = config.width,
        height = config.height,
        format = ?config.format,
        view_format = ?view_format,
        max_texture = device.limits().max_texture_dimension_2d,
        "surface configured",
    );

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("slide-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("slide-quad"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let make_slot = |label: &str| SlotState {
        uniform_buf: device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<SlideUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }),
        uniform: SlideUniform::default(),
        texture: None,
    };
    let slots = [make_slot("slide-uniform-first"), make_slot("slide-uniform-second")];

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("slide-bind-layout"),
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
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("slide-shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/slide.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("slide-pipeline-layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });
    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("slide-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: view_format,
                blend: Some(wgpu::BlendState {
                    color: ADDITIVE,
                    alpha: ADDITIVE,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Ok(GpuPresenter {
        surface,
        device,
        queue,
        config,
        view_format,
        pipeline,
        bind_layout,
        sampler,
        vbuf,
        slots,
        frame: None,
        window,
    })
}
