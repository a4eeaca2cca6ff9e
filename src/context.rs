//! The wgpu renderer.
//!
//! [`GpuRenderer`] draws a [`Scene`] into a window surface or, for tests, into an
//! offscreen texture. Geometry and materials are uploaded the first time a node
//! using them is drawn and stay on the GPU until released by id.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context as _;
use cgmath::Matrix4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::PerspectiveCamera,
    data_structures::{
        geometry::{Geometry, GeometryId, Material, MaterialId},
        scene_graph::{NodeKind, Scene},
        texture::{self, Texture},
        transform::TransformRaw,
    },
    error::RenderError,
    pipelines::{light, scene as scene_pipeline},
    renderer::Renderer,
};

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

impl GpuGeometry {
    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

struct GpuMaterial {
    buffer: wgpu::Buffer,
    texture: Option<Texture>,
    bind_group: wgpu::BindGroup,
}

impl GpuMaterial {
    fn destroy(&self) {
        self.buffer.destroy();
        if let Some(texture) = &self.texture {
            texture.destroy();
        }
    }
}

struct NodeSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Raised by wgpu's device-lost callback and checked before every frame.
#[derive(Clone, Debug, Default)]
struct DeviceLoss(Arc<AtomicBool>);

impl DeviceLoss {
    fn callback(&self) -> impl Fn(wgpu::DeviceLostReason, String) + Send + 'static {
        let lost = self.0.clone();
        move |reason, message| {
            log::error!("graphics device lost ({:?}): {}", reason, message);
            lost.store(true, Ordering::SeqCst);
        }
    }

    fn check(&self) -> Result<(), RenderError> {
        if self.0.load(Ordering::SeqCst) {
            Err(RenderError::DeviceLost)
        } else {
            Ok(())
        }
    }
}

enum Target {
    Window {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        configured: bool,
    },
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    },
}

pub struct GpuRenderer {
    target: Target,
    device: wgpu::Device,
    queue: wgpu::Queue,
    depth_texture: Texture,
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    node_layout: wgpu::BindGroupLayout,
    white: Texture,
    sampler: wgpu::Sampler,
    default_material: GpuMaterial,
    geometries: HashMap<GeometryId, GpuGeometry>,
    materials: HashMap<MaterialId, GpuMaterial>,
    node_slots: Vec<NodeSlot>,
    clear_colour: wgpu::Color,
    pixel_ratio: f64,
    device_loss: DeviceLoss,
    disposed: bool,
}

impl GpuRenderer {
    /// Creates a renderer drawing into `window`.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = mk_instance();
        let surface = instance
            .create_surface(window.clone())
            .context("cannot create a surface for the window")?;
        let (device, queue, adapter) = request_device(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders assume an sRGB surface; anything else comes out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        // AR passes the camera feed through transparent pixels.
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let configured = size.width > 0 && size.height > 0;
        if configured {
            surface.configure(&device, &config);
        }

        let target = Target::Window {
            window,
            surface,
            config,
            configured,
        };
        Ok(Self::with_target(device, queue, target, surface_format))
    }

    /// Creates a renderer drawing into an offscreen texture of `width` x `height`.
    pub async fn offscreen(width: u32, height: u32) -> anyhow::Result<Self> {
        let instance = mk_instance();
        let (device, queue, _) = request_device(&instance, None).await?;
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let size = (width.max(1), height.max(1));
        let texture = mk_offscreen_texture(&device, format, size);
        let target = Target::Offscreen {
            texture,
            format,
            size,
        };
        Ok(Self::with_target(device, queue, target, format))
    }

    fn with_target(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: Target,
        format: wgpu::TextureFormat,
    ) -> Self {
        let device_loss = DeviceLoss::default();
        device.set_device_lost_callback(device_loss.callback());

        let frame_layout = light::mk_bind_group_layout(&device);
        let material_layout = scene_pipeline::material_layout(&device);
        let node_layout = scene_pipeline::node_layout(&device);
        let pipeline = scene_pipeline::mk_scene_pipeline(
            &device,
            format,
            &frame_layout,
            &material_layout,
            &node_layout,
        );

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<light::FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = light::mk_bind_group(&device, &frame_layout, &frame_buffer);

        let white = Texture::create_white(&device, &queue);
        let sampler = texture::create_default_sampler(&device);
        let (buffer, bind_group) = scene_pipeline::mk_material_bind_group(
            &device,
            &material_layout,
            &Material::default(),
            &white,
            &sampler,
        );
        let default_material = GpuMaterial {
            buffer,
            texture: None,
            bind_group,
        };

        let (width, height) = target_size(&target);
        let depth_texture = Texture::create_depth_texture(&device, [width, height], "depth_texture");

        Self {
            target,
            device,
            queue,
            depth_texture,
            pipeline,
            frame_buffer,
            frame_bind_group,
            material_layout,
            node_layout,
            white,
            sampler,
            default_material,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            node_slots: Vec::new(),
            clear_colour: wgpu::Color::BLACK,
            pixel_ratio: 1.0,
            device_loss,
            disposed: false,
        }
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.target {
            Target::Window { window, .. } => Some(window),
            Target::Offscreen { .. } => None,
        }
    }

    pub fn uploaded_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn uploaded_materials(&self) -> usize {
        self.materials.len()
    }

    fn upload_geometry(&mut self, geometry: &Geometry) {
        if self.geometries.contains_key(&geometry.id()) {
            return;
        }
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.geometries.insert(
            geometry.id(),
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                num_elements: geometry.indices.len() as u32,
            },
        );
    }

    fn upload_material(&mut self, material: &Material) {
        if self.materials.contains_key(&material.id()) {
            return;
        }
        let texture = material.texture.as_ref().map(|img| {
            Texture::from_image_data(&self.device, &self.queue, img, Some("material texture"))
        });
        let (buffer, bind_group) = scene_pipeline::mk_material_bind_group(
            &self.device,
            &self.material_layout,
            material,
            texture.as_ref().unwrap_or(&self.white),
            &self.sampler,
        );
        self.materials.insert(
            material.id(),
            GpuMaterial {
                buffer,
                texture,
                bind_group,
            },
        );
    }

    fn ensure_node_slots(&mut self, count: usize) {
        while self.node_slots.len() < count {
            let (buffer, bind_group) =
                scene_pipeline::mk_node_bind_group(&self.device, &self.node_layout);
            self.node_slots.push(NodeSlot { buffer, bind_group });
        }
    }

    fn configure(&mut self) {
        if let Target::Window {
            surface,
            config,
            configured,
            ..
        } = &mut self.target
        {
            surface.configure(&self.device, config);
            *configured = true;
        }
    }

    fn acquire(&mut self) -> Result<Option<(wgpu::TextureView, Option<wgpu::SurfaceTexture>)>, RenderError> {
        match &self.target {
            Target::Window {
                configured: false, ..
            } => Ok(None),
            Target::Window { surface, .. } => match surface.get_current_texture() {
                Ok(output) => {
                    let view = output
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(Some((view, Some(output))))
                }
                Err(e) => {
                    let err = RenderError::from(e);
                    if err == RenderError::Outdated {
                        self.configure();
                    }
                    Err(err)
                }
            },
            Target::Offscreen { texture, .. } => Ok(Some((
                texture.create_view(&wgpu::TextureViewDescriptor::default()),
                None,
            ))),
        }
    }

    /// Copies the offscreen target back to the CPU as tightly packed RGBA rows.
    #[cfg(feature = "integration-tests")]
    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        let Target::Offscreen {
            texture,
            size: (width, height),
            ..
        } = &self.target
        else {
            anyhow::bail!("only offscreen renderers can be read back");
        };
        let (width, height) = (*width, *height);
        // copies need rows aligned to 256 bytes
        let padded_row = (4 * width).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures::channel::oneshot::channel();
        let slice = output_buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(std::time::Duration::from_secs(3)),
            })
            .context("device poll failed")?;
        rx.await.context("readback was cancelled")??;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((4 * width * height) as usize);
        for row in data.chunks(padded_row as usize) {
            pixels.extend_from_slice(&row[..(4 * width) as usize]);
        }
        drop(data);
        output_buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong size")
    }
}

impl Renderer for GpuRenderer {
    fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.pixel_ratio = pixel_ratio;
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.disposed {
            return;
        }
        match &mut self.target {
            Target::Window { config, .. } => {
                config.width = width;
                config.height = height;
                self.configure();
            }
            Target::Offscreen {
                texture,
                format,
                size,
            } => {
                texture.destroy();
                *texture = mk_offscreen_texture(&self.device, *format, (width, height));
                *size = (width, height);
            }
        }
        self.depth_texture.destroy();
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
    }

    fn size(&self) -> (u32, u32) {
        target_size(&self.target)
    }

    fn set_clear_colour(&mut self, colour: wgpu::Color) {
        self.clear_colour = colour;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Uninitialised(
                "renderer was disposed".to_string(),
            ));
        }
        self.device_loss.check()?;

        let mut draws: Vec<(Matrix4<f32>, &Geometry, Option<&Material>)> = Vec::new();
        scene.traverse(|node, world| {
            if let NodeKind::Mesh {
                geometry,
                materials,
            } = &node.kind
            {
                draws.push((*world, geometry, materials.first()));
            }
        });
        for (_, geometry, material) in &draws {
            self.upload_geometry(geometry);
            if let Some(material) = material {
                self.upload_material(material);
            }
        }
        self.ensure_node_slots(draws.len());

        let Some((view, output)) = self.acquire()? else {
            return Ok(());
        };

        let frame_uniform = light::FrameUniform::new(camera, &scene.lights());
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame_uniform]));
        for ((world, _, _), slot) in draws.iter().zip(&self.node_slots) {
            self.queue.write_buffer(
                &slot.buffer,
                0,
                bytemuck::cast_slice(&[TransformRaw::from_world(world)]),
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
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
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for ((_, geometry, material), slot) in draws.iter().zip(&self.node_slots) {
                let Some(gpu_geometry) = self.geometries.get(&geometry.id()) else {
                    continue;
                };
                let gpu_material = material
                    .and_then(|material| self.materials.get(&material.id()))
                    .unwrap_or(&self.default_material);
                render_pass.set_bind_group(1, &gpu_material.bind_group, &[]);
                render_pass.set_bind_group(2, &slot.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu_geometry.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(gpu_geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu_geometry.num_elements, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }

    fn release_geometry(&mut self, geometry: GeometryId) -> bool {
        match self.geometries.remove(&geometry) {
            Some(gpu) => {
                gpu.destroy();
                true
            }
            None => false,
        }
    }

    fn release_material(&mut self, material: MaterialId) -> bool {
        match self.materials.remove(&material) {
            Some(gpu) => {
                gpu.destroy();
                true
            }
            None => false,
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.geometries.drain().for_each(|(_, gpu)| gpu.destroy());
        self.materials.drain().for_each(|(_, gpu)| gpu.destroy());
        self.node_slots
            .drain(..)
            .for_each(|slot| slot.buffer.destroy());
        self.default_material.destroy();
        self.frame_buffer.destroy();
        self.white.destroy();
        self.depth_texture.destroy();
        if let Target::Offscreen { texture, .. } = &self.target {
            texture.destroy();
        }
        self.disposed = true;
        log::info!("renderer disposed");
    }
}

fn mk_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::GL,
        ..Default::default()
    })
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue, wgpu::Adapter)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("no suitable graphics adapter")?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await
        .context("cannot open the graphics device")?;
    Ok((device, queue, adapter))
}

fn mk_offscreen_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

fn target_size(target: &Target) -> (u32, u32) {
    match target {
        Target::Window { config, .. } => (config.width, config.height),
        Target::Offscreen { size, .. } => *size,
    }
}
