use std::sync::{Arc, Mutex, PoisonError};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::GpuError;
use crate::gpu::backend::{BufferUsage, EntityBindings, FrameCommands, GpuBackend};
use crate::gpu::render_config::{RenderConfig, begin_sprite_pass};

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

enum PresentTarget {
    Surface {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// A texture acquired for one tick, presented after the frame is submitted.
pub struct WgpuFrame {
    view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    render_config: RenderConfig,
    target: PresentTarget,
    lost: Arc<Mutex<Option<String>>>,
}

impl WgpuBackend {
    /// Device and surface for an on-screen window.
    pub async fn for_window(window: Arc<Window>, vsync: bool) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::AdapterUnavailable(e.to_string()))?;
        let (device, queue) = request_device(&adapter).await?;

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(GpuError::NoSurfaceFormat)?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            surface_format,
            config.present_mode
        );

        Ok(Self::assemble(
            device,
            queue,
            surface_format,
            PresentTarget::Surface {
                window,
                surface,
                config,
            },
        ))
    }

    /// Device rendering into an offscreen texture of the given size.
    pub async fn headless(width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|e| GpuError::AdapterUnavailable(e.to_string()))?;
        let (device, queue) = request_device(&adapter).await?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        Ok(Self::assemble(
            device,
            queue,
            OFFSCREEN_FORMAT,
            PresentTarget::Offscreen { texture },
        ))
    }

    fn assemble(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        target: PresentTarget,
    ) -> Self {
        let lost = Arc::new(Mutex::new(None));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            record_device_loss(&flag, reason, message);
        });
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("Uncaptured wgpu error: {error}");
        }));

        let render_config = RenderConfig::new(&device, surface_format);

        Self {
            device,
            queue,
            render_config,
            target,
            lost,
        }
    }

    /// Reconfigures the surface. Buffers and pipelines are left alone.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let PresentTarget::Surface {
            surface, config, ..
        } = &mut self.target
        {
            config.width = width;
            config.height = height;
            surface.configure(&self.device, config);
        }
    }

    fn check_device(&self) -> Result<(), GpuError> {
        match self
            .lost
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(reason) => Err(GpuError::DeviceLost(reason.clone())),
            None => Ok(()),
        }
    }

    /// Runs `work` inside validation and out-of-memory error scopes and
    /// returns whatever either scope caught.
    fn capture_errors<T>(&self, work: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = work(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(out_of_memory))
    }

    fn scoped<T>(&self, label: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, GpuError> {
        self.check_device()?;
        match self.capture_errors(create) {
            (_, Some(error)) => Err(GpuError::Allocation {
                label: label.to_owned(),
                message: error.to_string(),
            }),
            (value, None) => Ok(value),
        }
    }
}

/// Device-lost callback body. Dropping a device on rebuild reports
/// `Destroyed`; only other reasons mark the device as lost.
fn record_device_loss(lost: &Mutex<Option<String>>, reason: wgpu::DeviceLostReason, message: String) {
    if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
        log::debug!("Device destroyed: {message}");
        return;
    }
    log::error!("Device lost ({reason:?}): {message}");
    *lost.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let info = adapter.get_info();
    log::info!("Using adapter {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Gravity Sprites Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    Ok((device, queue))
}

fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    match usage {
        BufferUsage::Kinematic => {
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC
        }
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
        BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type BindGroup = wgpu::BindGroup;
    type ComputePipeline = wgpu::ComputePipeline;
    type RenderPipeline = wgpu::RenderPipeline;
    type Target = WgpuFrame;

    fn create_buffer(&self, label: &str, contents: &[u8], usage: BufferUsage) -> Result<wgpu::Buffer, GpuError> {
        self.scoped(label, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: buffer_usages(usage),
            })
        })
    }

    fn buffer_size(&self, buffer: &wgpu::Buffer) -> u64 {
        buffer.size()
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn read_buffer(&self, buffer: &wgpu::Buffer) -> Result<Vec<u8>, GpuError> {
        self.check_device()?;
        let size = buffer.size();
        let staging = self.scoped("Readback Staging Buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Readback Staging Buffer"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        pollster::block_on(receiver)
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }

    fn create_compute_pipeline(&self) -> Result<wgpu::ComputePipeline, GpuError> {
        self.scoped("Update Entities Pipeline", |device| {
            self.render_config.create_compute_pipeline(device)
        })
    }

    fn create_render_pipeline(&self) -> Result<wgpu::RenderPipeline, GpuError> {
        self.scoped("Sprite Pipeline", |device| {
            self.render_config.create_render_pipeline(device)
        })
    }

    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
        bindings: EntityBindings<'_, wgpu::Buffer>,
    ) -> Result<wgpu::BindGroup, GpuError> {
        let kinematic_size = wgpu::BufferSize::new(bindings.kinematic_len);
        self.scoped(label, |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &pipeline.get_bind_group_layout(0),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: bindings.params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: bindings.previous,
                            offset: 0,
                            size: kinematic_size,
                        }),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: bindings.next,
                            offset: 0,
                            size: kinematic_size,
                        }),
                    },
                ],
            })
        })
    }

    fn max_workgroups(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    fn aspect_ratio(&self) -> f32 {
        match &self.target {
            PresentTarget::Surface { config, .. } => config.width as f32 / config.height as f32,
            PresentTarget::Offscreen { texture } => texture.width() as f32 / texture.height() as f32,
        }
    }

    fn acquire_target(&mut self) -> Result<WgpuFrame, GpuError> {
        self.check_device()?;
        match &mut self.target {
            PresentTarget::Surface {
                surface, config, ..
            } => match surface.get_current_texture() {
                Ok(surface_texture) => {
                    let view = surface_texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(WgpuFrame {
                        view,
                        surface_texture: Some(surface_texture),
                    })
                }
                Err(error) => {
                    // A reconfigured surface is ready for the next frame
                    if matches!(error, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                        log::warn!("Surface {error}, reconfiguring");
                        surface.configure(&self.device, config);
                    }
                    Err(error.into())
                }
            },
            PresentTarget::Offscreen { texture } => Ok(WgpuFrame {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            }),
        }
    }

    fn submit(&mut self, frame: FrameCommands<'_, Self>) -> Result<(), GpuError> {
        self.check_device()?;
        let FrameCommands {
            target,
            compute,
            draw,
        } = frame;

        // Errors raised while encoding or submitting come back here instead of
        // the uncaptured handler, so a failed frame never counts as a tick
        let ((), error) = self.capture_errors(|device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Update Entities Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(compute.pipeline);
                compute_pass.set_bind_group(0, compute.bind_group, &[]);
                compute_pass.dispatch_workgroups(compute.workgroups, 1, 1);
            }

            {
                let mut render_pass = begin_sprite_pass(&mut encoder, &target.view, wgpu::Color::BLACK);
                render_pass.set_pipeline(draw.pipeline);
                render_pass.set_vertex_buffer(0, draw.scale.slice(..));
                render_pass.set_vertex_buffer(1, draw.kinematics.slice(..));
                render_pass.set_vertex_buffer(2, draw.colours.slice(..));
                render_pass.set_vertex_buffer(3, draw.geometry.slice(..));
                render_pass.draw(0..draw.vertex_count, 0..draw.instance_count);
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        });
        if let Some(error) = error {
            return Err(GpuError::Submission(error.to_string()));
        }

        if let Some(surface_texture) = target.surface_texture {
            if let PresentTarget::Surface { window, .. } = &self.target {
                window.pre_present_notify();
            }
            surface_texture.present();
        }
        Ok(())
    }
}
