// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend entry point: adapter/device acquisition and the swap chain.

use std::cell::RefCell;
use std::rc::Rc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::api::descriptors::TextureDescriptor;
use crate::api::device::{Device, Error};
use crate::api::format::Format;
use crate::api::resource::{Texture, TextureUsage};
use crate::api::shader::ShaderCompiler;
use crate::api::swapchain::SwapChain;
use crate::webgpu::device::WebGpuDevice;
use crate::webgpu::texture::WebGpuTexture;

/// Picks the adapter/device and hands out devices or swap chains for this
/// backend. Backend choice happens here, once.
pub struct WebGpuDeviceContribution {
    power_preference: wgpu::PowerPreference,
    shader_compiler: Option<Rc<dyn ShaderCompiler>>,
}

impl WebGpuDeviceContribution {
    pub fn new() -> WebGpuDeviceContribution {
        WebGpuDeviceContribution {
            power_preference: wgpu::PowerPreference::default(),
            shader_compiler: None,
        }
    }

    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Installs the external GLSL→WGSL cross-compiler; without one, programs
    /// whose stages are GLSL fail with a shader-compilation error.
    pub fn with_shader_compiler(mut self, compiler: Rc<dyn ShaderCompiler>) -> Self {
        self.shader_compiler = Some(compiler);
        self
    }

    async fn request(
        &self,
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), Error> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                force_fallback_adapter: false,
                compatible_surface,
            })
            .await
            .map_err(|e| Error::ResourceCreation(format!("request_adapter: {e}")))?;
        let optional = wgpu::Features::DEPTH32FLOAT_STENCIL8
            | wgpu::Features::TEXTURE_COMPRESSION_BC
            | wgpu::Features::TEXTURE_FORMAT_16BIT_NORM
            | wgpu::Features::INDIRECT_FIRST_INSTANCE;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: adapter.features() & optional,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::ResourceCreation(format!("request_device: {e}")))?;
        Ok((adapter, device, queue))
    }

    /// A device with no presentable surface, for offscreen rendering and
    /// tests.
    pub async fn create_device_headless(&self) -> Result<Rc<WebGpuDevice>, Error> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let (adapter, device, queue) = self.request(&instance, None).await?;
        Ok(WebGpuDevice::new(
            device,
            queue,
            adapter.get_info(),
            self.shader_compiler.clone(),
        ))
    }

    pub async fn create_swap_chain<W>(
        &self,
        window: W,
        width: u32,
        height: u32,
    ) -> Result<Rc<WebGpuSwapChain>, Error>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::ResourceCreation(format!("create_surface: {e}")))?;
        let (adapter, device, queue) = self.request(&instance, Some(&surface)).await?;

        let capabilities = surface.get_capabilities(&adapter);
        let (surface_format, format) = if capabilities
            .formats
            .contains(&wgpu::TextureFormat::Bgra8Unorm)
        {
            (wgpu::TextureFormat::Bgra8Unorm, Format::Bgra8Norm)
        } else {
            (wgpu::TextureFormat::Rgba8Unorm, Format::U8RgbaNorm)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let device = WebGpuDevice::new(
            device,
            queue,
            adapter.get_info(),
            self.shader_compiler.clone(),
        );
        Ok(Rc::new(WebGpuSwapChain {
            device,
            surface,
            format,
            config: RefCell::new(config),
            current: RefCell::new(None),
            transient_registry: Rc::new(RefCell::new(Default::default())),
        }))
    }
}

impl Default for WebGpuDeviceContribution {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WebGpuSwapChain {
    device: Rc<WebGpuDevice>,
    surface: wgpu::Surface<'static>,
    format: Format,
    config: RefCell<wgpu::SurfaceConfiguration>,
    current: RefCell<Option<wgpu::SurfaceTexture>>,
    /// Onscreen textures are recreated every frame and excluded from leak
    /// tracking; they register here instead of the device registry.
    transient_registry: crate::api::device::SharedResourceRegistry,
}

impl SwapChain for WebGpuSwapChain {
    fn device(&self) -> Rc<dyn Device> {
        self.device.clone()
    }

    fn configure_swap_chain(&self, width: u32, height: u32) {
        let mut config = self.config.borrow_mut();
        config.width = width;
        config.height = height;
        self.surface.configure(&self.device.gpu.device, &config);
    }

    fn width(&self) -> u32 {
        self.config.borrow().width
    }

    fn height(&self) -> u32 {
        self.config.borrow().height
    }

    fn onscreen_texture(&self) -> Rc<dyn Texture> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(e) => {
                // Outdated/lost surfaces recover on reconfigure.
                logwise::warn_sync!(
                    "surface texture unavailable, reconfiguring: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
                self.surface
                    .configure(&self.device.gpu.device, &self.config.borrow());
                self.surface
                    .get_current_texture()
                    .expect("surface lost after reconfigure")
            }
        };
        let texture = WebGpuTexture::wrap(
            self.device.gpu.clone(),
            self.transient_registry.clone(),
            surface_texture.texture.clone(),
            TextureDescriptor {
                usage: TextureUsage::RENDER_TARGET | TextureUsage::COPY_SRC,
                ..TextureDescriptor::d2(
                    self.format,
                    self.config.borrow().width,
                    self.config.borrow().height,
                    TextureUsage::RENDER_TARGET,
                )
            },
        );
        *self.current.borrow_mut() = Some(surface_texture);
        texture
    }

    fn present(&self) {
        if let Some(surface_texture) = self.current.borrow_mut().take() {
            surface_texture.present();
        }
    }
}
