// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend entry point: context adoption and the swap chain.
//!
//! Unlike the WebGPU path, the embedder owns context creation here. It hands
//! over a ready [`glow::Context`] and declares which profile the context
//! speaks; the contribution wraps it in a device or a swap chain.

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::device::{Device, Error};
use crate::api::format::Format;
use crate::api::resource::Texture;
use crate::api::shader::ShaderCompiler;
use crate::api::swapchain::SwapChain;
use crate::webgl::caps::GlProfile;
use crate::webgl::device::WebGlDevice;
use crate::webgl::texture::WebGlTexture;

pub struct WebGlDeviceContribution {
    gl: glow::Context,
    profile: GlProfile,
    shader_compiler: Option<Rc<dyn ShaderCompiler>>,
}

impl WebGlDeviceContribution {
    pub fn new(gl: glow::Context, profile: GlProfile) -> WebGlDeviceContribution {
        WebGlDeviceContribution {
            gl,
            profile,
            shader_compiler: None,
        }
    }

    /// Installs the external WGSL→GLSL cross-compiler; without one, programs
    /// whose stages are WGSL fail with a shader-compilation error.
    pub fn with_shader_compiler(mut self, compiler: Rc<dyn ShaderCompiler>) -> Self {
        self.shader_compiler = Some(compiler);
        self
    }

    /// A device with no presentable surface, for offscreen rendering and
    /// tests.
    pub fn create_device_headless(self) -> Result<Rc<WebGlDevice>, Error> {
        WebGlDevice::new(self.gl, self.profile, self.shader_compiler)
    }

    /// A device bound to the context's default framebuffer. `width`/`height`
    /// describe the current drawing-buffer size.
    pub fn create_swap_chain(
        self,
        width: u32,
        height: u32,
    ) -> Result<Rc<WebGlSwapChain>, Error> {
        let device = WebGlDevice::new(self.gl, self.profile, self.shader_compiler)?;
        Ok(Rc::new(WebGlSwapChain {
            device,
            format: Format::U8RgbaNorm,
            size: RefCell::new((width, height)),
            transient_registry: Rc::new(RefCell::new(Default::default())),
        }))
    }
}

pub struct WebGlSwapChain {
    device: Rc<WebGlDevice>,
    format: Format,
    size: RefCell<(u32, u32)>,
    /// Onscreen textures are recreated every frame and excluded from leak
    /// tracking; they register here instead of the device registry.
    transient_registry: crate::api::device::SharedResourceRegistry,
}

impl SwapChain for WebGlSwapChain {
    fn device(&self) -> Rc<dyn Device> {
        self.device.clone()
    }

    fn configure_swap_chain(&self, width: u32, height: u32) {
        // The embedder resizes the drawing buffer; only the bookkeeping
        // lives here.
        *self.size.borrow_mut() = (width, height);
    }

    fn width(&self) -> u32 {
        self.size.borrow().0
    }

    fn height(&self) -> u32 {
        self.size.borrow().1
    }

    fn onscreen_texture(&self) -> Rc<dyn Texture> {
        let (width, height) = *self.size.borrow();
        WebGlTexture::default_framebuffer(
            self.device.ctx.clone(),
            self.transient_registry.clone(),
            self.format,
            width,
            height,
        )
    }

    fn present(&self) {
        // The platform presents on flush.
        use glow::HasContext;
        unsafe { self.device.ctx.gl.flush() };
    }
}
