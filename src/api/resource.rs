// SPDX-License-Identifier: MIT OR Apache-2.0
//! The resource trait family.
//!
//! Every GPU object the device hands out implements [`Resource`]: a unique
//! id, a [`ResourceKind`] tag, an explicit `destroy` contract, and an `Any`
//! seam the owning backend uses to get its concrete type back. Resources are
//! created through `Device::create_*` factories, mutated only through their
//! own methods, and destroyed exactly once by their owner — there is no
//! reference counting of native handles. Using a destroyed resource is a
//! caller bug, matching the native APIs.
//!
//! The whole crate is single-threaded cooperative, so handles are `Rc` and
//! none of these traits require `Send`.

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::format::Format;

bitflags::bitflags! {
    /// Buffer usage flags, validated at copy/bind time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const MAP_READ = 1 << 0;
        const COPY_SRC = 1 << 1;
        const COPY_DST = 1 << 2;
        const INDEX    = 1 << 3;
        const VERTEX   = 1 << 4;
        const UNIFORM  = 1 << 5;
        const STORAGE  = 1 << 6;
        const INDIRECT = 1 << 7;
    }

    /// Texture usage flags. A missing flag at copy time is a fatal error,
    /// never a silent no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED       = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const STORAGE       = 1 << 2;
        const COPY_SRC      = 1 << 3;
        const COPY_DST      = 1 << 4;
    }
}

/// Closed tag distinguishing resource categories in the union of all
/// resources a device tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Sampler,
    RenderTarget,
    Program,
    InputLayout,
    RenderPipeline,
    ComputePipeline,
    Bindings,
    Readback,
    QueryPool,
}

/// Common contract of every device-created object.
pub trait Resource {
    /// Unique id, assigned at creation, never reused within a process.
    fn id(&self) -> u64;
    fn kind(&self) -> ResourceKind;
    fn debug_name(&self) -> Option<String>;
    /// Releases the native handles. Must be called exactly once by the
    /// owner; the resource must not be used afterwards.
    fn destroy(&self);
    fn as_any(&self) -> &dyn Any;
}

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique resource id.
pub(crate) fn alloc_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Texture dimensionality, which selects the native upload entry point on GL
/// (`tex_image_2d` vs `tex_image_3d` vs per-face uploads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    D2Array,
    D3,
    Cube,
}

pub trait Buffer: Resource {
    fn size(&self) -> u64;
    fn usage(&self) -> BufferUsage;
    /// Uploads raw bytes at `dst_offset`. The destination range must fit the
    /// allocated size; overflow is a fatal error, not silent truncation.
    fn set_sub_data(&self, dst_offset: u64, data: &[u8]);
}

pub trait Texture: Resource {
    fn format(&self) -> Format;
    fn dimension(&self) -> TextureDimension;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn depth_or_array_layers(&self) -> u32;
    fn mip_level_count(&self) -> u32;
    fn usage(&self) -> TextureUsage;
    /// Uploads one mip level. `layers` carries one byte slice per array
    /// layer (or cube face); each slice must hold exactly the level's data
    /// for this texture's format.
    fn set_image_data(&self, layers: &[&[u8]], lod: u32);
}

pub trait Sampler: Resource {}

/// A color or depth/stencil attachment target.
///
/// Wraps either a texture or (on capability-limited backends) a bare
/// renderbuffer; in the latter case [`RenderTarget::texture`] is `None` and
/// callers that wanted to sample the attachment must check for it.
pub trait RenderTarget: Resource {
    fn format(&self) -> Format;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn sample_count(&self) -> u32;
    fn texture(&self) -> Option<Rc<dyn Texture>>;
}

pub trait Program: Resource {}

pub trait InputLayout: Resource {}

pub trait RenderPipeline: Resource {}

pub trait ComputePipeline: Resource {}

pub trait Bindings: Resource {}

/// Occlusion query storage. Results become available after the frame that
/// recorded the queries has been submitted and resolved.
pub trait QueryPool: Resource {
    fn count(&self) -> u32;
    /// Cached result for one query, `None` until resolved.
    fn result(&self, index: u32) -> Option<u64>;
}

/// Asynchronous GPU→CPU transfers, the only genuinely suspending operations
/// in the crate.
pub trait Readback: Resource {
    /// Reads `length` bytes starting at `src_offset`. The buffer needs
    /// `BufferUsage::COPY_SRC` (WebGPU) to be readable.
    fn read_buffer(
        &self,
        buffer: Rc<dyn Buffer>,
        src_offset: u64,
        length: u64,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<u8>, crate::api::Error>>>>;

    /// Reads a rectangle of mip 0. Out-of-bounds texels read back as zeroes
    /// rather than erroring, so callers can over-read edges cheaply.
    fn read_texture(
        &self,
        texture: Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<u8>, crate::api::Error>>>>;

    /// Synchronous texture read. Backend-conditional: the GL backend
    /// supports it, WebGPU returns [`crate::api::Error::Unsupported`].
    fn read_texture_sync(
        &self,
        texture: Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, crate::api::Error>;
}
