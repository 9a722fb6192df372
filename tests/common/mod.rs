// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inert resource stand-ins for descriptor-level tests. No device needed;
//! equality and slot resolution only look at resource ids.
#![allow(dead_code)]

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use mica::api::{
    Buffer, BufferUsage, Format, InputLayout, Program, RenderPipeline, Resource, ResourceKind,
    Sampler, Texture, TextureDimension, TextureUsage,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! stub_resource {
    ($name:ident, $kind:ident) => {
        pub struct $name {
            id: u64,
        }

        impl $name {
            pub fn new() -> Rc<$name> {
                Rc::new($name { id: next_id() })
            }
        }

        impl Resource for $name {
            fn id(&self) -> u64 {
                self.id
            }

            fn kind(&self) -> ResourceKind {
                ResourceKind::$kind
            }

            fn debug_name(&self) -> Option<String> {
                None
            }

            fn destroy(&self) {}

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

stub_resource!(StubBuffer, Buffer);
stub_resource!(StubTexture, Texture);
stub_resource!(StubSampler, Sampler);
stub_resource!(StubProgram, Program);
stub_resource!(StubInputLayout, InputLayout);
stub_resource!(StubRenderPipeline, RenderPipeline);

impl Buffer for StubBuffer {
    fn size(&self) -> u64 {
        256
    }

    fn usage(&self) -> BufferUsage {
        BufferUsage::UNIFORM | BufferUsage::COPY_DST
    }

    fn set_sub_data(&self, _dst_offset: u64, _data: &[u8]) {}
}

impl Texture for StubTexture {
    fn format(&self) -> Format {
        Format::U8RgbaNorm
    }

    fn dimension(&self) -> TextureDimension {
        TextureDimension::D2
    }

    fn width(&self) -> u32 {
        4
    }

    fn height(&self) -> u32 {
        4
    }

    fn depth_or_array_layers(&self) -> u32 {
        1
    }

    fn mip_level_count(&self) -> u32 {
        1
    }

    fn usage(&self) -> TextureUsage {
        TextureUsage::SAMPLED
    }

    fn set_image_data(&self, _layers: &[&[u8]], _lod: u32) {}
}

impl Sampler for StubSampler {}
impl Program for StubProgram {}
impl InputLayout for StubInputLayout {}
impl RenderPipeline for StubRenderPipeline {}
