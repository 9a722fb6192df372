// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::{FilterMode, MipmapFilterMode, SamplerDescriptor};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Resource, ResourceKind, Sampler};
use crate::api::whoops;
use crate::webgpu::device::Gpu;
use crate::webgpu::translate;

pub(super) struct WebGpuSampler {
    id: u64,
    sampler: wgpu::Sampler,
    registry: SharedResourceRegistry,
}

impl WebGpuSampler {
    pub(super) fn new(
        gpu: &Gpu,
        registry: SharedResourceRegistry,
        descriptor: SamplerDescriptor,
    ) -> Result<Rc<WebGpuSampler>, Error> {
        if descriptor.max_anisotropy > 1
            && (descriptor.mag_filter != FilterMode::Linear
                || descriptor.min_filter != FilterMode::Linear
                || descriptor.mipmap_filter != MipmapFilterMode::Linear)
        {
            whoops("anisotropic sampling requires trilinear filtering");
        }
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: translate::address_mode(descriptor.address_mode_u),
            address_mode_v: translate::address_mode(descriptor.address_mode_v),
            address_mode_w: translate::address_mode(descriptor.address_mode_w),
            mag_filter: translate::filter_mode(descriptor.mag_filter),
            min_filter: translate::filter_mode(descriptor.min_filter),
            mipmap_filter: translate::mipmap_filter_mode(descriptor.mipmap_filter),
            lod_min_clamp: descriptor.lod_min_clamp,
            // NoMip pins sampling to the base level.
            lod_max_clamp: if descriptor.mipmap_filter == MipmapFilterMode::NoMip {
                0.0
            } else {
                descriptor.lod_max_clamp
            },
            compare: descriptor.compare.map(translate::compare_function),
            anisotropy_clamp: descriptor.max_anisotropy,
            border_color: None,
        });
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Sampler, None);
        Ok(Rc::new(WebGpuSampler {
            id,
            sampler,
            registry,
        }))
    }

    pub(super) fn raw(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

impl Resource for WebGpuSampler {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Sampler
    }

    fn debug_name(&self) -> Option<String> {
        None
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sampler for WebGpuSampler {}
