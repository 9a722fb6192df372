// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::borrow::Cow;
use std::rc::Rc;

use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Program, Resource, ResourceKind};
use crate::api::shader::{ProgramDescriptor, ShaderCompiler, ShaderStage, StageDescriptor};
use crate::webgpu::device::Gpu;

pub(super) struct StageModule {
    pub module: wgpu::ShaderModule,
    pub entry_point: Option<String>,
}

pub(super) struct WebGpuProgram {
    id: u64,
    pub(super) vertex: Option<StageModule>,
    pub(super) fragment: Option<StageModule>,
    pub(super) compute: Option<StageModule>,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGpuProgram {
    pub(super) fn new(
        gpu: &Gpu,
        registry: SharedResourceRegistry,
        descriptor: ProgramDescriptor,
        compiler: Option<&Rc<dyn ShaderCompiler>>,
    ) -> Result<Rc<WebGpuProgram>, Error> {
        descriptor.validate();
        let label = descriptor.debug_name.as_deref();
        let vertex = descriptor
            .vertex
            .as_ref()
            .map(|stage| build_stage(gpu, stage, ShaderStage::Vertex, compiler, label))
            .transpose()?;
        let fragment = descriptor
            .fragment
            .as_ref()
            .map(|stage| build_stage(gpu, stage, ShaderStage::Fragment, compiler, label))
            .transpose()?;
        let compute = descriptor
            .compute
            .as_ref()
            .map(|stage| build_stage(gpu, stage, ShaderStage::Compute, compiler, label))
            .transpose()?;
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Program, descriptor.debug_name.clone());
        Ok(Rc::new(WebGpuProgram {
            id,
            vertex,
            fragment,
            compute,
            debug_name: descriptor.debug_name,
            registry,
        }))
    }
}

/// Obtains WGSL for one stage, cross-compiling GLSL through the installed
/// compiler when needed, and builds its module.
fn build_stage(
    gpu: &Gpu,
    stage: &StageDescriptor,
    kind: ShaderStage,
    compiler: Option<&Rc<dyn ShaderCompiler>>,
    label: Option<&str>,
) -> Result<StageModule, Error> {
    let wgsl = match (&stage.wgsl, &stage.glsl) {
        (Some(wgsl), _) => Cow::Borrowed(wgsl.as_str()),
        (None, Some(glsl)) => {
            let Some(compiler) = compiler else {
                return Err(Error::ShaderCompilation(format!(
                    "stage {} is glsl but no cross-compiler is installed",
                    kind.as_str()
                )));
            };
            let compiled = compiler.compile(glsl, kind, true).map_err(|e| {
                logwise::error_sync!(
                    "shader cross-compilation failed: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
                Error::ShaderCompilation(e)
            })?;
            Cow::Owned(compiled)
        }
        (None, None) => unreachable!("checked by ProgramDescriptor::validate"),
    };
    let module = gpu
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(wgsl.as_ref())),
        });
    Ok(StageModule {
        module,
        entry_point: stage.entry_point.clone(),
    })
}

impl Resource for WebGpuProgram {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Program
    }

    fn debug_name(&self) -> Option<String> {
        self.debug_name.clone()
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Program for WebGpuProgram {}
