// SPDX-License-Identifier: MIT OR Apache-2.0
//! Program compilation and linking.
//!
//! Post-link fixups establish the cross-backend binding contract on GL's
//! global-slot model: uniform block `i` binds to buffer slot `i`, and sampler
//! uniforms take texture units in declaration order, matching the slot order
//! the bindings resolver assigns. On the legacy profile uniform blocks do not
//! exist; a block at slot `i` is instead declared as a `uniform vec4 ub_<i>[N]`
//! array and fed from the CPU shadow copy at bind time.

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;

use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Program, Resource, ResourceKind};
use crate::api::shader::{ProgramDescriptor, ShaderCompiler, ShaderStage, StageDescriptor};
use crate::webgl::device::Ctx;

/// Highest legacy uniform-block slot scanned for.
const MAX_LEGACY_UNIFORM_BLOCKS: usize = 8;

pub(super) struct WebGlProgram {
    id: u64,
    ctx: Rc<Ctx>,
    program: glow::Program,
    /// Location and declared vec4 count of each `ub_<i>` array, legacy only.
    legacy_uniforms: Vec<Option<(glow::UniformLocation, i32)>>,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGlProgram {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        descriptor: ProgramDescriptor,
        compiler: Option<&Rc<dyn ShaderCompiler>>,
    ) -> Result<Rc<WebGlProgram>, Error> {
        descriptor.validate();
        if descriptor.compute.is_some() {
            return Err(Error::Unsupported("compute programs"));
        }
        let gl = &ctx.gl;
        let program = ensure_resource_exists(unsafe { gl.create_program() }, "program")?;
        let stages = [
            (ShaderStage::Vertex, glow::VERTEX_SHADER, &descriptor.vertex),
            (
                ShaderStage::Fragment,
                glow::FRAGMENT_SHADER,
                &descriptor.fragment,
            ),
        ];
        let mut shaders = Vec::new();
        for (stage, gl_stage, source) in stages {
            let Some(source) = source else { continue };
            let glsl = stage_glsl(stage, source, compiler)?;
            let shader = ensure_resource_exists(unsafe { gl.create_shader(gl_stage) }, "shader")?;
            unsafe {
                gl.shader_source(shader, &glsl);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    logwise::error_sync!(
                        "shader compilation failed: {log}",
                        log = logwise::privacy::LogIt(&log)
                    );
                    gl.delete_shader(shader);
                    return Err(Error::ShaderCompilation(log));
                }
                gl.attach_shader(program, shader);
            }
            shaders.push(shader);
        }
        unsafe {
            gl.link_program(program);
            for shader in shaders {
                gl.delete_shader(shader);
            }
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                logwise::error_sync!(
                    "program link failed: {log}",
                    log = logwise::privacy::LogIt(&log)
                );
                gl.delete_program(program);
                return Err(Error::ShaderCompilation(log));
            }
        }

        if ctx.caps.uniform_buffers {
            let blocks =
                unsafe { gl.get_program_parameter_i32(program, glow::ACTIVE_UNIFORM_BLOCKS) } as u32;
            for i in 0..blocks {
                unsafe { gl.uniform_block_binding(program, i, i) };
            }
        }

        // Sampler uniforms get sequential texture units; arrays take one unit
        // per element.
        let mut legacy_uniforms = vec![None; MAX_LEGACY_UNIFORM_BLOCKS];
        unsafe {
            gl.use_program(Some(program));
            let count = gl.get_active_uniforms(program);
            let mut unit = 0i32;
            for i in 0..count {
                let Some(uniform) = gl.get_active_uniform(program, i) else {
                    continue;
                };
                if is_sampler_type(uniform.utype) {
                    if let Some(location) = gl.get_uniform_location(program, &uniform.name) {
                        let units: Vec<i32> = (unit..unit + uniform.size).collect();
                        gl.uniform_1_i32_slice(Some(&location), &units);
                        unit += uniform.size;
                    }
                } else if let Some(slot) = legacy_block_slot(&uniform.name) {
                    if slot < MAX_LEGACY_UNIFORM_BLOCKS {
                        if let Some(location) = gl.get_uniform_location(program, &uniform.name) {
                            legacy_uniforms[slot] = Some((location, uniform.size));
                        }
                    }
                }
            }
            gl.use_program(None);
        }

        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Program, descriptor.debug_name.clone());
        Ok(Rc::new(WebGlProgram {
            id,
            ctx,
            program,
            legacy_uniforms,
            debug_name: descriptor.debug_name,
            registry,
        }))
    }

    pub(super) fn raw(&self) -> glow::Program {
        self.program
    }

    pub(super) fn legacy_uniform(&self, slot: usize) -> Option<&(glow::UniformLocation, i32)> {
        self.legacy_uniforms.get(slot)?.as_ref()
    }
}

fn stage_glsl(
    stage: ShaderStage,
    source: &StageDescriptor,
    compiler: Option<&Rc<dyn ShaderCompiler>>,
) -> Result<String, Error> {
    if let Some(glsl) = &source.glsl {
        return Ok(glsl.clone());
    }
    let wgsl = source.wgsl.as_ref().expect("checked by StageDescriptor::validate");
    match compiler {
        Some(compiler) => compiler.compile(wgsl, stage, true).map_err(|log| {
            logwise::error_sync!(
                "cross-compilation failed: {log}",
                log = logwise::privacy::LogIt(&log)
            );
            Error::ShaderCompilation(log)
        }),
        None => Err(Error::ShaderCompilation(
            "wgsl source but no cross-compiler installed".to_string(),
        )),
    }
}

fn is_sampler_type(utype: u32) -> bool {
    matches!(
        utype,
        glow::SAMPLER_2D
            | glow::SAMPLER_3D
            | glow::SAMPLER_CUBE
            | glow::SAMPLER_2D_ARRAY
            | glow::SAMPLER_2D_SHADOW
            | glow::SAMPLER_CUBE_SHADOW
            | glow::SAMPLER_2D_ARRAY_SHADOW
            | glow::INT_SAMPLER_2D
            | glow::INT_SAMPLER_3D
            | glow::INT_SAMPLER_CUBE
            | glow::INT_SAMPLER_2D_ARRAY
            | glow::UNSIGNED_INT_SAMPLER_2D
            | glow::UNSIGNED_INT_SAMPLER_3D
            | glow::UNSIGNED_INT_SAMPLER_CUBE
            | glow::UNSIGNED_INT_SAMPLER_2D_ARRAY
    )
}

/// Parses `ub_3` / `ub_3[0]` into `Some(3)`.
fn legacy_block_slot(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("ub_")?;
    let digits = rest.split('[').next()?;
    digits.parse().ok()
}

impl Resource for WebGlProgram {
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
        unsafe { self.ctx.gl.delete_program(self.program) };
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Program for WebGlProgram {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_block_names_parse() {
        assert_eq!(legacy_block_slot("ub_0"), Some(0));
        assert_eq!(legacy_block_slot("ub_3[0]"), Some(3));
        assert_eq!(legacy_block_slot("u_color"), None);
        assert_eq!(legacy_block_slot("ub_x"), None);
    }
}
