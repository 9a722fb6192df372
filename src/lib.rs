// SPDX-License-Identifier: MIT OR Apache-2.0
/*! mica is a backend-agnostic GPU device abstraction.

It exposes a single API for buffers, textures, samplers, programs, pipelines,
bindings and passes, and runs that API unmodified over two very different
native backends:

| Backend | Crate | Model |
|---------|-------|-------|
| WebGPU  | [wgpu](https://wgpu.rs) | explicit, object-based: bind groups, command encoders, render bundles |
| WebGL-class GL | [glow](https://docs.rs/glow) | immediate-mode state machine: global slots, per-draw state changes |

Application code creates resources once through [`api::Device`] factories and
records work through [`api::RenderPass`]/[`api::ComputePass`]; the backend
modules translate descriptors (blend/depth/stencil megastate, binding layouts,
vertex formats) into native state and preserve identical command ordering and
resource-lifetime guarantees on both sides.

# The shape of a frame

```text
device.begin_frame();
let pass = device.create_render_pass(desc);
// set_pipeline / set_bindings / set_vertex_input / draw ...
device.submit_pass(pass);
device.end_frame();
```

Passes are pooled: submitting a pass recycles the backing object for the next
frame rather than reallocating encoders per pass.

# What mica is not

There is no scene graph, no material system and no asset pipeline here. Shader
cross-compilation is a seam ([`api::ShaderCompiler`]), not an implementation;
callers hand each backend the language it natively consumes, or install a
compiler of their own.
*/

pub mod api;
mod pool;

#[cfg(feature = "backend_webgpu")]
pub mod webgpu;

#[cfg(feature = "backend_webgl")]
pub mod webgl;

pub use api::Error;
