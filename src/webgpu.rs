// SPDX-License-Identifier: MIT OR Apache-2.0
//! The wgpu backend.
//!
//! Explicit bind groups, native render bundles and occlusion queries, lazy
//! pipeline compilation. Shaders are WGSL; GLSL sources go through the
//! installed cross-compiler seam.

mod bindings;
mod buffer;
mod contribution;
mod device;
mod pass;
mod pipeline;
mod program;
mod query;
mod readback;
mod render_target;
mod sampler;
mod texture;
mod translate;

pub use contribution::{WebGpuDeviceContribution, WebGpuSwapChain};
pub use device::WebGpuDevice;
