// SPDX-License-Identifier: MIT OR Apache-2.0
//! The GL backend.
//!
//! Targets WebGL-class contexts on either profile. Recording is execution:
//! pass methods issue GL calls immediately, filtered through a redundant-state
//! cache. Shaders are GLSL; WGSL sources go through the installed
//! cross-compiler seam. Compute is absent on this backend.

mod bindings;
mod buffer;
mod caps;
mod contribution;
mod device;
mod pass;
mod pipeline;
mod program;
mod query;
mod readback;
mod render_target;
mod sampler;
mod state;
mod texture;
mod translate;

pub use caps::GlProfile;
pub use contribution::{WebGlDeviceContribution, WebGlSwapChain};
pub use device::WebGlDevice;
