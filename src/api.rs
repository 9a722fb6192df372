// SPDX-License-Identifier: MIT OR Apache-2.0
//! The backend-agnostic device surface.
//!
//! Everything in this module is shared between backends: pixel/vertex format
//! tables, descriptor value types and their structural equality, the resource
//! trait family, and the device/pass/swap-chain traits the backends implement.

pub mod depth;
pub mod descriptors;
pub mod device;
pub mod equality;
pub mod format;
pub mod megastate;
pub mod pass;
pub mod resource;
pub mod shader;
pub mod swapchain;

pub use depth::{reverse_depth_for_clear_value, reverse_depth_for_compare_function};
pub use descriptors::*;
pub use device::{Device, DeviceLimits, Error, VendorInfo};
pub use format::{Format, SamplerFormatKind};
pub use megastate::{MegaStateDescriptor, PartialMegaState};
pub use pass::{ComputePass, Pass, RenderBundle, RenderPass};
pub use resource::*;
pub use shader::{ProgramDescriptor, ShaderCompiler, ShaderStage, StageDescriptor};
pub use swapchain::SwapChain;

/// Fatal programmer-error escape hatch.
///
/// Descriptor/usage misconfiguration (unsupported format reaching a
/// translation table, missing usage flag on a copy source, out-of-range
/// upload) is not recoverable and must not degrade into silently wrong GPU
/// memory layouts. These panic immediately and propagate to the caller.
#[track_caller]
pub(crate) fn whoops(msg: &str) -> ! {
    panic!("whoops: {msg}");
}
