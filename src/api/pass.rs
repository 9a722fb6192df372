// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pass recording traits.
//!
//! A pass is a transient recording scope: created by the device, fed
//! state-setting and draw/dispatch calls, then consumed by
//! `Device::submit_pass`, which finalizes it and returns the backing object
//! to a pool for the next frame. Ownership enforces the state machine: a
//! submitted pass cannot be touched again because the `Box` is gone.
//!
//! Per-draw validation is deliberately absent: `set_pipeline`/`set_bindings`
//! must precede the draws that depend on them, exactly as in the native
//! APIs, and violating that is undefined behavior rather than a checked
//! error, to avoid per-draw overhead.

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::{BufferSlice, Color};
use crate::api::resource::{Bindings, Buffer, ComputePipeline, InputLayout, RenderPipeline};

/// Common supertrait so both pass kinds flow through one `submit_pass`.
pub trait Pass {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A pre-recorded, replayable draw sequence.
///
/// Bundles assume the recorded draw set and resource *bindings* are
/// frame-invariant: mutating a bound buffer's contents between replays is
/// fine, rebinding different resources requires re-recording.
pub trait RenderBundle {
    fn as_any(&self) -> &dyn Any;
}

pub trait RenderPass: Pass {
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32);
    fn set_pipeline(&mut self, pipeline: &Rc<dyn RenderPipeline>);
    /// `dynamic_byte_offsets` applies, in order, to the uniform-buffer
    /// bindings that were created with dynamic offsets.
    fn set_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]);
    fn set_vertex_input(
        &mut self,
        input_layout: Option<&Rc<dyn InputLayout>>,
        vertex_buffers: &[BufferSlice],
        index_buffer: Option<&BufferSlice>,
    );
    fn set_stencil_reference(&mut self, reference: u32);
    fn set_blend_constant(&mut self, color: Color);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    );
    /// WebGPU only; the GL backend has no indirect drawing and fails fast.
    fn draw_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64);
    fn draw_indexed_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64);

    /// Query index is into the pass descriptor's occlusion query pool.
    fn begin_occlusion_query(&mut self, query_index: u32);
    fn end_occlusion_query(&mut self);

    /// Push/pop must balance within a single pass recording; checked at
    /// submit.
    fn push_debug_group(&mut self, name: &str);
    fn pop_debug_group(&mut self);
    fn insert_debug_marker(&mut self, name: &str);

    /// Redirects subsequent state/draw calls into a bundle until
    /// [`RenderPass::end_bundle`].
    fn begin_bundle(&mut self);
    /// Finishes the bundle, replays it into this pass once, and returns it
    /// for replay in later passes.
    fn end_bundle(&mut self) -> Rc<dyn RenderBundle>;
    fn execute_bundles(&mut self, bundles: &[Rc<dyn RenderBundle>]);
}

pub trait ComputePass: Pass {
    fn set_pipeline(&mut self, pipeline: &Rc<dyn ComputePipeline>);
    fn set_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]);
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
    /// WebGPU only; fails fast on GL.
    fn dispatch_workgroups_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64);
    fn push_debug_group(&mut self, name: &str);
    fn pop_debug_group(&mut self);
    fn insert_debug_marker(&mut self, name: &str);
}
