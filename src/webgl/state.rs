// SPDX-License-Identifier: MIT OR Apache-2.0
//! The redundant-state filter.
//!
//! GL is a global state machine; binding a pipeline means replaying its whole
//! megastate. The cache remembers what the context was last told and skips
//! matching sub-states. Invalidation (at pass begin, after clears touch write
//! masks) forces the next bind to replay everything.

use glow::HasContext;

use crate::api::depth::reverse_depth_for_compare_function;
use crate::api::descriptors::{ChannelWriteMask, Color};
use crate::api::megastate::{AttachmentState, MegaStateDescriptor, StencilFaceState};
use crate::webgl::translate;

pub(super) struct StateCache {
    valid: bool,
    mega: MegaStateDescriptor,
    depth_test: bool,
    stencil_test: bool,
    stencil_reference: u32,
    blend_color: Color,
    enabled_attribs: u64,
}

impl StateCache {
    pub(super) fn new() -> StateCache {
        StateCache {
            valid: false,
            mega: MegaStateDescriptor::default(),
            depth_test: false,
            stencil_test: false,
            stencil_reference: 0,
            blend_color: Color::TRANSPARENT_BLACK,
            enabled_attribs: 0,
        }
    }

    pub(super) fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Applies `mega` to the context, diffed against the cached state.
    /// `depth_test`/`stencil_test` reflect the current pass's attachments.
    pub(super) fn bind_mega(
        &mut self,
        gl: &glow::Context,
        mega: &MegaStateDescriptor,
        depth_test: bool,
        stencil_test: bool,
    ) {
        let force = !self.valid;
        // GL blends globally; attachment 0 is the template for every target.
        let attachment = mega.attachments_state.first().cloned().unwrap_or_default();
        let cached = self.mega.attachments_state.first().cloned().unwrap_or_default();
        if force || attachment != cached {
            self.apply_attachment(gl, &attachment);
        }
        if force || mega.blend_constant != self.mega.blend_constant {
            self.set_blend_constant(gl, mega.blend_constant);
        }
        if force
            || depth_test != self.depth_test
            || mega.depth_compare != self.mega.depth_compare
            || mega.depth_write != self.mega.depth_write
        {
            unsafe {
                if depth_test {
                    gl.enable(glow::DEPTH_TEST);
                    // Reversed-Z: the compare sense flips exactly here.
                    gl.depth_func(translate::compare_function(
                        reverse_depth_for_compare_function(mega.depth_compare),
                    ));
                } else {
                    gl.disable(glow::DEPTH_TEST);
                }
                gl.depth_mask(mega.depth_write);
            }
        }
        let stencil_changed = force
            || stencil_test != self.stencil_test
            || mega.stencil_front != self.mega.stencil_front
            || mega.stencil_back != self.mega.stencil_back
            || mega.stencil_write != self.mega.stencil_write;
        if stencil_changed {
            self.apply_stencil(gl, mega, stencil_test);
        }
        if force || mega.cull_mode != self.mega.cull_mode {
            unsafe {
                match translate::cull_face(mega.cull_mode) {
                    Some(face) => {
                        gl.enable(glow::CULL_FACE);
                        gl.cull_face(face);
                    }
                    None => gl.disable(glow::CULL_FACE),
                }
            }
        }
        if force || mega.front_face != self.mega.front_face {
            unsafe { gl.front_face(translate::front_face(mega.front_face)) };
        }
        if force || mega.polygon_offset != self.mega.polygon_offset {
            unsafe {
                if mega.polygon_offset {
                    gl.enable(glow::POLYGON_OFFSET_FILL);
                    gl.polygon_offset(1.0, 1.0);
                } else {
                    gl.disable(glow::POLYGON_OFFSET_FILL);
                }
            }
        }
        self.mega = mega.clone();
        self.depth_test = depth_test;
        self.stencil_test = stencil_test;
        self.valid = true;
    }

    fn apply_attachment(&self, gl: &glow::Context, attachment: &AttachmentState) {
        let mask = attachment.channel_write_mask;
        unsafe {
            gl.color_mask(
                mask.contains(ChannelWriteMask::RED),
                mask.contains(ChannelWriteMask::GREEN),
                mask.contains(ChannelWriteMask::BLUE),
                mask.contains(ChannelWriteMask::ALPHA),
            );
            if attachment.rgb_blend.is_opaque() && attachment.alpha_blend.is_opaque() {
                gl.disable(glow::BLEND);
            } else {
                gl.enable(glow::BLEND);
                gl.blend_equation_separate(
                    translate::blend_equation(attachment.rgb_blend.mode),
                    translate::blend_equation(attachment.alpha_blend.mode),
                );
                gl.blend_func_separate(
                    translate::blend_factor(attachment.rgb_blend.src_factor),
                    translate::blend_factor(attachment.rgb_blend.dst_factor),
                    translate::blend_factor(attachment.alpha_blend.src_factor),
                    translate::blend_factor(attachment.alpha_blend.dst_factor),
                );
            }
        }
    }

    fn apply_stencil(&self, gl: &glow::Context, mega: &MegaStateDescriptor, stencil_test: bool) {
        let active = stencil_test
            && (mega.stencil_write
                || mega.stencil_front != StencilFaceState::default()
                || mega.stencil_back != StencilFaceState::default());
        unsafe {
            if !active {
                gl.disable(glow::STENCIL_TEST);
                gl.stencil_mask(0xFF);
                return;
            }
            gl.enable(glow::STENCIL_TEST);
            let reference = self.stencil_reference as i32;
            for (face, state) in [
                (glow::FRONT, &mega.stencil_front),
                (glow::BACK, &mega.stencil_back),
            ] {
                gl.stencil_func_separate(
                    face,
                    translate::compare_function(state.compare),
                    reference,
                    state.mask,
                );
                gl.stencil_op_separate(
                    face,
                    translate::stencil_op(state.fail_op),
                    translate::stencil_op(state.depth_fail_op),
                    translate::stencil_op(state.pass_op),
                );
            }
            gl.stencil_mask(if mega.stencil_write { 0xFF } else { 0 });
        }
    }

    pub(super) fn set_stencil_reference(&mut self, gl: &glow::Context, reference: u32) {
        if self.valid && reference == self.stencil_reference {
            return;
        }
        self.stencil_reference = reference;
        // Reference travels with the stencil funcs; replay them.
        let mega = self.mega.clone();
        self.apply_stencil(gl, &mega, self.stencil_test);
    }

    pub(super) fn set_blend_constant(&mut self, gl: &glow::Context, color: Color) {
        self.blend_color = color;
        unsafe { gl.blend_color(color.r, color.g, color.b, color.a) };
    }

    /// Enables exactly the attribute arrays in `mask`, disabling the rest.
    /// Locations are capped at 32, beyond every MAX_VERTEX_ATTRIBS in the
    /// wild.
    pub(super) fn set_enabled_attribs(&mut self, gl: &glow::Context, mask: u64) {
        for location in 0..32u32 {
            let bit = 1u64 << location;
            let want = mask & bit != 0;
            if self.valid && want == (self.enabled_attribs & bit != 0) {
                continue;
            }
            unsafe {
                if want {
                    gl.enable_vertex_attrib_array(location);
                } else {
                    gl.disable_vertex_attrib_array(location);
                }
            }
        }
        self.enabled_attribs = mask;
    }
}
