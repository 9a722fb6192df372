// SPDX-License-Identifier: MIT OR Apache-2.0
//! The megastate: all fixed-function pipeline state as one value.
//!
//! Blend, depth, stencil, cull, winding and polygon offset are treated as a
//! single comparable descriptor. Construction is an overlay: start from the
//! canonical default, then apply a caller-supplied sparse override
//! field-by-field. Sub-objects are never replaced wholesale; overlaying
//! `{ stencil_front: { compare } }` must not reset the other stencil-face
//! fields to backend defaults. The overlay takes an immutable base and
//! returns a new value, so two pipelines can never alias a blend-state
//! sub-object.

use crate::api::descriptors::{
    BlendFactor, BlendMode, ChannelWriteMask, Color, CompareFunction, CullMode, FrontFace,
    StencilOp,
};

/// Blend state for one channel group (RGB or alpha) of one attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBlendState {
    pub mode: BlendMode,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl ChannelBlendState {
    /// Replace-src: the "blending off" state.
    pub const OPAQUE: ChannelBlendState = ChannelBlendState {
        mode: BlendMode::Add,
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
    };

    /// Whether this state is an observable no-op the backend may disable.
    pub fn is_opaque(&self) -> bool {
        *self == Self::OPAQUE
    }
}

/// Per-color-attachment fixed-function state.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentState {
    pub channel_write_mask: ChannelWriteMask,
    pub rgb_blend: ChannelBlendState,
    pub alpha_blend: ChannelBlendState,
}

impl Default for AttachmentState {
    fn default() -> Self {
        AttachmentState {
            channel_write_mask: ChannelWriteMask::ALL,
            rgb_blend: ChannelBlendState::OPAQUE,
            alpha_blend: ChannelBlendState::OPAQUE,
        }
    }
}

/// Stencil state for one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub pass_op: StencilOp,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub mask: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        StencilFaceState {
            compare: CompareFunction::Always,
            pass_op: StencilOp::Keep,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            mask: 0xFF,
        }
    }
}

/// The complete fixed-function pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub struct MegaStateDescriptor {
    /// One entry per color attachment; the pipeline builder resizes this to
    /// the attachment count, cloning entry 0 as the template for new slots.
    pub attachments_state: Vec<AttachmentState>,
    pub blend_constant: Color,
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    pub stencil_write: bool,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_offset: bool,
}

impl Default for MegaStateDescriptor {
    /// The canonical defaults: depth write on with LEQUAL, stencil
    /// KEEP/ALWAYS, no culling, CCW winding.
    fn default() -> Self {
        MegaStateDescriptor {
            attachments_state: vec![AttachmentState::default()],
            blend_constant: Color::TRANSPARENT_BLACK,
            depth_compare: CompareFunction::LessEqual,
            depth_write: true,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_write: false,
            cull_mode: CullMode::None,
            front_face: FrontFace::Ccw,
            polygon_offset: false,
        }
    }
}

impl MegaStateDescriptor {
    /// Default state overlaid with `partial`.
    pub fn from_partial(partial: &PartialMegaState) -> MegaStateDescriptor {
        MegaStateDescriptor::default().overlay(partial)
    }

    /// Returns a copy of `self` with every populated field of `partial`
    /// applied. Field-by-field: sub-objects merge rather than replace.
    #[must_use]
    pub fn overlay(&self, partial: &PartialMegaState) -> MegaStateDescriptor {
        let mut out = self.clone();
        if let Some(attachments) = &partial.attachments_state {
            // Grow the base array first so overrides can address new slots.
            if attachments.len() > out.attachments_state.len() {
                let template = out
                    .attachments_state
                    .first()
                    .cloned()
                    .unwrap_or_default();
                out.attachments_state.resize(attachments.len(), template);
            }
            for (state, partial) in out.attachments_state.iter_mut().zip(attachments) {
                partial.apply_to(state);
            }
        }
        if let Some(blend_constant) = partial.blend_constant {
            out.blend_constant = blend_constant;
        }
        if let Some(depth_compare) = partial.depth_compare {
            out.depth_compare = depth_compare;
        }
        if let Some(depth_write) = partial.depth_write {
            out.depth_write = depth_write;
        }
        partial.stencil_front.apply_to(&mut out.stencil_front);
        partial.stencil_back.apply_to(&mut out.stencil_back);
        if let Some(stencil_write) = partial.stencil_write {
            out.stencil_write = stencil_write;
        }
        if let Some(cull_mode) = partial.cull_mode {
            out.cull_mode = cull_mode;
        }
        if let Some(front_face) = partial.front_face {
            out.front_face = front_face;
        }
        if let Some(polygon_offset) = partial.polygon_offset {
            out.polygon_offset = polygon_offset;
        }
        out
    }

    /// Resizes the attachment-state array to `count`, cloning attachment 0's
    /// state as the template for any newly added slots.
    pub(crate) fn resized_attachments(&self, count: usize) -> MegaStateDescriptor {
        let mut out = self.clone();
        let template = out.attachments_state.first().cloned().unwrap_or_default();
        out.attachments_state.resize(count, template);
        out.attachments_state.truncate(count);
        out
    }
}

/// Sparse override of [`MegaStateDescriptor`]; unset fields keep the base
/// value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialMegaState {
    pub attachments_state: Option<Vec<PartialAttachmentState>>,
    pub blend_constant: Option<Color>,
    pub depth_compare: Option<CompareFunction>,
    pub depth_write: Option<bool>,
    pub stencil_front: PartialStencilFaceState,
    pub stencil_back: PartialStencilFaceState,
    pub stencil_write: Option<bool>,
    pub cull_mode: Option<CullMode>,
    pub front_face: Option<FrontFace>,
    pub polygon_offset: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialAttachmentState {
    pub channel_write_mask: Option<ChannelWriteMask>,
    pub rgb_blend: PartialChannelBlendState,
    pub alpha_blend: PartialChannelBlendState,
}

impl PartialAttachmentState {
    fn apply_to(&self, state: &mut AttachmentState) {
        if let Some(mask) = self.channel_write_mask {
            state.channel_write_mask = mask;
        }
        self.rgb_blend.apply_to(&mut state.rgb_blend);
        self.alpha_blend.apply_to(&mut state.alpha_blend);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialChannelBlendState {
    pub mode: Option<BlendMode>,
    pub src_factor: Option<BlendFactor>,
    pub dst_factor: Option<BlendFactor>,
}

impl PartialChannelBlendState {
    fn apply_to(&self, state: &mut ChannelBlendState) {
        if let Some(mode) = self.mode {
            state.mode = mode;
        }
        if let Some(src) = self.src_factor {
            state.src_factor = src;
        }
        if let Some(dst) = self.dst_factor {
            state.dst_factor = dst;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialStencilFaceState {
    pub compare: Option<CompareFunction>,
    pub pass_op: Option<StencilOp>,
    pub fail_op: Option<StencilOp>,
    pub depth_fail_op: Option<StencilOp>,
    pub mask: Option<u32>,
}

impl PartialStencilFaceState {
    fn apply_to(&self, state: &mut StencilFaceState) {
        if let Some(compare) = self.compare {
            state.compare = compare;
        }
        if let Some(op) = self.pass_op {
            state.pass_op = op;
        }
        if let Some(op) = self.fail_op {
            state.fail_op = op;
        }
        if let Some(op) = self.depth_fail_op {
            state.depth_fail_op = op;
        }
        if let Some(mask) = self.mask {
            state.mask = mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overlay_is_identity() {
        let base = MegaStateDescriptor::default();
        assert_eq!(base.overlay(&PartialMegaState::default()), base);
    }

    #[test]
    fn overlay_is_idempotent() {
        let partial = PartialMegaState {
            depth_compare: Some(CompareFunction::Greater),
            cull_mode: Some(CullMode::Back),
            stencil_front: PartialStencilFaceState {
                compare: Some(CompareFunction::Equal),
                ..Default::default()
            },
            ..Default::default()
        };
        let once = MegaStateDescriptor::default().overlay(&partial);
        let twice = once.overlay(&partial);
        assert_eq!(once, twice);
    }

    #[test]
    fn stencil_face_overlay_preserves_unset_fields() {
        let partial = PartialMegaState {
            stencil_front: PartialStencilFaceState {
                compare: Some(CompareFunction::Never),
                ..Default::default()
            },
            ..Default::default()
        };
        let state = MegaStateDescriptor::from_partial(&partial);
        assert_eq!(state.stencil_front.compare, CompareFunction::Never);
        // Untouched face fields keep the canonical defaults, not backend zero.
        assert_eq!(state.stencil_front.pass_op, StencilOp::Keep);
        assert_eq!(state.stencil_front.mask, 0xFF);
        assert_eq!(state.stencil_back, StencilFaceState::default());
    }

    #[test]
    fn attachment_resize_clones_slot_zero() {
        let partial = PartialMegaState {
            attachments_state: Some(vec![PartialAttachmentState {
                channel_write_mask: Some(ChannelWriteMask::COLOR),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let state = MegaStateDescriptor::from_partial(&partial).resized_attachments(3);
        assert_eq!(state.attachments_state.len(), 3);
        for attachment in &state.attachments_state {
            assert_eq!(attachment.channel_write_mask, ChannelWriteMask::COLOR);
        }
    }

    #[test]
    fn defaults_match_contract() {
        let state = MegaStateDescriptor::default();
        assert!(state.depth_write);
        assert_eq!(state.depth_compare, CompareFunction::LessEqual);
        assert_eq!(state.cull_mode, CullMode::None);
        assert_eq!(state.front_face, FrontFace::Ccw);
        assert_eq!(state.stencil_front.pass_op, StencilOp::Keep);
        assert_eq!(state.stencil_front.compare, CompareFunction::Always);
    }
}
