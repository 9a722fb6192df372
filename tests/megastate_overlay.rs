// SPDX-License-Identifier: MIT OR Apache-2.0
//! Overlay semantics of the fixed-function megastate: sparse overrides merge
//! into sub-objects instead of replacing them.

use mica::api::megastate::{
    ChannelBlendState, MegaStateDescriptor, PartialAttachmentState, PartialChannelBlendState,
    PartialMegaState, PartialStencilFaceState,
};
use mica::api::{
    BlendFactor, BlendMode, ChannelWriteMask, Color, CompareFunction, CullMode, FrontFace,
    StencilOp,
};

#[test]
fn blend_channel_overlay_merges_fields() {
    let partial = PartialMegaState {
        attachments_state: Some(vec![PartialAttachmentState {
            rgb_blend: PartialChannelBlendState {
                src_factor: Some(BlendFactor::SrcAlpha),
                dst_factor: Some(BlendFactor::OneMinusSrcAlpha),
                ..Default::default()
            },
            ..Default::default()
        }]),
        ..Default::default()
    };
    let state = MegaStateDescriptor::from_partial(&partial);
    let rgb = &state.attachments_state[0].rgb_blend;
    assert_eq!(rgb.src_factor, BlendFactor::SrcAlpha);
    assert_eq!(rgb.dst_factor, BlendFactor::OneMinusSrcAlpha);
    // Unset mode keeps the default, not a zero value.
    assert_eq!(rgb.mode, BlendMode::Add);
    // Alpha channel untouched.
    assert!(state.attachments_state[0].alpha_blend.is_opaque());
    assert!(!rgb.is_opaque());
}

#[test]
fn overlay_returns_a_new_value() {
    let base = MegaStateDescriptor::default();
    let partial = PartialMegaState {
        depth_write: Some(false),
        cull_mode: Some(CullMode::Front),
        ..Default::default()
    };
    let derived = base.overlay(&partial);
    assert!(!derived.depth_write);
    assert_eq!(derived.cull_mode, CullMode::Front);
    // The base is untouched; two pipelines never alias state.
    assert!(base.depth_write);
    assert_eq!(base.cull_mode, CullMode::None);
}

#[test]
fn successive_overlays_compose_with_later_wins() {
    let first = PartialMegaState {
        depth_compare: Some(CompareFunction::Greater),
        front_face: Some(FrontFace::Cw),
        ..Default::default()
    };
    let second = PartialMegaState {
        depth_compare: Some(CompareFunction::Equal),
        ..Default::default()
    };
    let state = MegaStateDescriptor::from_partial(&first).overlay(&second);
    // Second overlay wins where it speaks, first survives where it doesn't.
    assert_eq!(state.depth_compare, CompareFunction::Equal);
    assert_eq!(state.front_face, FrontFace::Cw);
}

#[test]
fn overlay_grows_the_attachment_array() {
    let partial = PartialMegaState {
        attachments_state: Some(vec![
            PartialAttachmentState::default(),
            PartialAttachmentState {
                channel_write_mask: Some(ChannelWriteMask::RED),
                ..Default::default()
            },
            PartialAttachmentState {
                rgb_blend: PartialChannelBlendState {
                    mode: Some(BlendMode::Max),
                    ..Default::default()
                },
                ..Default::default()
            },
        ]),
        ..Default::default()
    };
    let state = MegaStateDescriptor::from_partial(&partial);
    assert_eq!(state.attachments_state.len(), 3);
    assert_eq!(state.attachments_state[0].channel_write_mask, ChannelWriteMask::ALL);
    assert_eq!(state.attachments_state[1].channel_write_mask, ChannelWriteMask::RED);
    // Slot 2 keeps slot 0's template values except the overridden mode.
    assert_eq!(state.attachments_state[2].channel_write_mask, ChannelWriteMask::ALL);
    assert_eq!(state.attachments_state[2].rgb_blend.mode, BlendMode::Max);
}

#[test]
fn stencil_faces_overlay_independently() {
    let partial = PartialMegaState {
        stencil_front: PartialStencilFaceState {
            pass_op: Some(StencilOp::IncrementClamp),
            mask: Some(0x0F),
            ..Default::default()
        },
        stencil_back: PartialStencilFaceState {
            compare: Some(CompareFunction::NotEqual),
            ..Default::default()
        },
        stencil_write: Some(true),
        ..Default::default()
    };
    let state = MegaStateDescriptor::from_partial(&partial);
    assert_eq!(state.stencil_front.pass_op, StencilOp::IncrementClamp);
    assert_eq!(state.stencil_front.mask, 0x0F);
    assert_eq!(state.stencil_front.compare, CompareFunction::Always);
    assert_eq!(state.stencil_back.compare, CompareFunction::NotEqual);
    assert_eq!(state.stencil_back.mask, 0xFF);
    assert!(state.stencil_write);
}

#[test]
fn scalar_fields_overlay() {
    let constant = Color {
        r: 0.25,
        g: 0.5,
        b: 0.75,
        a: 1.0,
    };
    let partial = PartialMegaState {
        blend_constant: Some(constant),
        polygon_offset: Some(true),
        ..Default::default()
    };
    let state = MegaStateDescriptor::from_partial(&partial);
    assert_eq!(state.blend_constant, constant);
    assert!(state.polygon_offset);
}

#[test]
fn opaque_detection_tracks_the_replace_src_state() {
    assert!(ChannelBlendState::OPAQUE.is_opaque());
    let blending = ChannelBlendState {
        mode: BlendMode::Add,
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
    };
    assert!(!blending.is_opaque());
}
