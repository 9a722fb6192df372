// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swap-chain acquisition.
//!
//! Backend selection happens exactly once, when a backend's device
//! contribution creates its swap chain; after that the whole API is
//! backend-agnostic.

use std::rc::Rc;

use crate::api::device::Device;
use crate::api::resource::Texture;

pub trait SwapChain {
    fn device(&self) -> Rc<dyn Device>;

    /// Resizes the presentable surface; may be called repeatedly and must
    /// match the backing canvas/window size.
    fn configure_swap_chain(&self, width: u32, height: u32);

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// The current presentable texture.
    ///
    /// Hazard carried over from the native APIs: on WebGPU the handle is
    /// only valid within the task that renders the frame; acquire it in the
    /// same task that records and submits.
    fn onscreen_texture(&self) -> Rc<dyn Texture>;

    /// Presents the current frame. No-op on backends that present on
    /// context flush.
    fn present(&self);
}
