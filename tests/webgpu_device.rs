// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end tests against a live adapter. Every test skips quietly when
//! the host has no usable GPU.
#![cfg(feature = "backend_webgpu")]

use std::rc::Rc;

use mica::api::{
    BindingsDescriptor, Buffer, BufferBinding, BufferDescriptor, BufferUsage, Color,
    ColorAttachment, Device, Error, Format, MegaStateDescriptor, PipelineRef, PrimitiveTopology,
    ProgramDescriptor, Readback, RenderPassDescriptor, RenderPipelineDescriptor, Resource,
    StageDescriptor, Texture, TextureDescriptor, TextureDimension, TextureUsage,
};
use mica::webgpu::{WebGpuDevice, WebGpuDeviceContribution};

fn headless_device() -> Option<Rc<WebGpuDevice>> {
    test_executors::sleep_on(async {
        WebGpuDeviceContribution::new()
            .create_device_headless()
            .await
            .ok()
    })
}

macro_rules! device_or_skip {
    () => {
        match headless_device() {
            Some(device) => device,
            None => {
                println!("no adapter available, skipping");
                return;
            }
        }
    };
}

#[test]
fn vendor_info_and_limits_report_the_platform() {
    let device = device_or_skip!();
    let info = device.query_vendor_info();
    assert_eq!(info.platform, "WebGPU");
    assert!(info.explicit_binding_locations);
    assert!(info.separate_sampler_textures);

    let limits = device.query_limits();
    assert!(limits.compute_shaders_supported);
    assert!(limits.storage_buffers_supported);
    assert!(limits.render_bundles_native);
    assert!(limits.uniform_buffer_word_alignment > 0);
}

#[test]
fn buffer_upload_reads_back_verbatim() {
    let device = device_or_skip!();
    let buffer = device
        .create_buffer(BufferDescriptor {
            size: 16,
            usage: BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            debug_name: Some("round trip".to_string()),
        })
        .expect("buffer creation");
    let data: Vec<u8> = (1..=16).collect();
    buffer.set_sub_data(0, &data);

    let readback = device.create_readback().expect("readback creation");
    let full = test_executors::sleep_on(readback.read_buffer(buffer.clone(), 0, 16))
        .expect("full read");
    assert_eq!(full, data);

    // Unaligned interior range; the staging copy rounds up internally.
    let window = test_executors::sleep_on(readback.read_buffer(buffer.clone(), 5, 7))
        .expect("windowed read");
    assert_eq!(window, data[5..12]);

    readback.destroy();
    buffer.destroy();
}

#[test]
fn cleared_texture_reads_back_the_clear_color() {
    let device = device_or_skip!();
    let texture = device
        .create_texture(TextureDescriptor::d2(
            Format::U8RgbaNorm,
            8,
            8,
            TextureUsage::RENDER_TARGET | TextureUsage::COPY_SRC,
        ))
        .expect("texture creation");
    let target = device
        .create_render_target_from_texture(texture.clone())
        .expect("render target creation");

    device.begin_frame();
    let pass = device.create_render_pass(RenderPassDescriptor {
        color_attachments: vec![ColorAttachment {
            render_target: target.clone(),
            resolve_to: None,
            clear_color: Some(Color {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            }),
        }],
        depth_stencil_attachment: None,
        occlusion_query_pool: None,
    });
    device.submit_pass(pass);
    device.end_frame();

    let readback = device.create_readback().expect("readback creation");
    let pixels = test_executors::sleep_on(readback.read_texture(texture.clone(), 0, 0, 8, 8))
        .expect("texture read");
    assert_eq!(pixels.len(), 8 * 8 * 4);
    for pixel in pixels.chunks_exact(4) {
        assert_eq!(pixel, [255, 0, 0, 255]);
    }

    readback.destroy();
    target.destroy();
    texture.destroy();
}

#[test]
fn over_reads_pad_with_zeroes() {
    let device = device_or_skip!();
    let texture = device
        .create_texture(TextureDescriptor::d2(
            Format::U8RgbaNorm,
            8,
            8,
            TextureUsage::RENDER_TARGET | TextureUsage::COPY_SRC,
        ))
        .expect("texture creation");
    let target = device
        .create_render_target_from_texture(texture.clone())
        .expect("render target creation");

    let pass = device.create_render_pass(RenderPassDescriptor {
        color_attachments: vec![ColorAttachment {
            render_target: target.clone(),
            resolve_to: None,
            clear_color: Some(Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 1.0,
            }),
        }],
        depth_stencil_attachment: None,
        occlusion_query_pool: None,
    });
    device.submit_pass(pass);

    // An 8x8 read anchored at (4,4) covers only a 4x4 corner of the texture.
    let readback = device.create_readback().expect("readback creation");
    let pixels = test_executors::sleep_on(readback.read_texture(texture.clone(), 4, 4, 8, 8))
        .expect("texture read");
    for row in 0..8usize {
        for col in 0..8usize {
            let pixel = &pixels[(row * 8 + col) * 4..(row * 8 + col) * 4 + 4];
            if row < 4 && col < 4 {
                assert_eq!(pixel, [255, 255, 255, 255], "in-bounds texel at {row},{col}");
            } else {
                assert_eq!(pixel, [0, 0, 0, 0], "out-of-bounds texel at {row},{col}");
            }
        }
    }

    readback.destroy();
    target.destroy();
    texture.destroy();
}

#[test]
fn concurrent_readbacks_do_not_interfere() {
    let device = device_or_skip!();
    let a = device
        .create_buffer(BufferDescriptor {
            size: 8,
            usage: BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            debug_name: None,
        })
        .expect("buffer creation");
    let b = device
        .create_buffer(BufferDescriptor {
            size: 8,
            usage: BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            debug_name: None,
        })
        .expect("buffer creation");
    a.set_sub_data(0, &[1u8; 8]);
    b.set_sub_data(0, &[2u8; 8]);

    let readback = device.create_readback().expect("readback creation");
    let (read_a, read_b) = test_executors::sleep_on(async {
        futures::join!(
            readback.read_buffer(a.clone(), 0, 8),
            readback.read_buffer(b.clone(), 0, 8),
        )
    });
    assert_eq!(read_a.expect("first read"), [1u8; 8]);
    assert_eq!(read_b.expect("second read"), [2u8; 8]);

    readback.destroy();
    a.destroy();
    b.destroy();
}

#[test]
fn dynamic_offsets_select_uniform_pages() {
    let device = device_or_skip!();

    // Two 256-aligned pages of the same uniform buffer holding different
    // colors; the second draw picks the green page through its offset.
    let uniforms = device
        .create_buffer(BufferDescriptor {
            size: 512,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            debug_name: Some("color pages".to_string()),
        })
        .expect("buffer creation");
    let color_bytes =
        |rgba: [f32; 4]| -> Vec<u8> { rgba.iter().flat_map(|c| c.to_le_bytes()).collect() };
    uniforms.set_sub_data(0, &color_bytes([1.0, 0.0, 0.0, 1.0]));
    uniforms.set_sub_data(256, &color_bytes([0.0, 1.0, 0.0, 1.0]));

    let program = device
        .create_program(ProgramDescriptor::render(
            StageDescriptor::wgsl(
                r#"
                @vertex
                fn main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
                    var corners = array<vec2<f32>, 3>(
                        vec2<f32>(-1.0, -3.0),
                        vec2<f32>(-1.0, 1.0),
                        vec2<f32>(3.0, 1.0),
                    );
                    return vec4<f32>(corners[index], 0.0, 1.0);
                }
                "#,
            ),
            StageDescriptor::wgsl(
                r#"
                struct Params { color: vec4<f32> }
                @group(0) @binding(0) var<uniform> params: Params;

                @fragment
                fn main() -> @location(0) vec4<f32> {
                    return params.color;
                }
                "#,
            ),
        ))
        .expect("program creation");
    let pipeline = device
        .create_render_pipeline(RenderPipelineDescriptor {
            program,
            topology: PrimitiveTopology::Triangles,
            mega_state: MegaStateDescriptor::default(),
            color_attachment_formats: vec![Format::U8RgbaNorm],
            depth_stencil_attachment_format: None,
            sample_count: 1,
            input_layout: None,
        })
        .expect("pipeline creation");
    let bindings = device
        .create_bindings(BindingsDescriptor {
            pipeline: PipelineRef::Render(pipeline.clone()),
            uniform_buffer_bindings: vec![BufferBinding {
                binding: None,
                buffer: uniforms.clone(),
                offset: 0,
                size: 16,
            }],
            sampler_bindings: vec![],
            storage_buffer_bindings: vec![],
            storage_texture_bindings: vec![],
        })
        .expect("bindings creation");

    let texture = device
        .create_texture(TextureDescriptor::d2(
            Format::U8RgbaNorm,
            4,
            4,
            TextureUsage::RENDER_TARGET | TextureUsage::COPY_SRC,
        ))
        .expect("texture creation");
    let target = device
        .create_render_target_from_texture(texture.clone())
        .expect("render target creation");

    device.begin_frame();
    let mut pass = device.create_render_pass(RenderPassDescriptor {
        color_attachments: vec![ColorAttachment {
            render_target: target.clone(),
            resolve_to: None,
            clear_color: Some(Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            }),
        }],
        depth_stencil_attachment: None,
        occlusion_query_pool: None,
    });
    pass.set_pipeline(&pipeline);
    pass.set_bindings(&bindings, &[0]);
    pass.draw(3, 1, 0, 0);
    pass.set_bindings(&bindings, &[256]);
    pass.draw(3, 1, 0, 0);
    device.submit_pass(pass);
    device.end_frame();

    let readback = device.create_readback().expect("readback creation");
    let pixels = test_executors::sleep_on(readback.read_texture(texture.clone(), 0, 0, 4, 4))
        .expect("texture read");
    for pixel in pixels.chunks_exact(4) {
        assert_eq!(pixel, [0, 255, 0, 255]);
    }

    readback.destroy();
    target.destroy();
    texture.destroy();
    bindings.destroy();
    pipeline.destroy();
    uniforms.destroy();
}

#[test]
fn volume_upload_without_data_fails_fast() {
    let device = device_or_skip!();
    let texture = device
        .create_texture(TextureDescriptor {
            dimension: TextureDimension::D3,
            format: Format::U8RgbaNorm,
            width: 4,
            height: 4,
            depth_or_array_layers: 4,
            mip_level_count: 1,
            usage: TextureUsage::COPY_DST,
            flip_y: false,
            debug_name: None,
        })
        .expect("texture creation");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        texture.set_image_data(&[], 0);
    }));
    let message = outcome
        .expect_err("empty volume upload must not succeed")
        .downcast::<String>()
        .expect("panic payload");
    assert!(message.contains("whoops"), "unexpected panic: {message}");

    texture.destroy();
}
    let device = device_or_skip!();
    let texture = device
        .create_texture(TextureDescriptor::d2(
            Format::U8RgbaNorm,
            2,
            2,
            TextureUsage::COPY_SRC,
        ))
        .expect("texture creation");
    let readback = device.create_readback().expect("readback creation");
    let result = readback.read_texture_sync(texture.clone(), 0, 0, 2, 2);
    assert!(matches!(result, Err(Error::Unsupported(_))));
    readback.destroy();
    texture.destroy();
}

#[test]
fn passes_recycle_across_frames() {
    let device = device_or_skip!();
    let texture = device
        .create_texture(TextureDescriptor::d2(
            Format::U8RgbaNorm,
            4,
            4,
            TextureUsage::RENDER_TARGET,
        ))
        .expect("texture creation");
    let target = device
        .create_render_target_from_texture(texture.clone())
        .expect("render target creation");

    // Several frames of clear-only passes; the pooled pass objects are
    // checked out and released each time.
    for frame in 0..3 {
        device.begin_frame();
        for _ in 0..2 {
            let pass = device.create_render_pass(RenderPassDescriptor {
                color_attachments: vec![ColorAttachment {
                    render_target: target.clone(),
                    resolve_to: None,
                    clear_color: Some(Color {
                        r: frame as f32 / 3.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }),
                }],
                depth_stencil_attachment: None,
                occlusion_query_pool: None,
            });
            device.submit_pass(pass);
        }
        device.end_frame();
    }

    target.destroy();
    texture.destroy();
}

#[test]
fn leak_check_tracks_undestroyed_resources() {
    let device = device_or_skip!();
    device.set_resource_leak_check(true);
    let buffer = device
        .create_buffer(BufferDescriptor {
            size: 4,
            usage: BufferUsage::UNIFORM,
            debug_name: Some("leaky".to_string()),
        })
        .expect("buffer creation");

    let leaks = device.check_for_leaks();
    assert!(leaks.iter().any(|(id, ..)| *id == buffer.id()));

    buffer.destroy();
    assert!(device.check_for_leaks().is_empty());
    device.set_resource_leak_check(false);
}
