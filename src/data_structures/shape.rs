//! Flat-coloured geometry: ground plane, walls, box wireframes and the
//! screen-space overlay (FPS digits and crosshair).
//!
//! Everything here is plain CPU data until it is uploaded into a
//! [`ShapeBuffer`]. Colours are linear RGBA because the surface is sRGB.

use cgmath::Point3;
use wgpu::util::DeviceExt;

use crate::data_structures::{bounds::BoundingBox, model::Vertex};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex for ColorVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts an 8-bit sRGB colour to linear RGBA.
pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> [f32; 4] {
    [
        srgb_to_linear(r),
        srgb_to_linear(g),
        srgb_to_linear(b),
        f32::from(a) / 255.0,
    ]
}

pub fn to_wgpu_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color[0]),
        g: f64::from(color[1]),
        b: f64::from(color[2]),
        a: f64::from(color[3]),
    }
}

/// The handful of named colours the scene uses.
pub mod palette {
    use super::rgba8;

    pub fn ray_white() -> [f32; 4] {
        rgba8(245, 245, 245, 255)
    }
    pub fn light_gray() -> [f32; 4] {
        rgba8(200, 200, 200, 255)
    }
    pub fn blue() -> [f32; 4] {
        rgba8(0, 121, 241, 255)
    }
    pub fn lime() -> [f32; 4] {
        rgba8(0, 158, 47, 255)
    }
    pub fn gold() -> [f32; 4] {
        rgba8(255, 203, 0, 255)
    }
    pub fn red() -> [f32; 4] {
        rgba8(230, 41, 55, 255)
    }
}

fn vertex(p: Point3<f32>, color: [f32; 4]) -> ColorVertex {
    ColorVertex {
        position: p.into(),
        color,
    }
}

/// A horizontal rectangle of `size` (x, z) centred on `center`, as two triangles.
pub fn plane(center: Point3<f32>, size: [f32; 2], color: [f32; 4]) -> Vec<ColorVertex> {
    let (hx, hz) = (size[0] * 0.5, size[1] * 0.5);
    let a = Point3::new(center.x - hx, center.y, center.z - hz);
    let b = Point3::new(center.x - hx, center.y, center.z + hz);
    let c = Point3::new(center.x + hx, center.y, center.z + hz);
    let d = Point3::new(center.x + hx, center.y, center.z - hz);
    [a, b, c, a, c, d]
        .into_iter()
        .map(|p| vertex(p, color))
        .collect()
}

// Corner indices of `BoundingBox::corners`, two triangles per face.
const CUBOID_TRIANGLES: [usize; 36] = [
    0, 1, 2, 0, 2, 3, // bottom
    4, 6, 5, 4, 7, 6, // top
    0, 4, 5, 0, 5, 1, // -z
    2, 6, 7, 2, 7, 3, // +z
    1, 5, 6, 1, 6, 2, // +x
    3, 7, 4, 3, 4, 0, // -x
];

// Twelve edges of `BoundingBox::corners`.
const BOX_EDGES: [usize; 24] = [
    0, 1, 1, 2, 2, 3, 3, 0, // bottom
    4, 5, 5, 6, 6, 7, 7, 4, // top
    0, 4, 1, 5, 2, 6, 3, 7, // pillars
];

/// A solid box of `size` (width, height, length) centred on `center`.
pub fn cuboid(center: Point3<f32>, size: [f32; 3], color: [f32; 4]) -> Vec<ColorVertex> {
    let half = cgmath::Vector3::new(size[0], size[1], size[2]) * 0.5;
    let corners = BoundingBox::new(center - half, center + half).corners();
    CUBOID_TRIANGLES
        .iter()
        .map(|&i| vertex(corners[i], color))
        .collect()
}

/// The outline of `bounds` as a line list.
pub fn wire_box(bounds: &BoundingBox, color: [f32; 4]) -> Vec<ColorVertex> {
    let corners = bounds.corners();
    BOX_EDGES
        .iter()
        .map(|&i| vertex(corners[i], color))
        .collect()
}

/*
 * Seven-segment layout, in units of digit width/height:
 *
 *    -a-
 *   f   b
 *    -g-
 *   e   c
 *    -d-
 */
const SEGMENTS: [[[f32; 2]; 2]; 7] = [
    [[0.0, 0.0], [1.0, 0.0]], // a
    [[1.0, 0.0], [1.0, 0.5]], // b
    [[1.0, 0.5], [1.0, 1.0]], // c
    [[0.0, 1.0], [1.0, 1.0]], // d
    [[0.0, 0.5], [0.0, 1.0]], // e
    [[0.0, 0.0], [0.0, 0.5]], // f
    [[0.0, 0.5], [1.0, 0.5]], // g
];

// Bit n set means segment n (a = 0) is lit.
const DIGITS: [u8; 10] = [
    0b0111111, // 0
    0b0000110, // 1
    0b1011011, // 2
    0b1001111, // 3
    0b1100110, // 4
    0b1101101, // 5
    0b1111101, // 6
    0b0000111, // 7
    0b1111111, // 8
    0b1101111, // 9
];

/// Maps a pixel position to normalized device coordinates.
pub fn px_to_ndc(px: [f32; 2], screen: [f32; 2]) -> [f32; 2] {
    [
        px[0] / screen[0].max(1.0) * 2.0 - 1.0,
        1.0 - px[1] / screen[1].max(1.0) * 2.0,
    ]
}

/// Draws `value` as seven-segment digits with its top-left corner at
/// `origin_px`. The result is a line list in normalized device coordinates.
pub fn seven_segment(
    value: u32,
    origin_px: [f32; 2],
    digit_px: [f32; 2],
    screen: [f32; 2],
    color: [f32; 4],
) -> Vec<ColorVertex> {
    let advance = digit_px[0] * 1.5;
    let mut vertices = Vec::new();
    for (slot, digit) in value.to_string().bytes().enumerate() {
        let mask = DIGITS[usize::from(digit - b'0')];
        let left = origin_px[0] + slot as f32 * advance;
        for (segment, ends) in SEGMENTS.iter().enumerate() {
            if mask & (1 << segment) == 0 {
                continue;
            }
            for end in ends {
                let px = [left + end[0] * digit_px[0], origin_px[1] + end[1] * digit_px[1]];
                let [x, y] = px_to_ndc(px, screen);
                vertices.push(ColorVertex {
                    position: [x, y, 0.0],
                    color,
                });
            }
        }
    }
    vertices
}

/// A small plus sign in the middle of the screen.
pub fn crosshair(screen: [f32; 2], half_px: f32, color: [f32; 4]) -> Vec<ColorVertex> {
    let (cx, cy) = (screen[0] * 0.5, screen[1] * 0.5);
    [
        [cx - half_px, cy],
        [cx + half_px, cy],
        [cx, cy - half_px],
        [cx, cy + half_px],
    ]
    .into_iter()
    .map(|px| {
        let [x, y] = px_to_ndc(px, screen);
        ColorVertex {
            position: [x, y, 0.0],
            color,
        }
    })
    .collect()
}

/// Coloured vertices uploaded to the GPU.
#[derive(Debug)]
pub struct ShapeBuffer {
    pub buffer: wgpu::Buffer,
    pub amount: usize,
}

impl ShapeBuffer {
    pub fn new(device: &wgpu::Device, label: &str, vertices: &[ColorVertex]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            amount: vertices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCREEN: [f32; 2] = [800.0, 450.0];

    #[test]
    fn eight_lights_every_segment() {
        let v = seven_segment(8, [10.0, 10.0], [8.0, 16.0], SCREEN, palette::lime());
        assert_eq!(v.len(), 7 * 2);
    }

    #[test]
    fn sixty_fps_uses_twelve_segments() {
        let v = seven_segment(60, [10.0, 10.0], [8.0, 16.0], SCREEN, palette::lime());
        assert_eq!(v.len(), 12 * 2);
    }

    #[test]
    fn one_is_two_segments_on_the_right() {
        let v = seven_segment(1, [0.0, 0.0], [8.0, 16.0], SCREEN, palette::lime());
        assert_eq!(v.len(), 4);
        let right = px_to_ndc([8.0, 0.0], SCREEN)[0];
        assert!(v.iter().all(|vertex| (vertex.position[0] - right).abs() < 1e-6));
    }

    #[test]
    fn top_left_pixel_is_the_ndc_corner() {
        let [x, y] = px_to_ndc([0.0, 0.0], SCREEN);
        assert_relative_eq!(x, -1.0);
        assert_relative_eq!(y, 1.0);
        let [x, y] = px_to_ndc(SCREEN, SCREEN);
        assert_relative_eq!(x, 1.0);
        assert_relative_eq!(y, -1.0);
    }

    #[test]
    fn wire_box_draws_twelve_edges_on_the_box() {
        let bb = BoundingBox::for_tree(Point3::new(0.0, 0.0, 0.0), 1.0);
        let lines = wire_box(&bb, palette::red());
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|v| bb.contains(v.position.into())));
    }

    #[test]
    fn wall_cuboid_has_the_requested_extent() {
        let wall = cuboid(Point3::new(-16.0, 2.5, 0.0), [1.0, 5.0, 32.0], palette::blue());
        assert_eq!(wall.len(), 36);
        let max_z = wall.iter().map(|v| v.position[2]).fold(f32::MIN, f32::max);
        let min_y = wall.iter().map(|v| v.position[1]).fold(f32::MAX, f32::min);
        assert_relative_eq!(max_z, 16.0);
        assert_relative_eq!(min_y, 0.0);
    }

    #[test]
    fn plane_faces_up() {
        let p = plane(Point3::new(0.0, 0.0, 0.0), [32.0, 32.0], palette::light_gray());
        let [a, b, c] = [p[0].position, p[1].position, p[2].position];
        let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let normal_y = ab[2] * ac[0] - ab[0] * ac[2];
        assert!(normal_y > 0.0);
    }

    #[test]
    fn white_stays_white_in_linear_space() {
        for channel in rgba8(255, 255, 255, 255) {
            assert_relative_eq!(channel, 1.0, epsilon = 1e-6);
        }
        assert_eq!(rgba8(0, 0, 0, 0), [0.0, 0.0, 0.0, 0.0]);
    }
}
