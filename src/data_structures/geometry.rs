use cgmath::{InnerSpace, Matrix3, Rad};

use crate::data_structures::model::ModelVertex;

/// Indexed triangle list kept on the CPU until the owning node is uploaded.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Rotate positions and normals around the X axis in place.
    pub fn rotate_x(&mut self, angle: Rad<f32>) {
        let rotation = Matrix3::from_angle_x(angle);
        for vertex in self.vertices.iter_mut() {
            let position: cgmath::Vector3<f32> = vertex.position.into();
            let normal: cgmath::Vector3<f32> = vertex.normal.into();
            vertex.position = (rotation * position).into();
            vertex.normal = (rotation * normal).normalize().into();
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/**
 * A flat quad of `width` x `height` centred on the origin in the XY plane,
 * facing +Z and split into `width_segments` x `height_segments` cells.
 *
 * Rows run top to bottom so texture coordinates match the usual image
 * orientation (v = 0 at the top edge).
 */
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;

    let mut vertices = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            vertices.push(ModelVertex {
                position: [x, -y, 0.0],
                tex_coords: [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
                normal: [0.0, 0.0, 1.0],
            });
        }
    }

    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    let row = grid_x + 1;
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = (ix + 1) + row * (iy + 1);
            let d = (ix + 1) + row * iy;
            // counter-clockwise when seen from +Z
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Geometry { vertices, indices }
}
