//! CPU-side geometry and materials.
//!
//! Geometry and materials carry stable ids. The renderer uploads them lazily
//! and keys its GPU buffers and textures by these ids, which is what lets a view
//! release every GPU resource of a scene by walking it.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Triangle list geometry.
#[derive(Clone, Debug)]
pub struct Geometry {
    id: GeometryId,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: GeometryId(next_id()),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    /// A UV sphere with equirectangular texture coordinates.
    ///
    /// `u` runs 0..1 around the equator and `v` 0..1 from the north to the south
    /// pole, so an equirectangular image maps onto it unchanged.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let theta = v * std::f32::consts::PI;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * std::f32::consts::TAU;
                let normal = [-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin()];
                vertices.push(Vertex {
                    position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                    normal,
                    tex_coords: [u, v],
                });
            }
        }

        let row = width_segments + 1;
        let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // the pole rows collapse into single triangles
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        Self::new(vertices, indices)
    }
}

/// Decoded RGBA8 image data.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    id: MaterialId,
    pub base_color: [f32; 4],
    pub texture: Option<ImageData>,
    /// Skips lighting, e.g. for panoramas.
    pub unlit: bool,
}

impl Material {
    pub fn new(base_color: [f32; 4], texture: Option<ImageData>) -> Self {
        Self {
            id: MaterialId(next_id()),
            base_color,
            texture,
            unlit: false,
        }
    }

    pub fn unlit(texture: ImageData) -> Self {
        Self {
            unlit: true,
            ..Self::new([1.0; 4], Some(texture))
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0; 4], None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_gets_its_own_id() {
        let a = Geometry::new(vec![], vec![]);
        let b = Geometry::new(vec![], vec![]);
        assert_ne!(a.id(), b.id());
        assert_ne!(Material::default().id(), Material::default().id());
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let sphere = Geometry::sphere(500.0, 60, 40);
        assert_eq!(sphere.vertices.len(), 61 * 41);
        for vertex in &sphere.vertices {
            let [x, y, z] = vertex.position;
            let r = (x * x + y * y + z * z).sqrt();
            assert!((r - 500.0).abs() < 0.01, "vertex at radius {}", r);
        }
    }

    #[test]
    fn sphere_indices_reference_existing_vertices() {
        let sphere = Geometry::sphere(1.0, 8, 6);
        assert_eq!(sphere.indices.len() % 3, 0);
        // two triangles per quad minus one per quad in each pole row
        assert_eq!(sphere.indices.len(), ((8 * 6 * 2) - 8 * 2) * 3);
        let count = sphere.vertices.len() as u32;
        assert!(sphere.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn images_are_stored_as_rgba() {
        let img = image::DynamicImage::new_rgb8(4, 2);
        let data = ImageData::from_image(&img);
        assert_eq!((data.width, data.height), (4, 2));
        assert_eq!(data.rgba.len(), 4 * 2 * 4);
    }
}
