//! The renderer seam.
//!
//! The scene lifecycle only talks to a [`Renderer`]; [`crate::context::GpuRenderer`]
//! is the wgpu implementation. GPU resources are created lazily from the scene
//! graph and released explicitly by id, since dropping a scene node does not
//! free the buffers and textures uploaded for it.

use crate::{
    camera::PerspectiveCamera,
    data_structures::{
        geometry::{GeometryId, MaterialId},
        scene_graph::{Scene, VisualResource},
    },
    error::RenderError,
};

pub trait Renderer {
    fn set_pixel_ratio(&mut self, pixel_ratio: f64);

    fn pixel_ratio(&self) -> f64;

    /// Resizes the output surface.
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn set_clear_colour(&mut self, colour: wgpu::Color);

    /// Renders one frame of `scene` as seen by `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;

    /// Frees the GPU buffers of a geometry. Returns `false` if none were uploaded.
    fn release_geometry(&mut self, geometry: GeometryId) -> bool;

    /// Frees the GPU texture and uniforms of a material. Returns `false` if none were uploaded.
    fn release_material(&mut self, material: MaterialId) -> bool;

    /// Frees everything the renderer still holds. Rendering after this fails.
    fn dispose(&mut self);
}

/// Counts of what [`release_scene`] handed back to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Released {
    pub geometries: usize,
    pub materials: usize,
}

/// Walks `scene` and releases every geometry and material of every drawable node.
///
/// Resources count as released whether or not the renderer had uploaded them yet;
/// a mesh that was never drawn has nothing on the GPU to free.
pub fn release_scene<R: Renderer + ?Sized>(scene: &Scene, renderer: &mut R) -> Released {
    let mut released = Released::default();
    for resource in scene.visual_resources() {
        match resource {
            VisualResource::Geometry(id) => {
                renderer.release_geometry(id);
                released.geometries += 1;
            }
            VisualResource::Material(id) => {
                renderer.release_material(id);
                released.materials += 1;
            }
        }
    }
    released
}
