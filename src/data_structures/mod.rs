//! Scene data: transforms, geometry and materials, the scene graph, GPU textures.
//!
//! - `transform` holds per-node position, rotation and scale
//! - `geometry` contains CPU-side meshes and materials with stable resource ids
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` contains the GPU texture wrapper used by the wgpu renderer

pub mod geometry;
pub mod scene_graph;
pub mod texture;
pub mod transform;
