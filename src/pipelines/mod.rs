//! Render pipelines and the uniforms they bind.

pub mod light;
pub mod scene;
