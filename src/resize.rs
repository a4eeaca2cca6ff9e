//! Keeps camera projection and surface size in step with the viewport.
//!
//! Every resize event is applied immediately; there is no debouncing.

use crate::{camera::PerspectiveCamera, renderer::Renderer};

/// Recomputes the camera aspect and projection and resizes the renderer surface.
/// A changed pixel ratio (the window moved to another display) is applied first.
///
/// Returns `false` without touching anything for a zero-area viewport, which is
/// what a minimised window reports.
pub fn apply<R: Renderer + ?Sized>(
    camera: &mut PerspectiveCamera,
    renderer: &mut R,
    width: u32,
    height: u32,
    pixel_ratio: f64,
) -> bool {
    if width == 0 || height == 0 {
        log::debug!("ignoring resize to {}x{}", width, height);
        return false;
    }
    if renderer.pixel_ratio() != pixel_ratio {
        renderer.set_pixel_ratio(pixel_ratio);
    }
    camera.set_aspect(width as f32 / height as f32);
    camera.update_projection_matrix();
    renderer.set_size(width, height);
    true
}
