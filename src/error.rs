//! Error types for asset loading and rendering.
//!
//! None of these errors escapes the scene lifecycle as a panic: asset errors are
//! reported through [`crate::lifecycle::AssetOutcome`], render errors through
//! [`crate::frame::TickOutcome`].

use thiserror::Error;

/// Why an asset could not be fetched or decoded.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch asset {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid asset location {0}")]
    Location(String),
    #[error("failed to decode model: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported asset content: {0}")]
    Unsupported(String),
}

/// Why a frame could not be rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The surface is lost or outdated and must be reconfigured before the next frame.
    #[error("surface must be reconfigured")]
    Outdated,
    #[error("surface error: {0}")]
    Surface(String),
    #[error("device lost")]
    DeviceLost,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("renderer was not initialised: {0}")]
    Uninitialised(String),
}

impl RenderError {
    /// Errors after which no further frame can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::DeviceLost | RenderError::OutOfMemory)
    }
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::Outdated,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Surface(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_device_loss_and_exhausted_memory_are_fatal() {
        assert!(RenderError::DeviceLost.is_fatal());
        assert!(RenderError::OutOfMemory.is_fatal());
        assert!(!RenderError::Outdated.is_fatal());
        assert!(!RenderError::Surface("timeout".into()).is_fatal());
        assert!(!RenderError::Uninitialised("no adapter".into()).is_fatal());
    }

    #[test]
    fn lost_and_outdated_surfaces_map_to_reconfigure() {
        assert_eq!(RenderError::from(wgpu::SurfaceError::Lost), RenderError::Outdated);
        assert_eq!(RenderError::from(wgpu::SurfaceError::Outdated), RenderError::Outdated);
    }

    #[test]
    fn an_out_of_memory_surface_stops_rendering() {
        let err = RenderError::from(wgpu::SurfaceError::OutOfMemory);
        assert_eq!(err, RenderError::OutOfMemory);
        assert!(err.is_fatal());
        assert!(!RenderError::from(wgpu::SurfaceError::Timeout).is_fatal());
    }
}
