//! View configuration.
//!
//! Every constant a view needs lives here: camera frustum, clear colour, the asset
//! to load and where to load it from, and the per-tick motion of the loaded asset.
//! [`ViewConfig::ar`] and [`ViewConfig::vr`] hold the values of the two gallery views.

use std::{f32::consts::PI, path::PathBuf};

use crate::immersive::ImmersiveMode;

/// Environment variable that overrides the asset base (directory or `http(s)` URL).
pub const ASSET_BASE_ENV: &str = "GALLERY_ASSET_BASE";

/// Where asset paths are resolved against.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetSource {
    /// Development assets on the local file system.
    Local(PathBuf),
    /// Production assets behind a remote base URL.
    Remote(reqwest::Url),
    /// The origin the page was served from (web builds only).
    Origin,
}

impl AssetSource {
    /// Interprets `base` as a URL when it has an `http`/`https` scheme, as a directory otherwise.
    pub fn parse(base: &str) -> Result<Self, crate::error::AssetError> {
        if base.starts_with("http://") || base.starts_with("https://") {
            let base = if base.ends_with('/') {
                base.to_string()
            } else {
                format!("{}/", base)
            };
            reqwest::Url::parse(&base)
                .map(AssetSource::Remote)
                .map_err(|e| crate::error::AssetError::Location(format!("{}: {}", base, e)))
        } else {
            Ok(AssetSource::Local(PathBuf::from(base)))
        }
    }

    /// Reads [`ASSET_BASE_ENV`], falling back to the platform default.
    pub fn from_env() -> Self {
        match std::env::var(ASSET_BASE_ENV) {
            Ok(base) if !base.trim().is_empty() => match Self::parse(base.trim()) {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("ignoring {}: {}", ASSET_BASE_ENV, e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }
}

impl Default for AssetSource {
    fn default() -> Self {
        if cfg!(target_arch = "wasm32") {
            AssetSource::Origin
        } else {
            AssetSource::Local(PathBuf::from("./assets"))
        }
    }
}

/// The kind of asset a view loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// A binary glTF (GLB) or glTF model.
    Model,
    /// An equirectangular image.
    Panorama,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetRequest {
    pub kind: AssetKind,
    /// Path relative to the [`AssetSource`].
    pub path: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: cgmath::Point3<f32>,
}

/// Placement of a loaded asset inside the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub position: cgmath::Vector3<f32>,
    /// Euler angles in radians.
    pub rotation: cgmath::Vector3<f32>,
    pub scale: cgmath::Vector3<f32>,
}

/// Per-tick motion of a loaded asset.
///
/// All increments are per frame, not per second: every display refresh advances
/// the motion by exactly one step.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
    /// Yaw increment in radians.
    pub spin_step: f32,
    /// Horizontal drift increment, zero for no drift.
    pub drift_step: f32,
    /// Drift wraps once x exceeds this value...
    pub drift_upper: f32,
    /// ...and restarts here.
    pub drift_reset: f32,
    /// Amplitude of `sin(x)` applied to y, zero for no wave.
    pub wave_amplitude: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightConfig {
    pub color: u32,
    pub intensity: f32,
    /// `None` for ambient light.
    pub direction: Option<[f32; 3]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig {
    pub name: &'static str,
    pub camera: CameraConfig,
    pub clear_colour: wgpu::Color,
    pub lights: Vec<LightConfig>,
    pub asset: AssetRequest,
    pub source: AssetSource,
    pub placement: Placement,
    pub motion: MotionConfig,
    pub immersive: Option<ImmersiveMode>,
}

impl ViewConfig {
    /// The AR model viewer: a small model drifting right in front of the user.
    pub fn ar() -> Self {
        Self {
            name: "ar",
            camera: CameraConfig {
                fovy: cgmath::Deg(70.0),
                znear: 0.01,
                zfar: 40.0,
                position: cgmath::Point3::new(0.0, 0.0, 0.0),
            },
            // the camera feed shows through in AR
            clear_colour: wgpu::Color::TRANSPARENT,
            lights: vec![
                LightConfig {
                    color: 0x203899,
                    intensity: 1.0,
                    direction: None,
                },
                LightConfig {
                    color: 0x6fbcf0,
                    intensity: 1.0,
                    direction: Some([0.5, 1.0, 0.3]),
                },
            ],
            asset: AssetRequest {
                kind: AssetKind::Model,
                path: "nft-assets/nft.glb".to_string(),
            },
            source: AssetSource::from_env(),
            placement: Placement {
                position: cgmath::Vector3::new(0.0, 0.0, -2.0),
                rotation: cgmath::Vector3::new(PI / 6.0, 0.0, 0.0),
                scale: cgmath::Vector3::new(0.04, 0.04, 0.04),
            },
            motion: MotionConfig {
                spin_step: 0.002,
                drift_step: 0.0035,
                drift_upper: 3.0,
                drift_reset: -3.0,
                wave_amplitude: 0.5,
            },
            immersive: Some(ImmersiveMode::Ar),
        }
    }

    /// The VR panorama: an equirectangular image wrapped around the viewer.
    pub fn vr() -> Self {
        Self {
            name: "vr",
            camera: CameraConfig {
                fovy: cgmath::Deg(75.0),
                znear: 1.0,
                zfar: 1100.0,
                position: cgmath::Point3::new(0.0, 0.0, 0.0),
            },
            clear_colour: wgpu::Color::BLACK,
            lights: vec![LightConfig {
                color: 0xffffff,
                intensity: 1.0,
                direction: None,
            }],
            asset: AssetRequest {
                kind: AssetKind::Panorama,
                path: "nft-assets/panorama.jpg".to_string(),
            },
            source: AssetSource::from_env(),
            placement: Placement {
                position: cgmath::Vector3::new(0.0, 0.0, 0.0),
                rotation: cgmath::Vector3::new(0.0, 0.0, 0.0),
                // inverted on x so the sphere is seen from the inside
                scale: cgmath::Vector3::new(-1.0, 1.0, 1.0),
            },
            motion: MotionConfig {
                spin_step: 0.0005,
                drift_step: 0.0,
                drift_upper: 0.0,
                drift_reset: 0.0,
                wave_amplitude: 0.0,
            },
            immersive: Some(ImmersiveMode::Vr),
        }
    }

    pub fn with_source(mut self, source: AssetSource) -> Self {
        self.source = source;
        self
    }
}

/// Converts a `0xRRGGBB` colour to linear-ish float components.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_bases_become_remote_urls_with_trailing_slash() {
        let source = AssetSource::parse("https://cdn.example.com/gallery").unwrap();
        match source {
            AssetSource::Remote(url) => {
                assert_eq!(url.as_str(), "https://cdn.example.com/gallery/");
                assert_eq!(
                    url.join("nft-assets/nft.glb").unwrap().as_str(),
                    "https://cdn.example.com/gallery/nft-assets/nft.glb"
                );
            }
            other => panic!("expected remote source, got {:?}", other),
        }
    }

    #[test]
    fn other_bases_are_directories() {
        assert_eq!(
            AssetSource::parse("/srv/gallery").unwrap(),
            AssetSource::Local(PathBuf::from("/srv/gallery"))
        );
    }

    #[test]
    fn ar_view_uses_the_gallery_constants() {
        let config = ViewConfig::ar();
        assert_eq!(config.camera.fovy, cgmath::Deg(70.0));
        assert_eq!(config.camera.znear, 0.01);
        assert_eq!(config.camera.zfar, 40.0);
        assert_eq!(config.motion.drift_upper, 3.0);
        assert_eq!(config.motion.drift_reset, -3.0);
        assert_eq!(config.immersive, Some(ImmersiveMode::Ar));
        assert_eq!(config.asset.kind, AssetKind::Model);
    }

    #[test]
    fn hex_colours_split_into_channels() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(rgb(0x0000ff), [0.0, 0.0, 1.0]);
    }
}
