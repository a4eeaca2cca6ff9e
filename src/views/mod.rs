//! The gallery's 3D views.
//!
//! A [`SceneView`] decides what a mounted scene contains and how its asset moves;
//! the [`crate::lifecycle::SceneController`] owns everything else.

use std::time::Duration;

use crate::{
    config::{AssetKind, LightConfig, ViewConfig},
    data_structures::scene_graph::{Light, Scene, SceneNode},
    error::AssetError,
    resources::LoadedAsset,
};

pub mod ar;
pub mod vr;

pub use ar::ArView;
pub use vr::VrView;

pub trait SceneView {
    /// Adds everything that does not depend on the asset, such as lights.
    fn on_init(&mut self, scene: &mut Scene);

    /// Turns the loaded asset into the node that gets attached to the scene.
    fn on_asset(&mut self, asset: LoadedAsset) -> Result<SceneNode, AssetError>;

    /// Advances the attached asset by one tick.
    fn on_update(&mut self, node: &mut SceneNode, dt: Duration);
}

/// Picks the view matching the asset `config` asks for.
pub fn for_config(config: &ViewConfig) -> Box<dyn SceneView> {
    match config.asset.kind {
        AssetKind::Model => Box::new(ArView::new(config)),
        AssetKind::Panorama => Box::new(VrView::new(config)),
    }
}

pub(crate) fn add_lights(scene: &mut Scene, lights: &[LightConfig]) {
    for (idx, light) in lights.iter().enumerate() {
        let light = Light::from(light);
        let name = match light {
            Light::Ambient { .. } => format!("ambient light {}", idx),
            Light::Directional { .. } => format!("directional light {}", idx),
        };
        scene.add(SceneNode::light(name, light));
    }
}

pub(crate) fn unexpected(expected: AssetKind, asset: &LoadedAsset) -> AssetError {
    AssetError::Unsupported(format!(
        "expected a {:?} asset but got a {:?}",
        expected,
        asset.kind()
    ))
}
