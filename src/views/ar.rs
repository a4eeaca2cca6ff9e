//! The AR model viewer.
//!
//! The model spins slowly, drifts to the right and bobs along a sine wave keyed
//! off its horizontal position. Past x = 3 it reappears at x = -3.

use std::time::Duration;

use crate::{
    animation::{AnimationCursor, Spin, wave},
    config::{AssetKind, LightConfig, Placement, ViewConfig},
    data_structures::{
        scene_graph::{Scene, SceneNode},
        transform::Transform,
    },
    error::AssetError,
    resources::LoadedAsset,
    views::{SceneView, add_lights, unexpected},
};

pub struct ArView {
    lights: Vec<LightConfig>,
    placement: Placement,
    spin: Spin,
    drift: AnimationCursor,
    wave_amplitude: f32,
}

impl ArView {
    pub fn new(config: &ViewConfig) -> Self {
        let motion = &config.motion;
        Self {
            lights: config.lights.clone(),
            placement: config.placement.clone(),
            spin: Spin::new(motion.spin_step),
            drift: AnimationCursor::new(
                config.placement.position.x,
                motion.drift_step,
                motion.drift_upper,
                motion.drift_reset,
            ),
            wave_amplitude: motion.wave_amplitude,
        }
    }
}

impl SceneView for ArView {
    fn on_init(&mut self, scene: &mut Scene) {
        add_lights(scene, &self.lights);
    }

    fn on_asset(&mut self, asset: LoadedAsset) -> Result<SceneNode, AssetError> {
        match asset {
            LoadedAsset::Model(model) => {
                let mut placed =
                    SceneNode::group("nft").with_transform(Transform::from(&self.placement));
                placed.add_child(model);
                self.drift.set(self.placement.position.x);
                Ok(placed)
            }
            other => Err(unexpected(AssetKind::Model, &other)),
        }
    }

    fn on_update(&mut self, node: &mut SceneNode, _dt: Duration) {
        let transform = &mut node.transform;
        transform.rotation.y = self.spin.advance(transform.rotation.y);
        let x = self.drift.advance();
        transform.position.x = x;
        transform.position.y = wave(x, self.wave_amplitude);
        log::trace!(
            "model position: x={:.2}, y={:.2}",
            transform.position.x,
            transform.position.y
        );
    }
}
