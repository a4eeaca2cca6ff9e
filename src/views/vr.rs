//! The VR panorama.
//!
//! An equirectangular image is wrapped around the viewer on the inside of a
//! large sphere that turns slowly. Until the image arrives, or if it never
//! does, the view shows its black backdrop.

use std::time::Duration;

use crate::{
    animation::Spin,
    config::{AssetKind, LightConfig, Placement, ViewConfig},
    data_structures::{
        geometry::{Geometry, Material},
        scene_graph::{Scene, SceneNode},
        transform::Transform,
    },
    error::AssetError,
    resources::LoadedAsset,
    views::{SceneView, add_lights, unexpected},
};

const SPHERE_RADIUS: f32 = 500.0;
const SPHERE_WIDTH_SEGMENTS: u32 = 60;
const SPHERE_HEIGHT_SEGMENTS: u32 = 40;

pub struct VrView {
    lights: Vec<LightConfig>,
    placement: Placement,
    spin: Spin,
}

impl VrView {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            lights: config.lights.clone(),
            placement: config.placement.clone(),
            spin: Spin::new(config.motion.spin_step),
        }
    }
}

impl SceneView for VrView {
    fn on_init(&mut self, scene: &mut Scene) {
        add_lights(scene, &self.lights);
    }

    fn on_asset(&mut self, asset: LoadedAsset) -> Result<SceneNode, AssetError> {
        match asset {
            LoadedAsset::Panorama(image) => {
                let sphere = Geometry::sphere(
                    SPHERE_RADIUS,
                    SPHERE_WIDTH_SEGMENTS,
                    SPHERE_HEIGHT_SEGMENTS,
                );
                Ok(
                    SceneNode::mesh("panorama", sphere, Material::unlit(image))
                        .with_transform(Transform::from(&self.placement)),
                )
            }
            other => Err(unexpected(AssetKind::Panorama, &other)),
        }
    }

    fn on_update(&mut self, node: &mut SceneNode, _dt: Duration) {
        node.transform.rotation.y = self.spin.advance(node.transform.rotation.y);
    }
}
