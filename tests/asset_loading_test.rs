#![cfg(not(target_arch = "wasm32"))]

use std::{path::Path, time::Duration};

use gallery_xr::{
    config::{AssetSource, ViewConfig},
    data_structures::scene_graph::{NodeKind, Scene, SceneNode},
    document::VirtualDocument,
    error::AssetError,
    lifecycle::{AssetOutcome, SceneController},
    views,
};

use crate::common::test_utils::{Journal, RecordingRenderer, Step};

mod common;

const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "token", "mesh": 0 }],
  "meshes": [{ "name": "token", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
  "buffers": [{ "uri": "triangle.bin", "byteLength": 44 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

fn write_triangle(dir: &Path) {
    let assets = dir.join("nft-assets");
    std::fs::create_dir_all(&assets).unwrap();
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    std::fs::write(assets.join("triangle.bin"), bin).unwrap();
    std::fs::write(assets.join("triangle.gltf"), TRIANGLE_GLTF).unwrap();
}

fn write_panorama(dir: &Path) {
    let assets = dir.join("nft-assets");
    std::fs::create_dir_all(&assets).unwrap();
    image::RgbImage::from_pixel(16, 8, image::Rgb([200, 120, 40]))
        .save(assets.join("panorama.jpg"))
        .unwrap();
}

fn find<'a>(scene: &'a Scene, name: &str) -> Option<&'a SceneNode> {
    fn walk<'a>(node: &'a SceneNode, name: &str) -> Option<&'a SceneNode> {
        if node.name == name {
            return Some(node);
        }
        node.children.iter().find_map(|child| walk(child, name))
    }
    scene.children().iter().find_map(|node| walk(node, name))
}

#[tokio::test]
async fn a_panorama_is_wrapped_around_the_viewer() {
    let dir = tempfile::tempdir().unwrap();
    write_panorama(dir.path());
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let config = ViewConfig::vr().with_source(AssetSource::Local(dir.path().to_path_buf()));
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::new(renderer_journal))
    });

    let (ticket, result) = mounted.pending.resolve().await;
    let outcome = mounted.controller.complete_asset_load(&ticket, result);
    let AssetOutcome::Attached(id) = outcome else {
        panic!("expected the panorama to attach, got {:?}", outcome);
    };

    mounted.controller.tick(Duration::from_millis(16));
    mounted.controller.tick(Duration::from_millis(16));

    let scene = mounted.controller.scene().unwrap();
    let sphere = scene.children().iter().find(|node| node.id() == id).unwrap();
    assert!((sphere.transform.rotation.y - 0.001).abs() < 1e-6);
    assert_eq!(sphere.transform.scale.x, -1.0);
    let NodeKind::Mesh { materials, .. } = &sphere.kind else {
        panic!("the panorama is not a mesh: {:?}", sphere.name);
    };
    let material = &materials[0];
    let texture = material.texture.as_ref().unwrap();
    assert_eq!((texture.width, texture.height), (16, 8));
    assert!(material.unlit);

    let report = mounted.controller.teardown(&mut doc, &mut mounted.handle);
    assert_eq!(report.released.geometries, 1);
    assert_eq!(report.released.materials, 1);
}

#[tokio::test]
async fn a_model_is_placed_in_front_of_the_camera() {
    let dir = tempfile::tempdir().unwrap();
    write_triangle(dir.path());
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut config = ViewConfig::ar().with_source(AssetSource::Local(dir.path().to_path_buf()));
    config.asset.path = "nft-assets/triangle.gltf".to_string();
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::new(renderer_journal))
    });

    let (ticket, result) = mounted.pending.resolve().await;
    assert!(matches!(
        mounted.controller.complete_asset_load(&ticket, result),
        AssetOutcome::Attached(_)
    ));

    let scene = mounted.controller.scene().unwrap();
    let placed = find(scene, "nft").unwrap();
    assert_eq!(placed.transform.position.z, -2.0);
    assert_eq!(placed.transform.scale.x, 0.04);
    let token = find(scene, "token").unwrap();
    let mesh = token
        .children
        .iter()
        .find_map(|child| match &child.kind {
            NodeKind::Mesh { geometry, .. } => Some(geometry),
            _ => None,
        })
        .unwrap();
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.indices, vec![0, 1, 2]);

    mounted.controller.tick(Duration::from_millis(16));
    assert_eq!(journal.count(|s| *s == Step::Render), 1);
}

#[tokio::test]
async fn a_missing_asset_fails_the_load_but_not_the_view() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let config = ViewConfig::ar().with_source(AssetSource::Local(dir.path().to_path_buf()));
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::new(renderer_journal))
    });

    let (ticket, result) = mounted.pending.resolve().await;
    assert!(matches!(result, Err(AssetError::Io { .. })));
    assert_eq!(
        mounted.controller.complete_asset_load(&ticket, result),
        AssetOutcome::Failed
    );
    assert!(mounted.controller.asset_failure().unwrap().contains("nft.glb"));

    mounted.controller.tick(Duration::from_millis(16));
    assert_eq!(journal.count(|s| *s == Step::Render), 1);
}

#[tokio::test]
async fn a_load_that_finishes_after_teardown_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    write_panorama(dir.path());
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let config = ViewConfig::vr().with_source(AssetSource::Local(dir.path().to_path_buf()));
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::new(renderer_journal))
    });
    let load = tokio::spawn(mounted.pending.resolve());

    mounted.controller.teardown(&mut doc, &mut mounted.handle);
    let (ticket, result) = load.await.unwrap();

    assert!(result.is_ok());
    assert_eq!(
        mounted.controller.complete_asset_load(&ticket, result),
        AssetOutcome::Discarded
    );
    assert!(mounted.controller.scene().is_none());
    assert_eq!(doc.surface_count(), 0);
}
