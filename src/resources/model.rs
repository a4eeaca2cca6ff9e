//! glTF / GLB model decoding into scene nodes.

use crate::{
    config::AssetSource,
    data_structures::{
        geometry::{Geometry, ImageData, Material, Vertex},
        scene_graph::SceneNode,
        transform::Transform,
    },
    error::AssetError,
    resources::{load_binary, sibling},
};

pub async fn load_model(source: &AssetSource, path: &str) -> Result<SceneNode, AssetError> {
    let bytes = load_binary(source, path).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => {
                    return Err(AssetError::Unsupported(format!(
                        "{} references a binary chunk it does not contain",
                        path
                    )));
                }
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(AssetError::Unsupported(format!(
                    "{} embeds base64 buffers; export it as GLB",
                    path
                )));
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(source, &sibling(path, uri)).await?);
            }
        }
    }

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let texture = match pbr.base_color_texture() {
            Some(info) => Some(
                load_image(source, path, &buffer_data, info.texture().source().source()).await?,
            ),
            None => None,
        };
        materials.push(Material::new(pbr.base_color_factor(), texture));
    }

    let mut roots = Vec::new();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            roots.push(to_scene_node(&node, &buffer_data, &materials));
        }
    }

    let mut root = SceneNode::group(path.rsplit('/').next().unwrap_or(path));
    root.children = roots;
    log::info!("decoded {} with {} nodes", path, root.count());
    Ok(root)
}

async fn load_image(
    source: &AssetSource,
    path: &str,
    buffers: &[Vec<u8>],
    image: gltf::image::Source<'_>,
) -> Result<ImageData, AssetError> {
    let img = match image {
        gltf::image::Source::View { view, mime_type: _ } => {
            let buffer = &buffers[view.buffer().index()];
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .ok_or_else(|| {
                    AssetError::Unsupported(format!("{} has an image view out of bounds", path))
                })?;
            image::load_from_memory(bytes)?
        }
        gltf::image::Source::Uri { uri, mime_type: _ } => {
            let bytes = load_binary(source, &sibling(path, uri)).await?;
            image::load_from_memory(&bytes)?
        }
    };
    Ok(ImageData::from_image(&img))
}

fn to_scene_node(
    node: &gltf::Node<'_>,
    buffers: &[Vec<u8>],
    materials: &[Material],
) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut scene_node = SceneNode::group(node.name().unwrap_or("node"))
        .with_transform(Transform::from_decomposed(translation, rotation, scale));

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("mesh");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("skipping {:?} primitive of mesh {}", primitive.mode(), name);
                continue;
            }
            let Some(geometry) = read_geometry(&primitive, buffers) else {
                log::warn!("skipping primitive without positions in mesh {}", name);
                continue;
            };
            let material = primitive
                .material()
                .index()
                .and_then(|idx| materials.get(idx))
                .cloned()
                .unwrap_or_default();
            scene_node.add_child(SceneNode::mesh(name, geometry, material));
        }
    }

    for child in node.children() {
        scene_node.add_child(to_scene_node(&child, buffers, materials));
    }
    scene_node
}

fn read_geometry(primitive: &gltf::Primitive<'_>, buffers: &[Vec<u8>]) -> Option<Geometry> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<Vertex> = reader
        .read_positions()?
        .map(|position| Vertex {
            position,
            // unlit meshes without normals still get lit from above
            normal: [0.0, 1.0, 0.0],
            tex_coords: [0.0, 0.0],
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    Some(Geometry::new(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A GLB with one triangle, one material and a node translated by (0, 0, -1).
    fn triangle_glb() -> Vec<u8> {
        let mut bin: Vec<u8> = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"name": "nft", "mesh": 0, "translation": [0.0, 0.0, -1.0]}}],
  "meshes": [{{"name": "token", "primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
  "materials": [{{"pbrMetallicRoughness": {{"baseColorFactor": [1.0, 0.5, 0.25, 1.0]}}}}],
  "buffers": [{{"byteLength": {len}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#,
            len = bin.len()
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn glb_meshes_become_scene_nodes() {
        use crate::data_structures::scene_graph::NodeKind;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nft-assets")).unwrap();
        std::fs::write(dir.path().join("nft-assets/nft.glb"), triangle_glb()).unwrap();
        let source = AssetSource::Local(dir.path().to_path_buf());

        let root = load_model(&source, "nft-assets/nft.glb").await.unwrap();
        assert_eq!(root.name, "nft.glb");
        let node = &root.children[0];
        assert_eq!(node.name, "nft");
        assert_eq!(node.transform.position, cgmath::Vector3::new(0.0, 0.0, -1.0));
        match &node.children[0].kind {
            NodeKind::Mesh {
                geometry,
                materials,
            } => {
                assert_eq!(geometry.vertices.len(), 3);
                assert_eq!(geometry.indices, vec![0, 1, 2]);
                assert_eq!(geometry.vertices[1].position, [1.0, 0.0, 0.0]);
                assert_eq!(materials[0].base_color, [1.0, 0.5, 0.25, 1.0]);
            }
            other => panic!("expected a mesh, got {:?}", other),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.glb"), b"not a model").unwrap();
        let source = AssetSource::Local(dir.path().to_path_buf());
        let result = load_model(&source, "broken.glb").await;
        assert!(matches!(result, Err(AssetError::Gltf(_))));
    }
}
