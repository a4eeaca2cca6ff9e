//! Asynchronous asset loading.
//!
//! Assets are fetched as bytes from an [`AssetSource`] (files natively, HTTP for
//! remote bases and on the web) and decoded into plain scene data. Nothing here
//! touches the GPU, so a load can run on any executor and hand its result back
//! to the view that requested it.

use crate::{
    config::{AssetKind, AssetRequest, AssetSource},
    data_structures::{geometry::ImageData, scene_graph::SceneNode},
    error::AssetError,
};

pub mod model;
pub mod texture;

/// A decoded asset, ready to be attached to a scene.
#[derive(Debug)]
pub enum LoadedAsset {
    Model(SceneNode),
    Panorama(ImageData),
}

impl LoadedAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            LoadedAsset::Model(_) => AssetKind::Model,
            LoadedAsset::Panorama(_) => AssetKind::Panorama,
        }
    }
}

/// Fetches and decodes the asset described by `request`.
pub async fn load_asset(
    request: AssetRequest,
    source: AssetSource,
) -> Result<LoadedAsset, AssetError> {
    log::info!("loading {:?} asset {}", request.kind, request.path);
    match request.kind {
        AssetKind::Model => model::load_model(&source, &request.path)
            .await
            .map(LoadedAsset::Model),
        AssetKind::Panorama => texture::load_panorama(&source, &request.path)
            .await
            .map(LoadedAsset::Panorama),
    }
}

#[cfg(target_arch = "wasm32")]
fn origin_url() -> Result<reqwest::Url, AssetError> {
    let origin = web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .ok_or_else(|| AssetError::Location("page origin is unavailable".to_string()))?;
    reqwest::Url::parse(&format!("{}/", origin))
        .map_err(|e| AssetError::Location(format!("{}: {}", origin, e)))
}

async fn fetch(url: reqwest::Url) -> Result<Vec<u8>, AssetError> {
    let http = |source| AssetError::Http {
        url: url.to_string(),
        source,
    };
    let response = reqwest::get(url.clone())
        .await
        .and_then(|response| response.error_for_status())
        .map_err(http)?;
    let bytes = response.bytes().await.map_err(http)?;
    Ok(bytes.to_vec())
}

fn join_url(base: &reqwest::Url, path: &str) -> Result<reqwest::Url, AssetError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AssetError::Location(format!("{}{}: {}", base, path, e)))
}

/// Reads the bytes behind `path`, resolved against `source`.
pub async fn load_binary(source: &AssetSource, path: &str) -> Result<Vec<u8>, AssetError> {
    match source {
        AssetSource::Remote(base) => fetch(join_url(base, path)?).await,
        #[cfg(target_arch = "wasm32")]
        AssetSource::Origin => fetch(join_url(&origin_url()?, path)?).await,
        #[cfg(not(target_arch = "wasm32"))]
        AssetSource::Origin => Err(AssetError::Location(format!(
            "{} has no page origin to resolve against outside the browser",
            path
        ))),
        #[cfg(not(target_arch = "wasm32"))]
        AssetSource::Local(base) => {
            let full = base.join(path.trim_start_matches('/'));
            tokio::fs::read(&full).await.map_err(|source| AssetError::Io {
                path: full.display().to_string(),
                source,
            })
        }
        #[cfg(target_arch = "wasm32")]
        AssetSource::Local(base) => Err(AssetError::Location(format!(
            "{} cannot be read from the file system in the browser",
            base.join(path).display()
        ))),
    }
}

/// Resolves `uri` relative to the directory of `path`.
pub(crate) fn sibling(path: &str, uri: &str) -> String {
    match path.rfind('/') {
        Some(idx) => format!("{}/{}", &path[..idx], uri),
        None => uri.to_string(),
    }
}
