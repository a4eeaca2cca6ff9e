use crate::{
    config::AssetSource, data_structures::geometry::ImageData, error::AssetError,
    resources::load_binary,
};

/// Loads an equirectangular image. The format is guessed from the file contents.
pub async fn load_panorama(source: &AssetSource, path: &str) -> Result<ImageData, AssetError> {
    let bytes = load_binary(source, path).await?;
    let img = image::load_from_memory(&bytes)?;
    let data = ImageData::from_image(&img);
    if data.width != data.height * 2 {
        // still usable, just stretched
        log::warn!(
            "{} is {}x{}, equirectangular images are twice as wide as high",
            path,
            data.width,
            data.height
        );
    }
    Ok(data)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn png_panoramas_decode_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([10, 20, 30]));
        img.save(dir.path().join("panorama.png")).unwrap();
        let source = AssetSource::Local(dir.path().to_path_buf());

        let data = load_panorama(&source, "panorama.png").await.unwrap();
        assert_eq!((data.width, data.height), (8, 4));
        assert_eq!(&data.rgba[..4], &[10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn undecodable_images_are_image_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("panorama.jpg"), b"\x00\x01garbage").unwrap();
        let source = AssetSource::Local(dir.path().to_path_buf());

        let result = load_panorama(&source, "panorama.jpg").await;
        assert!(matches!(result, Err(AssetError::Image(_))));
    }
}
