//! Image decoding for flag textures and the HDR environment.

use std::path::Path;

use crate::assets::AssetError;

/// Decoded 2D image, RGBA8, ready for GPU upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Declared color space; base-color textures are sRGB.
    pub srgb: bool,
}

/// Decoded equirectangular environment image, linear RGBA f32.
#[derive(Debug, Clone, PartialEq)]
pub struct EquirectImage {
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

/// Decode a standard image file to RGBA8. `flip_y` mirrors the rows for UV
/// conventions with the origin at the bottom; glTF textures keep the rows
/// as stored.
pub fn load_texture(path: &Path, flip_y: bool) -> Result<TextureImage, AssetError> {
    let image = image::open(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let mut rgba = image.to_rgba8();
    if flip_y {
        image::imageops::flip_vertical_in_place(&mut rgba);
    }
    let (width, height) = rgba.dimensions();
    Ok(TextureImage {
        pixels: rgba.into_raw(),
        width,
        height,
        srgb: true,
    })
}

/// Decode an equirectangular HDR file to linear float data.
pub fn load_equirect(path: &Path) -> Result<EquirectImage, AssetError> {
    let image = image::open(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let rgba = image.to_rgba32f();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::EmptyImage {
            path: path.display().to_string(),
        });
    }
    Ok(EquirectImage {
        pixels: rgba.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let err = load_texture(Path::new("no/such/flag.jpg"), false).unwrap_err();
        assert!(err.to_string().contains("no/such/flag.jpg"));
    }

    #[test]
    fn missing_equirect_reports_path() {
        let err = load_equirect(Path::new("no/such/sky.hdr")).unwrap_err();
        assert!(err.to_string().contains("no/such/sky.hdr"));
    }
}
