//! Texture data, material roles and the uploaded texture record.

use std::path::Path;

use image::{RgbaImage, imageops::FilterType};

/// Semantic purpose of a texture, independent of the file format's slot names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureRole {
    /// Resolution order used for every mesh.
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Diffuse,
        TextureRole::Specular,
        TextureRole::Normal,
        TextureRole::Height,
    ];

    /// Uniform-style name, e.g. `texture_diffuse`.
    pub fn as_str(self) -> &'static str {
        match self {
            TextureRole::Diffuse => "texture_diffuse",
            TextureRole::Specular => "texture_specular",
            TextureRole::Normal => "texture_normal",
            TextureRole::Height => "texture_height",
        }
    }

    /// Colour data is stored in sRGB; everything else is linear.
    pub fn is_color(self) -> bool {
        matches!(self, TextureRole::Diffuse)
    }
}

/// An uploaded texture. `path` is the cache key exactly as the material
/// declared it.
#[derive(Debug)]
pub struct Texture<H> {
    path: String,
    role: TextureRole,
    width: u32,
    height: u32,
    handle: H,
}

impl<H> Texture<H> {
    pub fn new(path: impl Into<String>, role: TextureRole, width: u32, height: u32, handle: H) -> Self {
        Self {
            path: path.into(),
            role,
            width,
            height,
            handle,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode any image format enabled on the `image` crate and convert it
    /// to RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> image::ImageResult<Self> {
        let path = path.as_ref();
        log::debug!("Decoding texture {:?}", path);

        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("Decoded texture {}x{} from {:?}", width, height, path);

        Ok(Self::from_image(rgba))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new_rgba8(width, height, image.into_raw())
    }

    /// Single-colour texture, used for roles a mesh has no texture for.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::new_rgba8(1, 1, rgba.to_vec())
    }

    /// Create a simple test texture (checkerboard pattern).
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self::new_rgba8(size, size, data)
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Full mip chain, base level first. Each level halves the previous
    /// one (rounding down, never below 1) with a triangle filter.
    pub fn mip_chain(&self) -> Vec<TextureData> {
        let count = self.mip_level_count() as usize;
        let mut levels = Vec::with_capacity(count);
        levels.push(self.clone());

        let Some(mut current) = RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            return levels;
        };
        while levels.len() < count {
            let w = (current.width() / 2).max(1);
            let h = (current.height() / 2).max(1);
            current = image::imageops::resize(&current, w, h, FilterType::Triangle);
            levels.push(Self::new_rgba8(w, h, current.as_raw().clone()));
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_down_to_one_pixel() {
        let tex = TextureData::create_test_texture(16);
        let chain = tex.mip_chain();
        let sizes: Vec<_> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(16, 16), (8, 8), (4, 4), (2, 2), (1, 1)]);
        assert!(chain.iter().all(TextureData::is_valid));
    }

    #[test]
    fn mip_chain_of_non_square_texture() {
        let tex = TextureData::new_rgba8(8, 2, vec![200; 8 * 2 * 4]);
        assert_eq!(tex.mip_level_count(), 4);
        let last = tex.mip_chain().pop().unwrap();
        assert_eq!((last.width, last.height), (1, 1));
        // Uniform input stays uniform after filtering.
        assert!(last.data.iter().all(|&b| b == 200));
    }

    #[test]
    fn solid_texture_is_single_pixel() {
        let tex = TextureData::solid([1, 2, 3, 4]);
        assert!(tex.is_valid());
        assert_eq!(tex.mip_level_count(), 1);
        assert_eq!(tex.mip_chain().len(), 1);
    }

    #[test]
    fn role_order_and_names() {
        let names: Vec<_> = TextureRole::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            names,
            ["texture_diffuse", "texture_specular", "texture_normal", "texture_height"]
        );
        assert!(TextureRole::Diffuse.is_color());
        assert!(!TextureRole::Normal.is_color());
    }
}
