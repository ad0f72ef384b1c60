/// One source material, reduced to what the runtime consumes.
#[derive(Debug, Clone)]
pub struct Material {
    /// Diffuse color factor [r, g, b, a] in 0..1.
    pub diffuse_color: [f32; 4],
    /// Decoded diffuse texture, written as a sibling PNG on export.
    pub diffuse_image: Option<image::RgbaImage>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse_color: [1.0, 1.0, 1.0, 1.0],
            diffuse_image: None,
        }
    }
}

impl Material {
    /// Opaque-white substitute for faces without a usable material.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// File name of the sibling diffuse texture for material `index`.
    pub fn texture_file_name(asset_stem: &str, index: usize) -> String {
        format!("{asset_stem}_diffuse_{index}.png")
    }
}
