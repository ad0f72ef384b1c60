pub mod axes;
pub mod gltf_loader;

use std::path::Path;

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{ProcyonError, Result};
use crate::scene::SceneDescription;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Gltf,
    Glb,
}

impl InputFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "gltf" => Ok(InputFormat::Gltf),
            "glb" => Ok(InputFormat::Glb),
            _ => Err(ProcyonError::Input(format!(
                "Unsupported file format: .{ext}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Gltf => "glTF",
            InputFormat::Glb => "GLB",
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the full ingestion stage.
pub fn ingest(config: &ExportConfig) -> Result<SceneDescription> {
    if !config.input.exists() {
        return Err(ProcyonError::Input(format!(
            "Input file not found: {}",
            config.input.display()
        )));
    }

    let format = InputFormat::from_path(&config.input)?;
    info!(format = %format, path = %config.input.display(), "Detected input format");

    let scene = match format {
        InputFormat::Gltf | InputFormat::Glb => gltf_loader::load_gltf(&config.input, config)?,
    };

    debug!(
        triangles = scene.triangles.len(),
        materials = scene.materials.len(),
        joints = scene.joints.len(),
        animations = scene.animations.len(),
        "Ingested scene"
    );

    Ok(scene)
}
