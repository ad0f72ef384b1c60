use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::ExportConfig;
use crate::encode::{self, fixed, portable, Sink};
use crate::error::{ProcyonError, Result};
use crate::ingestion;
use crate::process;
use crate::scene::SceneDescription;
use crate::types::{Material, ProcyonData};

/// Summary of a completed export run.
#[derive(Debug)]
pub struct ExportResult {
    pub meshes: usize,
    pub vertices: u32,
    pub indices: u32,
    pub bone_groups: usize,
    pub textures: usize,
    pub duration: Duration,
}

/// Pipeline orchestrator -- drives the export stages.
pub struct Pipeline;

impl Pipeline {
    /// Run the full export pipeline on the configured input file.
    pub fn run(config: &ExportConfig) -> Result<ExportResult> {
        info!(input = %config.input.display(), "Starting export");
        let scene = ingestion::ingest(config)?;
        Self::export_scene(config, &scene)
    }

    /// Export an already-resolved scene description.
    pub fn export_scene(config: &ExportConfig, scene: &SceneDescription) -> Result<ExportResult> {
        let start = Instant::now();

        let mut data = process::assemble(scene);

        if config.portable && scene.has_skeleton() {
            process::partition(&mut data)?;
        }

        let asset_stem = asset_stem(&config.output)?;
        encode::validate(&data, &asset_stem, config.portable)?;

        write_asset(config, &data, &asset_stem)?;

        let textures = if config.materials_enabled {
            write_diffuse_textures(&config.output, &data)?
        } else {
            0
        };

        let duration = start.elapsed();
        info!(
            output = %config.output.display(),
            meshes = data.meshes.len(),
            vertices = data.vertex_total,
            indices = data.index_total,
            bone_groups = data.bone_groups.len(),
            textures,
            elapsed = ?duration,
            "Export complete"
        );

        Ok(ExportResult {
            meshes: data.meshes.len(),
            vertices: data.vertex_total,
            indices: data.index_total,
            bone_groups: data.bone_groups.len(),
            textures,
            duration,
        })
    }
}

/// File stem of the output path; names the asset inside the file (texture
/// references are derived from it).
fn asset_stem(output: &Path) -> Result<String> {
    output
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            ProcyonError::Output(format!("Output path has no file stem: {}", output.display()))
        })
}

/// Serialize to `<output>.tmp` and rename into place, so a failed run
/// never leaves a truncated asset behind.
fn write_asset(config: &ExportConfig, data: &ProcyonData, asset_stem: &str) -> Result<()> {
    let mut tmp = config.output.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = File::create(&tmp)?;
    let mut sink = Sink::new(BufWriter::new(file), config.ascii);
    let written = if config.portable {
        portable::write_pp3d(&mut sink, data, asset_stem, config.bone_weight_size)
    } else {
        fixed::write_p3d(&mut sink, data, asset_stem)
    };
    drop(sink);

    if let Err(e) = written {
        if let Err(remove) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %remove, "Failed to remove temp file");
        }
        return Err(e);
    }

    fs::rename(&tmp, &config.output)?;
    Ok(())
}

/// Write each textured material's diffuse image as a sibling PNG.
fn write_diffuse_textures(output: &Path, data: &ProcyonData) -> Result<usize> {
    let stem = asset_stem(output)?;
    let textured: Vec<(usize, &image::RgbaImage)> = data
        .materials
        .iter()
        .enumerate()
        .filter_map(|(m, material)| material.diffuse_image.as_ref().map(|img| (m, img)))
        .collect();

    textured.par_iter().try_for_each(|&(m, img)| {
        let name = Material::texture_file_name(&stem, m);
        let path = output.with_file_name(&name);
        info!(path = %path.display(), "Writing diffuse texture");
        img.save(&path)
            .map_err(|e| ProcyonError::Output(format!("Failed to write texture '{name}': {e}")))
    })?;

    Ok(textured.len())
}
