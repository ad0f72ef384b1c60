use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use procyon_export::config::{CliArgs, ExportConfig};
use procyon_export::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("procyon_export=debug")
    } else {
        EnvFilter::new("procyon_export=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config: ExportConfig = args.into();

    match Pipeline::run(&config) {
        Ok(result) => {
            println!(
                "Done: {} meshes, {} vertices, {} textures in {:.2}s",
                result.meshes,
                result.vertices,
                result.textures,
                result.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Export failed");
            Err(anyhow::anyhow!(e)).context("procyon-export failed")
        }
    }
}
