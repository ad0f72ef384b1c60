use std::path::PathBuf;

use clap::Parser;

/// World axis choice for `--forward` / `--up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Axis {
    #[value(name = "X")]
    PosX,
    #[value(name = "-X")]
    NegX,
    #[value(name = "Y")]
    PosY,
    #[value(name = "-Y")]
    NegY,
    #[value(name = "Z")]
    PosZ,
    #[value(name = "-Z")]
    NegZ,
}

impl Axis {
    /// Unit vector for this axis.
    pub fn vector(self) -> glam::Vec3 {
        match self {
            Axis::PosX => glam::Vec3::X,
            Axis::NegX => glam::Vec3::NEG_X,
            Axis::PosY => glam::Vec3::Y,
            Axis::NegY => glam::Vec3::NEG_Y,
            Axis::PosZ => glam::Vec3::Z,
            Axis::NegZ => glam::Vec3::NEG_Z,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::PosX => write!(f, "X"),
            Axis::NegX => write!(f, "-X"),
            Axis::PosY => write!(f, "Y"),
            Axis::NegY => write!(f, "-Y"),
            Axis::PosZ => write!(f, "Z"),
            Axis::NegZ => write!(f, "-Z"),
        }
    }
}

/// Storage width of one portable-format bone weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WeightSize {
    #[value(name = "1")]
    Byte,
    #[value(name = "2")]
    Short,
    #[value(name = "4")]
    Float,
}

impl WeightSize {
    /// Byte width written per weight slot.
    pub fn byte_size(self) -> u8 {
        match self {
            WeightSize::Byte => 1,
            WeightSize::Short => 2,
            WeightSize::Float => 4,
        }
    }
}

impl std::fmt::Display for WeightSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.byte_size())
    }
}

/// Fully resolved export configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub portable: bool,
    pub materials_enabled: bool,
    pub bone_weight_size: WeightSize,
    pub forward: Axis,
    pub up: Axis,
    pub ascii: bool,
    pub verbose: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            portable: false,
            materials_enabled: true,
            bone_weight_size: WeightSize::Byte,
            forward: Axis::NegZ,
            up: Axis::PosY,
            ascii: false,
            verbose: false,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "procyon-export",
    about = "Skinned mesh and animation exporter for the Procyon P3D/PP3D formats",
    version
)]
pub struct CliArgs {
    /// Input scene file (glTF or GLB)
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Place output into <FILE>
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Export in the portable (PP3D) format
    #[arg(long)]
    pub portable: bool,

    /// Don't export mesh materials
    #[arg(long)]
    pub no_materials: bool,

    /// Bone weight storage width in bytes (portable format only)
    #[arg(long = "bone_weight_size", value_enum, default_value = "1")]
    pub bone_weight_size: WeightSize,

    /// Forward axis of the exported asset
    #[arg(long, value_enum, default_value = "-Z", value_name = "AXIS")]
    pub forward: Axis,

    /// Up axis of the exported asset
    #[arg(long, value_enum, default_value = "Y", value_name = "AXIS")]
    pub up: Axis,

    /// Write output as plain text (for inspection only)
    #[arg(long)]
    pub ascii: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl From<CliArgs> for ExportConfig {
    fn from(args: CliArgs) -> Self {
        ExportConfig {
            input: args.input,
            output: args.output,
            portable: args.portable,
            materials_enabled: !args.no_materials,
            bone_weight_size: args.bone_weight_size,
            forward: args.forward,
            up: args.up,
            ascii: args.ascii,
            verbose: args.verbose,
        }
    }
}
