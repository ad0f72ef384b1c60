pub mod config;
pub mod encode;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod process;
pub mod scene;
pub mod types;

pub use config::{Axis, ExportConfig, WeightSize};
pub use error::{ProcyonError, Result};
pub use pipeline::Pipeline;
