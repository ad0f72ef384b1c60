pub mod assemble;
pub mod quantize;
pub mod subskeleton;

pub use assemble::assemble;
pub use subskeleton::partition;
