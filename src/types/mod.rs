mod asset;
mod material;
mod mesh;
mod skeleton;
mod vertex;

pub use asset::{BoneGroup, ProcyonData};
pub use material::Material;
pub use mesh::MeshBucket;
pub use skeleton::{Animation, AnimationFrame, JointPose, SkeletonJoint};
pub use vertex::{normalized_weights, Vertex, MAX_INFLUENCES};
