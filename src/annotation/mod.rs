pub mod builder;
pub mod io;
pub mod set;

pub use builder::{AnnotationBuilder, AttributeKeys};
pub use set::FeatureSet;
