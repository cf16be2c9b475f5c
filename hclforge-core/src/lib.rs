//! hclforge Core
//!
//! Schema-driven generation of HCL configuration templates: provider
//! schemas are reduced to a field model, turned into template source,
//! rendered against concrete values, composed into one document and
//! normalized for comparison.

pub mod builder;
pub mod export;
pub mod field;
pub mod normalizer;
pub mod path;
pub mod registry;
pub mod schema;
pub mod store;
pub mod synthesizer;
pub mod template;
pub mod transform;
pub mod value;
