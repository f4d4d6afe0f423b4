//! Cross-compilation kernel for translating SPIR-V/HLSL shaders between
//! SPIR-V, DXBC, DXIL, MSL, HLSL text, and JSON reflection metadata.
//!
//! The public surface is [`Orchestrator`]: construct one per process,
//! point it at a [`ShaderSource`], and ask for a [`ShaderFormat`]. Each
//! submodule implements one component of the pipeline and can be used
//! standalone where a caller only needs part of it (reflection without
//! translation, for instance).

pub mod backend;
pub mod convention;
pub mod error;
pub mod hlsl;
pub mod orchestrate;
pub mod reflect;
#[cfg(test)]
mod testutil;
pub mod transpile;
pub mod types;

pub use backend::{BackendCapabilities, Loader};
pub use convention::BindingLayout;
pub use error::{Error, Result};
pub use orchestrate::{Orchestrator, TranslatedShader};
pub use reflect::{
    compute_metadata_json, graphics_metadata_json, list_resources, reflect_compute,
    reflect_graphics,
};
pub use types::{
    CompileOptions, ComputePipelineMetadata, GraphicsShaderMetadata, OwnedBuffer, ResourceDescriptor,
    ResourceKind, ShaderFormat, ShaderModel, ShaderSource, ShaderStage, SpirvModule,
};
