//! Backend-free SPIR-V transpilation: MSL and HLSL text generation, both
//! built on `spirv-cross2` (component D).

mod hlsl;
mod msl;

pub use hlsl::transpile_to_hlsl;
pub use msl::{transpile_compute_to_msl, transpile_graphics_to_msl};

/// The `(source, cleansed entry point)` pair every MSL transpile returns.
/// See [`transpile_graphics_to_msl`] for why the entry point can differ from
/// what the caller passed in.
pub type MslTranspileOutput = (String, String);
