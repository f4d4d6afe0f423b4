//! SPIR-V to HLSL text transpilation (component D).
//!
//! Used both as a standalone output format and as the first step of the
//! SPIR-V-to-legacy-DXBC route, which has to produce HLSL source for the
//! old FXC compiler to chew on.

use crate::error::{Error, Result};
use crate::types::{CompileOptions, ShaderModel, SpirvModule};
use spirv_cross2::targets::Hlsl;
use spirv_cross2::{Compiler, SpirvCrossContext};

fn shader_model_version(model: ShaderModel) -> u32 {
    match model {
        ShaderModel::Sm5 => 50,
        ShaderModel::Sm6 => 60,
    }
}

/// Transpile SPIR-V to HLSL source text.
///
/// Three options are set every time, matching the caller's expected binding
/// conventions regardless of shader model: the shader-model version,
/// non-writable UAV textures demoted to SRVs (HLSL-side, since a texture
/// never written to doesn't need UAV semantics), and vertex matrix-typed
/// inputs flattened to vector components (HLSL vertex inputs cannot be
/// matrices).
pub fn transpile_to_hlsl(spirv: &SpirvModule, options: &CompileOptions) -> Result<String> {
    let model = options.shader_model.unwrap_or(ShaderModel::Sm6);

    let context = SpirvCrossContext::new().map_err(|e| Error::TranspileFailed(e.to_string()))?;
    let mut compiler: Compiler<Hlsl> = context
        .create_compiler(spirv.words())
        .map_err(|e| Error::TranspileFailed(e.to_string()))?;

    let mut hlsl_options = Hlsl::options();
    hlsl_options.shader_model = shader_model_version(model);
    hlsl_options.nonwritable_uav_texture_as_srv = true;
    hlsl_options.flatten_matrix_vertex_input_semantics = true;

    let artifact = compiler
        .compile(&hlsl_options)
        .map_err(|e| Error::TranspileFailed(e.to_string()))?;
    Ok(artifact.to_string())
}
