//! HLSL source compilation (component B): DXC for SPIR-V/DXIL, and a
//! hand-rolled legacy FXC binding for DXBC.

mod legacy;

pub use legacy::compile_from_hlsl_legacy;

use crate::error::{Error, Result};
use crate::types::{CompileOptions, ShaderFormat, ShaderStage, SpirvModule};
use hassle_rs::compile_hlsl;

fn profile_string(stage: ShaderStage, options: &CompileOptions) -> String {
    let model = options.shader_model.unwrap_or(crate::types::ShaderModel::Sm6);
    format!("{}_{}", stage.hlsl_profile_prefix(), model.dxc_suffix())
}

/// Compile HLSL source to SPIR-V via DXC: request `-spirv` and pin the
/// target environment so descriptor-set/binding decorations come out
/// exactly as the descriptor-set convention expects.
pub fn compile_hlsl_to_spirv(
    source: &str,
    stage: ShaderStage,
    options: &CompileOptions,
) -> Result<SpirvModule> {
    let profile = profile_string(stage, options);
    let mut args = vec!["-spirv".to_string(), "-fspv-target-env=vulkan1.1".to_string()];
    if options.debug {
        args.push("-Od".to_string());
    }
    if let Some(include_dir) = &options.include_dir {
        args.push("-I".to_string());
        args.push(include_dir.display().to_string());
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let defines: Vec<(&str, Option<&str>)> = options
        .defines
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_deref()))
        .collect();

    let file_name = format!("{}.hlsl", options.entry_point);
    let binary = compile_hlsl(
        &file_name,
        source,
        &options.entry_point,
        &profile,
        &args,
        &defines,
    )
    .map_err(|e| Error::CompilationFailed(e.to_string()))?;

    SpirvModule::from_bytes(&binary)
}

/// Compile HLSL source directly to DXIL via DXC.
///
/// Requires [`crate::backend::Loader::dxil_available`] to have reported
/// `true`; the orchestrator is responsible for checking that before calling
/// in, since a missing signing library produces an unsigned, unusable
/// container rather than an outright DXC error.
pub fn compile_hlsl_to_dxil(
    source: &str,
    stage: ShaderStage,
    options: &CompileOptions,
) -> Result<Vec<u8>> {
    let profile = profile_string(stage, options);
    let mut args = vec!["-enable-16bit-types".to_string(), "-HV".to_string(), "2021".to_string()];
    if options.debug {
        args.push("-Od".to_string());
    }
    if let Some(include_dir) = &options.include_dir {
        args.push("-I".to_string());
        args.push(include_dir.display().to_string());
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let defines: Vec<(&str, Option<&str>)> = options
        .defines
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_deref()))
        .collect();

    let file_name = format!("{}.hlsl", options.entry_point);
    compile_hlsl(
        &file_name,
        source,
        &options.entry_point,
        &profile,
        &args,
        &defines,
    )
    .map_err(|e| Error::CompilationFailed(e.to_string()))
}

/// Which formats DXC can itself produce straight from HLSL source.
pub fn dxc_target_formats() -> &'static [ShaderFormat] {
    &[ShaderFormat::Spirv, ShaderFormat::Dxil]
}
