//! Route selection and the public one-call-per-shader API (component E).
//!
//! This is the only module that knows the full translation graph: which
//! source formats can reach which destination formats, and which routes
//! need an intermediate hop. Everything else in the crate is a pure
//! function of a SPIR-V module or HLSL string; this module is where those
//! functions get sequenced and where backend availability gets checked.

use crate::backend::{BackendCapabilities, Loader};
use crate::convention::BindingLayout;
use crate::error::{Error, Result};
use crate::hlsl::{compile_from_hlsl_legacy, compile_hlsl_to_dxil, compile_hlsl_to_spirv};
use crate::reflect::{reflect_compute, reflect_graphics};
use crate::transpile::{
    transpile_compute_to_msl, transpile_graphics_to_msl, transpile_to_hlsl, MslTranspileOutput,
};
use crate::types::{
    CompileOptions, ComputePipelineMetadata, GraphicsShaderMetadata, OwnedBuffer, ShaderFormat,
    ShaderModel, ShaderSource, ShaderStage, SpirvModule,
};

/// The result of a [`Orchestrator::translate`] call: the translated bytes
/// plus the entry point name downstream consumers must use.
///
/// For every route except SPIR-V/HLSL -> MSL, `entry_point` is simply the
/// caller's own [`CompileOptions::entry_point`] echoed back. The MSL routes
/// may return a different, *cleansed* name — SPIRV-Cross renames
/// entry points that collide with MSL/C++ reserved words, most commonly
/// `main` becoming `main0`. Callers must pass this field, not their
/// original entry point string, to whatever consumes the bytes next.
#[derive(Debug, Clone)]
pub struct TranslatedShader {
    pub bytes: OwnedBuffer,
    pub entry_point: String,
}

/// Ties backend discovery and the descriptor-set convention together into
/// the single entry point translation calls go through.
pub struct Orchestrator {
    loader: Loader,
    layout: BindingLayout,
}

impl Orchestrator {
    pub fn new() -> Self {
        Orchestrator {
            loader: Loader::new(),
            layout: BindingLayout::standard_layout(),
        }
    }

    pub fn with_layout(layout: BindingLayout) -> Self {
        Orchestrator {
            loader: Loader::new(),
            layout,
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn layout(&self) -> &BindingLayout {
        &self.layout
    }

    /// Resolve `source` to a SPIR-V module, compiling HLSL through DXC if
    /// necessary. Every non-SPIR-V route starts here.
    fn to_spirv(&self, source: &ShaderSource, stage: ShaderStage, options: &CompileOptions) -> Result<SpirvModule> {
        match source {
            ShaderSource::Spirv(module) => Ok(module.clone()),
            ShaderSource::Hlsl(text) => {
                if !self.loader.hlsl_compiler_available() {
                    return Err(Error::BackendUnavailable("dxcompiler"));
                }
                compile_hlsl_to_spirv(text, stage, options)
            }
        }
    }

    /// Translate `source` into `destination`, per the route table:
    ///
    /// - SPIR-V source -> SPIR-V: rejected — a caller that explicitly asks
    ///   for SPIR-V back out of SPIR-V is almost certainly a mistake
    ///   (`UnsupportedRoute`). The identity path still exists internally for
    ///   device construction, via
    ///   [`Orchestrator::build_graphics_shader`]/[`build_compute_pipeline`].
    /// - SPIR-V source -> MSL: `spirv-cross2`, no DXC involvement.
    /// - SPIR-V source -> HLSL: `spirv-cross2`.
    /// - SPIR-V source -> DXIL: `spirv-cross2` to HLSL, then DXC HLSL-to-DXIL.
    /// - SPIR-V source -> DXBC: `spirv-cross2` to HLSL, then legacy FXC.
    /// - HLSL source -> SPIR-V: DXC.
    /// - HLSL source -> DXIL: DXC to SPIR-V, `spirv-cross2` back to HLSL(sm6),
    ///   then DXC HLSL-to-DXIL. The forced round-trip normalizes bindings to
    ///   the descriptor-set convention before DXIL is emitted — going
    ///   straight from DXC-emitted DXIL would keep HLSL-native binding slots
    ///   instead.
    /// - HLSL source -> DXBC: DXC to SPIR-V, `spirv-cross2` to HLSL(sm5),
    ///   then legacy FXC. The round-trip only happens when the original
    ///   input is HLSL, never when it's already SPIR-V (where it would be
    ///   redundant and could change semantics).
    /// - HLSL source -> MSL: DXC to SPIR-V, then `spirv-cross2`.
    /// - HLSL source -> HLSL: DXC to SPIR-V, then `spirv-cross2` back to
    ///   HLSL text — also a normalizing round-trip, not a no-op passthrough.
    pub fn translate(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        destination: ShaderFormat,
        options: &CompileOptions,
    ) -> Result<TranslatedShader> {
        self.translate_impl(source, stage, destination, options, false)
    }

    fn translate_impl(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        destination: ShaderFormat,
        options: &CompileOptions,
        allow_spirv_identity: bool,
    ) -> Result<TranslatedShader> {
        let echo = |bytes: OwnedBuffer| TranslatedShader {
            bytes,
            entry_point: options.entry_point.clone(),
        };
        match (source, destination) {
            (ShaderSource::Spirv(module), ShaderFormat::Spirv) => {
                if !allow_spirv_identity {
                    return Err(Error::UnsupportedRoute(
                        "Input and output are both SPIRV".into(),
                    ));
                }
                Ok(echo(OwnedBuffer::from_spirv(module)))
            }
            (ShaderSource::Spirv(module), ShaderFormat::Msl) => {
                let (text, entry_point) = self.transpile_msl(module, stage, &options.entry_point)?;
                Ok(TranslatedShader {
                    bytes: OwnedBuffer::text(text),
                    entry_point,
                })
            }
            (ShaderSource::Spirv(module), ShaderFormat::Hlsl) => {
                let text = transpile_to_hlsl(module, options)?;
                Ok(echo(OwnedBuffer::text(text)))
            }
            (ShaderSource::Spirv(module), ShaderFormat::Dxil) => {
                if !self.loader.dxil_available() {
                    return Err(Error::BackendUnavailable("dxil"));
                }
                let mut sm6_options = options.clone();
                sm6_options.shader_model = Some(ShaderModel::Sm6);
                let hlsl = transpile_to_hlsl(module, &sm6_options)?;
                let dxil = compile_hlsl_to_dxil(&hlsl, stage, &sm6_options)?;
                Ok(echo(OwnedBuffer::binary(dxil)))
            }
            (ShaderSource::Spirv(module), ShaderFormat::Dxbc) => {
                if !self.loader.legacy_compiler_available() {
                    return Err(Error::BackendUnavailable("d3dcompiler_47"));
                }
                let mut sm5_options = options.clone();
                sm5_options.shader_model = Some(ShaderModel::Sm5);
                let hlsl = transpile_to_hlsl(module, &sm5_options)?;
                let dxbc = compile_from_hlsl_legacy(&hlsl, stage, &sm5_options)?;
                Ok(echo(OwnedBuffer::binary(dxbc)))
            }

            (ShaderSource::Hlsl(text), ShaderFormat::Spirv) => {
                if !self.loader.hlsl_compiler_available() {
                    return Err(Error::BackendUnavailable("dxcompiler"));
                }
                let module = compile_hlsl_to_spirv(text, stage, options)?;
                Ok(echo(OwnedBuffer::from_spirv(&module)))
            }
            (ShaderSource::Hlsl(text), ShaderFormat::Dxil) => {
                // Forced round-trip: direct DXC HLSL->DXIL would keep
                // HLSL-native binding conventions that don't match the
                // descriptor-set scheme the reflection/remap passes assume.
                if !self.loader.dxil_available() {
                    return Err(Error::BackendUnavailable("dxil"));
                }
                if !self.loader.hlsl_compiler_available() {
                    return Err(Error::BackendUnavailable("dxcompiler"));
                }
                let spirv = compile_hlsl_to_spirv(text, stage, options)?;
                let mut sm6_options = options.clone();
                sm6_options.shader_model = Some(ShaderModel::Sm6);
                let normalized_hlsl = transpile_to_hlsl(&spirv, &sm6_options)?;
                let dxil = compile_hlsl_to_dxil(&normalized_hlsl, stage, &sm6_options)?;
                Ok(echo(OwnedBuffer::binary(dxil)))
            }
            (ShaderSource::Hlsl(text), ShaderFormat::Dxbc) => {
                // Same rationale as the DXIL round-trip: route through
                // SPIR-V because the original input is HLSL.
                if !self.loader.legacy_compiler_available() {
                    return Err(Error::BackendUnavailable("d3dcompiler_47"));
                }
                if !self.loader.hlsl_compiler_available() {
                    return Err(Error::BackendUnavailable("dxcompiler"));
                }
                let spirv = compile_hlsl_to_spirv(text, stage, options)?;
                let mut sm5_options = options.clone();
                sm5_options.shader_model = Some(ShaderModel::Sm5);
                let normalized_hlsl = transpile_to_hlsl(&spirv, &sm5_options)?;
                let dxbc = compile_from_hlsl_legacy(&normalized_hlsl, stage, &sm5_options)?;
                Ok(echo(OwnedBuffer::binary(dxbc)))
            }
            (ShaderSource::Hlsl(_), ShaderFormat::Msl) => {
                let module = self.to_spirv(source, stage, options)?;
                let (text, entry_point) = self.transpile_msl(&module, stage, &options.entry_point)?;
                Ok(TranslatedShader {
                    bytes: OwnedBuffer::text(text),
                    entry_point,
                })
            }
            (ShaderSource::Hlsl(_), ShaderFormat::Hlsl) => {
                let module = self.to_spirv(source, stage, options)?;
                let text = transpile_to_hlsl(&module, options)?;
                Ok(echo(OwnedBuffer::text(text)))
            }

            (_, ShaderFormat::Json) => Err(Error::UnsupportedRoute(
                "JSON is a reflection-only output; call reflect_graphics/reflect_compute instead".into(),
            )),
        }
    }

    /// Reflect `source`'s graphics-stage resources, compiling HLSL to SPIR-V
    /// through DXC first if necessary (route: HLSL -> SPIR-V -> Reflect).
    pub fn reflect_graphics(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        options: &CompileOptions,
    ) -> Result<GraphicsShaderMetadata> {
        let spirv = self.to_spirv(source, stage, options)?;
        reflect_graphics(&spirv)
    }

    /// Reflect `source`'s compute-stage resources, compiling HLSL to SPIR-V
    /// through DXC first if necessary.
    pub fn reflect_compute(
        &self,
        source: &ShaderSource,
        options: &CompileOptions,
    ) -> Result<ComputePipelineMetadata> {
        let spirv = self.to_spirv(source, ShaderStage::Compute, options)?;
        reflect_compute(&spirv, &self.layout)
    }

    fn transpile_msl(
        &self,
        module: &SpirvModule,
        stage: ShaderStage,
        entry_point: &str,
    ) -> Result<MslTranspileOutput> {
        match stage {
            ShaderStage::Compute => transpile_compute_to_msl(module, &self.layout, entry_point),
            _ => transpile_graphics_to_msl(module, stage, &self.layout, entry_point),
        }
    }

    /// Pick the format to hand a GPU device: prefer SPIR-V native, else
    /// DXIL, else DXBC, else MSL, restricted to whatever `device_accepts`
    /// and the backends this process actually has loaded can both reach from
    /// `source`.
    fn select_device_format(
        &self,
        source: &ShaderSource,
        device_accepts: BackendCapabilities,
    ) -> Result<ShaderFormat> {
        let reachable = match source {
            ShaderSource::Spirv(_) => self.loader.spirv_shader_formats(),
            ShaderSource::Hlsl(_) => self.loader.hlsl_shader_formats(),
        };
        const PRIORITY: [(ShaderFormat, BackendCapabilities); 4] = [
            (ShaderFormat::Spirv, BackendCapabilities::SPIRV),
            (ShaderFormat::Dxil, BackendCapabilities::DXIL),
            (ShaderFormat::Dxbc, BackendCapabilities::DXBC),
            (ShaderFormat::Msl, BackendCapabilities::MSL),
        ];
        PRIORITY
            .into_iter()
            .find(|(format, flag)| {
                device_accepts.contains(*flag) && reachable.contains(format)
            })
            .map(|(format, _)| format)
            .ok_or_else(|| {
                Error::UnsupportedRoute(
                    "no shader format is acceptable to both the device and the loaded backends"
                        .into(),
                )
            })
    }

    /// Build a complete graphics shader: select the best format
    /// `device_accepts` can take, translate to it, and reflect in one call.
    pub fn build_graphics_shader(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        device_accepts: BackendCapabilities,
        options: &CompileOptions,
    ) -> Result<(TranslatedShader, GraphicsShaderMetadata)> {
        let spirv = self.to_spirv(source, stage, options)?;
        let metadata = reflect_graphics(&spirv)?;
        let destination = self.select_device_format(&ShaderSource::Spirv(spirv.clone()), device_accepts)?;
        let translated = self.translate_impl(
            &ShaderSource::Spirv(spirv),
            stage,
            destination,
            options,
            true,
        )?;
        Ok((translated, metadata))
    }

    /// Build a complete compute pipeline: select the best format
    /// `device_accepts` can take, translate to it, and reflect in one call.
    pub fn build_compute_pipeline(
        &self,
        source: &ShaderSource,
        device_accepts: BackendCapabilities,
        options: &CompileOptions,
    ) -> Result<(TranslatedShader, ComputePipelineMetadata)> {
        let spirv = self.to_spirv(source, ShaderStage::Compute, options)?;
        let metadata = reflect_compute(&spirv, &self.layout)?;
        let destination = self.select_device_format(&ShaderSource::Spirv(spirv.clone()), device_accepts)?;
        let translated = self.translate_impl(
            &ShaderSource::Spirv(spirv),
            ShaderStage::Compute,
            destination,
            options,
            true,
        )?;
        Ok((translated, metadata))
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
