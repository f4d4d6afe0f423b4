//! Command-line front end for the shadercross translation pipeline.

use anyhow::{bail, Context, Result};
use clap::Parser;
use shadercross_core::{
    CompileOptions, Orchestrator, ShaderFormat, ShaderSource, ShaderStage, SpirvModule,
};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Translate shaders between SPIR-V, HLSL, DXBC, DXIL, MSL and JSON
/// reflection metadata.
#[derive(Parser, Debug)]
#[clap(name = "shadercross", version)]
struct Args {
    /// Input shader file. Format is inferred from its suffix unless
    /// overridden with --source.
    input: PathBuf,

    /// Output file. Format is inferred from its suffix unless overridden
    /// with --dest.
    #[clap(short = 'o', long = "output")]
    output: PathBuf,

    /// Force the source format instead of inferring it from the input's
    /// suffix.
    #[clap(short = 's', long = "source")]
    source: Option<String>,

    /// Shader stage: vertex, fragment, or compute. Inferred from the input
    /// filename's .vert/.frag/.comp suffix if omitted.
    #[clap(short = 't', long = "stage")]
    stage: Option<String>,

    /// Force the destination format instead of inferring it from --output's
    /// suffix.
    #[clap(short = 'd', long = "dest")]
    dest: Option<String>,

    /// Entry point function name.
    #[clap(short = 'e', long = "entrypoint", default_value = "main")]
    entrypoint: String,

    /// Preprocessor define, `NAME` or `NAME=VALUE`. Repeatable.
    #[clap(short = 'D', long = "define")]
    define: Vec<String>,

    /// Emit debug info where the target format supports it.
    #[clap(short = 'g', long = "debug")]
    debug: bool,

    /// Directory to search for #include'd HLSL files.
    #[clap(short = 'I', long = "include")]
    include_dir: Option<PathBuf>,
}

fn parse_define(raw: &str) -> (String, Option<String>) {
    match raw.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (raw.to_string(), None),
    }
}

fn format_of(path: &Path, explicit: Option<&str>) -> Result<ShaderFormat> {
    if let Some(name) = explicit {
        return ShaderFormat::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unrecognized format {:?}", name));
    }
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| anyhow::anyhow!("cannot infer format: {:?} has no extension", path))?;
    ShaderFormat::from_suffix(suffix)
        .ok_or_else(|| anyhow::anyhow!("unrecognized format suffix {:?}", suffix))
}

fn stage_of(path: &Path, explicit: Option<&str>) -> Result<ShaderStage> {
    if let Some(name) = explicit {
        return ShaderStage::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unrecognized stage {:?}", name));
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let suffix = stem
        .rsplit('.')
        .next()
        .ok_or_else(|| anyhow::anyhow!("cannot infer shader stage from {:?}", path))?;
    ShaderStage::from_suffix(suffix)
        .ok_or_else(|| anyhow::anyhow!("cannot infer shader stage from {:?}", path))
}

fn read_source(path: &Path, format: ShaderFormat) -> Result<ShaderSource> {
    match format {
        ShaderFormat::Spirv => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading {:?}", path))?;
            let module = SpirvModule::from_bytes(&bytes)?;
            Ok(ShaderSource::Spirv(module))
        }
        ShaderFormat::Hlsl => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {:?}", path))?;
            Ok(ShaderSource::Hlsl(text))
        }
        other => bail!("{:?} cannot be used as translation input", other),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();
    let args = Args::parse();
    log::info!("translating {:?} -> {:?}", args.input, args.output);

    let input_format = format_of(&args.input, args.source.as_deref()).ok();
    let destination = format_of(&args.output, args.dest.as_deref())?;
    let stage = stage_of(&args.input, args.stage.as_deref())?;

    let source_format = input_format.unwrap_or(ShaderFormat::Hlsl);
    let source = read_source(&args.input, source_format)?;

    let options = CompileOptions {
        entry_point: args.entrypoint,
        include_dir: args.include_dir,
        defines: args.define.iter().map(|d| parse_define(d)).collect(),
        debug: args.debug,
        shader_model: None,
    };

    let orchestrator = Orchestrator::new();

    if destination == ShaderFormat::Json {
        let json = match stage {
            ShaderStage::Compute => {
                let metadata = orchestrator.reflect_compute(&source, &options)?;
                shadercross_core::compute_metadata_json(&metadata)?
            }
            _ => {
                let metadata = orchestrator.reflect_graphics(&source, stage, &options)?;
                shadercross_core::graphics_metadata_json(&metadata)?
            }
        };
        std::fs::write(&args.output, json).with_context(|| format!("writing {:?}", args.output))?;
        return Ok(());
    }

    let translated = orchestrator.translate(&source, stage, destination, &options)?;
    if translated.entry_point != options.entry_point {
        log::info!(
            "entry point {:?} was cleansed to {:?} by the backend; downstream consumers of {:?} must use the cleansed name",
            options.entry_point,
            translated.entry_point,
            args.output,
        );
    }

    let mut file = std::fs::File::create(&args.output)
        .with_context(|| format!("creating {:?}", args.output))?;
    file.write_all(translated.bytes.as_bytes())
        .with_context(|| format!("writing {:?}", args.output))?;

    Ok(())
}
