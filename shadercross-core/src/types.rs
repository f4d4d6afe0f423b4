use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// The three shader stages this crate understands.
///
/// Inferred from a `.vert`/`.frag`/`.comp` filename suffix by the CLI
/// collaborator, or supplied explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// The one-letter-ish HLSL target profile prefix, e.g. `vs` for vertex.
    pub fn hlsl_profile_prefix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::Fragment => "ps",
            ShaderStage::Compute => "cs",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "vert" => Some(ShaderStage::Vertex),
            "frag" => Some(ShaderStage::Fragment),
            "comp" => Some(ShaderStage::Compute),
            _ => None,
        }
    }

    /// Parse the CLI's `-t` flag value (`vertex`/`fragment`/`compute`),
    /// case-insensitively. Distinct from [`Self::from_suffix`], which
    /// matches the abbreviated `.vert`/`.frag`/`.comp` filename suffixes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "vertex" => Some(ShaderStage::Vertex),
            "fragment" => Some(ShaderStage::Fragment),
            "compute" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

/// HLSL shader model, required whenever the destination is HLSL text or
/// legacy DXBC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderModel {
    Sm5,
    Sm6,
}

impl ShaderModel {
    pub fn dxc_suffix(self) -> &'static str {
        match self {
            ShaderModel::Sm5 => "5_0",
            ShaderModel::Sm6 => "6_0",
        }
    }
}

/// Every output/input format this pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderFormat {
    Spirv,
    Dxbc,
    Dxil,
    Msl,
    Hlsl,
    Json,
}

impl ShaderFormat {
    /// Infer a format from a filename suffix, per the CLI's suffix-inference
    /// rule (`.spv`, `.hlsl`, `.dxbc`, `.dxil`, `.msl`, `.json`).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "spv" => Some(ShaderFormat::Spirv),
            "hlsl" => Some(ShaderFormat::Hlsl),
            "dxbc" => Some(ShaderFormat::Dxbc),
            "dxil" => Some(ShaderFormat::Dxil),
            "msl" => Some(ShaderFormat::Msl),
            "json" => Some(ShaderFormat::Json),
            _ => None,
        }
    }

    /// Parse the CLI's `-s`/`-d` flag value (`SPIRV`/`HLSL`/`DXBC`/`DXIL`/
    /// `MSL`/`JSON`), case-insensitively. Distinct from [`Self::from_suffix`],
    /// which matches filename extensions and spells SPIR-V `spv`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SPIRV" => Some(ShaderFormat::Spirv),
            "HLSL" => Some(ShaderFormat::Hlsl),
            "DXBC" => Some(ShaderFormat::Dxbc),
            "DXIL" => Some(ShaderFormat::Dxil),
            "MSL" => Some(ShaderFormat::Msl),
            "JSON" => Some(ShaderFormat::Json),
            _ => None,
        }
    }
}

/// A SPIR-V binary, always a whole number of 32-bit words.
///
/// Constructing one from a raw byte buffer enforces the size invariant up
/// front so every downstream consumer can assume it holds.
#[derive(Debug, Clone)]
pub struct SpirvModule(Vec<u32>);

impl SpirvModule {
    pub fn from_words(words: Vec<u32>) -> Self {
        SpirvModule(words)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::InvalidSpirv(format!(
                "byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        use byte_slice_cast::AsSliceOf;
        let words = bytes
            .as_slice_of::<u32>()
            .map_err(|e| Error::InvalidSpirv(e.to_string()))?
            .to_vec();
        Ok(SpirvModule(words))
    }

    pub fn words(&self) -> &[u32] {
        &self.0
    }

    pub fn into_words(self) -> Vec<u32> {
        self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        use byte_slice_cast::AsByteSlice;
        self.0.as_byte_slice().to_vec()
    }

    pub fn byte_len(&self) -> usize {
        self.0.len() * 4
    }
}

/// Owned bytes produced by a backend: either NUL-terminated UTF-8 text or an
/// opaque binary blob.
///
/// A move-only owned-buffer type: it is consumed by value at every backend
/// boundary, so a partial-failure path in the orchestrator can never end up
/// aliasing or leaking a buffer a backend has already freed on its side.
#[derive(Debug, Clone)]
pub struct OwnedBuffer {
    data: Vec<u8>,
    is_text: bool,
}

impl OwnedBuffer {
    pub fn binary(data: Vec<u8>) -> Self {
        OwnedBuffer {
            data,
            is_text: false,
        }
    }

    pub fn text(mut text: String) -> Self {
        text.push('\0');
        OwnedBuffer {
            data: text.into_bytes(),
            is_text: true,
        }
    }

    pub fn from_spirv(module: &SpirvModule) -> Self {
        OwnedBuffer::binary(module.to_bytes())
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn as_str(&self) -> Result<&str> {
        let bytes = match self.data.iter().position(|&b| b == 0) {
            Some(nul) => &self.data[..nul],
            None => &self.data[..],
        };
        std::str::from_utf8(bytes).map_err(|e| Error::InvalidSpirv(e.to_string()))
    }

    pub fn into_spirv(self) -> Result<SpirvModule> {
        SpirvModule::from_bytes(&self.data)
    }
}

/// The caller's input: either a parsed SPIR-V module or HLSL source text.
#[derive(Debug, Clone)]
pub enum ShaderSource {
    Spirv(SpirvModule),
    Hlsl(String),
}

/// Per-call compile configuration threaded through the orchestrator so
/// individual backend-call signatures don't balloon.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub entry_point: String,
    pub include_dir: Option<PathBuf>,
    pub defines: Vec<(String, Option<String>)>,
    pub debug: bool,
    pub shader_model: Option<ShaderModel>,
}

/// Per-resource reflection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: u32,
    pub kind: ResourceKind,
    pub set: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    SampledImage,
    SeparateSampler,
    StorageImage,
    StorageBuffer,
    UniformBuffer,
}

/// Graphics-stage reflection counts, serialized verbatim as the JSON output
/// format.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GraphicsShaderMetadata {
    pub samplers: u32,
    pub storage_textures: u32,
    pub storage_buffers: u32,
    pub uniform_buffers: u32,
}

/// Compute-stage reflection counts plus threadgroup size.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ComputePipelineMetadata {
    pub samplers: u32,
    pub readonly_storage_textures: u32,
    pub readonly_storage_buffers: u32,
    pub readwrite_storage_textures: u32,
    pub readwrite_storage_buffers: u32,
    pub uniform_buffers: u32,
    pub threadcount_x: u32,
    pub threadcount_y: u32,
    pub threadcount_z: u32,
}
