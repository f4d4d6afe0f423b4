use thiserror::Error;

/// Everything that can go wrong while translating or reflecting a shader.
///
/// Recoverable conditions all land here; the orchestrator logs at `error!`
/// before handing one of these back to the caller. Fatal allocation failures
/// are not represented — they are left to Rust's global allocator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(&'static str),

    #[error("compilation failed: {0}")]
    CompilationFailed(String),

    #[error("transpilation failed: {0}")]
    TranspileFailed(String),

    #[error("Descriptor set index for {kind} must be {allowed}, got {index}")]
    InvalidDescriptorSet {
        kind: &'static str,
        index: u32,
        allowed: &'static str,
    },

    #[error("resource {name:?} is missing a {decoration} decoration")]
    MissingDecoration {
        name: String,
        decoration: &'static str,
    },

    #[error("unsupported route: {0}")]
    UnsupportedRoute(String),

    #[error("malformed SPIR-V module: {0}")]
    InvalidSpirv(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
