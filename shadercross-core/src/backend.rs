//! Backend discovery and lifecycle (component A).
//!
//! Probes for the `dxcompiler`/`dxil`/`d3dcompiler_47` shared libraries
//! before trusting the code paths that depend on them: resolve a
//! platform-correct file name with [`libloading::library_filename`], prefer
//! a copy sitting beside the current executable, and fall back to the
//! global search path. A missing library never fails `Loader::new` outright
//! — it just narrows the reported capability set.

use crate::types::ShaderFormat;
use bitflags::bitflags;
use libloading::Library;
use std::path::{Path, PathBuf};

bitflags! {
    /// Output formats a given process-wide backend configuration can produce.
    pub struct BackendCapabilities: u8 {
        const SPIRV = 0b0000_0001;
        const MSL   = 0b0000_0010;
        const DXIL  = 0b0000_0100;
        const DXBC  = 0b0000_1000;
    }
}

fn beside_current_exe(file_name: &Path) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(file_name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| file_name.to_path_buf())
}

fn probe_loadable(canonical_name: &str) -> bool {
    let file_name = libloading::library_filename(canonical_name);
    let path = beside_current_exe(Path::new(&file_name));
    match unsafe { Library::new(&path) } {
        Ok(_lib) => true,
        Err(err) => {
            log::debug!("backend library {:?} not found: {}", path, err);
            false
        }
    }
}

/// Process-wide backend discovery state.
///
/// Initialization and teardown become ordinary construction/drop: callers
/// are expected to build exactly one `Loader` up front (on a single thread,
/// never concurrently with translation calls) and hold it for the process
/// lifetime.
pub struct Loader {
    hlsl_compiler_loaded: bool,
    dxil_capable: bool,
    legacy_compiler_loaded: bool,
}

impl Loader {
    pub fn new() -> Self {
        let hlsl_compiler_loaded = probe_loadable("dxcompiler");

        // The DXIL signing library is checked for presence only: we unload
        // it immediately and never call into it. Its absence silently flips
        // the DXIL capability off even though dxcompiler itself loaded fine.
        let dxil_signing_present = probe_loadable("dxil");
        let dxil_capable = hlsl_compiler_loaded && dxil_signing_present;

        let legacy_compiler_loaded = probe_loadable("d3dcompiler_47");

        if !hlsl_compiler_loaded {
            log::warn!("dxcompiler not found; DXC-backed HLSL/SPIR-V/DXIL routes are unavailable");
        }
        if hlsl_compiler_loaded && !dxil_signing_present {
            log::warn!("DXIL signing library not found; DXIL capability disabled");
        }
        if !legacy_compiler_loaded {
            log::warn!("legacy HLSL compiler not found; DXBC routes are unavailable");
        }

        Loader {
            hlsl_compiler_loaded,
            dxil_capable,
            legacy_compiler_loaded,
        }
    }

    pub fn hlsl_compiler_available(&self) -> bool {
        self.hlsl_compiler_loaded
    }

    pub fn dxil_available(&self) -> bool {
        self.dxil_capable
    }

    pub fn legacy_compiler_available(&self) -> bool {
        self.legacy_compiler_loaded
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        let mut caps = BackendCapabilities::SPIRV | BackendCapabilities::MSL;
        if self.dxil_capable {
            caps |= BackendCapabilities::DXIL;
        }
        if self.legacy_compiler_loaded {
            caps |= BackendCapabilities::DXBC;
        }
        caps
    }

    /// Destination formats reachable from a SPIR-V source.
    ///
    /// Always contains SPIR-V and MSL regardless of which native libraries
    /// loaded .
    pub fn spirv_shader_formats(&self) -> Vec<ShaderFormat> {
        let mut formats = vec![ShaderFormat::Spirv, ShaderFormat::Msl];
        if self.dxil_capable {
            formats.push(ShaderFormat::Dxil);
        }
        if self.legacy_compiler_loaded {
            formats.push(ShaderFormat::Dxbc);
        }
        formats
    }

    /// Destination formats reachable from an HLSL source.
    pub fn hlsl_shader_formats(&self) -> Vec<ShaderFormat> {
        let mut formats = Vec::new();
        if self.hlsl_compiler_loaded {
            formats.push(ShaderFormat::Spirv);
            formats.push(ShaderFormat::Dxil);
        }
        if self.legacy_compiler_loaded {
            formats.push(ShaderFormat::Dxbc);
        }
        formats
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spirv_formats_always_contain_spirv_and_msl() {
        let loader = Loader::new();
        let formats = loader.spirv_shader_formats();
        assert!(formats.contains(&ShaderFormat::Spirv));
        assert!(formats.contains(&ShaderFormat::Msl));
    }

    #[test]
    fn init_then_drop_does_not_panic() {
        let loader = Loader::new();
        drop(loader);
    }
}
