//! A minimal binding to the legacy `d3dcompiler_47.dll` `D3DCompile` entry
//! point, loaded dynamically through [`libloading`] the same way the rest
//! of component A probes for native libraries.
//!
//! No `windows`/`winapi` crate wraps this specific, very old entry point,
//! so the call goes through raw function pointers and a hand-written COM
//! vtable for the two `ID3DBlob` methods this module needs. The library
//! only exists on Windows, so off-Windows this fails the same way an
//! absent DXC/DXIL backend does: [`Library::new`] can't find
//! `d3dcompiler_47` and callers see `Error::BackendUnavailable` rather
//! than a platform-specific build failure.

use crate::error::{Error, Result};
use crate::types::{CompileOptions, ShaderModel, ShaderStage};
use libloading::Library;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};

#[repr(C)]
struct IUnknownVtbl {
    query_interface: unsafe extern "system" fn(*mut c_void, *const u8, *mut *mut c_void) -> i32,
    add_ref: unsafe extern "system" fn(*mut c_void) -> u32,
    release: unsafe extern "system" fn(*mut c_void) -> u32,
}

#[repr(C)]
struct ID3DBlobVtbl {
    base: IUnknownVtbl,
    get_buffer_pointer: unsafe extern "system" fn(*mut c_void) -> *mut c_void,
    get_buffer_size: unsafe extern "system" fn(*mut c_void) -> usize,
}

#[repr(C)]
struct ComObject {
    vtbl: *const ID3DBlobVtbl,
}

unsafe fn blob_to_vec(blob: *mut c_void) -> Vec<u8> {
    let object = &*(blob as *mut ComObject);
    let vtbl = &*object.vtbl;
    let ptr = (vtbl.get_buffer_pointer)(blob) as *const u8;
    let len = (vtbl.get_buffer_size)(blob);
    let bytes = std::slice::from_raw_parts(ptr, len).to_vec();
    (vtbl.base.release)(blob);
    bytes
}

type D3DCompileFn = unsafe extern "system" fn(
    src_data: *const c_void,
    src_data_size: usize,
    source_name: *const c_char,
    defines: *const c_void,
    include: *const c_void,
    entrypoint: *const c_char,
    target: *const c_char,
    flags1: u32,
    flags2: u32,
    code: *mut *mut c_void,
    error_msgs: *mut *mut c_void,
) -> c_int;

/// Compile HLSL source to legacy DXBC bytecode via FXC's `D3DCompile`.
///
/// Only shader model 5.x profiles are accepted by FXC; callers targeting
/// `ShaderModel::Sm6` have already been rejected upstream by the
/// orchestrator's route table.
pub fn compile_from_hlsl_legacy(
    source: &str,
    stage: ShaderStage,
    options: &CompileOptions,
) -> Result<Vec<u8>> {
    let library = unsafe { Library::new(libloading::library_filename("d3dcompiler_47")) }
        .map_err(|_| Error::BackendUnavailable("d3dcompiler_47"))?;

    let compile: libloading::Symbol<D3DCompileFn> = unsafe {
        library
            .get(b"D3DCompile\0")
            .map_err(|_| Error::BackendUnavailable("d3dcompiler_47"))?
    };

    let model = options.shader_model.unwrap_or(ShaderModel::Sm5);
    let profile = format!("{}_{}", stage.hlsl_profile_prefix(), model.dxc_suffix());
    let source_name = CString::new(format!("{}.hlsl", options.entry_point)).unwrap();
    let entrypoint = CString::new(options.entry_point.clone()).unwrap();
    let target = CString::new(profile).unwrap();

    let mut code: *mut c_void = std::ptr::null_mut();
    let mut errors: *mut c_void = std::ptr::null_mut();

    // D3DCOMPILE_OPTIMIZATION_LEVEL3 | (debug ? D3DCOMPILE_DEBUG : 0)
    let flags1 = 1 << 15 | if options.debug { 1 << 0 } else { 0 };

    let hr = unsafe {
        compile(
            source.as_ptr() as *const c_void,
            source.len(),
            source_name.as_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            entrypoint.as_ptr(),
            target.as_ptr(),
            flags1,
            0,
            &mut code,
            &mut errors,
        )
    };

    if hr < 0 {
        let message = if errors.is_null() {
            format!("D3DCompile failed with HRESULT {:#x}", hr)
        } else {
            let bytes = unsafe { blob_to_vec(errors) };
            String::from_utf8_lossy(&bytes).trim_end_matches('\0').to_string()
        };
        return Err(Error::CompilationFailed(message));
    }

    Ok(unsafe { blob_to_vec(code) })
}
