//! Hand-assembled SPIR-V fixtures for tests.
//!
//! Built with [`rspirv::dr::Builder`] rather than captured from a real
//! compiler, so each fixture only contains the instructions the test
//! actually exercises.

#![cfg(test)]

use crate::types::SpirvModule;
use rspirv::dr::{Builder, Operand};
use rspirv::spirv;

fn storage_buffer_module(set: u32, binding: u32, local_size: (u32, u32, u32)) -> SpirvModule {
    let mut b = Builder::new();
    b.set_version(1, 3);
    b.capability(spirv::Capability::Shader);
    b.ext_inst_import("GLSL.std.450");
    b.memory_model(spirv::AddressingModel::Logical, spirv::MemoryModel::GLSL450);

    let float_ty = b.type_float(32);
    let runtime_arr = b.type_runtime_array(float_ty);
    b.decorate(
        runtime_arr,
        spirv::Decoration::ArrayStride,
        vec![Operand::LiteralInt32(4)],
    );
    let struct_ty = b.type_struct(vec![runtime_arr]);
    b.decorate(struct_ty, spirv::Decoration::BufferBlock, vec![]);
    b.member_decorate(
        struct_ty,
        0,
        spirv::Decoration::Offset,
        vec![Operand::LiteralInt32(0)],
    );

    let ptr_ty = b.type_pointer(None, spirv::StorageClass::Uniform, struct_ty);
    let var = b.variable(ptr_ty, None, spirv::StorageClass::Uniform, None);
    b.decorate(
        var,
        spirv::Decoration::DescriptorSet,
        vec![Operand::LiteralInt32(set)],
    );
    b.decorate(
        var,
        spirv::Decoration::Binding,
        vec![Operand::LiteralInt32(binding)],
    );

    let void = b.type_void();
    let voidf = b.type_function(void, vec![]);
    let main = b
        .begin_function(void, None, spirv::FunctionControl::NONE, voidf)
        .unwrap();
    b.begin_block(None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();

    b.entry_point(spirv::ExecutionModel::GLCompute, main, "main", vec![var]);
    b.execution_mode(
        main,
        spirv::ExecutionMode::LocalSize,
        vec![local_size.0, local_size.1, local_size.2],
    );

    SpirvModule::from_words(b.module().assemble())
}

/// A single readonly storage buffer at set 0, binding 0, local size 8x8x1.
pub fn compute_shader_fixture() -> SpirvModule {
    storage_buffer_module(0, 0, (8, 8, 1))
}

/// A storage buffer placed at an arbitrary descriptor set, to exercise the
/// `InvalidDescriptorSet` error path.
pub fn compute_shader_with_storage_buffer_set(set: u32) -> SpirvModule {
    storage_buffer_module(set, 0, (8, 8, 1))
}

/// A storage buffer variable decorated with neither `DescriptorSet` nor
/// `Binding`, to exercise the `MissingDecoration` error path.
pub fn compute_shader_with_undecorated_resource() -> SpirvModule {
    let mut b = Builder::new();
    b.set_version(1, 3);
    b.capability(spirv::Capability::Shader);
    b.ext_inst_import("GLSL.std.450");
    b.memory_model(spirv::AddressingModel::Logical, spirv::MemoryModel::GLSL450);

    let float_ty = b.type_float(32);
    let runtime_arr = b.type_runtime_array(float_ty);
    b.decorate(
        runtime_arr,
        spirv::Decoration::ArrayStride,
        vec![Operand::LiteralInt32(4)],
    );
    let struct_ty = b.type_struct(vec![runtime_arr]);
    b.decorate(struct_ty, spirv::Decoration::BufferBlock, vec![]);
    b.member_decorate(
        struct_ty,
        0,
        spirv::Decoration::Offset,
        vec![Operand::LiteralInt32(0)],
    );

    let ptr_ty = b.type_pointer(None, spirv::StorageClass::Uniform, struct_ty);
    let var = b.variable(ptr_ty, None, spirv::StorageClass::Uniform, None);
    // Deliberately no DescriptorSet/Binding decoration on `var`.

    let void = b.type_void();
    let voidf = b.type_function(void, vec![]);
    let main = b
        .begin_function(void, None, spirv::FunctionControl::NONE, voidf)
        .unwrap();
    b.begin_block(None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();

    b.entry_point(spirv::ExecutionModel::GLCompute, main, "main", vec![var]);
    b.execution_mode(main, spirv::ExecutionMode::LocalSize, vec![8, 8, 1]);

    SpirvModule::from_words(b.module().assemble())
}

/// A resource variable's shape for [`module_with_resources`]: a descriptor
/// kind plus the (set, binding) it's decorated with.
pub enum ResourceSpec {
    SampledImage(u32, u32),
    StorageImage(u32, u32),
    StorageBuffer(u32, u32),
    UniformBuffer(u32, u32),
}

/// Build a minimal SPIR-V module declaring one resource variable per
/// `ResourceSpec`, for exercising reflection/remapping against an exact,
/// hand-picked set of (kind, set, binding) tuples.
pub fn module_with_resources(resources: &[ResourceSpec], local_size: (u32, u32, u32)) -> SpirvModule {
    let mut b = Builder::new();
    b.set_version(1, 3);
    b.capability(spirv::Capability::Shader);
    b.capability(spirv::Capability::ImageQuery);
    b.ext_inst_import("GLSL.std.450");
    b.memory_model(spirv::AddressingModel::Logical, spirv::MemoryModel::GLSL450);

    let float_ty = b.type_float(32);
    let mut interface = Vec::new();

    for resource in resources {
        let var = match resource {
            ResourceSpec::SampledImage(set, binding) => {
                let image_ty = b.type_image(
                    float_ty,
                    spirv::Dim::Dim2D,
                    0,
                    0,
                    0,
                    1,
                    spirv::ImageFormat::Unknown,
                    None,
                );
                let ptr_ty = b.type_pointer(None, spirv::StorageClass::UniformConstant, image_ty);
                let var = b.variable(ptr_ty, None, spirv::StorageClass::UniformConstant, None);
                decorate_set_binding(&mut b, var, *set, *binding);
                var
            }
            ResourceSpec::StorageImage(set, binding) => {
                let image_ty = b.type_image(
                    float_ty,
                    spirv::Dim::Dim2D,
                    0,
                    0,
                    0,
                    2,
                    spirv::ImageFormat::Rgba32f,
                    None,
                );
                let ptr_ty = b.type_pointer(None, spirv::StorageClass::UniformConstant, image_ty);
                let var = b.variable(ptr_ty, None, spirv::StorageClass::UniformConstant, None);
                decorate_set_binding(&mut b, var, *set, *binding);
                var
            }
            ResourceSpec::StorageBuffer(set, binding) => {
                let runtime_arr = b.type_runtime_array(float_ty);
                b.decorate(
                    runtime_arr,
                    spirv::Decoration::ArrayStride,
                    vec![Operand::LiteralInt32(4)],
                );
                let struct_ty = b.type_struct(vec![runtime_arr]);
                b.decorate(struct_ty, spirv::Decoration::BufferBlock, vec![]);
                b.member_decorate(
                    struct_ty,
                    0,
                    spirv::Decoration::Offset,
                    vec![Operand::LiteralInt32(0)],
                );
                let ptr_ty = b.type_pointer(None, spirv::StorageClass::Uniform, struct_ty);
                let var = b.variable(ptr_ty, None, spirv::StorageClass::Uniform, None);
                decorate_set_binding(&mut b, var, *set, *binding);
                var
            }
            ResourceSpec::UniformBuffer(set, binding) => {
                let struct_ty = b.type_struct(vec![float_ty]);
                b.decorate(struct_ty, spirv::Decoration::Block, vec![]);
                b.member_decorate(
                    struct_ty,
                    0,
                    spirv::Decoration::Offset,
                    vec![Operand::LiteralInt32(0)],
                );
                let ptr_ty = b.type_pointer(None, spirv::StorageClass::Uniform, struct_ty);
                let var = b.variable(ptr_ty, None, spirv::StorageClass::Uniform, None);
                decorate_set_binding(&mut b, var, *set, *binding);
                var
            }
        };
        interface.push(var);
    }

    let void = b.type_void();
    let voidf = b.type_function(void, vec![]);
    let main = b
        .begin_function(void, None, spirv::FunctionControl::NONE, voidf)
        .unwrap();
    b.begin_block(None).unwrap();
    b.ret().unwrap();
    b.end_function().unwrap();

    b.entry_point(spirv::ExecutionModel::GLCompute, main, "main", interface);
    b.execution_mode(
        main,
        spirv::ExecutionMode::LocalSize,
        vec![local_size.0, local_size.1, local_size.2],
    );

    SpirvModule::from_words(b.module().assemble())
}

fn decorate_set_binding(b: &mut Builder, var: u32, set: u32, binding: u32) {
    b.decorate(
        var,
        spirv::Decoration::DescriptorSet,
        vec![Operand::LiteralInt32(set)],
    );
    b.decorate(
        var,
        spirv::Decoration::Binding,
        vec![Operand::LiteralInt32(binding)],
    );
}
