//! SPIR-V reflection (component C).
//!
//! Descriptor enumeration and classification runs on [`rspirv_reflect`],
//! which already buckets bindings by `(set, binding)`. Threadgroup-size
//! extraction stays on [`rspirv`]'s raw instruction walk, reading
//! `OpExecutionMode LocalSize` directly (`ExecutionMode` is opcode 16).

use crate::convention::BindingLayout;
use crate::error::{Error, Result};
use crate::types::{
    ComputePipelineMetadata, GraphicsShaderMetadata, ResourceDescriptor, ResourceKind, SpirvModule,
};
use rspirv_reflect::{DescriptorType, Reflection};
use std::collections::BTreeMap;

const EXECUTION_MODE_OPCODE: u32 = 16;

pub(crate) fn reflect_descriptor_sets(
    spirv: &SpirvModule,
) -> Result<BTreeMap<u32, BTreeMap<u32, rspirv_reflect::DescriptorInfo>>> {
    resource_ids_by_binding(spirv)?;
    let reflection = Reflection::new_from_spirv(&spirv.to_bytes())
        .map_err(|e| Error::InvalidSpirv(format!("{:?}", e)))?;
    reflection
        .get_descriptor_sets()
        .map_err(|e| Error::InvalidSpirv(format!("{:?}", e)))
}

/// Walk the module for every `OpVariable` in a resource storage class and the
/// `(set, binding)` decorations on it, keyed by the SPIR-V result id.
///
/// `rspirv_reflect` buckets resources by `(set, binding)` alone, which means a
/// resource variable missing either decoration would simply vanish from its
/// map rather than surface as an error; this walk is what actually raises
/// [`Error::MissingDecoration`] — a well-formed shader's resources always
/// carry both. It also recovers the one thing `rspirv_reflect` throws away:
/// the variable's own result id, needed for [`list_resources`].
fn resource_ids_by_binding(spirv: &SpirvModule) -> Result<BTreeMap<(u32, u32), u32>> {
    use rspirv::dr::Operand;
    use rspirv::spirv::{Decoration, Op, StorageClass};

    let mut loader = rspirv::dr::Loader::new();
    rspirv::binary::parse_words(spirv.words(), &mut loader)
        .map_err(|e| Error::InvalidSpirv(e.to_string()))?;
    let module = loader.module();

    let resource_storage_classes = [
        StorageClass::UniformConstant,
        StorageClass::Uniform,
        StorageClass::StorageBuffer,
    ];

    let mut resource_vars: BTreeMap<u32, (Option<u32>, Option<u32>)> = BTreeMap::new();
    for inst in module.types_global_values.iter() {
        if inst.class.opcode == Op::Variable {
            if let Some(Operand::StorageClass(class)) = inst.operands.first() {
                if resource_storage_classes.contains(class) {
                    if let Some(id) = inst.result_id {
                        resource_vars.insert(id, (None, None));
                    }
                }
            }
        }
    }

    for inst in module.annotations.iter() {
        if inst.class.opcode == Op::Decorate {
            if let (
                Some(Operand::IdRef(target)),
                Some(Operand::Decoration(decoration)),
                Some(Operand::LiteralInt32(value)),
            ) = (
                inst.operands.first(),
                inst.operands.get(1),
                inst.operands.get(2),
            ) {
                if let Some(entry) = resource_vars.get_mut(target) {
                    match decoration {
                        Decoration::DescriptorSet => entry.0 = Some(*value),
                        Decoration::Binding => entry.1 = Some(*value),
                        _ => {}
                    }
                }
            }
        }
    }

    let mut by_binding = BTreeMap::new();
    for (&id, &(set, binding)) in resource_vars.iter() {
        let set = set.ok_or_else(|| Error::MissingDecoration {
            name: "resource variable".into(),
            decoration: "DescriptorSet",
        })?;
        let binding = binding.ok_or_else(|| Error::MissingDecoration {
            name: "resource variable".into(),
            decoration: "Binding",
        })?;
        by_binding.insert((set, binding), id);
    }

    Ok(by_binding)
}

fn resource_kind(ty: DescriptorType) -> Option<ResourceKind> {
    match ty {
        DescriptorType::SAMPLED_IMAGE => Some(ResourceKind::SampledImage),
        DescriptorType::SAMPLER => Some(ResourceKind::SeparateSampler),
        DescriptorType::STORAGE_IMAGE => Some(ResourceKind::StorageImage),
        DescriptorType::STORAGE_BUFFER => Some(ResourceKind::StorageBuffer),
        DescriptorType::UNIFORM_BUFFER => Some(ResourceKind::UniformBuffer),
        _ => None,
    }
}

/// Enumerate every reflected resource as a flat [`ResourceDescriptor`] list,
/// the per-resource view `reflect_graphics`/`reflect_compute` summarize into
/// counts. Resource kinds outside the five this crate classifies (texel
/// buffers, input attachments, dynamic buffers) are skipped rather than
/// erroring, since none of the counted categories cover them.
pub fn list_resources(spirv: &SpirvModule) -> Result<Vec<ResourceDescriptor>> {
    let ids = resource_ids_by_binding(spirv)?;
    let sets = reflect_descriptor_sets(spirv)?;

    let mut resources = Vec::new();
    for (&set, bindings) in &sets {
        for (&binding, info) in bindings {
            let Some(kind) = resource_kind(info.ty) else {
                continue;
            };
            let id = ids.get(&(set, binding)).copied().unwrap_or(0);
            resources.push(ResourceDescriptor {
                id,
                kind,
                set,
                binding,
            });
        }
    }
    Ok(resources)
}

fn count_matching<'a>(
    sets: &'a BTreeMap<u32, BTreeMap<u32, rspirv_reflect::DescriptorInfo>>,
    ty: DescriptorType,
) -> u32 {
    sets.values()
        .flat_map(|bindings| bindings.values())
        .filter(|info| info.ty == ty)
        .count() as u32
}

/// Count resources of one kind, partitioned by whether their descriptor set
/// is the "readonly" or "readwrite" set in `layout`. Any other set index is
/// an [`Error::InvalidDescriptorSet`].
fn partition_by_set(
    sets: &BTreeMap<u32, BTreeMap<u32, rspirv_reflect::DescriptorInfo>>,
    ty: DescriptorType,
    kind: &'static str,
    readonly_set: u32,
    readwrite_set: u32,
) -> Result<(u32, u32)> {
    let mut readonly = 0u32;
    let mut readwrite = 0u32;
    for (&set_index, bindings) in sets {
        let matches = bindings.values().filter(|info| info.ty == ty).count() as u32;
        if matches == 0 {
            continue;
        }
        if set_index == readonly_set {
            readonly += matches;
        } else if set_index == readwrite_set {
            readwrite += matches;
        } else {
            return Err(Error::InvalidDescriptorSet {
                kind,
                index: set_index,
                allowed: "0 or 1",
            });
        }
    }
    Ok((readonly, readwrite))
}

/// Reflect a graphics (vertex or fragment) SPIR-V module.
///
/// Samples are counted as sampled images; if none are present, the count
/// falls back to separate samplers, which is what HLSL-origin modules emit
/// (DXC splits `Texture2D`/`SamplerState` into two separate SPIR-V
/// resources rather than a combined image-sampler).
pub fn reflect_graphics(spirv: &SpirvModule) -> Result<GraphicsShaderMetadata> {
    let sets = reflect_descriptor_sets(spirv)?;

    let sampled_images = count_matching(&sets, DescriptorType::SAMPLED_IMAGE);
    let samplers = if sampled_images > 0 {
        sampled_images
    } else {
        count_matching(&sets, DescriptorType::SAMPLER)
    };

    Ok(GraphicsShaderMetadata {
        samplers,
        storage_textures: count_matching(&sets, DescriptorType::STORAGE_IMAGE),
        storage_buffers: count_matching(&sets, DescriptorType::STORAGE_BUFFER),
        uniform_buffers: count_matching(&sets, DescriptorType::UNIFORM_BUFFER),
    })
}

/// Reflect a compute SPIR-V module, per `layout`'s descriptor-set
/// convention.
pub fn reflect_compute(
    spirv: &SpirvModule,
    layout: &BindingLayout,
) -> Result<ComputePipelineMetadata> {
    let sets = reflect_descriptor_sets(spirv)?;

    let sampled_images = count_matching(&sets, DescriptorType::SAMPLED_IMAGE);
    let samplers = if sampled_images > 0 {
        sampled_images
    } else {
        count_matching(&sets, DescriptorType::SAMPLER)
    };

    let (readonly_storage_textures, readwrite_storage_textures) = partition_by_set(
        &sets,
        DescriptorType::STORAGE_IMAGE,
        "compute storage texture",
        layout.compute_readonly_set,
        layout.compute_readwrite_set,
    )?;

    let (readonly_storage_buffers, readwrite_storage_buffers) = partition_by_set(
        &sets,
        DescriptorType::STORAGE_BUFFER,
        "compute storage buffer",
        layout.compute_readonly_set,
        layout.compute_readwrite_set,
    )?;

    let uniform_buffers = count_matching(&sets, DescriptorType::UNIFORM_BUFFER);

    let (threadcount_x, threadcount_y, threadcount_z) = compute_local_size(spirv)?;

    Ok(ComputePipelineMetadata {
        samplers,
        readonly_storage_textures,
        readonly_storage_buffers,
        readwrite_storage_textures,
        readwrite_storage_buffers,
        uniform_buffers,
        threadcount_x,
        threadcount_y,
        threadcount_z,
    })
}

/// Walk the parsed SPIR-V for `OpExecutionMode ... LocalSize x y z`.
fn compute_local_size(spirv: &SpirvModule) -> Result<(u32, u32, u32)> {
    let mut loader = rspirv::dr::Loader::new();
    rspirv::binary::parse_words(spirv.words(), &mut loader)
        .map_err(|e| Error::InvalidSpirv(e.to_string()))?;
    let module = loader.module();

    for inst in module.global_inst_iter() {
        if inst.class.opcode as u32 == EXECUTION_MODE_OPCODE {
            use rspirv::dr::Operand::LiteralInt32;
            if let [LiteralInt32(x), LiteralInt32(y), LiteralInt32(z), ..] = inst.operands[2..] {
                return Ok((x, y, z));
            }
        }
    }

    Err(Error::InvalidSpirv(
        "no OpExecutionMode LocalSize found for compute shader".into(),
    ))
}

/// Serialize graphics reflection metadata to the one-line compact JSON wire
/// format callers expect.
pub fn graphics_metadata_json(metadata: &GraphicsShaderMetadata) -> Result<String> {
    serde_json::to_string(metadata).map_err(|e| Error::InvalidSpirv(e.to_string()))
}

/// Serialize compute reflection metadata to the one-line compact JSON wire
/// format callers expect.
pub fn compute_metadata_json(metadata: &ComputePipelineMetadata) -> Result<String> {
    serde_json::to_string(metadata).map_err(|e| Error::InvalidSpirv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflecting_twice_is_byte_identical() {
        let spirv = crate::testutil::compute_shader_fixture();
        let layout = BindingLayout::standard_layout();
        let a = reflect_compute(&spirv, &layout).unwrap();
        let b = reflect_compute(&spirv, &layout).unwrap();
        assert_eq!(compute_metadata_json(&a).unwrap(), compute_metadata_json(&b).unwrap());
    }

    #[test]
    fn compute_invalid_descriptor_set_fails() {
        let spirv = crate::testutil::compute_shader_with_storage_buffer_set(2);
        let layout = BindingLayout::standard_layout();
        let err = reflect_compute(&spirv, &layout).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Descriptor set index for compute storage buffer must be 0 or 1"));
    }

    #[test]
    fn undecorated_resource_fails_with_missing_decoration() {
        let spirv = crate::testutil::compute_shader_with_undecorated_resource();
        let layout = BindingLayout::standard_layout();
        let err = reflect_compute(&spirv, &layout).unwrap_err();
        assert!(matches!(err, Error::MissingDecoration { .. }));
    }

    #[test]
    fn list_resources_classifies_each_binding_with_a_distinct_id() {
        use crate::testutil::ResourceSpec;

        let spirv = crate::testutil::module_with_resources(
            &[
                ResourceSpec::SampledImage(0, 0),
                ResourceSpec::StorageBuffer(1, 0),
                ResourceSpec::UniformBuffer(1, 1),
            ],
            (1, 1, 1),
        );

        let mut resources = list_resources(&spirv).unwrap();
        resources.sort_by_key(|r| (r.set, r.binding));

        assert_eq!(resources.len(), 3);
        assert_eq!((resources[0].set, resources[0].binding), (0, 0));
        assert_eq!(resources[0].kind, ResourceKind::SampledImage);
        assert_eq!((resources[1].set, resources[1].binding), (1, 0));
        assert_eq!(resources[1].kind, ResourceKind::StorageBuffer);
        assert_eq!((resources[2].set, resources[2].binding), (1, 1));
        assert_eq!(resources[2].kind, ResourceKind::UniformBuffer);

        let ids: std::collections::BTreeSet<_> = resources.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3, "each resource variable should keep its own SPIR-V id");
    }
}
