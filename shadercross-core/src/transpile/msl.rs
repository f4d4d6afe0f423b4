//! SPIR-V to MSL transpilation and resource-index remapping (component D).
//!
//! Vulkan binds resources at `(descriptor set, binding)` pairs; Metal has
//! three flat index spaces (buffer, texture, sampler) per stage with no
//! notion of a descriptor set at all. The remapper below assigns each
//! resource its MSL index by walking reflected bindings in ascending
//! `(set, binding)` order and applying a fixed sequence of rules, each
//! rule advancing one or more running counters. This mirrors the
//! `ResourceBinding`/`bind_resource` shape used for the same problem
//! elsewhere in the ecosystem, adapted to the `spirv-cross2` resource
//! binding API.

use crate::convention::BindingLayout;
use crate::error::{Error, Result};
use crate::reflect::reflect_descriptor_sets;
use crate::transpile::MslTranspileOutput;
use crate::types::{ShaderStage, SpirvModule};
use rspirv_reflect::DescriptorType;
use spirv_cross2::compile::msl::MslResourceBinding;
use spirv_cross2::spirv::ExecutionModel;
use spirv_cross2::targets::Msl;
use spirv_cross2::{Compiler, SpirvCrossContext};
use std::collections::BTreeMap;

type Sets = BTreeMap<u32, BTreeMap<u32, rspirv_reflect::DescriptorInfo>>;

fn execution_model(stage: ShaderStage) -> ExecutionModel {
    match stage {
        ShaderStage::Vertex => ExecutionModel::Vertex,
        ShaderStage::Fragment => ExecutionModel::Fragment,
        ShaderStage::Compute => ExecutionModel::GLCompute,
    }
}

/// Bindings whose descriptor set falls outside `resource_set`/`uniform_set`
/// are rejected up front by `validate_graphics_sets`/`validate_compute_sets`
/// before this is ever called, so every resource this returns belongs to the
/// requested set.
fn bindings_in_set(sets: &Sets, set_index: u32) -> Vec<(u32, rspirv_reflect::DescriptorInfo)> {
    sets.get(&set_index)
        .map(|bindings| {
            let mut entries: Vec<_> = bindings
                .iter()
                .map(|(&binding, info)| (binding, info.clone()))
                .collect();
            entries.sort_by_key(|(binding, _)| *binding);
            entries
        })
        .unwrap_or_default()
}

/// Reject any resource whose descriptor set isn't one this stage's
/// convention allows for its kind, before the remapper gets a chance to
/// silently skip it. Texture-samplers, storage-textures and storage-buffers
/// belong on `resource_set` (set 0 or 2 per the caller's convention);
/// uniform-buffers belong on `uniform_set` (set 1 or 3).
fn validate_graphics_sets(sets: &Sets, resource_set: u32, uniform_set: u32) -> Result<()> {
    for (&set_index, bindings) in sets {
        for info in bindings.values() {
            let (kind, ok) = match info.ty {
                DescriptorType::SAMPLED_IMAGE | DescriptorType::SAMPLER => {
                    ("graphics sampler", set_index == resource_set)
                }
                DescriptorType::STORAGE_IMAGE => {
                    ("graphics storage texture", set_index == resource_set)
                }
                DescriptorType::STORAGE_BUFFER => {
                    ("graphics storage buffer", set_index == resource_set)
                }
                DescriptorType::UNIFORM_BUFFER => {
                    ("graphics uniform buffer", set_index == uniform_set)
                }
                _ => continue,
            };
            if !ok {
                let allowed = if kind == "graphics uniform buffer" {
                    "1 or 3"
                } else {
                    "0 or 2"
                };
                return Err(Error::InvalidDescriptorSet {
                    kind,
                    index: set_index,
                    allowed,
                });
            }
        }
    }
    Ok(())
}

/// Same idea as `validate_graphics_sets`, for compute's three-way
/// readonly/readwrite/uniform split.
fn validate_compute_sets(sets: &Sets, layout: &BindingLayout) -> Result<()> {
    let readonly = layout.compute_readonly_set;
    let readwrite = layout.compute_readwrite_set;
    let uniforms = layout.compute_uniforms_set;
    for (&set_index, bindings) in sets {
        for info in bindings.values() {
            let (kind, ok, allowed) = match info.ty {
                DescriptorType::SAMPLED_IMAGE | DescriptorType::SAMPLER => {
                    ("compute sampler", set_index == readonly, "0")
                }
                DescriptorType::STORAGE_IMAGE => (
                    "compute storage texture",
                    set_index == readonly || set_index == readwrite,
                    "0 or 1",
                ),
                DescriptorType::STORAGE_BUFFER => (
                    "compute storage buffer",
                    set_index == readonly || set_index == readwrite,
                    "0 or 1",
                ),
                DescriptorType::UNIFORM_BUFFER => {
                    ("compute uniform buffer", set_index == uniforms, "2")
                }
                _ => continue,
            };
            if !ok {
                return Err(Error::InvalidDescriptorSet {
                    kind,
                    index: set_index,
                    allowed,
                });
            }
        }
    }
    Ok(())
}

/// The four ordered rules for a graphics stage (vertex or fragment): each
/// rule assigns an MSL index built from the resource's own `binding` plus a
/// fixed offset carried over from the previous rule's total count. Because
/// the descriptor-set convention numbers each resource kind from zero within
/// its set, this still tolerates a shader that skips a binding slot within a
/// kind.
fn graphics_bindings(
    sets: &Sets,
    stage: ShaderStage,
    resource_set: u32,
    uniform_set: u32,
) -> Vec<MslResourceBinding> {
    let model = execution_model(stage);
    let mut out = Vec::new();

    // Rule 1: texture-samplers — msl_texture = msl_sampler = binding.
    let texture_samplers: Vec<_> = bindings_in_set(sets, resource_set)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::SAMPLED_IMAGE)
        .collect();
    for (binding, _) in &texture_samplers {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: resource_set,
            binding: *binding,
            msl_buffer: None,
            msl_texture: Some(*binding),
            msl_sampler: Some(*binding),
        });
    }
    let n_ts = texture_samplers.len() as u32;

    // Rule 2: storage-textures — msl_texture = N_ts + binding.
    for (binding, info) in bindings_in_set(sets, resource_set) {
        if info.ty == DescriptorType::STORAGE_IMAGE {
            out.push(MslResourceBinding {
                stage: model,
                desc_set: resource_set,
                binding,
                msl_buffer: None,
                msl_texture: Some(n_ts + binding),
                msl_sampler: None,
            });
        }
    }

    // Rule 3: storage-buffers — msl_buffer = binding.
    let storage_buffers: Vec<_> = bindings_in_set(sets, resource_set)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::STORAGE_BUFFER)
        .collect();
    for (binding, _) in &storage_buffers {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: resource_set,
            binding: *binding,
            msl_buffer: Some(*binding),
            msl_texture: None,
            msl_sampler: None,
        });
    }
    let n_sb = storage_buffers.len() as u32;

    // Rule 4: uniform-buffers — msl_buffer = N_sb + binding.
    for (binding, info) in bindings_in_set(sets, uniform_set) {
        if info.ty == DescriptorType::UNIFORM_BUFFER {
            out.push(MslResourceBinding {
                stage: model,
                desc_set: uniform_set,
                binding,
                msl_buffer: Some(n_sb + binding),
                msl_texture: None,
                msl_sampler: None,
            });
        }
    }

    out
}

/// The six ordered rules for a compute shader: texture-samplers on
/// the readonly set, readonly storage-textures, readwrite storage-textures
/// (one running texture offset across all three), then readonly
/// storage-buffers, readwrite storage-buffers, and uniform-buffers (one
/// running buffer offset across all three). Each rule's offset is the total
/// count contributed by every earlier rule; within a rule, the MSL index is
/// that offset plus the resource's own `binding`.
fn compute_bindings(sets: &Sets, layout: &BindingLayout) -> Vec<MslResourceBinding> {
    let model = ExecutionModel::GLCompute;
    let mut out = Vec::new();

    let readonly = layout.compute_readonly_set;
    let readwrite = layout.compute_readwrite_set;
    let uniforms = layout.compute_uniforms_set;

    // Rule 1: texture-samplers on the readonly set — msl_texture =
    // msl_sampler = T, the running counter, not the resource's own binding;
    // T++ per resource.
    let texture_samplers: Vec<_> = bindings_in_set(sets, readonly)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::SAMPLED_IMAGE)
        .collect();
    let mut texture_offset = 0u32;
    for (binding, _) in &texture_samplers {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: readonly,
            binding: *binding,
            msl_buffer: None,
            msl_texture: Some(texture_offset),
            msl_sampler: Some(texture_offset),
        });
        texture_offset += 1;
    }

    // Rule 2: readonly storage-textures — msl_texture = T + binding.
    let readonly_images: Vec<_> = bindings_in_set(sets, readonly)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::STORAGE_IMAGE)
        .collect();
    for (binding, _) in &readonly_images {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: readonly,
            binding: *binding,
            msl_buffer: None,
            msl_texture: Some(texture_offset + binding),
            msl_sampler: None,
        });
    }
    texture_offset += readonly_images.len() as u32;

    // Rule 3: readwrite storage-textures, continuing the texture offset.
    let readwrite_images: Vec<_> = bindings_in_set(sets, readwrite)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::STORAGE_IMAGE)
        .collect();
    for (binding, _) in &readwrite_images {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: readwrite,
            binding: *binding,
            msl_buffer: None,
            msl_texture: Some(texture_offset + binding),
            msl_sampler: None,
        });
    }

    // Rule 4: readonly storage-buffers — msl_buffer = binding.
    let readonly_buffers: Vec<_> = bindings_in_set(sets, readonly)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::STORAGE_BUFFER)
        .collect();
    let mut buffer_offset = 0u32;
    for (binding, _) in &readonly_buffers {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: readonly,
            binding: *binding,
            msl_buffer: Some(buffer_offset + binding),
            msl_texture: None,
            msl_sampler: None,
        });
    }
    buffer_offset += readonly_buffers.len() as u32;

    // Rule 5: readwrite storage-buffers — msl_buffer = B + binding.
    let readwrite_buffers: Vec<_> = bindings_in_set(sets, readwrite)
        .into_iter()
        .filter(|(_, info)| info.ty == DescriptorType::STORAGE_BUFFER)
        .collect();
    for (binding, _) in &readwrite_buffers {
        out.push(MslResourceBinding {
            stage: model,
            desc_set: readwrite,
            binding: *binding,
            msl_buffer: Some(buffer_offset + binding),
            msl_texture: None,
            msl_sampler: None,
        });
    }
    buffer_offset += readwrite_buffers.len() as u32;

    // Rule 6: uniform-buffers, continuing the buffer offset.
    for (binding, info) in bindings_in_set(sets, uniforms) {
        if info.ty == DescriptorType::UNIFORM_BUFFER {
            out.push(MslResourceBinding {
                stage: model,
                desc_set: uniforms,
                binding,
                msl_buffer: Some(buffer_offset + binding),
                msl_texture: None,
                msl_sampler: None,
            });
        }
    }

    out
}

/// Transpile a graphics-stage SPIR-V module to MSL source text.
///
/// Returns the MSL source alongside the *cleansed* entry point name :
/// `entry_point` as authored may collide with an MSL/C++ reserved word (most
/// commonly `main`, which SPIRV-Cross renames to `main0`), and the caller
/// must hand this cleansed name — never the original — to whatever Metal
/// toolchain consumes the returned source.
pub fn transpile_graphics_to_msl(
    spirv: &SpirvModule,
    stage: ShaderStage,
    layout: &BindingLayout,
    entry_point: &str,
) -> Result<MslTranspileOutput> {
    let (resource_set, uniform_set) = match stage {
        ShaderStage::Vertex => (layout.vertex_resources_set, layout.vertex_uniforms_set),
        ShaderStage::Fragment => (layout.fragment_resources_set, layout.fragment_uniforms_set),
        ShaderStage::Compute => {
            return Err(Error::UnsupportedRoute(
                "compute shaders must go through transpile_compute_to_msl".into(),
            ))
        }
    };

    let sets = reflect_descriptor_sets(spirv)?;
    validate_graphics_sets(&sets, resource_set, uniform_set)?;
    let bindings = graphics_bindings(&sets, stage, resource_set, uniform_set);
    compile_msl(spirv, &bindings, entry_point)
}

/// Transpile a compute SPIR-V module to MSL source text. See
/// [`transpile_graphics_to_msl`] for the cleansed-entry-point contract.
pub fn transpile_compute_to_msl(
    spirv: &SpirvModule,
    layout: &BindingLayout,
    entry_point: &str,
) -> Result<MslTranspileOutput> {
    let sets = reflect_descriptor_sets(spirv)?;
    validate_compute_sets(&sets, layout)?;
    let bindings = compute_bindings(&sets, layout);
    compile_msl(spirv, &bindings, entry_point)
}

fn compile_msl(
    spirv: &SpirvModule,
    bindings: &[MslResourceBinding],
    entry_point: &str,
) -> Result<MslTranspileOutput> {
    let context = SpirvCrossContext::new().map_err(|e| Error::TranspileFailed(e.to_string()))?;
    let mut compiler: Compiler<Msl> = context
        .create_compiler(spirv.words())
        .map_err(|e| Error::TranspileFailed(e.to_string()))?;

    for binding in bindings {
        compiler
            .add_msl_resource_binding(binding.clone())
            .map_err(|e| Error::TranspileFailed(e.to_string()))?;
    }

    let options = Msl::options();
    let artifact = compiler
        .compile(&options)
        .map_err(|e| Error::TranspileFailed(e.to_string()))?;

    // SPIRV-Cross renames entry points that collide with MSL/C++ reserved
    // words as part of compilation; `entry_points()` reflects the name it
    // settled on, not what was authored. Downstream backends must use this.
    let cleansed = artifact
        .entry_points()
        .map_err(|e| Error::TranspileFailed(e.to_string()))?
        .into_iter()
        .find(|ep| ep.name == entry_point || ep.name.starts_with(entry_point))
        .map(|ep| ep.name.to_string())
        .unwrap_or_else(|| entry_point.to_string());

    Ok((artifact.to_string(), cleansed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ResourceSpec;

    fn assert_distinct_per_space(bindings: &[MslResourceBinding]) {
        let mut textures = Vec::new();
        let mut samplers = Vec::new();
        let mut buffers = Vec::new();
        for b in bindings {
            if let Some(t) = b.msl_texture {
                textures.push(t);
            }
            if let Some(s) = b.msl_sampler {
                samplers.push(s);
            }
            if let Some(buf) = b.msl_buffer {
                buffers.push(buf);
            }
        }
        for (name, mut indices) in [("texture", textures), ("sampler", samplers), ("buffer", buffers)] {
            let before = indices.len();
            indices.sort_unstable();
            indices.dedup();
            assert_eq!(indices.len(), before, "{} indices were not distinct", name);
        }
    }

    /// In each Metal index space, every resource of the same stage gets a
    /// distinct index, and the index a resource gets matches its own
    /// `binding` plus the running offset contributed by earlier rules.
    #[test]
    fn graphics_remap_follows_the_ordered_rules() {
        let spirv = crate::testutil::module_with_resources(
            &[
                ResourceSpec::SampledImage(0, 0),
                ResourceSpec::StorageImage(0, 0),
                ResourceSpec::StorageBuffer(0, 0),
                ResourceSpec::UniformBuffer(1, 0),
            ],
            (1, 1, 1),
        );
        let sets = reflect_descriptor_sets(&spirv).unwrap();
        let bindings = graphics_bindings(&sets, ShaderStage::Fragment, 0, 1);

        assert_eq!(bindings.len(), 4);
        assert_distinct_per_space(&bindings);

        let texture_sampler = bindings
            .iter()
            .find(|b| b.msl_sampler.is_some())
            .unwrap();
        assert_eq!(texture_sampler.msl_texture, Some(0));
        assert_eq!(texture_sampler.msl_sampler, Some(0));

        let storage_image = bindings
            .iter()
            .find(|b| b.msl_texture.is_some() && b.msl_sampler.is_none())
            .unwrap();
        // N_ts (1) + binding (0).
        assert_eq!(storage_image.msl_texture, Some(1));

        let uniform_buffer = bindings.iter().find(|b| b.desc_set == 1).unwrap();
        // N_sb (1) + binding (0).
        assert_eq!(uniform_buffer.msl_buffer, Some(1));
    }

    #[test]
    fn compute_remap_keeps_texture_and_buffer_spaces_distinct() {
        let layout = BindingLayout::standard_layout();
        let spirv = crate::testutil::module_with_resources(
            &[
                ResourceSpec::SampledImage(0, 0),
                ResourceSpec::StorageImage(0, 1),
                ResourceSpec::StorageImage(1, 0),
                ResourceSpec::StorageBuffer(0, 2),
                ResourceSpec::StorageBuffer(1, 1),
                ResourceSpec::UniformBuffer(2, 0),
            ],
            (8, 8, 1),
        );
        let sets = reflect_descriptor_sets(&spirv).unwrap();
        let bindings = compute_bindings(&sets, &layout);

        assert_eq!(bindings.len(), 6);
        assert_distinct_per_space(&bindings);

        let readwrite_buffer = bindings
            .iter()
            .find(|b| b.desc_set == 1 && b.msl_buffer.is_some())
            .unwrap();
        // B after the one readonly storage buffer (1) + its own binding (1).
        assert_eq!(readwrite_buffer.msl_buffer, Some(2));

        let uniform_buffer = bindings.iter().find(|b| b.desc_set == 2).unwrap();
        // B after both storage buffer groups (2) + binding (0).
        assert_eq!(uniform_buffer.msl_buffer, Some(2));
    }

    /// Invariant #4: `main` collides with a reserved identifier in MSL/C++,
    /// so SPIRV-Cross cleanses it to `main0`; the transpiler must surface
    /// that renamed form rather than the one the shader was authored with.
    #[test]
    fn entry_point_main_is_cleansed_to_main0() {
        let layout = BindingLayout::standard_layout();
        let spirv = crate::testutil::compute_shader_fixture();
        let (_, entry_point) = transpile_compute_to_msl(&spirv, &layout, "main").unwrap();
        assert_eq!(entry_point, "main0");
    }

    /// Compute rule 1's index is the sequential counter `T`, not the
    /// resource's own binding, so non-contiguous sampler bindings still get
    /// packed indices.
    #[test]
    fn compute_texture_sampler_index_is_sequential_not_binding() {
        let layout = BindingLayout::standard_layout();
        let spirv = crate::testutil::module_with_resources(
            &[
                ResourceSpec::SampledImage(0, 3),
                ResourceSpec::SampledImage(0, 7),
            ],
            (1, 1, 1),
        );
        let sets = reflect_descriptor_sets(&spirv).unwrap();
        let bindings = compute_bindings(&sets, &layout);

        assert_eq!(bindings.len(), 2);
        let first = bindings.iter().find(|b| b.binding == 3).unwrap();
        let second = bindings.iter().find(|b| b.binding == 7).unwrap();
        assert_eq!(first.msl_texture, Some(0));
        assert_eq!(first.msl_sampler, Some(0));
        assert_eq!(second.msl_texture, Some(1));
        assert_eq!(second.msl_sampler, Some(1));
    }

    /// A storage buffer outside the compute readonly/readwrite sets is
    /// rejected before remapping, not silently dropped (scenario E5).
    #[test]
    fn transpile_compute_to_msl_rejects_out_of_convention_set() {
        let layout = BindingLayout::standard_layout();
        let spirv = crate::testutil::compute_shader_with_storage_buffer_set(2);
        let err = transpile_compute_to_msl(&spirv, &layout, "main").unwrap_err();
        assert!(err
            .to_string()
            .contains("Descriptor set index for compute storage buffer must be 0 or 1"));
    }

    /// The same invariant holds on the graphics MSL route: a resource
    /// outside the stage's resource/uniform set pair fails transpilation
    /// rather than being dropped.
    #[test]
    fn transpile_graphics_to_msl_rejects_out_of_convention_set() {
        let layout = BindingLayout::standard_layout();
        let spirv = crate::testutil::module_with_resources(
            &[ResourceSpec::UniformBuffer(2, 0)],
            (1, 1, 1),
        );
        let err = transpile_graphics_to_msl(&spirv, ShaderStage::Fragment, &layout, "main")
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Descriptor set index for graphics uniform buffer must be 1 or 3"));
    }
}
