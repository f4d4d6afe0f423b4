//! The descriptor-set convention shaders must be authored to.
//!
//! Kept as a value rather than a literal constant scattered through the
//! reflection and remapping code, so a future convention can be introduced
//! without touching either.

/// Which descriptor sets carry which kind of resource, for graphics and
/// compute shaders respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingLayout {
    pub vertex_resources_set: u32,
    pub vertex_uniforms_set: u32,
    pub fragment_resources_set: u32,
    pub fragment_uniforms_set: u32,
    pub compute_readonly_set: u32,
    pub compute_readwrite_set: u32,
    pub compute_uniforms_set: u32,
}

impl BindingLayout {
    /// The convention this crate ships with by default: vertex resources on
    /// set 0, vertex uniforms on set 1, fragment resources on set 2,
    /// fragment uniforms on set 3; compute readonly resources on set 0,
    /// readwrite on set 1, uniforms on set 2.
    pub const fn standard_layout() -> Self {
        BindingLayout {
            vertex_resources_set: 0,
            vertex_uniforms_set: 1,
            fragment_resources_set: 2,
            fragment_uniforms_set: 3,
            compute_readonly_set: 0,
            compute_readwrite_set: 1,
            compute_uniforms_set: 2,
        }
    }

    pub fn graphics_resource_sets(&self) -> [u32; 2] {
        [self.vertex_resources_set, self.fragment_resources_set]
    }

    pub fn graphics_uniform_sets(&self) -> [u32; 2] {
        [self.vertex_uniforms_set, self.fragment_uniforms_set]
    }
}

impl Default for BindingLayout {
    fn default() -> Self {
        Self::standard_layout()
    }
}
