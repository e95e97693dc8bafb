use crate::graph::FrameGraph;
use crate::resource::{
    BufferDescription, FrameGraphBuffer, FrameGraphResource, FrameGraphTexture, ResourceType,
    TextureDescription,
};
use bitflags::bitflags;
use wgpu::{BufferUsages, TextureUsages};

bitflags! {
    /// How a pass accesses a resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceUsage: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Accessed by fixed-function stages or copies only.
        const NO_SHADER_ACCESS = 1 << 7;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Queue type a pass is submitted on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPassType {
    #[default]
    Graphics,
    Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetType {
    RenderTarget,
    DepthStencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedResourceData {
    pub usage: ResourceUsage,
    pub resource: FrameGraphResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedRenderTargetData {
    pub target_type: RenderTargetType,
    pub target: FrameGraphTexture,
}

/// Everything the compiler needs to know about one declared pass.
#[derive(Debug, Default, Clone)]
pub struct RenderPassDescription {
    pub name: String,
    pub pass_type: RenderPassType,
    pub resources: Vec<UsedResourceData>,
    pub render_targets: Vec<UsedRenderTargetData>,
    pub allow_culling: bool,
}

impl RenderPassDescription {
    pub fn new(name: &str, pass_type: RenderPassType) -> Self {
        Self {
            name: name.to_string(),
            pass_type,
            resources: Vec::new(),
            render_targets: Vec::new(),
            allow_culling: true,
        }
    }

    pub fn use_resource(mut self, usage: ResourceUsage, resource: impl Into<FrameGraphResource>) -> Self {
        self.resources.push(UsedResourceData {
            usage,
            resource: resource.into(),
        });
        self
    }

    pub fn use_render_target(mut self, target: FrameGraphTexture) -> Self {
        self.render_targets.push(UsedRenderTargetData {
            target_type: RenderTargetType::RenderTarget,
            target,
        });
        self
    }

    pub fn use_depth_stencil(mut self, target: FrameGraphTexture) -> Self {
        self.render_targets.push(UsedRenderTargetData {
            target_type: RenderTargetType::DepthStencil,
            target,
        });
        self
    }

    pub fn allow_culling(mut self, allow: bool) -> Self {
        self.allow_culling = allow;
        self
    }

    pub fn writes_anything(&self) -> bool {
        !self.render_targets.is_empty()
            || self
                .resources
                .iter()
                .any(|data| data.usage.contains(ResourceUsage::WRITE))
    }
}

/// Declares one pass. The pass is appended to its graph when the builder is dropped.
///
/// Declarations that cannot be honoured are logged and skipped instead of
/// failing the whole frame.
pub struct PassBuilder<'a> {
    graph: &'a mut FrameGraph,
    description: RenderPassDescription,
}

impl<'a> PassBuilder<'a> {
    pub(crate) fn new(graph: &'a mut FrameGraph, name: &str, pass_type: RenderPassType) -> Self {
        Self {
            graph,
            description: RenderPassDescription::new(name, pass_type),
        }
    }

    /// Index the pass will have in the frame.
    pub fn pass_index(&self) -> usize {
        self.graph.passes().len()
    }

    pub fn create_texture(&mut self, name: &str, description: TextureDescription) -> FrameGraphTexture {
        if description.width == 0 || description.height == 0 {
            log::warn!(
                "Pass '{}': texture '{name}' has a zero extent",
                self.description.name
            );
            return FrameGraphTexture::INVALID;
        }
        self.graph.resources_mut().declare_texture(name, description)
    }

    pub fn create_buffer(&mut self, name: &str, description: BufferDescription) -> FrameGraphBuffer {
        if description.size == 0 {
            log::warn!("Pass '{}': buffer '{name}' has zero size", self.description.name);
            return FrameGraphBuffer::INVALID;
        }
        self.graph.resources_mut().declare_buffer(name, description)
    }

    pub fn use_resource(&mut self, usage: ResourceUsage, resource: impl Into<FrameGraphResource>) -> &mut Self {
        let resource = resource.into();
        let Some(declared) = self.graph.resources().description(resource) else {
            log::warn!(
                "Pass '{}': ignoring unknown resource '{resource}'",
                self.description.name
            );
            return self;
        };

        let shader_visible = match &declared.resource_type {
            ResourceType::Texture(texture) => texture
                .usage
                .intersects(TextureUsages::TEXTURE_BINDING | TextureUsages::STORAGE_BINDING),
            ResourceType::Buffer(buffer) => buffer.usage.intersects(
                BufferUsages::UNIFORM | BufferUsages::STORAGE | BufferUsages::VERTEX | BufferUsages::INDEX,
            ),
        };
        if !shader_visible && !usage.contains(ResourceUsage::NO_SHADER_ACCESS) {
            log::warn!(
                "Pass '{}': '{}' is used without shader-visible usage flags",
                self.description.name,
                declared.name
            );
        }

        self.description.resources.push(UsedResourceData { usage, resource });
        self
    }

    pub fn use_render_target(&mut self, target: FrameGraphTexture) -> &mut Self {
        if self.validate_attachment(target, false) {
            self.description.render_targets.push(UsedRenderTargetData {
                target_type: RenderTargetType::RenderTarget,
                target,
            });
        }
        self
    }

    pub fn use_depth_stencil(&mut self, target: FrameGraphTexture) -> &mut Self {
        if self.validate_attachment(target, true) {
            self.description.render_targets.push(UsedRenderTargetData {
                target_type: RenderTargetType::DepthStencil,
                target,
            });
        }
        self
    }

    /// Passes that allow culling may be reported as culled when nothing
    /// consumes what they write.
    pub fn allow_culling(&mut self, allow: bool) -> &mut Self {
        self.description.allow_culling = allow;
        self
    }

    fn validate_attachment(&self, target: FrameGraphTexture, depth: bool) -> bool {
        let pass = &self.description.name;
        let texture = match self.graph.resources().description(target.resource()) {
            Some(declared) => match &declared.resource_type {
                ResourceType::Texture(texture) => texture,
                ResourceType::Buffer(_) => return false,
            },
            None => {
                log::warn!("Pass '{pass}': ignoring unknown attachment '{}'", target.resource());
                return false;
            }
        };

        if texture.format.is_depth_stencil_format() != depth {
            log::warn!(
                "Pass '{pass}': format {:?} cannot be bound as a {} attachment",
                texture.format,
                if depth { "depth-stencil" } else { "color" }
            );
            return false;
        }
        if !texture.usage.contains(TextureUsages::RENDER_ATTACHMENT) {
            log::warn!(
                "Pass '{pass}': attachment '{}' is missing RENDER_ATTACHMENT usage",
                target.resource()
            );
            return false;
        }
        true
    }
}

impl Drop for PassBuilder<'_> {
    fn drop(&mut self) {
        let description = std::mem::take(&mut self.description);
        self.graph.push_pass(description);
    }
}
