use std::fmt;
use std::hash::{Hash, Hasher};
use wgpu::{
    BufferDescriptor, BufferUsages, Extent3d, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Buffer,
}

/// Handle to a resource declared in the frame graph.
///
/// Two handles are equal when they share an index and a kind; the external flag
/// is carried along but does not take part in identity. All invalid handles are
/// equal regardless of kind.
#[derive(Debug, Clone, Copy)]
pub struct FrameGraphResource {
    index: u32,
    kind: ResourceKind,
    external: bool,
}

impl FrameGraphResource {
    const INVALID_INDEX: u32 = u32::MAX;

    pub const INVALID: Self = Self {
        index: Self::INVALID_INDEX,
        kind: ResourceKind::Buffer,
        external: false,
    };

    pub(crate) fn new(index: u32, kind: ResourceKind, external: bool) -> Self {
        debug_assert!(index != Self::INVALID_INDEX, "index {index} is reserved");
        Self {
            index,
            kind,
            external,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn is_valid(&self) -> bool {
        self.index != Self::INVALID_INDEX
    }

    /// Valid and owned by the frame graph, i.e. eligible for a virtual allocation.
    pub fn is_transient(&self) -> bool {
        self.is_valid() && !self.external
    }

    pub fn as_texture(&self) -> Option<FrameGraphTexture> {
        (self.is_valid() && self.kind == ResourceKind::Texture).then_some(FrameGraphTexture(*self))
    }

    pub fn as_buffer(&self) -> Option<FrameGraphBuffer> {
        (self.is_valid() && self.kind == ResourceKind::Buffer).then_some(FrameGraphBuffer(*self))
    }
}

impl PartialEq for FrameGraphResource {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && (self.kind == other.kind || !self.is_valid())
    }
}

impl Eq for FrameGraphResource {}

impl Hash for FrameGraphResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        if self.is_valid() {
            self.kind.hash(state);
        }
    }
}

impl fmt::Display for FrameGraphResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Invalid");
        }
        write!(f, "{:?}:{}", self.kind, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameGraphTexture(FrameGraphResource);

impl FrameGraphTexture {
    pub const INVALID: Self = Self(FrameGraphResource {
        index: FrameGraphResource::INVALID_INDEX,
        kind: ResourceKind::Texture,
        external: false,
    });

    pub fn resource(&self) -> FrameGraphResource {
        self.0
    }

    pub fn index(&self) -> u32 {
        self.0.index
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    pub fn is_external(&self) -> bool {
        self.0.external
    }
}

impl From<FrameGraphTexture> for FrameGraphResource {
    fn from(texture: FrameGraphTexture) -> Self {
        texture.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameGraphBuffer(FrameGraphResource);

impl FrameGraphBuffer {
    pub const INVALID: Self = Self(FrameGraphResource::INVALID);

    pub fn resource(&self) -> FrameGraphResource {
        self.0
    }

    pub fn index(&self) -> u32 {
        self.0.index
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    pub fn is_external(&self) -> bool {
        self.0.external
    }
}

impl From<FrameGraphBuffer> for FrameGraphResource {
    fn from(buffer: FrameGraphBuffer) -> Self {
        buffer.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsages,
}

impl TextureDescription {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsages) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
        }
    }

    pub fn with_mip_levels(mut self, levels: u32) -> Self {
        self.mip_level_count = levels;
        self
    }

    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    pub fn to_wgpu_descriptor<'a>(&self, label: Option<&'a str>) -> TextureDescriptor<'a> {
        TextureDescriptor {
            label,
            size: Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: self.depth_or_array_layers,
            },
            mip_level_count: self.mip_level_count,
            sample_count: self.sample_count,
            dimension: self.dimension,
            format: self.format,
            usage: self.usage,
            view_formats: &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDescription {
    pub size: u64,
    pub usage: BufferUsages,
}

impl BufferDescription {
    pub fn new(size: u64, usage: BufferUsages) -> Self {
        Self { size, usage }
    }

    pub fn to_wgpu_descriptor<'a>(&self, label: Option<&'a str>) -> BufferDescriptor<'a> {
        BufferDescriptor {
            label,
            size: self.size,
            usage: self.usage,
            mapped_at_creation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceType {
    Texture(TextureDescription),
    Buffer(BufferDescription),
}

impl ResourceType {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceType::Texture(_) => ResourceKind::Texture,
            ResourceType::Buffer(_) => ResourceKind::Buffer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescription {
    pub name: String,
    pub resource_type: ResourceType,
    pub is_external: bool,
}
