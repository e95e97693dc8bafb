use crate::range::align_up;
use crate::resource::{BufferDescription, FrameGraphResource, ResourceDescription, ResourceType, TextureDescription};
use crate::{FrameGraphError, Result};
use std::collections::HashMap;
use wgpu::{TextureDimension, TextureFormat};

/// Physical footprint of a resource as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceInfo {
    pub size_in_bytes: u64,
    /// Placement alignment in bytes, always a power of two.
    pub alignment: u64,
}

/// Device-side query turning a logical description into its physical footprint.
///
/// Implementations may be expensive; the frame graph asks at most once per
/// resource per frame through [`ResourceInfoCache`].
pub trait ResourceInfoQuery {
    fn query_resource_info(&self, description: &ResourceDescription) -> Result<ResourceInfo>;
}

/// Per-frame memo of [`ResourceInfoQuery`] answers, keyed by resource.
#[derive(Debug, Default)]
pub struct ResourceInfoCache {
    cached: HashMap<FrameGraphResource, ResourceInfo>,
}

impl ResourceInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: FrameGraphResource) -> Option<ResourceInfo> {
        self.cached.get(&resource).copied()
    }

    pub fn get_or_query<Q: ResourceInfoQuery + ?Sized>(
        &mut self,
        resource: FrameGraphResource,
        description: &ResourceDescription,
        device: &Q,
    ) -> Result<ResourceInfo> {
        if let Some(info) = self.cached.get(&resource) {
            return Ok(*info);
        }

        let info = device.query_resource_info(description)?;
        self.cached.insert(resource, info);
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.cached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cached.is_empty()
    }

    pub fn clear(&mut self) {
        self.cached.clear();
    }
}

const TEXTURE_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;
const MSAA_TEXTURE_PLACEMENT_ALIGNMENT: u64 = 4 * 1024 * 1024;
const BUFFER_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;
const BUFFER_SIZE_GRANULARITY: u64 = 256;

/// Footprint estimate derived from the wgpu descriptions alone.
///
/// Textures are tightly packed per mip level and rounded to the placement
/// alignment of placed resources; buffers are rounded to 256 bytes.
/// Block-compressed formats are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgpuFootprintQuery;

impl WgpuFootprintQuery {
    fn texture_footprint(description: &TextureDescription) -> Result<ResourceInfo> {
        let format = description.format;
        if format.is_compressed() {
            return Err(FrameGraphError::UnsupportedFormat { format });
        }

        let texel_size = format
            .block_copy_size(None)
            .or_else(|| depth_stencil_texel_size(format))
            .ok_or(FrameGraphError::UnsupportedFormat { format })? as u64;

        let mut size = 0u64;
        for level in 0..description.mip_level_count.max(1) {
            let width = mip_extent(description.width, level) as u64;
            let height = mip_extent(description.height, level) as u64;
            let depth = match description.dimension {
                TextureDimension::D3 => mip_extent(description.depth_or_array_layers, level),
                _ => description.depth_or_array_layers.max(1),
            } as u64;

            size += width * height * depth * texel_size;
        }
        size *= description.sample_count.max(1) as u64;

        let alignment = if description.sample_count > 1 {
            MSAA_TEXTURE_PLACEMENT_ALIGNMENT
        } else {
            TEXTURE_PLACEMENT_ALIGNMENT
        };

        Ok(ResourceInfo {
            size_in_bytes: align_up(size, alignment),
            alignment,
        })
    }

    fn buffer_footprint(description: &BufferDescription) -> ResourceInfo {
        ResourceInfo {
            size_in_bytes: align_up(description.size.max(1), BUFFER_SIZE_GRANULARITY),
            alignment: BUFFER_PLACEMENT_ALIGNMENT,
        }
    }
}

impl ResourceInfoQuery for WgpuFootprintQuery {
    fn query_resource_info(&self, description: &ResourceDescription) -> Result<ResourceInfo> {
        match &description.resource_type {
            ResourceType::Texture(texture) => Self::texture_footprint(texture),
            ResourceType::Buffer(buffer) => Ok(Self::buffer_footprint(buffer)),
        }
    }
}

// Combined and 24-bit depth formats have no single copy size.
fn depth_stencil_texel_size(format: TextureFormat) -> Option<u32> {
    match format {
        TextureFormat::Stencil8 => Some(1),
        TextureFormat::Depth16Unorm => Some(2),
        TextureFormat::Depth24Plus | TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32Float => Some(4),
        TextureFormat::Depth32FloatStencil8 => Some(8),
        _ => None,
    }
}

fn mip_extent(extent: u32, level: u32) -> u32 {
    extent.checked_shr(level).unwrap_or(0).max(1)
}
