//! Transient resource allocation and pass compilation for a per-frame render graph.
//!
//! Passes declare the textures and buffers they touch. Resolving a frame compiles
//! the passes into per-pass overviews, derives each transient resource's pass
//! lifetime and places every transient resource into a virtual heap, letting
//! resources whose lifetimes never overlap share the same bytes.

mod compiler;
mod events;
mod frame_resources;
mod graph;
mod handle_table;
mod pass;
mod range;
mod resource;
mod resource_info;
mod upload;
mod virtual_space;

pub use compiler::{
    OverviewFlags, PassOverview, PassRelation, RenderPassCompiler, ResourceLifetime, ResourceState,
    TimelineEvent,
};
pub use events::{EventList, ResourceAction, ResourceEvent};
pub use frame_resources::{FrameGraphResources, ResourceLocation};
pub use graph::{FrameGraph, FrameGraphConfig};
pub use handle_table::ResourceHandleTable;
pub use pass::{
    PassBuilder, RenderPassDescription, RenderPassType, RenderTargetType, ResourceUsage,
    UsedRenderTargetData, UsedResourceData,
};
pub use range::{IndexRange, MemoryRange};
pub use resource::{
    BufferDescription, FrameGraphBuffer, FrameGraphResource, FrameGraphTexture, ResourceDescription,
    ResourceKind, ResourceType, TextureDescription,
};
pub use resource_info::{ResourceInfo, ResourceInfoCache, ResourceInfoQuery, WgpuFootprintQuery};
pub use upload::{UploadPacker, UploadRecord};
pub use virtual_space::VirtualSpaceAllocator;

#[derive(Debug, thiserror::Error)]
pub enum FrameGraphError {
    #[error("Alignment {alignment} is not a power of two")]
    InvalidAlignment { alignment: u64 },

    #[error("Cannot allocate a zero-sized range of virtual space")]
    ZeroSizedAllocation,

    #[error("External resource '{resource}' is not managed by the frame graph")]
    ExternalResource { resource: FrameGraphResource },

    #[error("Resource handle '{resource}' is invalid")]
    InvalidResource { resource: FrameGraphResource },

    #[error("Resource '{resource}' already has a lifetime registered this frame")]
    DuplicateLifetime { resource: FrameGraphResource },

    #[error("Resource '{resource}' lifetime {first}..={last} is empty")]
    InvalidLifetime {
        resource: FrameGraphResource,
        first: usize,
        last: usize,
    },

    #[error("Resource '{resource}' description not found")]
    DescriptionNotFound { resource: FrameGraphResource },

    #[error("Texture format {format:?} is not supported for transient allocation")]
    UnsupportedFormat { format: wgpu::TextureFormat },
}

pub type Result<T> = std::result::Result<T, FrameGraphError>;
