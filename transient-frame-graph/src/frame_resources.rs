use crate::events::{EventList, ResourceAction, ResourceEvent};
use crate::handle_table::ResourceHandleTable;
use crate::range::MemoryRange;
use crate::resource::{
    BufferDescription, FrameGraphBuffer, FrameGraphResource, FrameGraphTexture,
    ResourceDescription, ResourceKind, ResourceType, TextureDescription,
};
use crate::resource_info::{ResourceInfoCache, ResourceInfoQuery};
use crate::upload::{UploadPacker, UploadRecord};
use crate::virtual_space::VirtualSpaceAllocator;
use crate::{FrameGraphError, Result};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Placement of one transient resource inside the frame's virtual heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLocation {
    pub resource: FrameGraphResource,
    pub memory_offset: u64,
    pub memory_size: u64,
    pub alignment: u64,
}

/// Every resource declared for a frame together with its virtual placement.
///
/// Declarations live until [`clear_new_frame`](Self::clear_new_frame);
/// lifetimes, placements and uploads until [`clear_resources`](Self::clear_resources).
#[derive(Debug, Default)]
pub struct FrameGraphResources {
    descriptions: Vec<ResourceDescription>,
    handles: ResourceHandleTable,
    events: EventList,
    allocator: VirtualSpaceAllocator,
    allocated: HashMap<FrameGraphResource, MemoryRange>,
    locations: Vec<ResourceLocation>,
    resource_info: ResourceInfoCache,
    uploads: UploadPacker,
    highest_memory_usage: u64,
}

impl FrameGraphResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_texture(&mut self, name: &str, description: TextureDescription) -> FrameGraphTexture {
        self.declare(name, ResourceType::Texture(description), false)
            .as_texture()
            .unwrap_or(FrameGraphTexture::INVALID)
    }

    pub fn declare_buffer(&mut self, name: &str, description: BufferDescription) -> FrameGraphBuffer {
        self.declare(name, ResourceType::Buffer(description), false)
            .as_buffer()
            .unwrap_or(FrameGraphBuffer::INVALID)
    }

    /// Registers a texture owned outside the frame graph. It gets a handle but
    /// never a lifetime or a placement.
    pub fn import_texture(&mut self, name: &str, description: TextureDescription) -> FrameGraphTexture {
        self.declare(name, ResourceType::Texture(description), true)
            .as_texture()
            .unwrap_or(FrameGraphTexture::INVALID)
    }

    pub fn import_buffer(&mut self, name: &str, description: BufferDescription) -> FrameGraphBuffer {
        self.declare(name, ResourceType::Buffer(description), true)
            .as_buffer()
            .unwrap_or(FrameGraphBuffer::INVALID)
    }

    fn declare(&mut self, name: &str, resource_type: ResourceType, is_external: bool) -> FrameGraphResource {
        let Some(index) = next_index(self.descriptions.len()) else {
            log::warn!("Cannot declare '{name}': resource indices are exhausted");
            return FrameGraphResource::INVALID;
        };
        let resource = FrameGraphResource::new(index, resource_type.kind(), is_external);

        self.descriptions.push(ResourceDescription {
            name: name.to_string(),
            resource_type,
            is_external,
        });
        self.add_fg_resource(resource);
        resource
    }

    pub fn add_fg_resource(&mut self, resource: FrameGraphResource) {
        self.handles.add_fg_resource(resource);
    }

    pub fn find_fg_resource(&self, index: u32) -> FrameGraphResource {
        self.handles.find_fg_resource(index)
    }

    pub fn find_fg_buffer(&self, index: u32) -> FrameGraphBuffer {
        self.handles.find_fg_buffer(index)
    }

    pub fn find_fg_texture(&self, index: u32) -> FrameGraphTexture {
        self.handles.find_fg_texture(index)
    }

    pub fn description(&self, resource: FrameGraphResource) -> Option<&ResourceDescription> {
        if !resource.is_valid() {
            return None;
        }
        self.descriptions
            .get(resource.index() as usize)
            .filter(|description| description.resource_type.kind() == resource.kind())
    }

    pub fn resource_count(&self) -> usize {
        self.descriptions.len()
    }

    pub fn add_resource_with_lifetime(
        &mut self,
        resource: FrameGraphResource,
        lifetime: RangeInclusive<usize>,
    ) -> Result<()> {
        if resource.is_transient() && self.description(resource).is_none() {
            return Err(FrameGraphError::DescriptionNotFound { resource });
        }
        self.events.add_resource_with_lifetime(resource, lifetime)
    }

    /// Sorts the lifetime events and replays them, placing every transient
    /// resource in the virtual heap. Replaying twice yields the same layout.
    ///
    /// On error no placement is kept.
    pub fn sort_and_finish<Q: ResourceInfoQuery + ?Sized>(&mut self, device: &Q) -> Result<()> {
        self.reset_placement();
        self.events.sort();

        if let Err(error) = self.replay(device) {
            self.reset_placement();
            return Err(error);
        }

        self.highest_memory_usage = self.allocator.highest_extent();
        log::debug!(
            "Placed {} transient resources, highest memory usage {} bytes",
            self.locations.len(),
            self.highest_memory_usage
        );
        Ok(())
    }

    fn reset_placement(&mut self) {
        self.allocator.reset();
        self.allocated.clear();
        self.locations.clear();
        self.highest_memory_usage = 0;
    }

    fn replay<Q: ResourceInfoQuery + ?Sized>(&mut self, device: &Q) -> Result<()> {
        for event in self.events.events() {
            let resource = event.resource;
            match event.action {
                ResourceAction::Create => {
                    let description = self
                        .descriptions
                        .get(resource.index() as usize)
                        .ok_or(FrameGraphError::DescriptionNotFound { resource })?;
                    let info = self.resource_info.get_or_query(resource, description, device)?;
                    let range = self.allocator.allocate(info.size_in_bytes, info.alignment)?;

                    log::trace!(
                        "Pass {}: create '{}' at {}..{}",
                        event.pass_index,
                        description.name,
                        range.aligned_start,
                        range.end
                    );

                    self.allocated.insert(resource, range);
                    self.locations.push(ResourceLocation {
                        resource,
                        memory_offset: range.aligned_start,
                        memory_size: info.size_in_bytes,
                        alignment: info.alignment,
                    });
                }
                ResourceAction::Destroy => match self.allocated.get(&resource) {
                    Some(range) => {
                        log::trace!("Pass {}: destroy '{}'", event.pass_index, resource);
                        self.allocator.free(*range);
                    }
                    None => {
                        log::error!("Resource '{resource}' is not present in the allocation map");
                    }
                },
            }
        }
        Ok(())
    }

    pub fn add_buffer_upload<Q: ResourceInfoQuery + ?Sized>(
        &mut self,
        buffer: FrameGraphBuffer,
        upload_offset: u64,
        upload_size: u64,
        device: &Q,
    ) -> Result<usize> {
        self.add_upload(buffer.resource(), upload_offset, upload_size, device)
    }

    pub fn add_texture_upload<Q: ResourceInfoQuery + ?Sized>(
        &mut self,
        texture: FrameGraphTexture,
        upload_offset: u64,
        upload_size: u64,
        device: &Q,
    ) -> Result<usize> {
        self.add_upload(texture.resource(), upload_offset, upload_size, device)
    }

    fn add_upload<Q: ResourceInfoQuery + ?Sized>(
        &mut self,
        resource: FrameGraphResource,
        upload_offset: u64,
        upload_size: u64,
        device: &Q,
    ) -> Result<usize> {
        if !resource.is_valid() {
            return Err(FrameGraphError::InvalidResource { resource });
        }
        if resource.is_external() {
            return Err(FrameGraphError::ExternalResource { resource });
        }

        let description = self
            .descriptions
            .get(resource.index() as usize)
            .ok_or(FrameGraphError::DescriptionNotFound { resource })?;
        let info = self.resource_info.get_or_query(resource, description, device)?;

        self.uploads.push(resource, info.alignment, upload_offset, upload_size)
    }

    /// Drops declarations and invalidates the handle table on top of
    /// [`clear_resources`](Self::clear_resources).
    pub fn clear_new_frame(&mut self) {
        self.descriptions.clear();
        self.handles.clear();
        self.clear_resources();
    }

    pub fn clear_resources(&mut self) {
        if !self.events.is_empty() || !self.uploads.uploads().is_empty() {
            log::debug!(
                "Discarding {} lifetime events and {} uploads",
                self.events.len(),
                self.uploads.uploads().len()
            );
        }
        self.events.clear();
        self.resource_info.clear();
        self.uploads.clear();
        self.reset_placement();
    }

    pub fn events(&self) -> &[ResourceEvent] {
        self.events.events()
    }

    pub fn locations(&self) -> &[ResourceLocation] {
        &self.locations
    }

    pub fn location_of(&self, resource: FrameGraphResource) -> Option<&ResourceLocation> {
        self.locations
            .iter()
            .find(|location| location.resource == resource)
    }

    pub fn uploads(&self) -> &[UploadRecord] {
        self.uploads.uploads()
    }

    pub fn highest_memory_usage(&self) -> u64 {
        self.highest_memory_usage
    }

    pub fn min_upload_size(&self) -> u64 {
        self.uploads.min_upload_size()
    }

    pub fn handles(&self) -> &ResourceHandleTable {
        &self.handles
    }

    pub fn kind_of(&self, index: u32) -> Option<ResourceKind> {
        let resource = self.find_fg_resource(index);
        resource.is_valid().then(|| resource.kind())
    }

    #[cfg(test)]
    pub(crate) fn push_event(&mut self, event: ResourceEvent) {
        self.events.push(event);
    }
}

// `u32::MAX` is the invalid handle index.
fn next_index(count: usize) -> Option<u32> {
    u32::try_from(count).ok().filter(|&index| index != u32::MAX)
}
