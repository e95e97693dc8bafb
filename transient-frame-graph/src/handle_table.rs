use crate::resource::{FrameGraphBuffer, FrameGraphResource, FrameGraphTexture};

/// Index-addressed lookup of every resource handle declared this frame.
#[derive(Debug, Default)]
pub struct ResourceHandleTable {
    handles: Vec<FrameGraphResource>,
}

impl ResourceHandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `resource` at its own index, growing the table to the next power
    /// of two when needed. Invalid handles are ignored.
    pub fn add_fg_resource(&mut self, resource: FrameGraphResource) {
        if !resource.is_valid() {
            return;
        }

        let index = resource.index() as usize;
        if index >= self.handles.len() {
            let capacity = (index + 1).next_power_of_two();
            self.handles.resize(capacity, FrameGraphResource::INVALID);
        }
        self.handles[index] = resource;
    }

    pub fn find_fg_resource(&self, index: u32) -> FrameGraphResource {
        self.handles
            .get(index as usize)
            .copied()
            .unwrap_or(FrameGraphResource::INVALID)
    }

    pub fn find_fg_buffer(&self, index: u32) -> FrameGraphBuffer {
        self.find_fg_resource(index)
            .as_buffer()
            .unwrap_or(FrameGraphBuffer::INVALID)
    }

    pub fn find_fg_texture(&self, index: u32) -> FrameGraphTexture {
        self.find_fg_resource(index)
            .as_texture()
            .unwrap_or(FrameGraphTexture::INVALID)
    }

    /// Invalidates every slot but keeps the storage for the next frame.
    pub fn clear(&mut self) {
        self.handles.fill(FrameGraphResource::INVALID);
    }

    pub fn capacity(&self) -> usize {
        self.handles.len()
    }
}
