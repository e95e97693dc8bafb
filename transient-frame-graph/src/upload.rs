use crate::range::align_up;
use crate::resource::FrameGraphResource;
use crate::{FrameGraphError, Result};

/// One staging copy into a frame graph resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRecord {
    pub resource: FrameGraphResource,
    /// Offset of the payload inside the shared upload buffer.
    pub buffer_offset: u64,
    pub buffer_length: u64,
    /// Destination offset inside the resource.
    pub resource_offset: u64,
}

/// Bump-packs upload payloads into a single staging buffer.
///
/// Space is never reclaimed within a frame; [`min_upload_size`](Self::min_upload_size)
/// is the staging buffer size needed to hold every record.
#[derive(Debug, Default)]
pub struct UploadPacker {
    uploads: Vec<UploadRecord>,
    upload_length: u64,
}

impl UploadPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        resource: FrameGraphResource,
        alignment: u64,
        resource_offset: u64,
        upload_size: u64,
    ) -> Result<usize> {
        if !alignment.is_power_of_two() {
            return Err(FrameGraphError::InvalidAlignment { alignment });
        }

        let buffer_offset = align_up(self.upload_length, alignment);
        self.upload_length = buffer_offset + upload_size;

        self.uploads.push(UploadRecord {
            resource,
            buffer_offset,
            buffer_length: upload_size,
            resource_offset,
        });
        Ok(self.uploads.len() - 1)
    }

    pub fn min_upload_size(&self) -> u64 {
        self.upload_length
    }

    pub fn uploads(&self) -> &[UploadRecord] {
        &self.uploads
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
        self.upload_length = 0;
    }
}
