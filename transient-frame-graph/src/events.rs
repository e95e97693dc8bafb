use crate::resource::FrameGraphResource;
use crate::{FrameGraphError, Result};
use std::collections::HashSet;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Create,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEvent {
    pub action: ResourceAction,
    pub pass_index: usize,
    pub resource: FrameGraphResource,
}

/// Create/destroy timeline of the transient resources of one frame.
#[derive(Debug, Default)]
pub struct EventList {
    events: Vec<ResourceEvent>,
    registered: HashSet<FrameGraphResource>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource referenced by the passes in `lifetime` (inclusive).
    ///
    /// The resource is created at the first pass and destroyed at the pass
    /// following the last one, so its memory is available again for anything
    /// created from that pass on.
    pub fn add_resource_with_lifetime(
        &mut self,
        resource: FrameGraphResource,
        lifetime: RangeInclusive<usize>,
    ) -> Result<()> {
        if !resource.is_valid() {
            return Err(FrameGraphError::InvalidResource { resource });
        }
        if resource.is_external() {
            return Err(FrameGraphError::ExternalResource { resource });
        }

        let (first, last) = lifetime.into_inner();
        // The destroy lands one pass after `last`.
        let end = last.checked_add(1).filter(|_| first <= last);
        let Some(end) = end else {
            return Err(FrameGraphError::InvalidLifetime {
                resource,
                first,
                last,
            });
        };
        if !self.registered.insert(resource) {
            return Err(FrameGraphError::DuplicateLifetime { resource });
        }

        self.events.push(ResourceEvent {
            action: ResourceAction::Create,
            pass_index: first,
            resource,
        });
        self.events.push(ResourceEvent {
            action: ResourceAction::Destroy,
            pass_index: end,
            resource,
        });
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, event: ResourceEvent) {
        self.events.push(event);
    }

    /// Orders events by pass index. Within one pass, destroys come before
    /// creates; otherwise declaration order is kept.
    pub fn sort(&mut self) {
        self.events
            .sort_by_key(|event| (event.pass_index, event.action == ResourceAction::Create));
    }

    pub fn events(&self) -> &[ResourceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.registered.clear();
    }
}
