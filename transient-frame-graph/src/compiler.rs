use crate::graph::FrameGraphConfig;
use crate::pass::{RenderPassDescription, RenderPassType, ResourceUsage};
use crate::resource::FrameGraphResource;
use bitflags::bitflags;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OverviewFlags: u8 {
        /// The pass writes a resource owned outside the frame graph.
        const HAS_EXTERNAL_WRITE = 1 << 0;
    }
}

bitflags! {
    /// Relation of one pass to another pass of the same frame.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PassRelation: u8 {
        /// Different queue types share a resource and at least one side writes it.
        const WRITE_ON_SEPARATE_QUEUE = 1 << 0;
        /// Both passes bind the same attachment.
        const SHARED_OUTPUT = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceState {
    pub usage: ResourceUsage,
    pub is_external: bool,
}

/// Per-pass summary derived from a [`RenderPassDescription`].
#[derive(Debug, Default)]
pub struct PassOverview {
    /// Keyed by resource index.
    pub resource_states: HashMap<u32, ResourceState>,
    pub output_resources: HashSet<u32>,
    /// Keyed by the index of every other pass in the frame.
    pub relations: HashMap<usize, PassRelation>,
    pub flags: OverviewFlags,
}

impl PassOverview {
    fn clear(&mut self) {
        self.resource_states.clear();
        self.output_resources.clear();
        self.relations.clear();
        self.flags = OverviewFlags::empty();
    }

    fn record(&mut self, resource: FrameGraphResource, usage: ResourceUsage) {
        self.resource_states
            .entry(resource.index())
            .and_modify(|state| state.usage |= usage)
            .or_insert(ResourceState {
                usage,
                is_external: resource.is_external(),
            });
    }

    pub fn relation_to(&self, pass_index: usize) -> PassRelation {
        self.relations.get(&pass_index).copied().unwrap_or_default()
    }

    fn relation_with(&self, pass_type: RenderPassType, other: &PassOverview, other_type: RenderPassType) -> PassRelation {
        let mut relation = PassRelation::empty();

        if pass_type != other_type {
            let shares_write = self.resource_states.iter().any(|(index, state)| {
                other
                    .resource_states
                    .get(index)
                    .is_some_and(|other_state| (state.usage | other_state.usage).contains(ResourceUsage::WRITE))
            });
            if shares_write {
                relation |= PassRelation::WRITE_ON_SEPARATE_QUEUE;
            }
        }

        if !self.output_resources.is_disjoint(&other.output_resources) {
            relation |= PassRelation::SHARED_OUTPUT;
        }

        relation
    }
}

/// Inclusive range of passes referencing one transient resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub resource: FrameGraphResource,
    pub first_pass: usize,
    pub last_pass: usize,
}

impl ResourceLifetime {
    pub fn passes(&self) -> RangeInclusive<usize> {
        self.first_pass..=self.last_pass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    Raster(usize),
    Compute(usize),
    /// `wait` blocks until `signal` has finished the work submitted so far.
    Fence {
        wait: RenderPassType,
        signal: RenderPassType,
    },
}

/// Turns the declared passes of a frame into overviews, lifetimes and a timeline.
///
/// Overviews are pooled and reused across frames.
#[derive(Debug, Default)]
pub struct RenderPassCompiler {
    overviews: Vec<PassOverview>,
    pass_count: usize,
    referenced_resources: HashSet<u32>,
    lifetimes: Vec<ResourceLifetime>,
    dependencies: DiGraph<usize, u32>,
    culled_passes: Vec<bool>,
    timeline: Vec<TimelineEvent>,
}

impl RenderPassCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, passes: &[RenderPassDescription], config: &FrameGraphConfig) {
        self.prepare_overviews(passes.len());
        self.find_resources(passes);
        self.find_relations(passes);
        self.build_dependencies(passes);
        self.compute_culled_passes(passes, config);
        self.compute_lifetimes(passes);
        self.build_timeline(passes);

        log::debug!(
            "Compiled {} passes: {} culled, {} transient lifetimes",
            passes.len(),
            self.culled_passes.iter().filter(|culled| **culled).count(),
            self.lifetimes.len()
        );
    }

    fn prepare_overviews(&mut self, pass_count: usize) {
        if self.overviews.len() < pass_count {
            self.overviews.resize_with(pass_count, PassOverview::default);
        }
        for overview in &mut self.overviews {
            overview.clear();
        }
        self.pass_count = pass_count;
        self.referenced_resources.clear();
    }

    fn find_resources(&mut self, passes: &[RenderPassDescription]) {
        for (pass, overview) in passes.iter().zip(self.overviews.iter_mut()) {
            for data in pass.resources.iter().filter(|data| data.resource.is_valid()) {
                self.referenced_resources.insert(data.resource.index());
                overview.record(data.resource, data.usage);

                if data.resource.is_external() && data.usage.contains(ResourceUsage::WRITE) {
                    overview.flags |= OverviewFlags::HAS_EXTERNAL_WRITE;
                }
            }

            for data in pass.render_targets.iter().filter(|data| data.target.is_valid()) {
                let target = data.target.resource();
                self.referenced_resources.insert(target.index());
                overview.record(target, ResourceUsage::WRITE);
                overview.output_resources.insert(target.index());

                if target.is_external() {
                    overview.flags |= OverviewFlags::HAS_EXTERNAL_WRITE;
                }
            }
        }
    }

    fn find_relations(&mut self, passes: &[RenderPassDescription]) {
        for i in (0..passes.len()).rev() {
            for j in (0..passes.len()).filter(|&j| j != i) {
                let relation = self.overviews[i].relation_with(
                    passes[i].pass_type,
                    &self.overviews[j],
                    passes[j].pass_type,
                );
                self.overviews[i].relations.insert(j, relation);
            }
        }
    }

    // Edges run from the last writer of a resource to every later reader.
    fn build_dependencies(&mut self, passes: &[RenderPassDescription]) {
        self.dependencies.clear();
        let nodes: Vec<NodeIndex> = (0..passes.len())
            .map(|pass_index| self.dependencies.add_node(pass_index))
            .collect();

        let mut last_writers: HashMap<u32, NodeIndex> = HashMap::new();
        for (pass_index, pass) in passes.iter().enumerate() {
            let node = nodes[pass_index];

            for data in pass.resources.iter().filter(|data| data.resource.is_valid()) {
                let index = data.resource.index();
                if data.usage.contains(ResourceUsage::READ)
                    && let Some(&writer) = last_writers.get(&index)
                    && writer != node
                {
                    self.dependencies.update_edge(writer, node, index);
                }
            }

            for data in pass.resources.iter().filter(|data| data.resource.is_valid()) {
                if data.usage.contains(ResourceUsage::WRITE) {
                    last_writers.insert(data.resource.index(), node);
                }
            }
            for data in pass.render_targets.iter().filter(|data| data.target.is_valid()) {
                last_writers.insert(data.target.index(), node);
            }
        }
    }

    fn compute_culled_passes(&mut self, passes: &[RenderPassDescription], config: &FrameGraphConfig) {
        self.culled_passes.clear();
        self.culled_passes.resize(passes.len(), false);
        if !config.pass_culling {
            return;
        }

        let reversed = Reversed(&self.dependencies);
        let mut required: HashSet<NodeIndex> = HashSet::new();
        let mut dfs = Dfs::empty(reversed);

        for node in self.dependencies.node_indices() {
            let pass_index = self.dependencies[node];
            let pass = &passes[pass_index];
            let is_root = !pass.allow_culling
                || !pass.writes_anything()
                || self.overviews[pass_index]
                    .flags
                    .contains(OverviewFlags::HAS_EXTERNAL_WRITE);

            if is_root && !required.contains(&node) {
                dfs.move_to(node);
                while let Some(visited) = dfs.next(reversed) {
                    required.insert(visited);
                }
            }
        }

        for node in self.dependencies.node_indices() {
            let pass_index = self.dependencies[node];
            self.culled_passes[pass_index] = passes[pass_index].allow_culling && !required.contains(&node);
        }
    }

    // Lifetimes follow first reference order and ignore culling.
    fn compute_lifetimes(&mut self, passes: &[RenderPassDescription]) {
        self.lifetimes.clear();
        let mut positions: HashMap<FrameGraphResource, usize> = HashMap::new();

        for (pass_index, pass) in passes.iter().enumerate() {
            let references = pass
                .resources
                .iter()
                .map(|data| data.resource)
                .chain(pass.render_targets.iter().map(|data| data.target.resource()));

            for resource in references.filter(FrameGraphResource::is_transient) {
                match positions.get(&resource) {
                    Some(&position) => self.lifetimes[position].last_pass = pass_index,
                    None => {
                        positions.insert(resource, self.lifetimes.len());
                        self.lifetimes.push(ResourceLifetime {
                            resource,
                            first_pass: pass_index,
                            last_pass: pass_index,
                        });
                    }
                }
            }
        }
    }

    fn build_timeline(&mut self, passes: &[RenderPassDescription]) {
        self.timeline.clear();

        for (pass_index, pass) in passes.iter().enumerate() {
            if self.culled_passes[pass_index] {
                continue;
            }

            let node = NodeIndex::new(pass_index);
            let signal = self
                .dependencies
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .map(|producer| self.dependencies[producer])
                .filter(|&producer| !self.culled_passes[producer])
                .map(|producer| passes[producer].pass_type)
                .find(|&producer_type| producer_type != pass.pass_type);

            if let Some(signal) = signal {
                self.timeline.push(TimelineEvent::Fence {
                    wait: pass.pass_type,
                    signal,
                });
            }

            self.timeline.push(match pass.pass_type {
                RenderPassType::Graphics => TimelineEvent::Raster(pass_index),
                RenderPassType::Compute => TimelineEvent::Compute(pass_index),
            });
        }
    }

    pub fn overviews(&self) -> &[PassOverview] {
        &self.overviews[..self.pass_count]
    }

    pub fn referenced_resources(&self) -> &HashSet<u32> {
        &self.referenced_resources
    }

    pub fn lifetimes(&self) -> &[ResourceLifetime] {
        &self.lifetimes
    }

    pub fn is_culled(&self, pass_index: usize) -> bool {
        self.culled_passes.get(pass_index).copied().unwrap_or(false)
    }

    pub fn culled_passes(&self) -> impl Iterator<Item = usize> + '_ {
        self.culled_passes
            .iter()
            .enumerate()
            .filter_map(|(pass_index, culled)| culled.then_some(pass_index))
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    /// Pool size; never shrinks.
    pub fn overview_capacity(&self) -> usize {
        self.overviews.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FrameGraphTexture, ResourceKind};

    fn transient(index: u32) -> FrameGraphResource {
        FrameGraphResource::new(index, ResourceKind::Texture, false)
    }

    fn external(index: u32) -> FrameGraphResource {
        FrameGraphResource::new(index, ResourceKind::Texture, true)
    }

    fn target(resource: FrameGraphResource) -> FrameGraphTexture {
        resource.as_texture().unwrap()
    }

    fn compile(passes: &[RenderPassDescription]) -> RenderPassCompiler {
        let mut compiler = RenderPassCompiler::new();
        compiler.compile(passes, &FrameGraphConfig::default());
        compiler
    }

    #[test]
    fn test_overviews_record_usage_and_outputs() {
        let passes = vec![
            RenderPassDescription::new("a", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(0))
                .use_resource(ResourceUsage::WRITE, transient(0))
                .use_render_target(target(transient(1))),
            RenderPassDescription::new("b", RenderPassType::Graphics)
                .use_resource(ResourceUsage::WRITE, external(2)),
        ];
        let compiler = compile(&passes);
        let overviews = compiler.overviews();

        assert_eq!(overviews.len(), 2);
        assert_eq!(overviews[0].resource_states[&0].usage, ResourceUsage::READ_WRITE);
        assert_eq!(overviews[0].resource_states[&1].usage, ResourceUsage::WRITE);
        assert!(overviews[0].output_resources.contains(&1));
        assert!(overviews[0].flags.is_empty());

        assert!(overviews[1].resource_states[&2].is_external);
        assert!(overviews[1].flags.contains(OverviewFlags::HAS_EXTERNAL_WRITE));
        assert_eq!(compiler.referenced_resources().len(), 3);
    }

    #[test]
    fn test_external_render_target_sets_flag() {
        let passes = vec![
            RenderPassDescription::new("present", RenderPassType::Graphics)
                .use_render_target(target(external(0))),
        ];
        let compiler = compile(&passes);
        assert!(compiler.overviews()[0].flags.contains(OverviewFlags::HAS_EXTERNAL_WRITE));
    }

    #[test]
    fn test_relations() {
        let shared = transient(0);
        let passes = vec![
            RenderPassDescription::new("draw", RenderPassType::Graphics).use_render_target(target(shared)),
            RenderPassDescription::new("blur", RenderPassType::Compute).use_resource(ResourceUsage::READ, shared),
            RenderPassDescription::new("overlay", RenderPassType::Graphics).use_render_target(target(shared)),
            RenderPassDescription::new("unrelated", RenderPassType::Compute)
                .use_resource(ResourceUsage::READ_WRITE, transient(1)),
        ];
        let compiler = compile(&passes);
        let overviews = compiler.overviews();

        assert_eq!(overviews[0].relation_to(1), PassRelation::WRITE_ON_SEPARATE_QUEUE);
        assert_eq!(overviews[1].relation_to(0), PassRelation::WRITE_ON_SEPARATE_QUEUE);
        assert_eq!(overviews[0].relation_to(2), PassRelation::SHARED_OUTPUT);
        assert_eq!(overviews[0].relation_to(3), PassRelation::empty());
        assert_eq!(overviews[3].relations.len(), 3);
        assert!(!overviews[3].relations.contains_key(&3));
    }

    #[test]
    fn test_overview_pool_is_reused() {
        let mut compiler = RenderPassCompiler::new();
        let three: Vec<_> = (0..3)
            .map(|i| {
                RenderPassDescription::new("pass", RenderPassType::Graphics)
                    .use_resource(ResourceUsage::READ_WRITE, transient(i))
            })
            .collect();

        compiler.compile(&three, &FrameGraphConfig::default());
        assert_eq!(compiler.overview_capacity(), 3);

        compiler.compile(&three[..1], &FrameGraphConfig::default());
        assert_eq!(compiler.overview_capacity(), 3);
        assert_eq!(compiler.overviews().len(), 1);
        assert_eq!(compiler.referenced_resources().len(), 1);
    }

    #[test]
    fn test_lifetimes_span_first_to_last_reference() {
        let passes = vec![
            RenderPassDescription::new("a", RenderPassType::Graphics)
                .use_render_target(target(transient(1)))
                .use_resource(ResourceUsage::READ, external(5)),
            RenderPassDescription::new("b", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(1))
                .use_render_target(target(transient(0))),
            RenderPassDescription::new("c", RenderPassType::Graphics),
            RenderPassDescription::new("d", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(1)),
        ];
        let compiler = compile(&passes);

        let lifetimes: Vec<_> = compiler
            .lifetimes()
            .iter()
            .map(|lifetime| (lifetime.resource.index(), lifetime.passes()))
            .collect();
        assert_eq!(lifetimes, vec![(1, 0..=3), (0, 1..=1)]);
    }

    #[test]
    fn test_unconsumed_pass_is_culled() {
        let backbuffer = external(0);
        let passes = vec![
            RenderPassDescription::new("shadow", RenderPassType::Graphics).use_render_target(target(transient(1))),
            RenderPassDescription::new("debug", RenderPassType::Graphics).use_render_target(target(transient(2))),
            RenderPassDescription::new("lighting", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(1))
                .use_render_target(target(backbuffer)),
        ];

        let compiler = compile(&passes);
        assert_eq!(compiler.culled_passes().collect::<Vec<_>>(), vec![1]);
        assert!(compiler.is_culled(1));
        assert!(!compiler.is_culled(0));
        assert_eq!(
            compiler.timeline(),
            &[TimelineEvent::Raster(0), TimelineEvent::Raster(2)]
        );
        // Culling does not shorten lifetimes.
        assert_eq!(compiler.lifetimes().len(), 2);

        let mut compiler = RenderPassCompiler::new();
        compiler.compile(&passes, &FrameGraphConfig { pass_culling: false });
        assert_eq!(compiler.culled_passes().count(), 0);
        assert_eq!(compiler.timeline().len(), 3);
    }

    #[test]
    fn test_passes_that_disallow_culling_are_kept() {
        let passes = vec![
            RenderPassDescription::new("readback", RenderPassType::Compute)
                .use_resource(ResourceUsage::WRITE, transient(0))
                .allow_culling(false),
            RenderPassDescription::new("marker", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(3)),
        ];
        let compiler = compile(&passes);
        assert_eq!(compiler.culled_passes().count(), 0);
    }

    #[test]
    fn test_fence_between_queue_types() {
        let passes = vec![
            RenderPassDescription::new("simulate", RenderPassType::Compute)
                .use_resource(ResourceUsage::WRITE, transient(0)),
            RenderPassDescription::new("draw", RenderPassType::Graphics)
                .use_resource(ResourceUsage::READ, transient(0))
                .use_render_target(target(external(1))),
        ];
        let compiler = compile(&passes);

        assert_eq!(
            compiler.timeline(),
            &[
                TimelineEvent::Compute(0),
                TimelineEvent::Fence {
                    wait: RenderPassType::Graphics,
                    signal: RenderPassType::Compute,
                },
                TimelineEvent::Raster(1),
            ]
        );
    }
}
