use std::collections::HashMap;
use transient_frame_graph::{
    BufferDescription, FrameGraph, FrameGraphConfig, FrameGraphResource, FrameGraphResources,
    RenderPassCompiler, RenderPassDescription, RenderPassType, ResourceDescription, ResourceInfo,
    ResourceInfoQuery, ResourceLocation, ResourceType, ResourceUsage, Result, TextureDescription,
    VirtualSpaceAllocator,
};
use wgpu::{BufferUsages, TextureFormat, TextureUsages};

/// Buffers occupy exactly their declared size; alignment is looked up by name.
#[derive(Default)]
struct TableQuery {
    alignments: HashMap<String, u64>,
}

impl TableQuery {
    fn with(mut self, name: &str, alignment: u64) -> Self {
        self.alignments.insert(name.to_string(), alignment);
        self
    }
}

impl ResourceInfoQuery for TableQuery {
    fn query_resource_info(&self, description: &ResourceDescription) -> Result<ResourceInfo> {
        let size_in_bytes = match &description.resource_type {
            ResourceType::Buffer(buffer) => buffer.size,
            ResourceType::Texture(texture) => u64::from(texture.width) * u64::from(texture.height) * 4,
        };
        Ok(ResourceInfo {
            size_in_bytes,
            alignment: self.alignments.get(&description.name).copied().unwrap_or(256),
        })
    }
}

fn storage(size: u64) -> BufferDescription {
    BufferDescription::new(size, BufferUsages::STORAGE | BufferUsages::COPY_DST)
}

/// Small deterministic generator so the property cases are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn location(resources: &FrameGraphResources, resource: FrameGraphResource) -> ResourceLocation {
    *resources
        .location_of(resource)
        .unwrap_or_else(|| panic!("{resource} was not placed"))
}

fn overlaps(a: &ResourceLocation, b: &ResourceLocation) -> bool {
    a.memory_offset < b.memory_offset + b.memory_size && b.memory_offset < a.memory_offset + a.memory_size
}

#[test]
fn intersecting_lifetimes_never_share_bytes() {
    for seed in 0..32 {
        let mut rng = Lcg(seed);
        let mut resources = FrameGraphResources::new();
        let mut query = TableQuery::default();
        let mut declared = Vec::new();

        for index in 0..24 {
            let name = format!("buffer{index}");
            let alignment = 1u64 << rng.next(13);
            let size = 1 + rng.next(20_000);
            let first = rng.next(16) as usize;
            let last = first + rng.next(6) as usize;

            query = query.with(&name, alignment);
            let buffer = resources.declare_buffer(&name, storage(size));
            resources
                .add_resource_with_lifetime(buffer.into(), first..=last)
                .unwrap();
            declared.push((buffer.resource(), first, last, alignment));
        }

        resources.sort_and_finish(&query).unwrap();

        for (i, &(a, a_first, a_last, a_alignment)) in declared.iter().enumerate() {
            let a_location = location(&resources, a);
            assert_eq!(a_location.memory_offset % a_alignment, 0, "seed {seed}");
            assert!(a_location.memory_offset + a_location.memory_size <= resources.highest_memory_usage());

            for &(b, b_first, b_last, _) in &declared[i + 1..] {
                if a_first <= b_last && b_first <= a_last {
                    let b_location = location(&resources, b);
                    assert!(
                        !overlaps(&a_location, &b_location),
                        "seed {seed}: {a} and {b} overlap"
                    );
                }
            }
        }
    }
}

#[test]
fn disjoint_lifetimes_alias() {
    let mut resources = FrameGraphResources::new();
    let early = resources.declare_buffer("early", storage(4096));
    let late = resources.declare_buffer("late", storage(4096));

    resources.add_resource_with_lifetime(early.into(), 0..=2).unwrap();
    resources.add_resource_with_lifetime(late.into(), 4..=6).unwrap();
    resources.sort_and_finish(&TableQuery::default()).unwrap();

    assert_eq!(
        location(&resources, early.into()).memory_offset,
        location(&resources, late.into()).memory_offset
    );
    assert_eq!(resources.highest_memory_usage(), 4096);
}

#[test]
fn adjacent_frees_coalesce_without_growth() {
    let mut allocator = VirtualSpaceAllocator::new();
    let a = allocator.allocate(512, 256).unwrap();
    let b = allocator.allocate(768, 256).unwrap();
    allocator.allocate(64, 64).unwrap();
    let extent = allocator.current_extent();

    allocator.free(b);
    allocator.free(a);

    let merged = allocator.allocate(512 + 768, 256).unwrap();
    assert_eq!(merged.aligned_start, a.aligned_start);
    assert_eq!(allocator.current_extent(), extent);
}

#[test]
fn peak_matches_concurrent_usage_regardless_of_declaration_order() {
    const SIZE: u64 = 1024;
    let lifetimes = [(0, 3), (1, 1), (2, 2), (2, 5), (3, 3), (4, 4), (4, 6), (6, 6)];

    let max_concurrent = (0..=6)
        .map(|pass| {
            lifetimes
                .iter()
                .filter(|(first, last)| *first <= pass && pass <= *last)
                .count() as u64
        })
        .max()
        .unwrap();

    let mut peaks = Vec::new();
    for reversed in [false, true] {
        let mut order: Vec<_> = lifetimes.to_vec();
        if reversed {
            order.reverse();
        }

        let mut resources = FrameGraphResources::new();
        for (index, (first, last)) in order.into_iter().enumerate() {
            let buffer = resources.declare_buffer(&format!("b{index}"), storage(SIZE));
            resources
                .add_resource_with_lifetime(buffer.into(), first..=last)
                .unwrap();
        }
        resources.sort_and_finish(&TableQuery::default()).unwrap();
        peaks.push(resources.highest_memory_usage());
    }

    assert_eq!(peaks, vec![max_concurrent * SIZE; 2]);
}

fn declare_deferred_frame(graph: &mut FrameGraph) {
    let backbuffer = graph.import_texture(
        "backbuffer",
        TextureDescription::new_2d(
            320,
            180,
            TextureFormat::Bgra8Unorm,
            TextureUsages::RENDER_ATTACHMENT,
        ),
    );
    let attachment = |format| {
        TextureDescription::new_2d(
            320,
            180,
            format,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        )
    };

    let (albedo, normal) = {
        let mut pass = graph.add_raster_pass("gbuffer");
        let albedo = pass.create_texture("albedo", attachment(TextureFormat::Rgba8Unorm));
        let normal = pass.create_texture("normal", attachment(TextureFormat::Rgba16Float));
        pass.use_render_target(albedo).use_render_target(normal);
        (albedo, normal)
    };
    let lit = {
        let mut pass = graph.add_raster_pass("lighting");
        let lit = pass.create_texture("lit", attachment(TextureFormat::Rgba16Float));
        pass.use_resource(ResourceUsage::READ, albedo)
            .use_resource(ResourceUsage::READ, normal)
            .use_render_target(lit);
        lit
    };
    let mut pass = graph.add_raster_pass("present");
    pass.use_resource(ResourceUsage::READ, lit)
        .use_render_target(backbuffer);
}

#[test]
fn clearing_and_replaying_a_frame_is_byte_identical() {
    let query = TableQuery::default();
    let mut graph = FrameGraph::new(FrameGraphConfig::default());

    declare_deferred_frame(&mut graph);
    graph.resolve(&query).unwrap();
    let locations = graph.resources().locations().to_vec();
    let peak = graph.resources().highest_memory_usage();
    assert_eq!(locations.len(), 3);

    graph.begin_frame();
    declare_deferred_frame(&mut graph);
    graph.resolve(&query).unwrap();

    assert_eq!(graph.resources().locations(), locations.as_slice());
    assert_eq!(graph.resources().highest_memory_usage(), peak);
}

#[test]
fn uploads_are_aligned_and_disjoint() {
    let mut resources = FrameGraphResources::new();
    let alignments = [256u64, 4, 1024, 16, 65536, 512];
    let mut query = TableQuery::default();
    let mut buffers = Vec::new();
    for (index, alignment) in alignments.into_iter().enumerate() {
        let name = format!("upload{index}");
        query = query.with(&name, alignment);
        buffers.push(resources.declare_buffer(&name, storage(100_000)));
    }

    let sizes = [100u64, 3, 5000, 17, 1, 256];
    for (buffer, size) in buffers.iter().zip(sizes) {
        resources.add_buffer_upload(*buffer, 0, size, &query).unwrap();
    }

    let uploads = resources.uploads();
    assert_eq!(uploads.len(), alignments.len());
    for (upload, alignment) in uploads.iter().zip(alignments) {
        assert_eq!(upload.buffer_offset % alignment, 0);
    }
    for pair in uploads.windows(2) {
        assert!(pair[0].buffer_offset + pair[0].buffer_length <= pair[1].buffer_offset);
    }
    let last = uploads[uploads.len() - 1];
    assert_eq!(resources.min_upload_size(), last.buffer_offset + last.buffer_length);
}

#[test]
fn short_lived_resources_reuse_freed_space() {
    let query = TableQuery::default()
        .with("a", 256)
        .with("b", 64)
        .with("c", 256);
    let mut resources = FrameGraphResources::new();
    let a = resources.declare_buffer("a", storage(256));
    let b = resources.declare_buffer("b", storage(128));
    let c = resources.declare_buffer("c", storage(256));

    resources.add_resource_with_lifetime(a.into(), 0..=0).unwrap();
    resources.add_resource_with_lifetime(b.into(), 1..=1).unwrap();
    resources.add_resource_with_lifetime(c.into(), 2..=2).unwrap();
    resources.sort_and_finish(&query).unwrap();

    let a_location = location(&resources, a.into());
    let b_location = location(&resources, b.into());
    let c_location = location(&resources, c.into());

    assert_eq!(a_location.memory_offset, 0);
    assert_eq!(c_location.memory_offset, a_location.memory_offset);
    assert_eq!(b_location.memory_offset % 64, 0);
    assert_eq!(resources.highest_memory_usage(), 256);
}

#[test]
fn unreferenced_lifetime_is_still_placed() {
    let mut resources = FrameGraphResources::new();
    let used = resources.declare_buffer("used", storage(2048));
    let standalone = resources.declare_buffer("standalone", storage(2048));

    let passes = vec![
        RenderPassDescription::new("write", RenderPassType::Compute)
            .use_resource(ResourceUsage::WRITE, used)
            .allow_culling(false),
    ];
    let mut compiler = RenderPassCompiler::new();
    compiler.compile(&passes, &FrameGraphConfig::default());
    assert!(!compiler.referenced_resources().contains(&standalone.index()));

    for lifetime in compiler.lifetimes() {
        resources
            .add_resource_with_lifetime(lifetime.resource, lifetime.passes())
            .unwrap();
    }
    resources
        .add_resource_with_lifetime(standalone.into(), 3..=4)
        .unwrap();
    resources.sort_and_finish(&TableQuery::default()).unwrap();

    assert_eq!(resources.locations().len(), 2);
    assert_eq!(location(&resources, standalone.into()).memory_size, 2048);
}
