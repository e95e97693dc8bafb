use crate::pass_configs::DemoConfig;
use transient_frame_graph::{
    BufferDescription, FrameGraph, FrameGraphBuffer, FrameGraphTexture, ResourceUsage,
    TextureDescription,
};
use wgpu::{BufferUsages, TextureFormat, TextureUsages};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Handles the command recorder needs after the frame is resolved.
pub struct FrameOutputs {
    pub camera: FrameGraphBuffer,
    pub hdr: FrameGraphTexture,
}

struct GBuffer {
    albedo: FrameGraphTexture,
    normal: FrameGraphTexture,
}

fn attachment(config: &DemoConfig, format: TextureFormat) -> TextureDescription {
    TextureDescription::new_2d(
        config.width,
        config.height,
        format,
        TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
    )
}

fn storage_texture(width: u32, height: u32, format: TextureFormat) -> TextureDescription {
    TextureDescription::new_2d(
        width,
        height,
        format,
        TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING,
    )
}

/// Declares a deferred frame ending in `backbuffer`.
pub fn declare_frame(graph: &mut FrameGraph, config: &DemoConfig, backbuffer: FrameGraphTexture) -> FrameOutputs {
    let (camera, depth) = depth_prepass(graph, config);
    let gbuffer = gbuffer_pass(graph, config, camera, depth);
    let occlusion = config
        .passes
        .ambient_occlusion
        .enabled
        .then(|| ambient_occlusion_pass(graph, config, depth, gbuffer.normal));
    let hdr = lighting_pass(graph, config, camera, depth, &gbuffer, occlusion);
    let bloom = config
        .passes
        .bloom
        .enabled
        .then(|| bloom_pass(graph, config, hdr));

    if config.passes.debug_overlay.enabled {
        debug_overlay_pass(graph, config, depth);
    }
    tonemap_pass(graph, hdr, bloom, backbuffer);

    FrameOutputs { camera, hdr }
}

fn depth_prepass(graph: &mut FrameGraph, config: &DemoConfig) -> (FrameGraphBuffer, FrameGraphTexture) {
    let mut pass = graph.add_raster_pass("depth_prepass");
    let camera = pass.create_buffer(
        "camera",
        BufferDescription::new(
            std::mem::size_of::<crate::CameraUniform>() as u64,
            BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        ),
    );
    let depth = pass.create_texture("depth", attachment(config, DEPTH_FORMAT));

    pass.use_resource(ResourceUsage::READ, camera)
        .use_depth_stencil(depth);
    (camera, depth)
}

fn gbuffer_pass(
    graph: &mut FrameGraph,
    config: &DemoConfig,
    camera: FrameGraphBuffer,
    depth: FrameGraphTexture,
) -> GBuffer {
    let mut pass = graph.add_raster_pass("gbuffer");
    let albedo = pass.create_texture("albedo", attachment(config, TextureFormat::Rgba8UnormSrgb));
    let normal = pass.create_texture("normal", attachment(config, TextureFormat::Rgba16Float));

    // Depth is loaded from the prepass and tested with EQUAL.
    pass.use_resource(ResourceUsage::READ, camera)
        .use_resource(ResourceUsage::READ | ResourceUsage::NO_SHADER_ACCESS, depth)
        .use_render_target(albedo)
        .use_render_target(normal)
        .use_depth_stencil(depth);
    GBuffer { albedo, normal }
}

fn ambient_occlusion_pass(
    graph: &mut FrameGraph,
    config: &DemoConfig,
    depth: FrameGraphTexture,
    normal: FrameGraphTexture,
) -> FrameGraphTexture {
    let downscale = config.passes.ambient_occlusion.downscale.max(1);
    let mut pass = graph.add_compute_pass("ambient_occlusion");
    let occlusion = pass.create_texture(
        "occlusion",
        storage_texture(
            config.width / downscale,
            config.height / downscale,
            TextureFormat::R32Float,
        ),
    );

    pass.use_resource(ResourceUsage::READ, depth)
        .use_resource(ResourceUsage::READ, normal)
        .use_resource(ResourceUsage::WRITE, occlusion);
    occlusion
}

fn lighting_pass(
    graph: &mut FrameGraph,
    config: &DemoConfig,
    camera: FrameGraphBuffer,
    depth: FrameGraphTexture,
    gbuffer: &GBuffer,
    occlusion: Option<FrameGraphTexture>,
) -> FrameGraphTexture {
    let mut pass = graph.add_raster_pass("lighting");
    let hdr = pass.create_texture("hdr", attachment(config, HDR_FORMAT));

    pass.use_resource(ResourceUsage::READ, camera)
        .use_resource(ResourceUsage::READ, depth)
        .use_resource(ResourceUsage::READ, gbuffer.albedo)
        .use_resource(ResourceUsage::READ, gbuffer.normal);
    if let Some(occlusion) = occlusion {
        pass.use_resource(ResourceUsage::READ, occlusion);
    }
    pass.use_render_target(hdr);
    hdr
}

fn bloom_pass(graph: &mut FrameGraph, config: &DemoConfig, hdr: FrameGraphTexture) -> FrameGraphTexture {
    let mut pass = graph.add_compute_pass("bloom");
    let bloom = pass.create_texture(
        "bloom_chain",
        storage_texture(config.width / 2, config.height / 2, HDR_FORMAT)
            .with_mip_levels(config.passes.bloom.mip_levels),
    );

    pass.use_resource(ResourceUsage::READ, hdr)
        .use_resource(ResourceUsage::READ_WRITE, bloom);
    bloom
}

fn debug_overlay_pass(graph: &mut FrameGraph, config: &DemoConfig, depth: FrameGraphTexture) {
    let mut pass = graph.add_raster_pass("debug_overlay");
    let overlay = pass.create_texture("overlay", attachment(config, TextureFormat::Rgba8Unorm));

    pass.use_resource(ResourceUsage::READ, depth)
        .use_render_target(overlay);
}

fn tonemap_pass(
    graph: &mut FrameGraph,
    hdr: FrameGraphTexture,
    bloom: Option<FrameGraphTexture>,
    backbuffer: FrameGraphTexture,
) {
    let mut pass = graph.add_raster_pass("tonemap");
    pass.use_resource(ResourceUsage::READ, hdr);
    if let Some(bloom) = bloom {
        pass.use_resource(ResourceUsage::READ, bloom);
    }
    pass.use_render_target(backbuffer).allow_culling(false);
}
