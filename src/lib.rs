mod pass_configs;
mod passes;

pub use pass_configs::{AmbientOcclusionConfig, BloomConfig, DebugOverlayConfig, DemoConfig, PassConfigs};
pub use passes::FrameOutputs;

use transient_frame_graph::{
    FrameGraph, FrameGraphError, FrameGraphTexture, TextureDescription, WgpuFootprintQuery,
};
use web_time::{Duration, Instant};
use wgpu::{TextureFormat, TextureUsages};

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_projection: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub frame_index: u32,
    pub padding: [u32; 3],
}

impl CameraUniform {
    pub fn new(frame_index: u32) -> Self {
        let mut view_projection = [[0.0; 4]; 4];
        for (index, row) in view_projection.iter_mut().enumerate() {
            row[index] = 1.0;
        }
        Self {
            view_projection,
            position: [0.0, 2.0, -5.0, 1.0],
            frame_index,
            padding: [0; 3],
        }
    }
}

/// Summary of one resolved frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub pass_count: usize,
    pub culled_passes: Vec<String>,
    pub transient_resources: usize,
    pub highest_memory_usage: u64,
    pub upload_size: u64,
    pub resolve_time: Duration,
}

pub struct App {
    config: DemoConfig,
    graph: FrameGraph,
    device: WgpuFootprintQuery,
    frame_index: u32,
}

impl App {
    pub fn new(config: DemoConfig) -> Self {
        let graph = FrameGraph::new(config.graph.clone());
        Self {
            config,
            graph,
            device: WgpuFootprintQuery,
            frame_index: 0,
        }
    }

    fn import_backbuffer(&mut self) -> FrameGraphTexture {
        self.graph.import_texture(
            "backbuffer",
            TextureDescription::new_2d(
                self.config.width,
                self.config.height,
                TextureFormat::Bgra8UnormSrgb,
                TextureUsages::RENDER_ATTACHMENT,
            ),
        )
    }

    pub fn render_frame(&mut self) -> Result<FrameReport, FrameGraphError> {
        self.graph.begin_frame();

        let backbuffer = self.import_backbuffer();
        let outputs = passes::declare_frame(&mut self.graph, &self.config, backbuffer);

        let start = Instant::now();
        self.graph.resolve(&self.device)?;
        let resolve_time = start.elapsed();

        let camera = CameraUniform::new(self.frame_index);
        let bytes = bytemuck::bytes_of(&camera);
        self.graph
            .resources_mut()
            .add_buffer_upload(outputs.camera, 0, bytes.len() as u64, &self.device)?;

        self.frame_index += 1;
        Ok(self.report(resolve_time))
    }

    fn report(&self, resolve_time: Duration) -> FrameReport {
        let passes = self.graph.passes();
        let resources = self.graph.resources();

        FrameReport {
            pass_count: passes.len(),
            culled_passes: self
                .graph
                .compiler()
                .culled_passes()
                .map(|pass_index| passes[pass_index].name.clone())
                .collect(),
            transient_resources: resources.locations().len(),
            highest_memory_usage: resources.highest_memory_usage(),
            upload_size: resources.min_upload_size(),
            resolve_time,
        }
    }

    pub fn log_layout(&self) {
        let resources = self.graph.resources();
        for location in resources.locations() {
            let name = resources
                .description(location.resource)
                .map(|description| description.name.as_str())
                .unwrap_or("<unnamed>");
            log::info!(
                "{name:>16}: offset {:>10} size {:>10} align {:>8}",
                location.memory_offset,
                location.memory_size,
                location.alignment
            );
        }
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }
}

pub fn run(config: DemoConfig) -> Result<(), FrameGraphError> {
    let frames = config.frames.max(1);
    let mut app = App::new(config);

    for _ in 0..frames {
        let report = app.render_frame()?;
        log::info!(
            "Frame resolved in {:?}: {} passes, {} transient resources, {} bytes of virtual memory, {} upload bytes",
            report.resolve_time,
            report.pass_count,
            report.transient_resources,
            report.highest_memory_usage,
            report.upload_size
        );
        if !report.culled_passes.is_empty() {
            log::info!("Culled passes: {}", report.culled_passes.join(", "));
        }
    }

    app.log_layout();
    Ok(())
}
