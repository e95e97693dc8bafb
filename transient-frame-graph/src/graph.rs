use crate::Result;
use crate::compiler::RenderPassCompiler;
use crate::frame_resources::FrameGraphResources;
use crate::pass::{PassBuilder, RenderPassDescription, RenderPassType};
use crate::resource::{BufferDescription, FrameGraphBuffer, FrameGraphTexture, TextureDescription};
use crate::resource_info::ResourceInfoQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Report passes whose results are never consumed as culled.
    pub pass_culling: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self { pass_culling: true }
    }
}

impl FrameGraphConfig {
    pub const NO_CULL_ARG: &'static str = "--fg-nocull";

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pass_culling = !args.into_iter().any(|arg| arg.as_ref() == Self::NO_CULL_ARG);
        Self { pass_culling }
    }
}

/// Per-frame pass declarations and their compiled, placed result.
///
/// A frame runs [`begin_frame`](Self::begin_frame), declares passes through
/// [`add_raster_pass`](Self::add_raster_pass) / [`add_compute_pass`](Self::add_compute_pass)
/// and finishes with [`resolve`](Self::resolve).
#[derive(Debug, Default)]
pub struct FrameGraph {
    config: FrameGraphConfig,
    resources: FrameGraphResources,
    passes: Vec<RenderPassDescription>,
    compiler: RenderPassCompiler,
}

impl FrameGraph {
    pub fn new(config: FrameGraphConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    pub fn add_raster_pass(&mut self, name: &str) -> PassBuilder<'_> {
        PassBuilder::new(self, name, RenderPassType::Graphics)
    }

    pub fn add_compute_pass(&mut self, name: &str) -> PassBuilder<'_> {
        PassBuilder::new(self, name, RenderPassType::Compute)
    }

    pub fn import_texture(&mut self, name: &str, description: TextureDescription) -> FrameGraphTexture {
        self.resources.import_texture(name, description)
    }

    pub fn import_buffer(&mut self, name: &str, description: BufferDescription) -> FrameGraphBuffer {
        self.resources.import_buffer(name, description)
    }

    pub(crate) fn push_pass(&mut self, description: RenderPassDescription) {
        self.passes.push(description);
    }

    /// Compiles the declared passes and places every transient resource.
    ///
    /// Lifetimes, placements and uploads from before the call are discarded,
    /// so uploads are recorded after `resolve`.
    pub fn resolve<Q: ResourceInfoQuery + ?Sized>(&mut self, device: &Q) -> Result<()> {
        self.resources.clear_resources();
        self.compiler.compile(&self.passes, &self.config);

        for lifetime in self.compiler.lifetimes() {
            self.resources
                .add_resource_with_lifetime(lifetime.resource, lifetime.passes())?;
        }

        self.resources.sort_and_finish(device)
    }

    /// Forgets every pass and resource declared for the previous frame.
    pub fn begin_frame(&mut self) {
        self.resources.clear_new_frame();
        self.passes.clear();
    }

    pub fn passes(&self) -> &[RenderPassDescription] {
        &self.passes
    }

    pub fn compiler(&self) -> &RenderPassCompiler {
        &self.compiler
    }

    pub fn resources(&self) -> &FrameGraphResources {
        &self.resources
    }

    /// Lifetimes and uploads added here are dropped by the next [`resolve`](Self::resolve).
    pub fn resources_mut(&mut self) -> &mut FrameGraphResources {
        &mut self.resources
    }
}
