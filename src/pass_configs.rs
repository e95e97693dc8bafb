use transient_frame_graph::FrameGraphConfig;

pub struct AmbientOcclusionConfig {
    pub enabled: bool,
    /// Resolution divisor relative to the backbuffer.
    pub downscale: u32,
}

impl Default for AmbientOcclusionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            downscale: 2,
        }
    }
}

pub struct BloomConfig {
    pub enabled: bool,
    pub mip_levels: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mip_levels: 5,
        }
    }
}

/// The overlay target is never consumed, so the pass is a culling candidate.
#[derive(Default)]
pub struct DebugOverlayConfig {
    pub enabled: bool,
}

#[derive(Default)]
pub struct PassConfigs {
    pub ambient_occlusion: AmbientOcclusionConfig,
    pub bloom: BloomConfig,
    pub debug_overlay: DebugOverlayConfig,
}

pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub passes: PassConfigs,
    pub graph: FrameGraphConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frames: 3,
            passes: PassConfigs::default(),
            graph: FrameGraphConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_string()).collect();
        let mut config = Self {
            graph: FrameGraphConfig::from_args(&args),
            ..Default::default()
        };

        for arg in &args {
            match arg.as_str() {
                "--no-bloom" => config.passes.bloom.enabled = false,
                "--no-ao" => config.passes.ambient_occlusion.enabled = false,
                "--debug-overlay" => config.passes.debug_overlay.enabled = true,
                _ => {}
            }
        }
        config
    }
}
