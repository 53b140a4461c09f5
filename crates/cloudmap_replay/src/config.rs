use clap::{Parser, ValueEnum};
use cloudmap::color::ColorMode;
use std::path::PathBuf;

/// `cloudmap_replay` - replays a scripted interaction session against the
/// point cloud engine without a window and prints what the renderer would see.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Dataset payload (`{"data": [...], "clusterCounts": [...]}`).
    #[arg(long, env = "CLOUDMAP_DATASET")]
    pub dataset: PathBuf,

    /// JSON array of interaction steps.
    #[arg(long, env = "CLOUDMAP_SCRIPT")]
    pub script: Option<PathBuf>,

    /// JSON file with engine settings; missing keys keep their defaults.
    #[arg(long, env = "CLOUDMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Which precomputed cluster count to color by.
    #[arg(long, env = "CLOUDMAP_CLUSTER_INDEX", default_value_t = 0)]
    pub cluster_index: usize,

    /// Fixed voxel resolution; chosen from the point count when omitted.
    #[arg(long, env = "CLOUDMAP_RESOLUTION")]
    pub resolution: Option<u32>,

    /// Hide points above this percentage of flagged content.
    #[arg(long, env = "CLOUDMAP_MAX_NSFW", default_value_t = 100.0)]
    pub max_nsfw: f32,

    /// Hide points whose name starts with this prefix (case-insensitive).
    #[arg(long, env = "CLOUDMAP_HIDDEN_PREFIX")]
    pub hidden_prefix: Option<String>,

    #[arg(long, env = "CLOUDMAP_COLOR_MODE", value_enum)]
    pub color_mode: Option<ColorModeArg>,

    /// Frames to run after the script finishes.
    #[arg(long, env = "CLOUDMAP_FRAMES", default_value_t = 1)]
    pub frames: u32,

    /// Simulated frame time in seconds.
    #[arg(long, env = "CLOUDMAP_DT", default_value_t = 1.0 / 60.0)]
    pub dt: f32,

    /// Viewport used to turn screen coordinates into pick rays.
    #[arg(long, env = "CLOUDMAP_WIDTH", default_value_t = 1280.0)]
    pub width: f32,

    #[arg(long, env = "CLOUDMAP_HEIGHT", default_value_t = 720.0)]
    pub height: f32,

    /// Vertical field of view in degrees.
    #[arg(long, env = "CLOUDMAP_FOV", default_value_t = 75.0)]
    pub fov: f32,

    /// Pretty-print the JSON report.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorModeArg {
    Cluster,
    Voxel,
}

impl From<ColorModeArg> for ColorMode {
    fn from(arg: ColorModeArg) -> Self {
        match arg {
            ColorModeArg::Cluster => ColorMode::Cluster,
            ColorModeArg::Voxel => ColorMode::Voxel,
        }
    }
}
