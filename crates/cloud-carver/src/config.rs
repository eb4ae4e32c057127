use clap::Parser;
use std::path::PathBuf;

/// `cloud-carver` - interactive point cloud viewer with per-axis box filtering.
///
/// Opens a PCD file, lets the user carve it with X/Y/Z bounds and exports the
/// retained points.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// PCD file to open at startup. Files can also be dropped onto the window.
    #[arg(env = "CARVER_FILE")]
    pub file: Option<PathBuf>,

    /// Where the export button writes the filtered cloud.
    #[arg(long, env = "CARVER_EXPORT_PATH", default_value = "filtered.pcd")]
    pub export_path: PathBuf,

    /// Initial point sprite diameter in pixels.
    #[arg(long, env = "CARVER_POINT_SIZE", default_value_t = 2.0)]
    pub point_size: f32,

    /// Initial multiplier applied to point colors before clamping.
    #[arg(long, env = "CARVER_COLOR_BOOST", default_value_t = 1.0)]
    pub color_boost: f32,
}
