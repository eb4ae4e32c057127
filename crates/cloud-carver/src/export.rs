//! Writes the points retained by the current filter to an ASCII PCD file.

use crate::data::color::pack_normalized;
use crate::data::PointCloud;
use crate::filter::FilterState;
use crate::predicate::retained_indices;
use crate::session::Session;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no point cloud is loaded")]
    NoActiveCloud,
    #[error("the current filter retains no points")]
    NothingRetained,
    #[error("export failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub points: usize,
    pub with_color: bool,
}

/// Retained points in buffer order, in file coordinates, with packed colors
/// when the cloud has them.
pub fn collect_retained(cloud: &PointCloud, filter: &FilterState) -> (Vec<[f32; 3]>, Option<Vec<u32>>) {
    let kept = retained_indices(filter, cloud.positions());
    let positions = kept.iter().map(|&i| cloud.file_position(i)).collect();
    let rgb = cloud
        .colors()
        .map(|colors| kept.iter().map(|&i| pack_normalized(colors[i])).collect());
    (positions, rgb)
}

/// Exports `cloud` under `filter`. Nothing is written when no point survives.
pub fn export_cloud(cloud: &PointCloud, filter: &FilterState, path: &Path) -> Result<ExportSummary, ExportError> {
    let (positions, rgb) = collect_retained(cloud, filter);
    if positions.is_empty() {
        return Err(ExportError::NothingRetained);
    }

    pcd::write_file(path, &positions, rgb.as_deref())?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        points: positions.len(),
        with_color: rgb.is_some(),
    };
    log::info!(
        "Exported {} of {} points to {}",
        summary.points,
        cloud.len(),
        path.display()
    );
    Ok(summary)
}

pub fn export_session(session: Option<&Session>, path: &Path) -> Result<ExportSummary, ExportError> {
    let session = session.ok_or(ExportError::NoActiveCloud)?;
    export_cloud(session.cloud(), session.filter(), path)
}
