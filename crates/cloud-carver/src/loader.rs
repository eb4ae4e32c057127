//! Background loading of PCD files.
//!
//! Decoding, color normalization and centering all run on a worker thread;
//! the finished [`PointCloud`] comes back over a channel and the event loop
//! picks it up with [`Loader::poll`]. Only one load may be in flight.

use crate::data::PointCloud;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::path::{Path, PathBuf};
use std::{io, thread, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("a load is already in progress")]
    Busy,
    #[error("failed to read {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{name}' contains no finite points")]
    Empty { name: String },
    #[error("color attribute has {colors} entries for {points} points")]
    ColorCount { colors: usize, points: usize },
    #[error("loader thread exited without a result")]
    Disconnected,
}

/// A finished load, successful or not.
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub result: Result<PointCloud, LoadError>,
}

/// Reads, decodes and prepares one file on the calling thread.
pub fn load_point_cloud(path: &Path) -> Result<PointCloud, LoadError> {
    let decoded = pcd::read_file(path).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    PointCloud::from_decoded(name, decoded)
}

#[derive(Debug, Default)]
pub struct Loader {
    rx: Option<Receiver<LoadOutcome>>,
    pending: Option<PathBuf>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts loading `path` in the background. Refused while another load runs.
    pub fn request(&mut self, path: impl Into<PathBuf>) -> Result<(), LoadError> {
        if self.pending.is_some() {
            return Err(LoadError::Busy);
        }

        let path = path.into();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let job_path = path.clone();

        thread::Builder::new()
            .name("pcd-loader".into())
            .spawn(move || {
                let result = load_point_cloud(&job_path);
                match &result {
                    Ok(cloud) => log::info!("Loaded {} ({} points)", job_path.display(), cloud.len()),
                    Err(e) => log::warn!("Load failed: {}", e),
                }
                // The receiver may be gone if the app is shutting down.
                let _ = tx.send(LoadOutcome {
                    path: job_path,
                    result,
                });
            })
            .map_err(|source| LoadError::Decode {
                path: path.clone(),
                source,
            })?;

        log::info!("Loading {}", path.display());
        self.rx = Some(rx);
        self.pending = Some(path);
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking; returns the outcome once the worker is done.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let outcome = match self.rx.as_ref()?.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => LoadOutcome {
                path: self.pending.clone().unwrap_or_default(),
                result: Err(LoadError::Disconnected),
            },
        };
        self.rx = None;
        self.pending = None;
        Some(outcome)
    }

    /// Blocks up to `timeout` for the outcome.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let outcome = match self.rx.as_ref()?.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => LoadOutcome {
                path: self.pending.clone().unwrap_or_default(),
                result: Err(LoadError::Disconnected),
            },
        };
        self.rx = None;
        self.pending = None;
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("sample.pcd");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\n\
             WIDTH 3\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS 3\nDATA ascii\n\
             0 0 1\n2 4 3\n1 2 2\n"
        )
        .unwrap();
        path
    }

    #[test]
    fn loads_and_centers_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());

        let mut loader = Loader::new();
        loader.request(&path).unwrap();
        assert!(loader.is_busy());

        let outcome = loader.wait(Duration::from_secs(10)).expect("load finished");
        let cloud = outcome.result.unwrap();
        assert_eq!(outcome.path, path);
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.name(), "sample.pcd");
        assert_eq!(cloud.origin_offset(), [1.0, 2.0, 1.0]);
        assert!(!loader.is_busy());
    }

    #[test]
    fn second_request_while_busy_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());

        let mut loader = Loader::new();
        loader.request(&path).unwrap();
        assert!(matches!(loader.request(&path), Err(LoadError::Busy)));

        assert!(loader.wait(Duration::from_secs(10)).is_some());
        loader.request(&path).unwrap();
        assert!(loader.wait(Duration::from_secs(10)).is_some());
    }

    #[test]
    fn missing_file_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_point_cloud(&dir.path().join("nope.pcd")).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }
}
