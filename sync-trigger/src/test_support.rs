//! Filesystem timestamp side channel, used only by this crate's own tests to observe a
//! fire time recorded on another thread without a second in-process communication path.
//!
//! Mirrors the upstream protocol's `TimestampSaver`: writing a zero-byte file whose name
//! encodes the timestamp is a crude but dependency-free way for one test thread to hand a
//! float to another without adding a channel just for the test harness.

use std::path::{Path, PathBuf};

use crate::clock;
use crate::error::{Error, Result};

pub(crate) struct TimestampSaver {
    dir: PathBuf,
    prefix: String,
}

impl TimestampSaver {
    pub(crate) fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> TimestampSaver {
        TimestampSaver {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Writes a zero-byte file named `{prefix}_{wall_now()}` and returns its path.
    pub(crate) fn save(&self) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}_{}", self.prefix, clock::wall_now()));
        std::fs::write(&path, []).map_err(|_| Error::Network)?;
        Ok(path)
    }

    /// Recovers the timestamp encoded in a path written by [`TimestampSaver::save`].
    pub(crate) fn get_ts_from_filename(path: &Path) -> Result<f64> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(Error::MalformedReply)?;
        let (_, ts) = name.rsplit_once('_').ok_or(Error::MalformedReply)?;
        ts.parse::<f64>().map_err(|_| Error::MalformedReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_timestamp_through_its_filename() {
        let dir = std::env::temp_dir();
        let saver = TimestampSaver::new(&dir, "sync-trigger-test-support");

        let path = saver.save().unwrap();
        let recovered = TimestampSaver::get_ts_from_filename(&path).unwrap();

        assert!((recovered - clock::wall_now()).abs() < 1.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_a_filename_with_no_prefix_separator() {
        assert_eq!(
            TimestampSaver::get_ts_from_filename(Path::new("noseparator")),
            Err(Error::MalformedReply)
        );
    }
}
