//! Append-only session log writer

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::LogRecord;
use crate::types::RobotState;
use crate::{MonitorError, Result};

/// Open recording: the file and how much went into it.
struct Recording {
    path: PathBuf,
    out: BufWriter<File>,
    lines: u64,
}

impl Recording {
    fn close(mut self) -> Result<(PathBuf, u64)> {
        self.out.flush().map_err(|e| MonitorError::file_error(self.path.clone(), e))?;
        Ok((self.path, self.lines))
    }
}

/// Writes one [`LogRecord`] line per accepted update while a recording is open.
///
/// Every line is flushed immediately so the file reflects the tracker at the
/// moment the update was applied. Dropping the writer flushes and closes any
/// open file.
#[derive(Default)]
pub struct LogWriter {
    recording: Option<Recording>,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` for appending. An already open recording is closed first.
    pub fn start_recording<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.stop_recording()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MonitorError::file_error(path.clone(), e))?;

        info!("Recording session log to {}", path.display());
        self.recording = Some(Recording { path, out: BufWriter::new(file), lines: 0 });
        Ok(())
    }

    /// Flush and close the open recording. Returns its path, if there was one.
    pub fn stop_recording(&mut self) -> Result<Option<PathBuf>> {
        match self.recording.take() {
            Some(recording) => {
                let (path, lines) = recording.close()?;
                info!("Closed session log {} ({} lines)", path.display(), lines);
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Path of the open recording.
    pub fn path(&self) -> Option<&Path> {
        self.recording.as_ref().map(|r| r.path.as_path())
    }

    /// Append one line for `state`. Does nothing when no recording is open.
    pub fn record_update(&mut self, state: &RobotState, timestamp: &str) -> Result<()> {
        let Some(recording) = self.recording.as_mut() else {
            return Ok(());
        };

        let line = LogRecord::from_state(timestamp, state).to_line();
        writeln!(recording.out, "{line}")
            .and_then(|()| recording.out.flush())
            .map_err(|e| MonitorError::file_error(recording.path.clone(), e))?;
        recording.lines += 1;
        debug!("Recorded update for robot {}", state.index);
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if let Some(recording) = self.recording.take() {
            if let Err(e) = recording.close() {
                warn!("Failed to flush session log on shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_log_path;

    fn state(index: usize, message: &str) -> RobotState {
        RobotState { index, message: message.to_string(), ..Default::default() }
    }

    #[test]
    fn writes_one_line_per_update() {
        let path = temp_log_path("writer-lines");
        let mut writer = LogWriter::new();
        writer.start_recording(&path).unwrap();
        assert!(writer.is_recording());

        writer.record_update(&state(0, "Attacker"), "10:00:00").unwrap();
        writer.record_update(&state(1, "Keeper"), "10:00:01").unwrap();

        // Flushed per line, readable before stop.
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("10:00:00,0,"));
        assert!(lines[1].ends_with(",Keeper"));

        assert_eq!(writer.stop_recording().unwrap(), Some(path.clone()));
        assert!(!writer.is_recording());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn updates_without_recording_are_ignored() {
        let mut writer = LogWriter::new();
        assert!(writer.record_update(&state(0, "x"), "10:00:00").is_ok());
        assert_eq!(writer.stop_recording().unwrap(), None);
    }

    #[test]
    fn restarting_switches_files() {
        let first = temp_log_path("writer-first");
        let second = temp_log_path("writer-second");
        let mut writer = LogWriter::new();

        writer.start_recording(&first).unwrap();
        writer.record_update(&state(0, "a"), "10:00:00").unwrap();
        writer.start_recording(&second).unwrap();
        writer.record_update(&state(0, "b"), "10:00:01").unwrap();
        drop(writer);

        assert_eq!(std::fs::read_to_string(&first).unwrap().lines().count(), 1);
        assert!(std::fs::read_to_string(&second).unwrap().ends_with(",b\n"));
        std::fs::remove_file(first).ok();
        std::fs::remove_file(second).ok();
    }

    #[test]
    fn unwritable_path_is_file_error() {
        let mut writer = LogWriter::new();
        let result = writer.start_recording("/definitely/not/here/session.log");
        assert!(matches!(result, Err(MonitorError::File { .. })));
        assert!(!writer.is_recording());
    }
}
