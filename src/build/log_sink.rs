use crate::error::RunError;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const BUILD_LOG: &str = "build.log";
pub const TEST_LOG: &str = "mstest.log";

/// Raw copy of everything a tool printed, one line per output line.
///
/// The file is truncated on creation and closed when the sink is dropped.
/// Write failures never abort a run: the first one is logged and kept for
/// [`LogSink::close`], and later lines are skipped.
pub struct LogSink {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
    error: Option<io::Error>,
}

impl LogSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RunError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| RunError::LogFile {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            writer: Some(LineWriter::new(file)),
            error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(path = %self.path.display(), error = %e, "log write failed, dropping further output");
            self.writer = None;
            self.error = Some(e);
        }
    }

    /// Marks the end of one output stream.
    pub fn end_of_stream(&mut self) {
        self.write_line("");
    }

    /// Flush and close, reporting the first write failure if there was one.
    pub fn close(mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lines_are_written_verbatim_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BUILD_LOG);
        let mut sink = LogSink::create(&path).unwrap();
        sink.write_line("first");
        sink.write_line("  second 'quoted' [x]");
        sink.end_of_stream();
        sink.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "first\n  second 'quoted' [x]\n\n"
        );
    }

    #[test]
    fn test_log_is_truncated_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TEST_LOG);
        fs::write(&path, "stale output from a previous run\n").unwrap();

        let mut sink = LogSink::create(&path).unwrap();
        sink.write_line("fresh");
        drop(sink);

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_missing_directory_is_a_log_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogSink::create(dir.path().join("nope").join(BUILD_LOG))
            .err()
            .unwrap();
        assert!(matches!(err, RunError::LogFile { .. }));
    }
}
