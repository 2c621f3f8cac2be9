use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};

/// Bytes of ffmpeg diagnostics kept for error messages
const STDERR_TAIL: usize = 4096;

/// Check whether both `ffmpeg` and `ffprobe` can be run
pub fn check_ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    })
}

/// Anonymous temp file a child process writes its stderr into
///
/// A pipe nobody reads fills up and blocks the child, so stderr goes to a
/// file instead and is only read back when the child has failed.
pub(crate) struct StderrLog {
    file: File,
}

impl StderrLog {
    pub(crate) fn new() -> std::io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
        })
    }

    /// Handle to pass to `Command::stderr`
    pub(crate) fn stdio(&self) -> std::io::Result<Stdio> {
        Ok(Stdio::from(self.file.try_clone()?))
    }

    /// Last few KiB of what the child wrote, trimmed
    pub(crate) fn tail(&mut self) -> String {
        let len = self.file.seek(SeekFrom::End(0)).unwrap_or(0);
        let start = len.saturating_sub(STDERR_TAIL as u64);
        if self.file.seek(SeekFrom::Start(start)).is_err() {
            return String::new();
        }

        let mut bytes = Vec::with_capacity(STDERR_TAIL);
        let _ = self.file.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_chatty_child_does_not_block() {
        let mut log = StderrLog::new().unwrap();
        // well past a pipe buffer
        let status = Command::new("sh")
            .args(["-c", "i=0; while [ $i -lt 4000 ]; do echo 'frame error: bad block' >&2; i=$((i+1)); done; exit 3"])
            .stdout(Stdio::null())
            .stderr(log.stdio().unwrap())
            .status()
            .unwrap();

        assert_eq!(status.code(), Some(3));
        let tail = log.tail();
        assert!(tail.len() <= STDERR_TAIL);
        assert!(tail.ends_with("frame error: bad block"));
    }

    #[test]
    fn test_empty_log() {
        let mut log = StderrLog::new().unwrap();
        assert_eq!(log.tail(), "");
    }
}
