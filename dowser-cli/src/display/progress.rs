//! Keeps tracing output and the check progress bar off each other's toes.
//!
//! While a check is running its progress bar is registered here, and the
//! tracing subscriber writes through [`ProgressWriter`] so that any warning
//! logged mid-check is printed above the bar instead of tearing it.

use indicatif::ProgressBar;
use std::io::Write;
use std::sync::Mutex;

/// Progress bar of the check currently running, if any.
static CHECK_PROGRESS_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// Register the progress bar log output should be routed through.
pub fn set_check_progress_bar(pb: ProgressBar) {
    let mut guard = CHECK_PROGRESS_BAR.lock().unwrap();
    *guard = Some(pb);
}

/// Drop the registration once the check is done.
pub fn clear_check_progress_bar() {
    let mut guard = CHECK_PROGRESS_BAR.lock().unwrap();
    *guard = None;
}

fn active_progress_bar() -> Option<ProgressBar> {
    let guard = CHECK_PROGRESS_BAR.lock().unwrap();
    guard.clone()
}

/// Line-buffering writer that prints through the active progress bar,
/// falling back to stderr when no bar is registered.
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl ProgressWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn emit(line: &str) -> std::io::Result<()> {
        if let Some(pb) = active_progress_bar() {
            pb.println(line);
        } else {
            let mut stderr = std::io::stderr();
            stderr.write_all(line.as_bytes())?;
            stderr.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // Flush complete lines only; partial lines wait for their newline.
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line_str = String::from_utf8_lossy(&line);
            Self::emit(line_str.trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let line_str = String::from_utf8_lossy(&self.buffer);
            let trimmed = line_str.trim_end();
            if !trimmed.is_empty() {
                Self::emit(trimmed)?;
            }
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter for tracing-subscriber that hands out [`ProgressWriter`]s.
pub struct ProgressWriterFactory;

impl ProgressWriterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProgressWriterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::new()
    }
}
