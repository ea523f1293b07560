//! Rolling Logger
//!
//! Size-rotated file logging plus an in-memory circular buffer of the most
//! recent lines, so a shell can show "recent activity" without reading files.
//!
//! Built on `tracing-subscriber`; records emitted through the `log` crate are
//! bridged into the same pipeline.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, format::Writer, time::FormatTime, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

static SINK: OnceLock<Arc<Sink>> = OnceLock::new();

/// Logger settings
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: log::LevelFilter,
    /// Rotate once the active file grows past this many bytes
    pub max_file_bytes: u64,
    /// Rotated files kept next to the active one
    pub max_files: usize,
    /// Lines kept in the in-memory buffer
    pub buffer_lines: usize,
    pub echo_stderr: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            max_file_bytes: 1024 * 1024,
            max_files: 3,
            buffer_lines: 500,
            echo_stderr: true,
        }
    }
}

/// Initialize logging with default settings.
///
/// Calling this more than once is harmless; only the first call installs the
/// subscriber.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    init_with_config(log_dir, app_name, LoggerConfig::default())
}

pub fn init_with_config(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    config: LoggerConfig,
) -> Result<(), String> {
    if SINK.get().is_some() {
        return Ok(());
    }

    let file = RollingFile::open(
        log_dir.as_ref(),
        app_name,
        config.max_file_bytes,
        config.max_files,
    )
    .map_err(|e| format!("Failed to open log file: {}", e))?;

    let sink = Arc::new(Sink {
        file: Mutex::new(file),
        ring: Mutex::new(RingBuffer::new(config.buffer_lines)),
    });
    if SINK.set(sink.clone()).is_err() {
        return Ok(());
    }

    let level = to_level_filter(config.level);
    let file_layer = fmt::layer()
        .with_writer(SinkHandle(sink))
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_filter(level);
    let stderr_layer = config.echo_stderr.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_timer(LocalTime)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))
}

pub fn info(msg: &str) -> Result<(), String> {
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    tracing::error!("{}", msg);
    Ok(())
}

/// Most recent log lines, oldest first. Empty before `init_logger`.
pub fn recent_logs() -> Vec<String> {
    SINK.get()
        .and_then(|sink| sink.ring.lock().ok().map(|ring| ring.snapshot()))
        .unwrap_or_default()
}

/// Path of the active log file, if the logger is initialized
pub fn log_file_path() -> Option<PathBuf> {
    SINK.get()
        .and_then(|sink| sink.file.lock().ok().map(|f| f.active_path()))
}

fn to_level_filter(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ========================
// Circular buffer
// ========================

/// Fixed-capacity line buffer; the oldest line is evicted first
#[derive(Debug)]
pub struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ========================
// Rolling file
// ========================

/// Log file that rotates `<name>.log` -> `<name>.1.log` -> ... once it grows
/// past `max_bytes`.
#[derive(Debug)]
pub struct RollingFile {
    dir: PathBuf,
    name: String,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
}

impl RollingFile {
    pub fn open(dir: &Path, name: &str, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            max_bytes,
            max_files,
            file,
            written,
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.name))
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.name, index))
    }

    pub fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + bytes.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_files == 0 {
            fs::remove_file(self.active_path())?;
        } else {
            let oldest = self.rotated_path(self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.max_files).rev() {
                let from = self.rotated_path(index);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(index + 1))?;
                }
            }
            fs::rename(self.active_path(), self.rotated_path(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.written = 0;
        Ok(())
    }
}

// ========================
// tracing writer plumbing
// ========================

struct Sink {
    file: Mutex<RollingFile>,
    ring: Mutex<RingBuffer>,
}

#[derive(Clone)]
struct SinkHandle(Arc<Sink>);

struct SinkWriter(Arc<Sink>);

impl<'a> MakeWriter<'a> for SinkHandle {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(self.0.clone())
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut file) = self.0.file.lock() {
            file.write_line(buf)?;
        }
        if let Ok(mut ring) = self.0.ring.lock() {
            for line in String::from_utf8_lossy(buf).lines() {
                if !line.trim().is_empty() {
                    ring.push(line.to_string());
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.file.lock() {
            Ok(mut file) => file.file.flush(),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut ring = RingBuffer::new(2);
        ring.push("a".to_string());
        ring.push("b".to_string());
        ring.push("c".to_string());
        assert_eq!(ring.snapshot(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_ring_buffer_zero_capacity() {
        let mut ring = RingBuffer::new(0);
        ring.push("ignored".to_string());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_rolling_file_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", 10, 2).unwrap();

        file.write_line(b"0123456789\n").unwrap();
        file.write_line(b"second\n").unwrap();
        file.write_line(b"third-line\n").unwrap();

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.1.log").exists());
        assert!(dir.path().join("app.2.log").exists());
        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(active, "third-line\n");
    }

    #[test]
    fn test_rolling_file_keeps_at_most_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", 4, 1).unwrap();

        for line in ["aaaa\n", "bbbb\n", "cccc\n"] {
            file.write_line(line.as_bytes()).unwrap();
        }

        assert!(dir.path().join("app.1.log").exists());
        assert!(!dir.path().join("app.2.log").exists());
        let rotated = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(rotated, "bbbb\n");
    }
}
