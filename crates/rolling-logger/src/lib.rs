//! Rolling Logger
//!
//! File logger that rolls over by size and keeps the most recent lines in a
//! circular buffer for in-app display. `log` records are bridged into the
//! same output through tracing-subscriber.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Roll the active file once it grows past this size
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
/// Rolled generations kept next to the active file
pub const KEEP_FILES: usize = 3;
/// Lines kept in memory
pub const RECENT_LINES: usize = 500;

static LOGGER: OnceLock<Arc<LoggerState>> = OnceLock::new();

/// Size-bounded log file with numbered generations (`app.log.1` is the newest rolled one)
struct RollingFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    max_bytes: u64,
    keep: usize,
}

impl RollingFile {
    fn open(path: PathBuf, max_bytes: u64, keep: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file: Some(file),
            written,
            max_bytes,
            keep,
        })
    }

    fn generation(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file = None;
        if self.keep == 0 {
            fs::remove_file(&self.path).or_else(ignore_missing)?;
        } else {
            fs::remove_file(self.generation(self.keep)).or_else(ignore_missing)?;
            for n in (1..self.keep).rev() {
                let from = self.generation(n);
                if from.exists() {
                    fs::rename(&from, self.generation(n + 1))?;
                }
            }
            fs::rename(&self.path, self.generation(1))?;
        }
        self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        self.written = 0;
        Ok(())
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + bytes.len() as u64 > self.max_bytes {
            self.roll()?;
        }
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Err(io::Error::new(io::ErrorKind::Other, "log file closed")),
        };
        file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

fn ignore_missing(e: io::Error) -> io::Result<()> {
    if e.kind() == io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(e)
    }
}

/// Fixed-capacity ring of formatted lines
struct RecentLines {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RecentLines {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn last(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }
}

struct LoggerState {
    file: Mutex<RollingFile>,
    recent: Mutex<RecentLines>,
}

impl LoggerState {
    fn record(&self, bytes: &[u8]) -> io::Result<()> {
        if let Ok(mut recent) = self.recent.lock() {
            for line in String::from_utf8_lossy(bytes).lines() {
                recent.push(line.to_string());
            }
        }
        match self.file.lock() {
            Ok(mut file) => file.write_line(bytes),
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "log file lock poisoned")),
        }
    }
}

/// Writer handed to tracing-subscriber for each event
#[derive(Clone)]
struct LogWriter(Arc<LoggerState>);

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.file.lock() {
            Ok(mut file) => match file.file.as_mut() {
                Some(f) => f.flush(),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global logger writing to `<log_dir>/<app_name>.log`.
///
/// Can only succeed once per process.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create {}: {}", log_dir.display(), e))?;

    let path = log_dir.join(format!("{}.log", app_name));
    let file = RollingFile::open(path.clone(), MAX_FILE_BYTES, KEEP_FILES)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let state = Arc::new(LoggerState {
        file: Mutex::new(file),
        recent: Mutex::new(RecentLines::new(RECENT_LINES)),
    });

    LOGGER
        .set(state.clone())
        .map_err(|_| "Logger already initialized".to_string())?;

    // try_init also routes `log` records through tracing
    tracing_subscriber::fmt()
        .with_writer(LogWriter(state))
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    tracing::info!("{} logging to {}", app_name, path.display());
    Ok(())
}

fn ensure_initialized() -> Result<(), String> {
    LOGGER.get().map(|_| ()).ok_or_else(|| "Logger not initialized".to_string())
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// The last `n` formatted lines, oldest first
pub fn recent_lines(n: usize) -> Vec<String> {
    LOGGER
        .get()
        .and_then(|state| state.recent.lock().ok().map(|recent| recent.last(n)))
        .unwrap_or_default()
}
