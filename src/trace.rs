//! Codec trace: a line-per-field dump of every reconstructed syntax element.
//!
//! Two runs over the same input produce the same trace, which makes it usable for
//! diffing against other decoders.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{trace, warn};

use crate::error::Result;

/// Where trace lines go.
pub trait TraceSink: Send {
    /// Callers skip formatting altogether when this is false.
    fn enabled(&self) -> bool {
        true
    }

    fn trace(&mut self, args: fmt::Arguments<'_>);
}

/// Formats and emits one trace line when the sink is enabled.
#[macro_export]
macro_rules! codec_trace {
    ($sink:expr, $($arg:tt)+) => {
        if $crate::trace::TraceSink::enabled(&*$sink) {
            $crate::trace::TraceSink::trace(&mut *$sink, format_args!($($arg)+));
        }
    };
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn enabled(&self) -> bool {
        false
    }

    fn trace(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Forwards to `log::trace!` under the `codec_trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn enabled(&self) -> bool {
        log::log_enabled!(target: "codec_trace", log::Level::Trace)
    }

    fn trace(&mut self, args: fmt::Arguments<'_>) {
        trace!(target: "codec_trace", "{}", args);
    }
}

/// Writes trace lines to a text file.
pub struct FileTrace {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl FileTrace {
    pub fn create(path: &Path) -> Result<Self> {
        let output = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(output),
            failed: false,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl TraceSink for FileTrace {
    fn enabled(&self) -> bool {
        !self.failed
    }

    fn trace(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.writer, "{}", args) {
            // a broken trace file must not abort the decode
            warn!("codec trace to {:?} disabled: {}", self.path, e);
            self.failed = true;
        }
    }
}

impl Drop for FileTrace {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Trace destination selected through [`crate::Params`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum TraceMode {
    #[default]
    Off,
    Log,
    /// One file per decoded sequence, named after this prefix.
    File(PathBuf),
}

impl TraceMode {
    /// Opens the sink for sequence `sequence_id`.
    pub fn open(&self, sequence_id: u8) -> Result<Box<dyn TraceSink>> {
        Ok(match self {
            TraceMode::Off => Box::new(NullTrace),
            TraceMode::Log => Box::new(LogTrace),
            TraceMode::File(prefix) => {
                let stem = prefix
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let path =
                    prefix.with_file_name(format!("{}_GOF{}_patch_decode.txt", stem, sequence_id));
                Box::new(FileTrace::create(&path)?)
            }
        })
    }
}
