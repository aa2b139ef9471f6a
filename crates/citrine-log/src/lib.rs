//! Logging for the transfer senders.
//!
//! A transfer is a short-lived, single-shot process whose interesting events
//! are per-datagram: queue, send, ack, retransmit, timeout. Records carry
//! the offset from logger start instead of a full wall-clock stamp, which
//! keeps trace lines narrow enough to scan the seq-id columns; one header
//! record with the wall-clock start lets offsets be reconciled with
//! receiver-side logs. Everything goes to stderr, because stdout is
//! reserved for the single metrics line a sender prints at the end.

use chrono::Local;
use log::{set_boxed_logger, set_max_level, Level, Log, Metadata, Record, SetLoggerError};
use std::io::{stderr, BufWriter, Stderr, Write};
use std::sync::Mutex;
use std::time::Instant;

pub struct CitrineLogger {
    max_level: Level,
    started_at: Instant,
    writer: Mutex<BufWriter<Stderr>>,
}

impl CitrineLogger {
    pub fn init(max_level: Level) -> Result<(), SetLoggerError> {
        let logger = CitrineLogger {
            max_level,
            started_at: Instant::now(),
            writer: Mutex::new(BufWriter::new(stderr())),
        };
        set_boxed_logger(Box::new(logger))?;
        set_max_level(max_level.to_level_filter());
        log::info!(
            "log started {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        Ok(())
    }
}

impl Log for CitrineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let offset = self.started_at.elapsed();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(
                writer,
                "+{:>9.4}s {:5} [{}] {}",
                offset.as_secs_f64(),
                record.level(),
                record.target(),
                record.args()
            );
            // Trace volume is one line per datagram; only records at Info
            // and above hit the stream immediately.
            if record.level() <= Level::Info {
                let _ = writer.flush();
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
