//! Byte-based progress reporting for a file import.

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{msg} [{bar:40}] {bytes}/{total_bytes} ({eta})";

/// Progress bar fed from the reader's byte offset.
pub struct ByteProgress {
    bar: ProgressBar,
    position: u64,
}

impl ByteProgress {
    pub fn new(total_bytes: u64, label: &str, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(total_bytes)
            .with_style(style)
            .with_message(format!("Importing {label}"));
        Self { bar, position: 0 }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            position: 0,
        }
    }

    /// Move to an absolute byte offset, reporting only the delta.
    pub fn set_position(&mut self, byte: u64) {
        if byte > self.position {
            self.bar.inc(byte - self.position);
            self.position = byte;
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
