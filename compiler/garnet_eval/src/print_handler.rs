//! Where `Kernel#puts`, `print` and `p` write.
//!
//! A runtime owns one handler, shared by its threads. Native runs write
//! to stdout; test runs capture into a buffer that assertions read back.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

pub enum PrintHandler {
    Stdout,
    /// Accumulates everything written.
    Buffer(Mutex<String>),
    Silent,
}

impl PrintHandler {
    /// Write `text` with no trailing newline.
    pub fn print(&self, text: &str) {
        match self {
            // A closed stdout is not the program's error.
            Self::Stdout => {
                let _ = std::io::stdout().lock().write_all(text.as_bytes());
            }
            Self::Buffer(buffer) => buffer.lock().push_str(text),
            Self::Silent => {}
        }
    }

    /// Write `text` and a newline as one unit, so lines from different
    /// threads do not interleave.
    pub fn println(&self, text: &str) {
        match self {
            Self::Stdout => {
                let _ = writeln!(std::io::stdout().lock(), "{text}");
            }
            Self::Buffer(buffer) => {
                let mut buffer = buffer.lock();
                buffer.push_str(text);
                buffer.push('\n');
            }
            Self::Silent => {}
        }
    }

    /// Everything captured so far; empty unless this is a buffer.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(buffer) => buffer.lock().clone(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(buffer) = self {
            buffer.lock().clear();
        }
    }
}

pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(Mutex::default()))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}
