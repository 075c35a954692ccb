//! The replayable trace writer (§6.4): a `trace.c`-style sequence of
//! `name(args...);` lines, handle arguments rendered as their stable name,
//! large payloads spilled to sibling `.bin` files, status lines as line
//! comments. Enabled only when `ANARI_DEBUG_TRACE_DIR` is set.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Payloads larger than this are written to a sibling `.bin` file instead
/// of inlined as a byte-literal.
const SPILL_THRESHOLD: usize = 256;

pub struct TraceWriter {
    dir: PathBuf,
    file: Mutex<File>,
    next_bin: AtomicU64,
}

impl TraceWriter {
    /// Opens (creating if necessary) `<base>_<instance>/trace.c`. `base`
    /// comes from `ANARI_DEBUG_TRACE_DIR`; `instance` disambiguates
    /// concurrently running processes/devices so runs never clobber each
    /// other's trace directory.
    pub fn open(base: &std::path::Path, instance: &str) -> std::io::Result<TraceWriter> {
        let dir = base.with_file_name(format!(
            "{}_{instance}",
            base.file_name().and_then(|n| n.to_str()).unwrap_or("trace")
        ));
        fs::create_dir_all(&dir)?;
        let file = File::create(dir.join("trace.c"))?;
        Ok(TraceWriter {
            dir,
            file: Mutex::new(file),
            next_bin: AtomicU64::new(0),
        })
    }

    /// Appends one recorded call as `name(args...);`.
    pub fn call(&self, rendered: &str) {
        let mut f = self.file.lock().unwrap();
        let _ = writeln!(f, "{rendered};");
    }

    /// Appends a status line as a `// ` comment.
    pub fn status(&self, line: &str) {
        let mut f = self.file.lock().unwrap();
        let _ = writeln!(f, "// {line}");
    }

    /// Spills `bytes` to a fresh sibling `.bin` file if it's large enough
    /// to be worth spilling, returning an inline literal or a loader-stub
    /// reference depending on size.
    pub fn render_bytes(&self, bytes: &[u8]) -> String {
        if bytes.len() <= SPILL_THRESHOLD {
            return format!("{{{}}}", hex(bytes));
        }
        let id = self.next_bin.fetch_add(1, Ordering::SeqCst);
        let name = format!("payload_{id}.bin");
        if fs::write(self.dir.join(&name), bytes).is_ok() {
            format!("load_binary(\"{name}\")")
        } else {
            format!("{{{}}}", hex(&bytes[..SPILL_THRESHOLD]))
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(",")
}
