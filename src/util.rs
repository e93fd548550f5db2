use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Byte progress bar for a single file transfer; a spinner when the size is unknown.
pub fn transfer_progress(total: Option<u64>, label: &str) -> ProgressBar {
    let pb = match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {binary_bytes_per_sec}",
            ) {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {bytes}") {
                pb.set_style(style);
            }
            pb
        }
    };
    pb.set_message(label.to_string());
    pb
}

/// Counter bar for jobs made of many small units (one per day window).
pub fn job_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len} ({elapsed})") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(label.to_string());
    pb
}

/// Print a concise summary line for a finished transfer.
pub fn print_transfer_summary(action: &str, bytes: u64, elapsed_secs: f64) {
    if elapsed_secs > 0.0 {
        let mb = bytes as f64 / 1024.0 / 1024.0;
        println!(
            "{}: {} in {:.2}s ({:.2} MB/s)",
            action,
            human_bytes(bytes),
            elapsed_secs,
            mb / elapsed_secs
        );
    } else {
        println!("{}: {}", action, human_bytes(bytes));
    }
}

/// Write failures to a file with a UTC timestamped header (append mode).
pub fn write_failures(path: &Path, failures: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "Failures (UTC {}):", Utc::now().format("%Y%m%dT%H%M%SZ"))?;
    for line in failures {
        writeln!(f, "{}", line)?;
    }
    Ok(())
}

// Default backoff base in milliseconds. Can be adjusted at runtime via `set_backoff_ms`.
static BACKOFF_BASE_MS: AtomicU64 = AtomicU64::new(250);

/// Set the base backoff in milliseconds used by `retry_operation` between attempts.
pub fn set_backoff_ms(ms: u64) {
    BACKOFF_BASE_MS.store(ms, Ordering::SeqCst);
}

/// Get the current base backoff in milliseconds used by `retry_operation`.
pub fn get_backoff_ms() -> u64 {
    BACKOFF_BASE_MS.load(Ordering::SeqCst)
}

/// Runs `op` up to `max_attempts` times (at least once), sleeping a linearly
/// growing backoff between attempts. Errors for which `is_retriable` is false
/// are returned immediately.
pub fn retry_operation<F, T, E, R>(max_attempts: usize, mut op: F, is_retriable: R) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts || !is_retriable(&e) {
                    return Err(e);
                }
                let wait = get_backoff_ms().saturating_mul(attempt as u64);
                tracing::debug!(attempt, wait_ms = wait, "retrying after transient failure");
                std::thread::sleep(Duration::from_millis(wait));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MiB");
    }

    #[test]
    fn write_failures_appends() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("logs").join("failures.txt");
        write_failures(&p, &["one".to_string()]).unwrap();
        write_failures(&p, &["two".to_string()]).unwrap();
        let text = std::fs::read_to_string(&p).unwrap();
        assert!(text.contains("one") && text.contains("two"));
        assert_eq!(text.matches("Failures (UTC").count(), 2);
    }
}
