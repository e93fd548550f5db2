use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log file for this run: `explicit` when given, else `<log_dir>/<name>.log`
/// for commands that always log to a file. Only reads `config_path`, so it
/// can run before the subscriber exists and before the config is created.
pub fn resolve_log_file(
    explicit: Option<&Path>,
    config_path: &Path,
    file_log_name: Option<&str>,
) -> Option<PathBuf> {
    match (explicit, file_log_name) {
        (Some(p), _) => Some(p.to_path_buf()),
        (None, Some(name)) => Some(Config::load(config_path).log_file(name)),
        (None, None) => None,
    }
}

/// Installs the global subscriber. With `log_file` set, events go to that
/// file (appended, no ANSI) and the returned guard must be held until exit
/// so buffered lines are flushed; otherwise they go to stderr.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    if let Some(path) = log_file {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "navigate.log".to_string());
                let appender = tracing_appender::rolling::never(dir, name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter(verbose))
                    .with_writer(writer)
                    .with_ansi(false)
                    .try_init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!("Warning: failed to create log directory {}: {}", dir.display(), e);
                eprintln!("Falling back to stderr logging");
            }
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StorageObject;

    #[test]
    fn resolving_log_file_does_not_create_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let file = resolve_log_file(None, &path, Some("appointments")).unwrap();
        assert_eq!(file, Config::default().log_file("appointments"));
        assert!(!path.exists());
        assert!(resolve_log_file(None, &path, None).is_none());
    }

    #[test]
    fn log_file_follows_configured_dir_unless_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = Config { log_dir: dir.path().join("logs"), ..Config::default() };
        cfg.save_to(&path).unwrap();
        assert_eq!(
            resolve_log_file(None, &path, Some("appointments")),
            Some(dir.path().join("logs").join("appointments.log"))
        );
        let explicit = dir.path().join("run.log");
        assert_eq!(resolve_log_file(Some(&explicit), &path, Some("appointments")), Some(explicit));
    }
}
