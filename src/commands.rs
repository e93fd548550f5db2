use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use cli_table::{Cell, CellStruct, Style, Table, format::Justify, print_stdout};
use owo_colors::OwoColorize;
use serde_json::Value;

use crate::api::{NavigateClient, Query, Resource};
use crate::app::App;
use crate::appointments::{ExportOptions, ExportSummary, run_export};
use crate::cli::SetArgs;
use crate::config::Config;
use crate::credentials::CredentialManager;
use crate::records::{alerts_to_rows, collection_rows, write_csv};
use crate::sftp::{NavigateSftp, SftpSettings};
use crate::util::{job_progress, print_transfer_summary, transfer_progress, write_failures};

pub fn handle_login(manager: &CredentialManager) -> Result<()> {
    let creds = manager.update_credentials()?;
    println!("{} stored credentials for '{}'", "✔".green(), creds.username);
    Ok(())
}

pub fn handle_logout(manager: &CredentialManager) -> Result<()> {
    manager.clear_credentials()?;
    println!("{} removed credentials from service '{}'", "✔".green(), manager.service_name());
    Ok(())
}

pub fn handle_whoami(manager: &CredentialManager) -> Result<()> {
    match manager.stored_credentials()? {
        Some(creds) => println!("{} (service '{}')", creds.username, manager.service_name()),
        None => println!(
            "{} no credentials stored for service '{}'",
            "!".yellow(),
            manager.service_name()
        ),
    }
    Ok(())
}

/// Table rows for a collection response, or `None` when the body has no
/// recognisable record list.
pub fn rows_for(resource: &Resource, value: &Value) -> Option<Vec<crate::records::Row>> {
    match resource {
        Resource::Alerts => Some(alerts_to_rows(value)),
        other => collection_rows(value, other.collection_key().unwrap_or("records")),
    }
}

pub fn handle_get(
    client: &NavigateClient,
    resource: &str,
    params: &[String],
    csv: Option<&Path>,
) -> Result<()> {
    let resource: Resource = resource.parse()?;
    let query = Query::parse_pairs(params)?;
    let value = client.fetch(&resource, &query)?;
    match csv {
        Some(path) => {
            let rows = rows_for(&resource, &value).with_context(|| {
                format!("response from {} has no record list to write as CSV", resource)
            })?;
            let n = write_csv(&rows, path)?;
            println!("{} wrote {} rows to {}", "✔".green(), n, path.display());
        }
        None => print_json(&value)?,
    }
    Ok(())
}

pub fn handle_user(client: &NavigateClient, user_id: &str) -> Result<()> {
    let value = client.get_user_by_id(user_id)?;
    print_json(&value)
}

pub fn handle_endpoint(client: &NavigateClient, endpoint: &str, params: &[String]) -> Result<()> {
    let query = Query::parse_pairs(params)?;
    let value = client.get_endpoint(endpoint, &query)?;
    print_json(&value)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Arguments of `navigate appointments`.
#[derive(Debug, Clone)]
pub struct AppointmentsArgs {
    pub begin_date: String,
    pub end_date: String,
    pub threads: usize,
    pub out_dir: PathBuf,
    pub retries: usize,
    pub failures_file: Option<PathBuf>,
}

pub fn handle_appointments(
    source: &dyn crate::appointments::AppointmentSource,
    args: AppointmentsArgs,
) -> Result<ExportSummary> {
    let begin = crate::parse::parse_date(&args.begin_date)?;
    let end = crate::parse::parse_date(&args.end_date)?;
    let opts = ExportOptions {
        begin,
        end,
        workers: args.threads,
        out_dir: args.out_dir,
        max_attempts: args.retries + 1,
    };
    opts.validate()?;
    let days = (end - begin).num_days().max(0) as u64;
    let pb = job_progress(days, "appointments");
    let summary = run_export(source, &opts, Some(&pb))?;
    pb.finish_and_clear();

    println!(
        "{} {} days: {} files written, {} empty, {} failed",
        "✔".green(),
        summary.windows,
        summary.files_written.len(),
        summary.empty,
        summary.failures.len()
    );
    if !summary.failures.is_empty() {
        for f in &summary.failures {
            eprintln!("  {} {}", "✘".red(), f);
        }
        if let Some(path) = &args.failures_file {
            write_failures(path, &summary.failures)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("failures recorded in {}", path.display());
        }
    }
    Ok(summary)
}

pub fn handle_sftp_list(client: &NavigateSftp, path: &str) -> Result<Vec<String>> {
    let names = client.list_files(path)?;
    if names.is_empty() {
        println!("{} is empty", path);
        return Ok(names);
    }
    let title = vec!["#".cell().bold(true), "Name".cell().bold(true)];
    let table: Vec<Vec<CellStruct>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| vec![(i + 1).cell().justify(Justify::Right), name.cell()])
        .collect();
    print_stdout(table.table().title(title)).context("failed to print table")?;
    Ok(names)
}

/// Local destination for a download: the remote file name in the current
/// directory unless given.
pub fn download_target(remote: &str, local: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = local {
        return Ok(if p.is_dir() { p.join(remote_file_name(remote)?) } else { p });
    }
    Ok(PathBuf::from(remote_file_name(remote)?))
}

fn remote_file_name(remote: &str) -> Result<&str> {
    remote
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .with_context(|| format!("cannot derive a local file name from '{}'", remote))
}

pub fn handle_sftp_get(client: &NavigateSftp, remote: &str, local: &Path) -> Result<u64> {
    let size = client.remote_size(remote).unwrap_or(None);
    let pb = transfer_progress(size, remote);
    let started = Instant::now();
    let bytes = client.download_file_with_progress(remote, local, |n| pb.inc(n))?;
    pb.finish_and_clear();
    print_transfer_summary(
        &format!("downloaded {} -> {}", remote, local.display()),
        bytes,
        started.elapsed().as_secs_f64(),
    );
    Ok(bytes)
}

pub fn handle_sftp_put(client: &NavigateSftp, local: &Path, remote: &str) -> Result<u64> {
    let size = std::fs::metadata(local).ok().map(|m| m.len());
    let pb = transfer_progress(size, &local.display().to_string());
    let started = Instant::now();
    let bytes = client.upload_file_with_progress(local, remote, |n| pb.inc(n))?;
    pb.finish_and_clear();
    print_transfer_summary(
        &format!("uploaded {} -> {}", local.display(), remote),
        bytes,
        started.elapsed().as_secs_f64(),
    );
    Ok(bytes)
}

/// Applies `args` to `config` and writes the result to `config_path`.
pub fn handle_set(config_path: &Path, config: &Config, args: SetArgs) -> Result<Config> {
    let mut cfg = config.clone();
    if let Some(url) = args.base_url {
        url::Url::parse(&url).with_context(|| format!("invalid base URL '{}'", url))?;
        cfg.base_url = url;
    }
    if let Some(name) = args.service_name {
        cfg.service_name = name;
    }
    if let Some(target) = args.sftp {
        let (username, host, port) = crate::parse::parse_remote_host(&target)
            .with_context(|| format!("invalid --sftp value '{}'", target))?;
        let key = match (&args.sftp_key, &cfg.sftp) {
            (Some(k), _) => k.clone(),
            (None, Some(existing)) => existing.private_key_path.clone(),
            (None, None) => dirs::home_dir()
                .map(|h| h.join(".ssh").join("id_rsa"))
                .context("cannot find the user's home directory for the default key")?,
        };
        let mut settings = SftpSettings::new(host, username, key);
        settings.port = port;
        cfg.sftp = Some(settings);
    } else if let Some(key) = args.sftp_key {
        let sftp = cfg
            .sftp
            .as_mut()
            .context("--sftp-key needs an sftp target; pass --sftp user@host as well")?;
        sftp.private_key_path = key;
    }
    if let Some(dir) = args.log_dir {
        cfg.log_dir = dir;
    }
    if let Some(dir) = args.appointments_dir {
        cfg.appointments_dir = dir;
    }
    cfg.save(config_path)?;
    println!("{} configuration saved to {}", "✔".green(), config_path.display());
    Ok(cfg)
}

pub fn handle_show_config(app: &App) -> Result<()> {
    let cfg = app.config();
    let sftp = cfg
        .sftp
        .as_ref()
        .map(|s| format!("{}@{} (key {})", s.username, s.addr(), s.private_key_path.display()))
        .unwrap_or_else(|| "-".to_string());
    let rows = vec![
        vec!["config file".cell(), app.config_path().display().to_string().cell()],
        vec!["base_url".cell(), cfg.base_url.clone().cell()],
        vec!["service_name".cell(), cfg.service_name.clone().cell()],
        vec!["sftp".cell(), sftp.cell()],
        vec!["log_dir".cell(), cfg.log_dir.display().to_string().cell()],
        vec!["appointments_dir".cell(), cfg.appointments_dir.display().to_string().cell()],
    ];
    print_stdout(rows.table().title(vec!["Key".cell().bold(true), "Value".cell().bold(true)]))
        .context("failed to print table")?;
    Ok(())
}
