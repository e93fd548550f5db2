use clap::Parser;
use owo_colors::OwoColorize;

use navigate_connector::app::App;
use navigate_connector::cli::{Cli, Commands, SftpCommand};
use navigate_connector::commands::{self, AppointmentsArgs};
use navigate_connector::config::Config;
use navigate_connector::error::{ApiError, CredentialError, NavigateError, SftpError};
use navigate_connector::logging;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        if let Some(hint) = hint_for(&e) {
            eprintln!("{} {}", "hint:".cyan(), hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(p) => p,
        None => Config::default_path()?,
    };
    // Export runs always log to a file.
    let file_log_name = match &cli.command {
        Commands::Appointments { .. } => Some("appointments"),
        _ => None,
    };
    let log_file = logging::resolve_log_file(cli.log_file.as_deref(), &config_path, file_log_name);
    let _log_guard = logging::init_logging(cli.verbose, log_file.as_deref());

    let config = Config::init(&config_path)?;
    tracing::debug!(config = %config_path.display(), "loaded configuration");

    let app = App::new(config, config_path);
    match cli.command {
        Commands::Login => commands::handle_login(&app.credential_manager()),
        Commands::Logout => commands::handle_logout(&app.credential_manager()),
        Commands::Whoami => commands::handle_whoami(&app.credential_manager()),
        Commands::Get { resource, params, csv } => {
            let client = app.api_client()?;
            commands::handle_get(&client, &resource, &params, csv.as_deref())
        }
        Commands::User { user_id } => commands::handle_user(&app.api_client()?, &user_id),
        Commands::Endpoint { endpoint, params } => {
            commands::handle_endpoint(&app.api_client()?, &endpoint, &params)
        }
        Commands::Appointments { begin_date, end_date, threads, out_dir, retries } => {
            if let Some(p) = &log_file {
                println!("Running. See logs at {} for details.", p.display());
            }
            let client = app.api_client()?;
            let args = AppointmentsArgs {
                begin_date,
                end_date,
                threads,
                out_dir: out_dir.unwrap_or_else(|| app.config().appointments_dir.clone()),
                retries,
                failures_file: Some(app.config().log_file("appointments_failures")),
            };
            commands::handle_appointments(&client, args).map(|_| ())
        }
        Commands::Sftp { action } => {
            let mut client = app.sftp_client()?;
            client.connect()?;
            let result = match action {
                SftpCommand::List { path } => commands::handle_sftp_list(&client, &path).map(|_| ()),
                SftpCommand::Get { remote, local } => {
                    let local = commands::download_target(&remote, local)?;
                    commands::handle_sftp_get(&client, &remote, &local).map(|_| ())
                }
                SftpCommand::Put { local, remote } => {
                    commands::handle_sftp_put(&client, &local, &remote).map(|_| ())
                }
            };
            client.close();
            result
        }
        Commands::Set(args) => {
            commands::handle_set(app.config_path(), app.config(), args).map(|_| ())
        }
        Commands::ShowConfig => commands::handle_show_config(&app),
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<NavigateError>() {
        e.hint()
    } else if let Some(e) = err.downcast_ref::<ApiError>() {
        e.hint()
    } else if let Some(e) = err.downcast_ref::<SftpError>() {
        e.hint()
    } else if let Some(e) = err.downcast_ref::<CredentialError>() {
        e.hint()
    } else {
        None
    }
}
