use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(short, long, global = true, help = "Print debug logs")]
    pub verbose: bool,
    #[clap(long, global = true, help = "Write logs to this file instead of stderr")]
    pub log_file: Option<PathBuf>,
    #[clap(long, global = true, help = "Use this config file instead of ~/.navigate-connector/config.json")]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Enter and store a new Navigate username and API key", display_order = 1)]
    Login,
    #[clap(about = "Remove the stored Navigate credentials", display_order = 2)]
    Logout,
    #[clap(about = "Show which Navigate user is stored", display_order = 3)]
    Whoami,
    #[clap(
        about = "Fetch a collection: alerts, users, notes, reminders, visits, attendance, assignments, assignment-feedback, appointments",
        display_order = 4
    )]
    Get {
        resource: String,
        #[clap(short = 'p', long = "param", help = "Query parameter as key=value (repeatable)")]
        params: Vec<String>,
        #[clap(long, help = "Write the records as CSV instead of printing JSON")]
        csv: Option<PathBuf>,
    },
    #[clap(about = "Fetch a single user record", display_order = 5)]
    User { user_id: String },
    #[clap(about = "Fetch any v3 endpoint, e.g. `courses`", display_order = 6)]
    Endpoint {
        endpoint: String,
        #[clap(short = 'p', long = "param", help = "Query parameter as key=value (repeatable)")]
        params: Vec<String>,
    },
    #[clap(about = "Export appointments to one CSV per day", display_order = 7)]
    Appointments {
        #[clap(long = "begin-date", alias = "begin_date", help = "Begin date in mm/dd/yyyy format")]
        begin_date: String,
        #[clap(long = "end-date", alias = "end_date", help = "End date in mm/dd/yyyy format (exclusive)")]
        end_date: String,
        #[clap(short = 't', long = "threads", default_value_t = crate::appointments::DEFAULT_WORKERS)]
        threads: usize,
        #[clap(short = 'o', long = "out-dir", help = "Output directory (default from config)")]
        out_dir: Option<PathBuf>,
        #[clap(long = "retries", default_value_t = 0, help = "Extra attempts per day on transient errors")]
        retries: usize,
    },
    #[clap(about = "Exchange files with the SFTP host", display_order = 8)]
    Sftp {
        #[clap(subcommand)]
        action: SftpCommand,
    },
    #[clap(about = "Configure the connector", display_order = 9)]
    Set(SetArgs),
    #[clap(about = "Print the active configuration", name = "config", display_order = 10)]
    ShowConfig,
}

#[derive(Subcommand, Debug)]
pub enum SftpCommand {
    #[clap(about = "List a remote directory", name = "ls")]
    List {
        #[clap(default_value = ".")]
        path: String,
    },
    #[clap(about = "Download a remote file", name = "get")]
    Get {
        remote: String,
        #[clap(help = "Local destination (default: remote file name in the current directory)")]
        local: Option<PathBuf>,
    },
    #[clap(about = "Upload a local file", name = "put")]
    Put { local: PathBuf, remote: String },
}

#[derive(clap::Args, Debug, Default)]
pub struct SetArgs {
    #[clap(long, help = "Navigate API base URL")]
    pub base_url: Option<String>,
    #[clap(long, help = "Keyring service name for the credentials")]
    pub service_name: Option<String>,
    #[clap(long, help = "SFTP target as user@host[:port]")]
    pub sftp: Option<String>,
    #[clap(long, help = "Private key used for SFTP authentication")]
    pub sftp_key: Option<PathBuf>,
    #[clap(long, help = "Directory for log files")]
    pub log_dir: Option<PathBuf>,
    #[clap(long, help = "Default output directory for appointment exports")]
    pub appointments_dir: Option<PathBuf>,
}
