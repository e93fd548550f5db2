//! Appointment export: one API call per day in a date range, each non-empty
//! day written to its own CSV file.
//!
//! Days are fanned out to a fixed pool of worker threads over a bounded
//! channel. A failing day is logged and reported in the summary; it never
//! stops the remaining days.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use crossbeam_channel::{bounded, unbounded};
use indicatif::ProgressBar;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::{NavigateClient, Query};
use crate::error::{ApiError, ExportError};
use crate::parse::format_date;
use crate::records::cell_text;

pub const DEFAULT_WORKERS: usize = 50;
pub const DEFAULT_OUT_DIR: &str = "data/appointments";

/// Flattened appointment, one CSV line.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentRow {
    pub appointment_id: String,
    pub location: String,
    pub organizer_primary_id: String,
    pub appointment_type: String,
    pub start_time: String,
    pub scheduled_student_services: String,
    pub is_no_show: Option<bool>,
    pub is_cancelled: Option<bool>,
    /// Comma-joined primary ids of attendees that have one.
    pub attendees_primary_ids: String,
}

impl AppointmentRow {
    pub fn from_value(appt: &Value) -> Self {
        let text = |key: &str| appt.get(key).map(cell_text).unwrap_or_default();
        let organizer_primary_id = appt
            .get("organizer")
            .and_then(|o| o.get("primary_id"))
            .map(cell_text)
            .unwrap_or_default();
        let attendees_primary_ids = appt
            .get("attendees")
            .and_then(Value::as_array)
            .map(|attendees| {
                attendees
                    .iter()
                    .filter_map(|a| a.get("primary_id"))
                    .map(cell_text)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        Self {
            appointment_id: text("id"),
            location: text("location"),
            organizer_primary_id,
            appointment_type: text("type"),
            start_time: text("start_time"),
            scheduled_student_services: appt
                .get("scheduled_student_services")
                .map(|v| crate::records::join_list(v, ", "))
                .unwrap_or_default(),
            is_no_show: appt.get("is_no_show").and_then(Value::as_bool),
            is_cancelled: appt.get("is_cancelled").and_then(Value::as_bool),
            attendees_primary_ids,
        }
    }

    fn cells(&self) -> [String; 9] {
        let flag = |b: Option<bool>| b.map(|v| v.to_string()).unwrap_or_default();
        [
            self.appointment_id.clone(),
            self.location.clone(),
            self.organizer_primary_id.clone(),
            self.appointment_type.clone(),
            self.start_time.clone(),
            self.scheduled_student_services.clone(),
            flag(self.is_no_show),
            flag(self.is_cancelled),
            self.attendees_primary_ids.clone(),
        ]
    }
}

const CSV_HEADER: [&str; 9] = [
    "appointment_id",
    "location",
    "organizer_primary_id",
    "appointment_type",
    "start_time",
    "scheduled_student_services",
    "is_no_show",
    "is_cancelled",
    "attendees_primary_ids",
];

/// Appointment objects of a response: a bare array, `data` as an array, or
/// `data.appointments` / `appointments`.
pub fn appointment_values(response: &Value) -> &[Value] {
    let candidates = [
        Some(response),
        response.get("data"),
        response.get("data").and_then(|d| d.get("appointments")),
        response.get("appointments"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn extract_appointment_data(response: &Value) -> Vec<AppointmentRow> {
    appointment_values(response).iter().map(AppointmentRow::from_value).collect()
}

/// Half-open one-day range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayWindow {
    pub fn begin_param(&self) -> String {
        format_date(self.start)
    }

    pub fn end_param(&self) -> String {
        format_date(self.end)
    }

    /// `apmts_mm_dd_yyyy_mm_dd_yyyy.csv`
    pub fn file_name(&self) -> String {
        format!(
            "apmts_{}_{}.csv",
            self.begin_param().replace('/', "_"),
            self.end_param().replace('/', "_")
        )
    }
}

/// Consecutive one-day windows covering `[begin, end)`.
pub fn day_windows(begin: NaiveDate, end: NaiveDate) -> Vec<DayWindow> {
    let mut windows = Vec::new();
    let mut start = begin;
    while start < end {
        let next = start + Duration::days(1);
        windows.push(DayWindow { start, end: next });
        start = next;
    }
    windows
}

/// Writes rows for a window under `dir`, creating it if needed.
pub fn export_rows(
    rows: &[AppointmentRow],
    window: &DayWindow,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(window.file_name());
    let write_err = |message: String| ExportError::Write { path: path.clone(), message };
    std::fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;
    let mut wtr = csv::Writer::from_path(&path).map_err(|e| write_err(e.to_string()))?;
    wtr.write_record(CSV_HEADER).map_err(|e| write_err(e.to_string()))?;
    for row in rows {
        wtr.write_record(row.cells()).map_err(|e| write_err(e.to_string()))?;
    }
    wtr.flush().map_err(|e| write_err(e.to_string()))?;
    info!("Data exported to {}", path.display());
    Ok(path)
}

/// Where appointments come from; the API client in production.
pub trait AppointmentSource: Sync {
    fn appointments(&self, begin_date: &str, end_date: &str) -> Result<Value, ApiError>;
}

impl AppointmentSource for NavigateClient {
    fn appointments(&self, begin_date: &str, end_date: &str) -> Result<Value, ApiError> {
        let query = Query::new().param("begin_date", begin_date).param("end_date", end_date);
        self.get_appointments(&query)
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub workers: usize,
    pub out_dir: PathBuf,
    /// Attempts per day for retriable API failures.
    pub max_attempts: usize,
}

impl ExportOptions {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Self {
        Self {
            begin,
            end,
            workers: DEFAULT_WORKERS,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            max_attempts: 1,
        }
    }

    /// The range must cover at least one day.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.begin >= self.end {
            return Err(ExportError::InvalidRange {
                begin: format_date(self.begin),
                end: format_date(self.end),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    Written(PathBuf),
    Empty,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub windows: usize,
    pub files_written: Vec<PathBuf>,
    pub empty: usize,
    pub failures: Vec<String>,
}

/// Fetches and exports a single day.
pub fn process_window<S: AppointmentSource + ?Sized>(
    source: &S,
    window: &DayWindow,
    out_dir: &Path,
    max_attempts: usize,
) -> WindowOutcome {
    let (begin, end) = (window.begin_param(), window.end_param());
    info!("Starting API call for appointments from {} to {}", begin, end);
    let response = crate::util::retry_operation(
        max_attempts,
        || source.appointments(&begin, &end),
        ApiError::is_retriable,
    );
    let response = match response {
        Ok(v) => v,
        Err(e) => {
            error!("Error during API call for the date range from {} to {}: {}", begin, end, e);
            return WindowOutcome::Failed(format!("{} - {}: {}", begin, end, e));
        }
    };
    info!("API call successful for appointments from {} to {}", begin, end);

    let rows = extract_appointment_data(&response);
    if rows.is_empty() {
        info!(
            "No appointments found for the date range from {} to {}. No CSV file created.",
            begin, end
        );
        return WindowOutcome::Empty;
    }
    match export_rows(&rows, window, out_dir) {
        Ok(path) => WindowOutcome::Written(path),
        Err(e) => {
            error!("Export failed for {} to {}: {}", begin, end, e);
            WindowOutcome::Failed(format!("{} - {}: {}", begin, end, e))
        }
    }
}

// Worker count bounded by the number of windows; zero means one.
fn calc_workers(requested: usize, windows: usize) -> usize {
    let workers = if requested == 0 { 1 } else { requested };
    workers.min(windows.max(1))
}

/// Runs the export over all day windows and blocks until every day is done.
pub fn run_export<S: AppointmentSource + ?Sized>(
    source: &S,
    opts: &ExportOptions,
    progress: Option<&ProgressBar>,
) -> Result<ExportSummary, ExportError> {
    opts.validate()?;
    let windows = day_windows(opts.begin, opts.end);
    let workers = calc_workers(opts.workers, windows.len());
    let started = Instant::now();
    info!(windows = windows.len(), workers, out_dir = %opts.out_dir.display(), "starting appointment export");

    let (job_tx, job_rx) = bounded::<DayWindow>(workers * 2);
    let (result_tx, result_rx) = unbounded::<WindowOutcome>();

    let mut summary = ExportSummary { windows: windows.len(), ..Default::default() };
    std::thread::scope(|scope| {
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for window in job_rx.iter() {
                    let outcome =
                        process_window(source, &window, &opts.out_dir, opts.max_attempts);
                    debug!(worker_id, start = %window.begin_param(), "window done");
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        let windows = &windows;
        scope.spawn(move || {
            for window in windows {
                if job_tx.send(*window).is_err() {
                    break;
                }
            }
        });

        for outcome in result_rx.iter() {
            if let Some(pb) = progress {
                pb.inc(1);
            }
            match outcome {
                WindowOutcome::Written(p) => summary.files_written.push(p),
                WindowOutcome::Empty => summary.empty += 1,
                WindowOutcome::Failed(msg) => summary.failures.push(msg),
            }
        }
    });
    summary.files_written.sort();
    info!(
        written = summary.files_written.len(),
        empty = summary.empty,
        failed = summary.failures.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "All data exported."
    );
    Ok(summary)
}
