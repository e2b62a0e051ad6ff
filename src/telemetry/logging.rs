use crate::error::{StoreError, StoreResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Filter directives are read from this variable; `info` when unset.
pub const LOG_ENV: &str = "SATCHEL_LOG";
pub const LOG_FILE: &str = "inventory.log";

static INITIALIZED: OnceLock<Option<PathBuf>> = OnceLock::new();

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "Satchel - character inventory store";

const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Installs the global subscriber. With a data root, events are also
/// appended to `<root>/log/inventory.log`. Later calls do nothing.
pub fn init(root: Option<&Path>) -> StoreResult<()> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, log_path) = match root {
        Some(root) => {
            let (file, path) = open_log_file(root)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        // someone else owns the global dispatcher; keep theirs
        return Ok(());
    }
    if INITIALIZED.set(log_path.clone()).is_ok() {
        if let Some(path) = log_path {
            tracing::debug!(path = %path.display(), "file logging enabled");
        }
    }
    Ok(())
}

/// File that `init` attached, if any.
pub fn log_file_path() -> Option<&'static Path> {
    INITIALIZED.get().and_then(|path| path.as_deref())
}

fn open_log_file(root: &Path) -> StoreResult<(File, PathBuf)> {
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir).map_err(|err| StoreError::io(&log_dir, err))?;
    let path = log_dir.join(LOG_FILE);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| StoreError::io(&path, err))?;
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        write_header(&mut file, LOG_FILE).map_err(|err| StoreError::io(&path, err))?;
    }
    Ok((file, path))
}

fn write_header(file: &mut impl Write, name: &str) -> std::io::Result<()> {
    let timestamp = format_header_timestamp(unix_timestamp());
    writeln!(file, "{HEADER_LINE}")?;
    writeln!(file, "{HEADER_TITLE}")?;
    writeln!(file, "{name} - started {timestamp}")?;
    file.flush()
}

fn format_header_timestamp(ts: i64) -> String {
    let datetime = breakdown_timestamp(ts);
    let weekday = WEEKDAYS[(datetime.weekday as usize).min(6)];
    let month = MONTHS[(datetime.month as usize).saturating_sub(1).min(11)];
    format!(
        "{weekday} {month} {:>2} {:02}:{:02}:{:02} {}",
        datetime.day, datetime.hour, datetime.minute, datetime.second, datetime.year
    )
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

struct DateTimeParts {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    weekday: u32,
}

fn breakdown_timestamp(ts: i64) -> DateTimeParts {
    let secs = ts.max(0);
    let days = secs / 86_400;
    let seconds_of_day = (secs % 86_400) as u32;
    let (year, month, day) = civil_from_days(days);
    DateTimeParts {
        year,
        month,
        day,
        hour: seconds_of_day / 3_600,
        minute: (seconds_of_day % 3_600) / 60,
        second: seconds_of_day % 60,
        weekday: (days % 7) as u32,
    }
}

fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = (y + i64::from(m <= 2)) as i32;
    (year, m as u32, d as u32)
}
