//! Defaults shared by the config layer, the CLI and the pipeline stages.

/// Timestamp value written by the recorder before its clock is synced.
pub const SENTINEL_TIMESTAMP: i64 = 0;

/// 250 Hz expressed as a period in microseconds.
pub const DEFAULT_PERIOD_MICROS: i64 = 4_000;

/// Index label of the resampled output table.
pub const INDEX_LABEL: &str = "cpu_time";

// Output layout
pub const DEFAULT_OUTPUT_DIR: &str = "combined";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_combined";
pub const SOURCE_EXTENSION: &str = "csv";

/// Cell tokens read as "no observation", on top of the empty cell.
pub const MISSING_VALUE_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// Session layout produced by the upstream glue
pub const DEFAULT_DATA_DIR: &str = "Flight_Data";
pub const DEFAULT_PLOTS_DIR: &str = "Plots";
pub const DEFAULT_LOG_EXTENSION: &str = "ulg";

// External collaborators
pub const DEFAULT_DECODER: &str = "ulog2csv";
pub const DEFAULT_INFO_PROGRAM: &str = "ulog_info";
pub const DEFAULT_PARAMS_PROGRAM: &str = "ulog_params";
pub const DEFAULT_MESSAGES_PROGRAM: &str = "ulog_messages";

pub const DEFAULT_LOG_DIR: &str = "logs";

/// Topics that are known to be noisy or non-numeric.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "position_setpoint_triplet_0",
    "sensor_selection_0",
    "telemetry_status_0",
    "vehicle_status_flags_0",
    "mission_result_0",
];

/// Owned copy of [`DEFAULT_EXCLUDES`] for config defaults.
pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

/// Output frequency in Hz for a period in microseconds.
pub fn frequency_hz(period_micros: i64) -> f64 {
    1_000_000.0 / period_micros as f64
}
