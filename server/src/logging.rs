//! Structured Logging Setup via tracing-subscriber
//!
//! Level und Format kommen aus der Konfiguration und koennen per
//! Umgebungsvariable ueberschrieben werden:
//! - `SF_LOG_LEVEL`: Filter-Ausdruck (z.B. `debug` oder `sprechfunk_signaling=trace`)
//! - `SF_LOG_FORMAT`: Format (text/json)

use anyhow::anyhow;
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const LEVEL_ENV: &str = "SF_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const FORMAT_ENV: &str = "SF_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Schlaegt fehl, wenn das Format unbekannt ist oder bereits ein globaler
/// Subscriber installiert wurde.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(FORMAT_ENV).unwrap_or_else(|_| format.to_string());
    if !log_format_gueltig(&format) {
        return Err(anyhow!("Unbekanntes Log-Format '{format}' (erlaubt: text, json)"));
    }

    let ergebnis = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
