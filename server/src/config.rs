//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.
//!
//! Der Server vermittelt nur die Signalisierung; die Sprachpfad-Konfiguration
//! (`ReorderBufferConfig`, `JitterConfig`, ...) gehoert den Teilnehmern.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::logging::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Sitzungs-Einstellungen
    pub sitzung: SitzungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Sitzungs-ID; 0 = beim Start aus der Uhrzeit ableiten
    pub id: u32,
    /// Kapazitaet der Eingangs-Queue (Pakete)
    pub eingang_kapazitaet: usize,
    /// Kapazitaet der Sende-Queue pro Verbindung (Pakete)
    pub sende_kapazitaet: usize,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        Self {
            id: 0,
            eingang_kapazitaet: 1024,
            sende_kapazitaet: 64,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?;
                config.validieren()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        if self.sitzung.eingang_kapazitaet == 0 || self.sitzung.sende_kapazitaet == 0 {
            bail!("sitzung: Queue-Kapazitaeten muessen groesser als 0 sein");
        }
        Ok(())
    }

    /// Konfigurierte Sitzungs-ID oder eine aus der Uhrzeit abgeleitete
    pub fn sitzungs_id(&self) -> u32 {
        if self.sitzung.id != 0 {
            return self.sitzung.id;
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        // Oberes und unteres Wort mischen; 0 ist reserviert
        let id = (nanos as u32) ^ ((nanos >> 32) as u32);
        id.max(1)
    }
}
