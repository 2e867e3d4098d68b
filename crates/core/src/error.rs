//! Fehlertypen fuer Sprechfunk
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Protokoll-Defekte (Aufruferfehler) werden beim Erzeugen sofort mit ihrer
//! Diagnose-ID geloggt.

use thiserror::Error;

/// Globaler Result-Alias fuer Sprechfunk
pub type Result<T> = std::result::Result<T, SprechfunkError>;

/// Alle moeglichen Fehler im Sprechfunk-System
#[derive(Debug, Error)]
pub enum SprechfunkError {
    // --- Interne Invarianten ---
    #[error("Protokoll-Defekt [{diagnose}]: {nachricht}")]
    Defekt {
        diagnose: &'static str,
        nachricht: String,
    },

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnbekannterNachrichtentyp(u8),

    #[error("Falsche Sitzung: erwartet={erwartet}, erhalten={erhalten}")]
    FalscheSitzung { erwartet: u32, erhalten: u32 },

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SprechfunkError {
    /// Erzeugt einen Protokoll-Defekt und loggt ihn mit seiner Diagnose-ID
    pub fn defekt(diagnose: &'static str, nachricht: impl Into<String>) -> Self {
        let nachricht = nachricht.into();
        tracing::error!(diagnose, "Moeglicher Fehler im Aufrufer: {}", nachricht);
        Self::Defekt {
            diagnose,
            nachricht,
        }
    }

    /// Erstellt einen Fehler fuer fehlerhafte Eingabedaten
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeNachricht(msg.into())
    }

    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler einen Aufruferfehler anzeigt
    pub fn ist_defekt(&self) -> bool {
        matches!(self, Self::Defekt { .. })
    }

    /// Gibt die Diagnose-ID eines Defekts zurueck
    pub fn diagnose(&self) -> Option<&'static str> {
        match self {
            Self::Defekt { diagnose, .. } => Some(diagnose),
            _ => None,
        }
    }
}
