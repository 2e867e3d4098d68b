//! Fehlertypen fuer die Sitzungs-Autoritaet

use sprechfunk_core::SprechfunkError;
use thiserror::Error;

/// Fehlertyp fuer Signaling und Sitzungsverwaltung
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Fehler aus Protokoll oder Kern (ungueltige Nachricht, falsche Sitzung, Defekt)
    #[error(transparent)]
    Protokoll(#[from] SprechfunkError),

    /// Alle 16-Bit-IDs sind vergeben
    #[error("Keine freie Spieler-ID mehr ({0} registriert)")]
    IdsErschoepft(usize),
}

impl SignalingError {
    /// Gibt true zurueck wenn der Fehler durch den Absender verursacht wurde
    pub fn ist_eingabefehler(&self) -> bool {
        matches!(
            self,
            Self::Protokoll(
                SprechfunkError::UngueltigeNachricht(_)
                    | SprechfunkError::UnbekannterNachrichtentyp(_)
                    | SprechfunkError::FalscheSitzung { .. }
            )
        )
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eingabefehler_erkennen() {
        let e: SignalingError = SprechfunkError::ungueltig("kurz").into();
        assert!(e.ist_eingabefehler());
        assert!(!SignalingError::IdsErschoepft(65536).ist_eingabefehler());

        let e: SignalingError = SprechfunkError::FalscheSitzung {
            erwartet: 1,
            erhalten: 2,
        }
        .into();
        assert!(e.ist_eingabefehler());
        assert!(!SignalingError::from(SprechfunkError::intern("kaputt")).ist_eingabefehler());
    }
}
