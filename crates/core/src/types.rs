//! Gemeinsame Identifikationstypen fuer Sprechfunk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Beide IDs sind
//! 16 Bit breit, weil sie unveraendert im Voice-Header landen.

use serde::{Deserialize, Serialize};

/// Vom Sitzungs-Server vergebene Teilnehmer-ID
///
/// Unabhaengig vom Verbindungs-Handle des Transports; bleibt fuer die
/// Lebensdauer der Sitzung an den Spielernamen gebunden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl PlayerId {
    /// Gibt den rohen Wert zurueck
    pub fn inner(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player:{}", self.0)
    }
}

/// Raum-ID, abgeleitet aus dem Raumnamen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u16);

impl RoomId {
    /// Leitet die Raum-ID stabil aus dem Raumnamen ab
    ///
    /// FNV-1a (32 Bit), anschliessend auf 16 Bit gefaltet. Sender und
    /// Empfaenger muessen fuer denselben Namen dieselbe ID berechnen.
    pub fn aus_name(name: &str) -> Self {
        const FNV_OFFSET: u32 = 0x811C_9DC5;
        const FNV_PRIME: u32 = 0x0100_0193;

        let hash = name.bytes().fold(FNV_OFFSET, |h, b| {
            (h ^ b as u32).wrapping_mul(FNV_PRIME)
        });
        Self(((hash >> 16) ^ (hash & 0xFFFF)) as u16)
    }

    /// Gibt den rohen Wert zurueck
    pub fn inner(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room:{}", self.0)
    }
}
