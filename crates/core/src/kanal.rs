//! Kanal-Wertetypen
//!
//! Ein Kanal beschreibt, wer den lokalen Sprachstrom hoeren soll: ein
//! einzelner Spieler oder alle Mitglieder eines Raums. Die Eigenschaften
//! werden per `Arc` geteilt; ihre Identitaet (Zeiger, nicht Inhalt) ist Teil
//! des Kanal-Schluessels.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Art des Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KanalTyp {
    /// Direkt an einen Spieler
    Spieler = 0,
    /// An alle Mitglieder eines Raums
    Raum = 1,
}

/// Sende-Prioritaet eines Kanals
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum KanalPrioritaet {
    Keine = 0,
    Niedrig = 1,
    #[default]
    Standard = 2,
    Hoch = 3,
}

impl KanalPrioritaet {
    /// Konvertiert zwei Bits in eine Prioritaet
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Keine,
            1 => Self::Niedrig,
            2 => Self::Standard,
            _ => Self::Hoch,
        }
    }
}

/// Eigenschaften eines Kanals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanalEigenschaften {
    /// Wiedergabe positionsabhaengig (3D)
    pub positional: bool,
    /// Sende-Prioritaet
    pub prioritaet: KanalPrioritaet,
    /// Lautstaerke-Multiplikator (0.0 bis 2.0)
    pub amplitude: f32,
}

impl KanalEigenschaften {
    /// Erstellt geteilte Eigenschaften
    pub fn geteilt(positional: bool, prioritaet: KanalPrioritaet, amplitude: f32) -> Arc<Self> {
        Arc::new(Self {
            positional,
            prioritaet,
            amplitude,
        })
    }

    /// Prueft ob zwei Referenzen dieselben Eigenschaften (dasselbe Objekt) meinen
    pub fn gleiche_referenz(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl Default for KanalEigenschaften {
    fn default() -> Self {
        Self {
            positional: false,
            prioritaet: KanalPrioritaet::Standard,
            amplitude: 1.0,
        }
    }
}
