//! Kanal-Bitfeld im Voice-Header
//!
//! Jeder Kanal-Deskriptor eines Voice-Pakets packt seine sechs Felder in
//! ein einzelnes `u16` (big-endian auf dem Draht):
//!
//! ```text
//! Bit   15    14          13         12-11       10-5        4-0
//!       Typ   Positional  Schliesst  Prioritaet  Amplitude   Sitzung
//! ```
//!
//! - Typ: 0 = Spieler, 1 = Raum
//! - Amplitude: 0..=63 entspricht 0.0..=2.0
//! - Sitzung: Kanal-Sitzungs-ID modulo 32 (Empfaenger erkennt nur Wechsel)

use sprechfunk_core::kanal::{KanalPrioritaet, KanalTyp};

const TYP_BIT: u16 = 1 << 15;
const POSITIONAL_BIT: u16 = 1 << 14;
const SCHLIESST_BIT: u16 = 1 << 13;
const PRIORITAET_SHIFT: u16 = 11;
const PRIORITAET_MASKE: u16 = 0b11;
const AMPLITUDE_SHIFT: u16 = 5;
const AMPLITUDE_MASKE: u16 = 0b11_1111;
const SITZUNG_MASKE: u16 = 0b1_1111;

/// Maximale Amplitude, die das Bitfeld darstellen kann
pub const MAX_AMPLITUDE: f32 = 2.0;

/// Gepackter Kanal-Deskriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KanalBitfeld(pub u16);

impl KanalBitfeld {
    /// Packt alle Felder in ein Bitfeld
    pub fn neu(
        typ: KanalTyp,
        sitzung: u16,
        prioritaet: KanalPrioritaet,
        amplitude: f32,
        positional: bool,
        schliessend: bool,
    ) -> Self {
        let mut bits = 0u16;
        if typ == KanalTyp::Raum {
            bits |= TYP_BIT;
        }
        if positional {
            bits |= POSITIONAL_BIT;
        }
        if schliessend {
            bits |= SCHLIESST_BIT;
        }
        bits |= ((prioritaet as u16) & PRIORITAET_MASKE) << PRIORITAET_SHIFT;
        bits |= (amplitude_quantisieren(amplitude) & AMPLITUDE_MASKE) << AMPLITUDE_SHIFT;
        bits |= sitzung & SITZUNG_MASKE;
        Self(bits)
    }

    pub fn typ(&self) -> KanalTyp {
        if self.0 & TYP_BIT != 0 {
            KanalTyp::Raum
        } else {
            KanalTyp::Spieler
        }
    }

    pub fn positional(&self) -> bool {
        self.0 & POSITIONAL_BIT != 0
    }

    pub fn schliessend(&self) -> bool {
        self.0 & SCHLIESST_BIT != 0
    }

    pub fn prioritaet(&self) -> KanalPrioritaet {
        KanalPrioritaet::from_bits(((self.0 >> PRIORITAET_SHIFT) & PRIORITAET_MASKE) as u8)
    }

    pub fn amplitude(&self) -> f32 {
        let stufe = (self.0 >> AMPLITUDE_SHIFT) & AMPLITUDE_MASKE;
        stufe as f32 * MAX_AMPLITUDE / AMPLITUDE_MASKE as f32
    }

    /// Kanal-Sitzungs-ID modulo 32
    pub fn sitzung(&self) -> u16 {
        self.0 & SITZUNG_MASKE
    }
}

fn amplitude_quantisieren(amplitude: f32) -> u16 {
    let a = if amplitude.is_finite() {
        amplitude.clamp(0.0, MAX_AMPLITUDE)
    } else {
        1.0
    };
    (a / MAX_AMPLITUDE * AMPLITUDE_MASKE as f32).round() as u16
}
