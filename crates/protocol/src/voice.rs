//! Empfangener Audio-Frame
//!
//! Ein `VoicePacket` ist die Einheit, die der Reorder-Buffer verwaltet. Die
//! Sequenznummer ist bereits auf 32 Bit erweitert (siehe [`crate::sequenz`]),
//! die Nutzdaten sind eine Sicht auf den Empfangspuffer.

use bytes::Bytes;
use sprechfunk_core::types::PlayerId;

/// Ein kodierter Audio-Frame eines entfernten Senders
///
/// Nach dem Erstellen unveraenderlich.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePacket {
    sequenz: u32,
    absender: PlayerId,
    nutzdaten: Bytes,
}

impl VoicePacket {
    pub fn neu(sequenz: u32, absender: PlayerId, nutzdaten: Bytes) -> Self {
        Self {
            sequenz,
            absender,
            nutzdaten,
        }
    }

    /// Erweiterte Sequenznummer
    pub fn sequenz(&self) -> u32 {
        self.sequenz
    }

    pub fn absender(&self) -> PlayerId {
        self.absender
    }

    /// Kodierte Audiodaten
    pub fn nutzdaten(&self) -> &Bytes {
        &self.nutzdaten
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nutzdaten_teilen_den_puffer() {
        let puffer = Bytes::from_static(b"\x01\x02\x03\x04");
        let paket = VoicePacket::neu(7, PlayerId(3), puffer.slice(1..3));
        assert_eq!(paket.sequenz(), 7);
        assert_eq!(paket.absender(), PlayerId(3));
        assert_eq!(&paket.nutzdaten()[..], &[2, 3]);
    }
}
