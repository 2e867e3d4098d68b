//! Codec-Einstellungen eines Teilnehmers
//!
//! Werden im Handshake uebertragen und in der Teilnehmerliste verteilt,
//! damit jeder Empfaenger den passenden Decoder anlegen kann.

use serde::{Deserialize, Serialize};

/// Verwendeter Audio-Codec
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AudioCodec {
    /// Unkomprimierte f32-Samples (Tests, Loopback)
    Identity = 0,
    /// Opus – Standard-Codec fuer Sprache
    #[default]
    Opus = 1,
}

impl AudioCodec {
    /// Konvertiert ein Byte in einen `AudioCodec`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Identity),
            1 => Some(Self::Opus),
            _ => None,
        }
    }
}

/// Codec-Einstellungen eines Senders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecEinstellungen {
    /// Codec
    pub codec: AudioCodec,
    /// Samples pro Frame (pro Kanal)
    pub frame_groesse: u32,
    /// Abtastrate in Hz
    pub abtastrate: u32,
}

impl CodecEinstellungen {
    /// Dauer eines Frames in Millisekunden
    pub fn frame_dauer_ms(&self) -> f32 {
        if self.abtastrate == 0 {
            return 0.0;
        }
        self.frame_groesse as f32 * 1000.0 / self.abtastrate as f32
    }
}

impl Default for CodecEinstellungen {
    fn default() -> Self {
        // 20 ms bei 48 kHz
        Self {
            codec: AudioCodec::Opus,
            frame_groesse: 960,
            abtastrate: 48_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ist_20ms_opus() {
        let c = CodecEinstellungen::default();
        assert_eq!(c.codec, AudioCodec::Opus);
        assert!((c.frame_dauer_ms() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn codec_aus_byte() {
        assert_eq!(AudioCodec::from_u8(0), Some(AudioCodec::Identity));
        assert_eq!(AudioCodec::from_u8(1), Some(AudioCodec::Opus));
        assert_eq!(AudioCodec::from_u8(9), None);
    }
}
