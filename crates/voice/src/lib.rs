//! sprechfunk-voice – Sprachpfad zwischen Encoder und Wiedergabe
//!
//! Empfangsseite: Frames einer entfernten Quelle landen im Reorder-Buffer,
//! die Wiedergabe-Sitzung zieht sie nach einer jitter-abhaengigen
//! Verzoegerung ueber die Dekodier-Pipeline heraus.
//!
//! Sendeseite: der `VoiceSender` verfolgt die offenen Kanaele und verteilt
//! jeden kodierten Frame an alle Zuhoerer.
//!
//! ## Module
//! - [`reorder_buffer`] – Min-Heap nach Sequenznummer, Verlustschaetzung
//! - [`verlust`] – Gleitendes Verlustfenster
//! - [`jitter`] – Jitter-Schaetzung und Konfidenz
//! - [`sitzung`] – Wiedergabe-Sitzung mit Aktivierungszeit
//! - [`decoder`] – Dekodier-Pipeline und Identity-Codec
//! - [`empfang`] – Zuordnung eingehender Frames zu ihren Quellen
//! - [`kanal`] – Kanal-Lebenszyklus und Kanalmenge
//! - [`sender`] – Ausgehende Sprachdaten

pub mod decoder;
pub mod empfang;
pub mod jitter;
pub mod kanal;
pub mod reorder_buffer;
pub mod sender;
pub mod sitzung;
pub mod verlust;

pub use decoder::{
    BufferedDecoderPipeline, DecoderPipeline, IdentityDecoder, IdentityEncoder, VoiceDecoder,
    VoiceEncoder,
};
pub use empfang::{EmpfangsErgebnis, Empfangsstelle};
pub use jitter::{JitterConfig, JitterQuelle, JitterSchaetzer};
pub use kanal::{KanalMenge, OffenerKanal};
pub use reorder_buffer::{ReorderBuffer, ReorderBufferConfig};
pub use sender::{SendeErgebnis, SenderConfig, VoiceSender};
pub use sitzung::{SitzungsKontext, SpeechSession, WiedergabeConfig};
