//! sprechfunk-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert das binaere Wire-Format aller Nachrichten, die
//! zwischen Clients und dem Sitzungs-Server ausgetauscht werden, sowie die
//! Hilfsmittel zum Zusammenbauen von Paketen.
//!
//! ## Module
//! - [`nachricht`] – Nachrichtentypen, `PacketWriter` und `PacketReader`
//! - [`kanal_bitfeld`] – 16-Bit-Kanal-Deskriptor im Voice-Header
//! - [`voice`] – Empfangener Audio-Frame fuer den Reorder-Buffer
//! - [`sequenz`] – Erweiterung der 16-Bit-Sequenznummern
//! - [`pool`] – Wiederverwendbare Sende-Puffer

pub mod kanal_bitfeld;
pub mod nachricht;
pub mod pool;
pub mod sequenz;
pub mod voice;

pub use kanal_bitfeld::KanalBitfeld;
pub use nachricht::{
    ClientState, DeltaChannelState, HandshakeRequest, HandshakeResponse, KanalDeskriptor,
    MessageType, Nachricht, PacketReader, PacketWriter, RaumBelegung, RemoveClient,
    RosterEintrag, VoiceData,
};
pub use pool::PufferPool;
pub use sequenz::SequenzErweiterung;
pub use voice::VoicePacket;
