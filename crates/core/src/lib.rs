//! sprechfunk-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Sprechfunk-Crates gemeinsam genutzt werden: IDs, Kanal-Wertetypen,
//! Client-Informationen, die Kollaborateur-Traits (Transport, Sitzung,
//! Client-Verzeichnis) sowie den Ereignis-Bus.

pub mod client;
pub mod codec;
pub mod diagnose;
pub mod error;
pub mod event;
pub mod kanal;
pub mod transport;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use client::{ClientInfo, ClientVerzeichnis};
pub use codec::{AudioCodec, CodecEinstellungen};
pub use error::{Result, SprechfunkError};
pub use event::{EreignisAbo, EreignisBus, SitzungsEreignis};
pub use kanal::{KanalEigenschaften, KanalPrioritaet, KanalTyp};
pub use transport::{LokaleSitzung, PeerHandle, Transport};
pub use types::{PlayerId, RoomId};
