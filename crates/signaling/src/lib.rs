//! sprechfunk-signaling – Teilnehmerverwaltung und Sitzungs-Autoritaet
//!
//! Dieser Crate verwaltet die Teilnehmer einer Sprechfunk-Sitzung. Die
//! `ClientSammlung` fuehrt auf jedem Teilnehmer die Raum-Buchhaltung, die
//! `SitzungsAutoritaet` laeuft nur auf dem Server und vergibt IDs.
//!
//! ## Architektur
//!
//! ```text
//! Transport (rohe Pakete)
//!     |
//!     v
//! NachrichtenVerteiler  – Kopf pruefen, Sitzungs-ID pruefen
//!     |
//!     v
//! SitzungsAutoritaet    – Handshake, Weiterleitung, RemoveClient
//!     |
//!     +-- ClientSammlung    (Teilnehmer + Raeume, meldet auf dem EreignisBus)
//!     +-- PlayerIdRegistry  (Name -> ID, nur anhaengend)
//! ```

pub mod autoritaet;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod sammlung;

// Bequeme Re-Exporte
pub use autoritaet::SitzungsAutoritaet;
pub use dispatcher::{NachrichtenVerteiler, Verarbeitet};
pub use error::{SignalingError, SignalingResult};
pub use registry::PlayerIdRegistry;
pub use sammlung::ClientSammlung;
