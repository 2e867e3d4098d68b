//! Client-Informationen und lesender Zugriff auf die Teilnehmerliste

use crate::codec::CodecEinstellungen;
use crate::transport::PeerHandle;
use crate::types::{PlayerId, RoomId};

/// Ein Teilnehmer der Sitzung
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo<P> {
    /// Vergebene Teilnehmer-ID
    pub player_id: PlayerId,
    /// Spielername (eindeutig innerhalb der Sitzung)
    pub name: String,
    /// Aktuelle Verbindung
    pub verbindung: P,
    /// Codec-Einstellungen des Teilnehmers
    pub codec: CodecEinstellungen,
    /// Namen der Raeume, in denen der Teilnehmer zuhoert
    pub raeume: Vec<String>,
    /// Noch verbunden?
    pub verbunden: bool,
}

impl<P> ClientInfo<P> {
    /// Erstellt einen verbundenen Teilnehmer ohne Raum-Mitgliedschaften
    pub fn neu(
        player_id: PlayerId,
        name: impl Into<String>,
        codec: CodecEinstellungen,
        verbindung: P,
    ) -> Self {
        Self {
            player_id,
            name: name.into(),
            verbindung,
            codec,
            raeume: Vec::new(),
            verbunden: true,
        }
    }

    /// Prueft ob der Teilnehmer im Raum ist
    pub fn ist_in_raum(&self, raum: RoomId) -> bool {
        self.raeume.iter().any(|r| RoomId::aus_name(r) == raum)
    }
}

/// Lesender Zugriff auf die bekannten Teilnehmer
pub trait ClientVerzeichnis<P: PeerHandle>: Send + Sync {
    /// Sucht einen Teilnehmer per Name
    fn client_nach_name(&self, name: &str) -> Option<ClientInfo<P>>;

    /// Sucht einen Teilnehmer per ID
    fn client_nach_id(&self, id: PlayerId) -> Option<ClientInfo<P>>;

    /// Gibt alle Teilnehmer zurueck, die im Raum zuhoeren
    fn clients_in_raum(&self, raum: RoomId) -> Vec<ClientInfo<P>>;
}
