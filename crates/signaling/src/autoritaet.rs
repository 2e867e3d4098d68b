//! Sitzungs-Autoritaet – vergibt IDs und verteilt Zustandsaenderungen
//!
//! Die Autoritaet ist der einzige Teilnehmer, der Spieler-IDs vergibt. Sie
//! beantwortet Handshakes direkt, leitet ClientState- und
//! DeltaChannelState-Pakete unveraendert an alle Teilnehmer weiter und
//! meldet entfernte Teilnehmer per RemoveClient.
//!
//! Alle Weiterleitungen sind pro Ziel fehlertolerant: ein nicht
//! erreichbarer Teilnehmer verhindert nicht die Zustellung an die uebrigen.

use std::sync::Arc;

use sprechfunk_core::client::{ClientInfo, ClientVerzeichnis};
use sprechfunk_core::transport::{PeerHandle, Transport};
use sprechfunk_core::types::PlayerId;
use sprechfunk_protocol::nachricht::{ClientState, DeltaChannelState, HandshakeRequest, PacketWriter};
use sprechfunk_protocol::pool::PufferPool;

use crate::error::SignalingResult;
use crate::sammlung::ClientSammlung;

/// Serverseitige Sitzungsverwaltung
pub struct SitzungsAutoritaet<P: PeerHandle> {
    sitzungs_id: u32,
    transport: Arc<dyn Transport<P>>,
    clients: ClientSammlung<P>,
    pool: Arc<PufferPool>,
}

impl<P: PeerHandle> SitzungsAutoritaet<P> {
    pub fn neu(
        sitzungs_id: u32,
        transport: Arc<dyn Transport<P>>,
        clients: ClientSammlung<P>,
        pool: Arc<PufferPool>,
    ) -> Self {
        tracing::info!(sitzungs_id, "Sitzungs-Autoritaet gestartet");
        Self {
            sitzungs_id,
            transport,
            clients,
            pool,
        }
    }

    pub fn sitzungs_id(&self) -> u32 {
        self.sitzungs_id
    }

    pub fn clients(&self) -> &ClientSammlung<P> {
        &self.clients
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Verarbeitet einen Handshake und antwortet nur dem Anfragenden
    ///
    /// Ohne Namen wird die Anfrage ignoriert (`Ok(None)`). Ist der Name oder
    /// die Verbindung bereits anders registriert, werden beide alten
    /// Registrierungen entfernt, bevor die neue angelegt wird.
    pub fn handshake_verarbeiten(
        &self,
        quelle: &P,
        anfrage: HandshakeRequest,
    ) -> SignalingResult<Option<PlayerId>> {
        let Some(name) = anfrage.name else {
            tracing::warn!(quelle = ?quelle, "Handshake ohne Spielernamen ignoriert");
            return Ok(None);
        };

        let nach_name = self.clients.client_nach_name(&name);
        let nach_verbindung = self.clients.nach_verbindung(quelle);

        let gleich = match (&nach_name, &nach_verbindung) {
            (Some(a), Some(b)) => a.player_id == b.player_id,
            (None, None) => true,
            _ => false,
        };
        if !gleich {
            tracing::debug!(
                name = %name,
                quelle = ?quelle,
                alt_verbindung = ?nach_verbindung.as_ref().map(|c| c.player_id),
                alt_name = ?nach_name.as_ref().map(|c| c.player_id),
                "Handshake kollidiert mit bestehender Registrierung"
            );
            for alt in [nach_verbindung, nach_name].into_iter().flatten() {
                if alt.verbunden {
                    self.client_entfernen(alt.player_id);
                }
            }
        }

        let info = self
            .clients
            .holen_oder_anlegen(&name, anfrage.codec, quelle.clone())?;

        let mut writer = PacketWriter::neu(self.pool.holen());
        writer.handshake_response_schreiben(
            self.sitzungs_id,
            info.player_id,
            &self.clients.roster(),
            &self.clients.raum_belegung(),
        );
        let paket = writer.fertig();
        if !self.transport.zuverlaessig_senden(quelle, &paket) {
            tracing::debug!(quelle = ?quelle, "Handshake-Antwort konnte nicht gesendet werden");
        }
        self.pool.zurueckgeben(paket);

        tracing::info!(name = %name, player_id = %info.player_id, "Handshake abgeschlossen");
        Ok(Some(info.player_id))
    }

    // -----------------------------------------------------------------------
    // Zustands-Weiterleitung
    // -----------------------------------------------------------------------

    /// Leitet ein ClientState-Paket weiter und wendet es danach lokal an
    pub fn client_state_verarbeiten(&self, roh: &[u8], state: &ClientState) -> usize {
        let erreicht = self.an_alle(roh);
        self.clients.client_state_anwenden(state);
        erreicht
    }

    /// Leitet ein DeltaChannelState-Paket weiter und wendet es danach lokal an
    pub fn delta_verarbeiten(&self, roh: &[u8], delta: &DeltaChannelState) -> usize {
        let erreicht = self.an_alle(roh);
        self.clients.delta_anwenden(delta);
        erreicht
    }

    // -----------------------------------------------------------------------
    // Entfernen
    // -----------------------------------------------------------------------

    /// Meldet allen Teilnehmern das Entfernen und raeumt danach auf
    ///
    /// Der Entfernte selbst bekommt die Meldung ebenfalls, solange seine
    /// Verbindung noch besteht.
    pub fn client_entfernen(&self, id: PlayerId) -> Option<ClientInfo<P>> {
        self.clients.client_nach_id(id)?;

        let mut writer = PacketWriter::neu(self.pool.holen());
        writer.remove_client_schreiben(self.sitzungs_id, id);
        let paket = writer.fertig();
        self.an_alle(&paket);
        self.pool.zurueckgeben(paket);

        self.clients.entfernen(id)
    }

    /// Entfernt den Teilnehmer, der ueber diese Verbindung registriert ist
    pub fn verbindung_entfernen(&self, verbindung: &P) -> Option<ClientInfo<P>> {
        let info = self.clients.nach_verbindung(verbindung)?;
        self.client_entfernen(info.player_id)
    }

    /// Sendet zuverlaessig an alle verbundenen Teilnehmer
    fn an_alle(&self, daten: &[u8]) -> usize {
        let ziele = self.clients.verbindungen();
        let erreicht = self.transport.an_alle_zuverlaessig(&ziele, daten);
        if erreicht < ziele.len() {
            tracing::debug!(ziele = ziele.len(), erreicht, "Nicht alle Teilnehmer erreicht");
        }
        erreicht
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
