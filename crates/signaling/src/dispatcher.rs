//! Nachrichten-Verteiler – routet rohe Pakete an die Sitzungs-Autoritaet
//!
//! Jedes eingehende Paket wird zuerst am Kopf geprueft (Magic, Typ,
//! Sitzungs-ID). Handshakes werden unabhaengig von der Sitzungs-ID
//! angenommen, weil der Client sie vor der Antwort noch nicht kennt. Alle
//! anderen Pakete muessen zur laufenden Sitzung gehoeren.
//!
//! | Typ                | Aktion                                   |
//! |--------------------|------------------------------------------|
//! | HandshakeRequest   | Registrierung + direkte Antwort          |
//! | ClientState        | Weiterleitung an alle + Raum-Buchhaltung |
//! | DeltaChannelState  | Weiterleitung an alle + Raum-Buchhaltung |
//! | sonstige           | geloggt und ignoriert                    |

use bytes::Bytes;
use std::sync::Arc;

use sprechfunk_core::transport::PeerHandle;
use sprechfunk_core::types::PlayerId;
use sprechfunk_core::SprechfunkError;
use sprechfunk_protocol::nachricht::{MessageType, PacketReader};

use crate::autoritaet::SitzungsAutoritaet;
use crate::error::SignalingResult;

/// Ergebnis der Verarbeitung eines Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verarbeitet {
    /// Handshake verarbeitet; `None` wenn die Anfrage keinen Namen hatte
    Handshake(Option<PlayerId>),
    /// Paket an so viele Teilnehmer weitergeleitet
    Weitergeleitet(usize),
    /// Paket ist fuer den Server ohne Bedeutung
    Ignoriert(MessageType),
}

/// Serverseitiger Einstieg fuer rohe Pakete
pub struct NachrichtenVerteiler<P: PeerHandle> {
    autoritaet: Arc<SitzungsAutoritaet<P>>,
}

impl<P: PeerHandle> NachrichtenVerteiler<P> {
    pub fn neu(autoritaet: Arc<SitzungsAutoritaet<P>>) -> Self {
        Self { autoritaet }
    }

    pub fn autoritaet(&self) -> &Arc<SitzungsAutoritaet<P>> {
        &self.autoritaet
    }

    /// Verarbeitet ein empfangenes Paket von `quelle`
    pub fn verarbeiten(&self, quelle: &P, daten: Bytes) -> SignalingResult<Verarbeitet> {
        let mut reader = PacketReader::neu(daten);
        let kopf = reader.kopf_lesen()?;

        if kopf.typ == MessageType::HandshakeRequest {
            let anfrage = reader.handshake_request_lesen()?;
            let id = self.autoritaet.handshake_verarbeiten(quelle, anfrage)?;
            return Ok(Verarbeitet::Handshake(id));
        }

        let erwartet = self.autoritaet.sitzungs_id();
        if kopf.sitzungs_id != erwartet {
            tracing::debug!(
                quelle = ?quelle,
                typ = ?kopf.typ,
                erwartet,
                erhalten = kopf.sitzungs_id,
                "Paket fuer fremde Sitzung verworfen"
            );
            return Err(SprechfunkError::FalscheSitzung {
                erwartet,
                erhalten: kopf.sitzungs_id,
            }
            .into());
        }

        match kopf.typ {
            MessageType::ClientState => {
                let state = reader.client_state_lesen(kopf)?;
                let n = self.autoritaet.client_state_verarbeiten(reader.alle(), &state);
                Ok(Verarbeitet::Weitergeleitet(n))
            }
            MessageType::DeltaChannelState => {
                let delta = reader.delta_channel_state_lesen(kopf)?;
                let n = self.autoritaet.delta_verarbeiten(reader.alle(), &delta);
                Ok(Verarbeitet::Weitergeleitet(n))
            }
            andere => {
                tracing::debug!(quelle = ?quelle, typ = ?andere, "Nachricht vom Server nicht verarbeitet");
                Ok(Verarbeitet::Ignoriert(andere))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
