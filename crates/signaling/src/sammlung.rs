//! Client-Sammlung – Teilnehmerliste und Raum-Mitgliedschaften
//!
//! Haelt alle verbundenen Teilnehmer und ihre Raeume. Aenderungen kommen
//! ueber ClientState (vollstaendige Raumliste) und DeltaChannelState
//! (einzelner Beitritt oder Austritt). Beitritte und Abgaenge werden auf dem
//! Ereignis-Bus gemeldet, damit z.B. der `VoiceSender` wartende
//! Spieler-Kanaele oeffnen kann.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use sprechfunk_core::client::{ClientInfo, ClientVerzeichnis};
use sprechfunk_core::codec::CodecEinstellungen;
use sprechfunk_core::event::{EreignisBus, SitzungsEreignis};
use sprechfunk_core::transport::PeerHandle;
use sprechfunk_core::types::{PlayerId, RoomId};
use sprechfunk_protocol::nachricht::{ClientState, DeltaChannelState, RaumBelegung, RosterEintrag};

use crate::error::SignalingResult;
use crate::registry::PlayerIdRegistry;

/// Thread-safe Teilnehmerliste
///
/// Clone teilt den inneren Zustand.
pub struct ClientSammlung<P: PeerHandle> {
    inner: Arc<ClientSammlungInner<P>>,
}

struct ClientSammlungInner<P: PeerHandle> {
    clients: DashMap<PlayerId, ClientInfo<P>>,
    ids: Arc<PlayerIdRegistry>,
    ereignisse: EreignisBus,
}

impl<P: PeerHandle> Clone for ClientSammlung<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PeerHandle> ClientSammlung<P> {
    pub fn neu(ids: Arc<PlayerIdRegistry>, ereignisse: EreignisBus) -> Self {
        Self {
            inner: Arc::new(ClientSammlungInner {
                clients: DashMap::new(),
                ids,
                ereignisse,
            }),
        }
    }

    /// Die geteilte ID-Vergabe
    pub fn ids(&self) -> &Arc<PlayerIdRegistry> {
        &self.inner.ids
    }

    /// Gibt den Teilnehmer mit dieser ID zurueck oder legt ihn an
    ///
    /// Ein bestehender Eintrag bleibt unveraendert.
    pub fn holen_oder_anlegen(
        &self,
        name: &str,
        codec: CodecEinstellungen,
        verbindung: P,
    ) -> SignalingResult<ClientInfo<P>> {
        let id = self.inner.ids.registrieren(name)?;
        let info = match self.inner.clients.entry(id) {
            Entry::Occupied(e) => return Ok(e.get().clone()),
            Entry::Vacant(e) => e.insert(ClientInfo::neu(id, name, codec, verbindung)).clone(),
        };

        tracing::info!(player_id = %id, name, verbindung = ?info.verbindung, "Teilnehmer hinzugefuegt");
        self.inner.ereignisse.senden(SitzungsEreignis::SpielerBeigetreten {
            name: name.to_string(),
            codec,
        });
        Ok(info)
    }

    /// Entfernt einen Teilnehmer; der zurueckgegebene Eintrag ist getrennt
    pub fn entfernen(&self, id: PlayerId) -> Option<ClientInfo<P>> {
        let (_, mut info) = self.inner.clients.remove(&id)?;
        info.verbunden = false;
        tracing::info!(player_id = %id, name = %info.name, "Teilnehmer entfernt");
        self.inner.ereignisse.senden(SitzungsEreignis::SpielerVerlassen {
            name: info.name.clone(),
        });
        Some(info)
    }

    pub fn nach_verbindung(&self, verbindung: &P) -> Option<ClientInfo<P>> {
        self.inner
            .clients
            .iter()
            .find(|e| &e.value().verbindung == verbindung)
            .map(|e| e.value().clone())
    }

    /// Alle Teilnehmer, sortiert nach ID
    pub fn alle(&self) -> Vec<ClientInfo<P>> {
        let mut alle: Vec<_> = self.inner.clients.iter().map(|e| e.value().clone()).collect();
        alle.sort_by_key(|c| c.player_id);
        alle
    }

    /// Verbindungen aller verbundenen Teilnehmer
    pub fn verbindungen(&self) -> Vec<P> {
        self.alle()
            .into_iter()
            .filter(|c| c.verbunden)
            .map(|c| c.verbindung)
            .collect()
    }

    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Teilnehmerliste fuer die Handshake-Antwort
    pub fn roster(&self) -> Vec<RosterEintrag> {
        self.alle()
            .into_iter()
            .map(|c| RosterEintrag {
                player_id: c.player_id,
                name: c.name,
                codec: c.codec,
            })
            .collect()
    }

    /// Raum -> Mitglieder, nach Raumname sortiert
    pub fn raum_belegung(&self) -> Vec<RaumBelegung> {
        let mut raeume: BTreeMap<String, Vec<PlayerId>> = BTreeMap::new();
        for c in self.alle() {
            for raum in c.raeume {
                raeume.entry(raum).or_default().push(c.player_id);
            }
        }
        raeume
            .into_iter()
            .map(|(raum, mitglieder)| RaumBelegung { raum, mitglieder })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Raum-Buchhaltung
    // -----------------------------------------------------------------------

    /// Ersetzt die Raumliste eines Teilnehmers
    ///
    /// Gibt `false` zurueck wenn der Teilnehmer unbekannt ist.
    pub fn client_state_anwenden(&self, state: &ClientState) -> bool {
        let Some(mut info) = self.inner.clients.get_mut(&state.player_id) else {
            tracing::debug!(player_id = %state.player_id, "ClientState fuer unbekannten Teilnehmer ignoriert");
            return false;
        };
        let mut raeume = state.raeume.clone();
        raeume.sort();
        raeume.dedup();
        info.raeume = raeume;
        tracing::debug!(player_id = %state.player_id, raeume = info.raeume.len(), "Raumliste aktualisiert");
        true
    }

    /// Fuegt einen Raum hinzu oder entfernt ihn
    pub fn delta_anwenden(&self, delta: &DeltaChannelState) -> bool {
        let Some(mut info) = self.inner.clients.get_mut(&delta.player_id) else {
            tracing::debug!(player_id = %delta.player_id, "DeltaChannelState fuer unbekannten Teilnehmer ignoriert");
            return false;
        };

        if delta.beigetreten {
            if !info.raeume.contains(&delta.raum) {
                info.raeume.push(delta.raum.clone());
            }
        } else {
            info.raeume.retain(|r| r != &delta.raum);
        }
        tracing::debug!(
            player_id = %delta.player_id,
            raum = %delta.raum,
            beigetreten = delta.beigetreten,
            "Raum-Mitgliedschaft geaendert"
        );
        true
    }
}

impl<P: PeerHandle> ClientVerzeichnis<P> for ClientSammlung<P> {
    fn client_nach_name(&self, name: &str) -> Option<ClientInfo<P>> {
        let id = self.inner.ids.id_von(name)?;
        self.inner.clients.get(&id).map(|e| e.value().clone())
    }

    fn client_nach_id(&self, id: PlayerId) -> Option<ClientInfo<P>> {
        self.inner.clients.get(&id).map(|e| e.value().clone())
    }

    fn clients_in_raum(&self, raum: RoomId) -> Vec<ClientInfo<P>> {
        let mut treffer: Vec<_> = self
            .inner
            .clients
            .iter()
            .filter(|e| e.value().ist_in_raum(raum))
            .map(|e| e.value().clone())
            .collect();
        treffer.sort_by_key(|c| c.player_id);
        treffer
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
