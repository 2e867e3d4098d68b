//! Zuordnung Spielername -> Spieler-ID
//!
//! Nur anhaengend: eine einmal vergebene ID bleibt fuer die Lebensdauer der
//! Sitzung an ihren Namen gebunden und wird nie neu vergeben. Ein Spieler,
//! der sich neu verbindet, erhaelt dieselbe ID wie zuvor.

use parking_lot::RwLock;
use std::collections::HashMap;

use sprechfunk_core::types::PlayerId;

use crate::error::{SignalingError, SignalingResult};

#[derive(Debug, Default)]
struct Eintraege {
    namen: Vec<String>,
    ids: HashMap<String, PlayerId>,
}

/// Vergibt Spieler-IDs; wird per `Arc` geteilt
#[derive(Debug, Default)]
pub struct PlayerIdRegistry {
    eintraege: RwLock<Eintraege>,
}

impl PlayerIdRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Bereits vergebene ID fuer `name`
    pub fn id_von(&self, name: &str) -> Option<PlayerId> {
        self.eintraege.read().ids.get(name).copied()
    }

    pub fn name_von(&self, id: PlayerId) -> Option<String> {
        self.eintraege.read().namen.get(id.0 as usize).cloned()
    }

    /// Gibt die ID fuer `name` zurueck und vergibt bei Bedarf die naechste
    pub fn registrieren(&self, name: &str) -> SignalingResult<PlayerId> {
        let mut e = self.eintraege.write();
        if let Some(id) = e.ids.get(name) {
            return Ok(*id);
        }

        let naechste = e.namen.len();
        let id = u16::try_from(naechste)
            .map(PlayerId)
            .map_err(|_| SignalingError::IdsErschoepft(naechste))?;
        e.namen.push(name.to_string());
        e.ids.insert(name.to_string(), id);
        tracing::debug!(name, player_id = %id, "Spieler-ID vergeben");
        Ok(id)
    }

    /// Anzahl je vergebener IDs
    pub fn len(&self) -> usize {
        self.eintraege.read().namen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
