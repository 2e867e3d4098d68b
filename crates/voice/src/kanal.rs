//! Offene Kanaele des lokalen Sprechers
//!
//! Ein Kanal ist Open oder Closing. Closing ist ein Uebergangszustand: der
//! Kanal wird noch genau einmal im naechsten Voice-Paket mitgeschickt, damit
//! die Empfaenger vom Schliessen erfahren, und danach entfernt.
//!
//! ```text
//! Open --schliessen--> Closing --gesendet--> (entfernt)
//!                         |
//!                         +--oeffnen--> Open (sitzung + 1)
//! ```
//!
//! Der Schluessel eines Kanals ist (Typ, Empfaenger, Eigenschaften-Referenz).
//! Zwei Kanaele mit inhaltsgleichen, aber verschiedenen Eigenschaften-Objekten
//! sind verschiedene Kanaele.

use std::sync::Arc;

use sprechfunk_core::diagnose;
use sprechfunk_core::kanal::{KanalEigenschaften, KanalTyp};
use sprechfunk_core::{Result, SprechfunkError};
use sprechfunk_protocol::kanal_bitfeld::KanalBitfeld;
use sprechfunk_protocol::nachricht::KanalDeskriptor;

// ---------------------------------------------------------------------------
// OffenerKanal
// ---------------------------------------------------------------------------

/// Unveraenderlicher Kanal-Eintrag; Uebergaenge liefern neue Werte
#[derive(Debug, Clone)]
pub struct OffenerKanal {
    typ: KanalTyp,
    sitzung: u16,
    eigenschaften: Arc<KanalEigenschaften>,
    schliessend: bool,
    empfaenger: u16,
    name: String,
}

impl OffenerKanal {
    /// Neuer offener Kanal mit Sitzung 0
    pub fn neu(
        typ: KanalTyp,
        eigenschaften: Arc<KanalEigenschaften>,
        empfaenger: u16,
        name: impl Into<String>,
    ) -> Self {
        Self {
            typ,
            sitzung: 0,
            eigenschaften,
            schliessend: false,
            empfaenger,
            name: name.into(),
        }
    }

    /// Open -> Closing
    pub fn als_schliessend(&self) -> Result<Self> {
        if self.schliessend {
            return Err(SprechfunkError::defekt(
                diagnose::KANAL_BEREITS_SCHLIESSEND,
                format!("Kanal '{}' wird bereits geschlossen", self.name),
            ));
        }
        Ok(Self {
            schliessend: true,
            ..self.clone()
        })
    }

    /// Closing -> Open, die Sitzung rueckt um 1 vor
    pub fn als_offen(&self) -> Result<Self> {
        if !self.schliessend {
            return Err(SprechfunkError::defekt(
                diagnose::KANAL_BEREITS_OFFEN,
                format!("Kanal '{}' ist bereits offen", self.name),
            ));
        }
        Ok(Self {
            schliessend: false,
            sitzung: self.sitzung.wrapping_add(1),
            ..self.clone()
        })
    }

    /// Prueft den Kanal-Schluessel
    pub fn passt(&self, typ: KanalTyp, empfaenger: u16, eigenschaften: &Arc<KanalEigenschaften>) -> bool {
        self.typ == typ
            && self.empfaenger == empfaenger
            && KanalEigenschaften::gleiche_referenz(&self.eigenschaften, eigenschaften)
    }

    pub fn typ(&self) -> KanalTyp {
        self.typ
    }

    pub fn sitzung(&self) -> u16 {
        self.sitzung
    }

    pub fn eigenschaften(&self) -> &Arc<KanalEigenschaften> {
        &self.eigenschaften
    }

    pub fn ist_schliessend(&self) -> bool {
        self.schliessend
    }

    pub fn empfaenger(&self) -> u16 {
        self.empfaenger
    }

    /// Spieler- oder Raumname
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bitfeld(&self) -> KanalBitfeld {
        KanalBitfeld::neu(
            self.typ,
            self.sitzung,
            self.eigenschaften.prioritaet,
            self.eigenschaften.amplitude,
            self.eigenschaften.positional,
            self.schliessend,
        )
    }

    /// Deskriptor fuer das Voice-Paket
    ///
    /// Raum-Kanaele tragen ihren Namen, weil die Raum-ID ein Hash ist.
    pub fn deskriptor(&self) -> KanalDeskriptor {
        KanalDeskriptor {
            bitfeld: self.bitfeld(),
            empfaenger: self.empfaenger,
            name: match self.typ {
                KanalTyp::Raum => Some(self.name.clone()),
                KanalTyp::Spieler => None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// KanalMenge
// ---------------------------------------------------------------------------

/// Alle verfolgten Kanaele plus die gemeinsame Kanal-Sitzungs-ID
///
/// Nicht thread-safe; der Sender haelt die Menge hinter einem Mutex.
#[derive(Debug, Default, Clone)]
pub struct KanalMenge {
    kanaele: Vec<OffenerKanal>,
    kanal_sitzung: u16,
}

impl KanalMenge {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Oeffnet einen Kanal oder oeffnet einen schliessenden erneut
    ///
    /// Sind alle anderen verfolgten Kanaele schliessend (oder gibt es keine),
    /// rueckt die Kanal-Sitzungs-ID vor. Ein bereits offener Kanal ist ein
    /// Defekt; die Menge bleibt dann unveraendert.
    pub fn oeffnen(
        &mut self,
        typ: KanalTyp,
        eigenschaften: &Arc<KanalEigenschaften>,
        empfaenger: u16,
        name: &str,
    ) -> Result<()> {
        let treffer = self
            .kanaele
            .iter()
            .position(|k| k.passt(typ, empfaenger, eigenschaften));

        let alle_schliessend = self
            .kanaele
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != treffer)
            .all(|(_, k)| k.ist_schliessend());

        match treffer {
            Some(i) => {
                let offen = self.kanaele[i].als_offen()?;
                self.kanaele[i] = offen;
            }
            None => {
                self.kanaele
                    .push(OffenerKanal::neu(typ, Arc::clone(eigenschaften), empfaenger, name));
            }
        }

        if alle_schliessend {
            self.kanal_sitzung = self.kanal_sitzung.wrapping_add(1);
            tracing::trace!(kanal_sitzung = self.kanal_sitzung, "Kanal-Sitzung gewechselt");
        }
        tracing::debug!(?typ, name, empfaenger, "Kanal geoeffnet");
        Ok(())
    }

    /// Setzt den passenden offenen Kanal auf schliessend
    ///
    /// `Ok(false)` wenn kein passender Kanal verfolgt wird. Ist der passende
    /// Kanal bereits schliessend, ist das ein Defekt.
    pub fn schliessen(
        &mut self,
        typ: KanalTyp,
        eigenschaften: &Arc<KanalEigenschaften>,
        empfaenger: u16,
    ) -> Result<bool> {
        let Some(i) = self
            .kanaele
            .iter()
            .position(|k| k.passt(typ, empfaenger, eigenschaften))
        else {
            tracing::debug!(?typ, empfaenger, "Zu schliessender Kanal nicht gefunden");
            return Ok(false);
        };

        let schliessend = self.kanaele[i].als_schliessend()?;
        tracing::debug!(?typ, name = schliessend.name(), empfaenger, "Kanal schliesst");
        self.kanaele[i] = schliessend;
        Ok(true)
    }

    /// Entfernt alle schliessenden Kanaele
    pub fn schliessende_entfernen(&mut self) {
        self.kanaele.retain(|k| !k.ist_schliessend());
    }

    /// Entfernt schliessende Kanaele, die so in `gesendet` enthalten waren
    ///
    /// Kanaele, die seit dem Schnappschuss geschlossen oder neu geoeffnet
    /// wurden, bleiben erhalten.
    pub fn gesendete_schliessende_entfernen(&mut self, gesendet: &[OffenerKanal]) {
        self.kanaele.retain(|k| {
            !(k.ist_schliessend()
                && gesendet.iter().any(|g| {
                    g.ist_schliessend()
                        && g.sitzung == k.sitzung
                        && g.passt(k.typ, k.empfaenger, &k.eigenschaften)
                }))
        });
    }

    /// Entfernt alle Spieler-Kanaele zu `name` und gibt sie zurueck
    pub fn spieler_entfernen(&mut self, name: &str) -> Vec<OffenerKanal> {
        let mut entfernt = Vec::new();
        self.kanaele.retain(|k| {
            if k.typ == KanalTyp::Spieler && k.name == name {
                entfernt.push(k.clone());
                false
            } else {
                true
            }
        });
        entfernt
    }

    pub fn leeren(&mut self) {
        self.kanaele.clear();
    }

    pub fn kanaele(&self) -> &[OffenerKanal] {
        &self.kanaele
    }

    /// Gemeinsame Sitzungs-ID fuer den Voice-Header
    pub fn kanal_sitzung(&self) -> u16 {
        self.kanal_sitzung
    }

    pub fn len(&self) -> usize {
        self.kanaele.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kanaele.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
