//! Ereignis-Bus fuer Sitzungs-Ereignisse
//!
//! Kanal-Oeffnungen und -Schliessungen sowie Spieler-Beitritte und -Abgaenge
//! werden ueber den Bus an Abonnenten verteilt. Jedes Abonnement hat eine
//! eigene unbegrenzte Queue; ein Abonnent liest seine Queue selbst leer
//! (`EreignisAbo::empfangen`), der Bus startet keine Tasks.
//!
//! Das Abonnement endet, sobald das `EreignisAbo` gedroppt wird. Der Bus
//! entfernt geschlossene Queues beim naechsten `senden`.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::codec::CodecEinstellungen;
use crate::kanal::KanalEigenschaften;

/// Alle Ereignisse, die ueber den Sitzungs-Bus fliessen
#[derive(Debug, Clone)]
pub enum SitzungsEreignis {
    // --- Kanal-Ereignisse ---
    /// Ein Spieler-Kanal wurde geoeffnet
    SpielerKanalGeoeffnet {
        spieler: String,
        eigenschaften: Arc<KanalEigenschaften>,
    },
    /// Ein Spieler-Kanal wurde geschlossen
    SpielerKanalGeschlossen {
        spieler: String,
        eigenschaften: Arc<KanalEigenschaften>,
    },
    /// Ein Raum-Kanal wurde geoeffnet
    RaumKanalGeoeffnet {
        raum: String,
        eigenschaften: Arc<KanalEigenschaften>,
    },
    /// Ein Raum-Kanal wurde geschlossen
    RaumKanalGeschlossen {
        raum: String,
        eigenschaften: Arc<KanalEigenschaften>,
    },

    // --- Spieler-Ereignisse ---
    /// Ein Spieler ist der Sitzung beigetreten
    SpielerBeigetreten {
        name: String,
        codec: CodecEinstellungen,
    },
    /// Ein Spieler hat die Sitzung verlassen
    SpielerVerlassen { name: String },
}

/// Verteilt Sitzungs-Ereignisse an alle Abonnenten
///
/// Thread-safe. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct EreignisBus {
    abonnenten: Arc<Mutex<Vec<mpsc::UnboundedSender<SitzungsEreignis>>>>,
}

impl EreignisBus {
    /// Erstellt einen neuen Bus ohne Abonnenten
    pub fn neu() -> Self {
        Self::default()
    }

    /// Sendet ein Ereignis an alle Abonnenten
    ///
    /// Gibt die Anzahl der erreichten Abonnenten zurueck.
    pub fn senden(&self, ereignis: SitzungsEreignis) -> usize {
        let mut abonnenten = self.abonnenten.lock();
        abonnenten.retain(|tx| tx.send(ereignis.clone()).is_ok());
        abonnenten.len()
    }

    /// Abonniert alle zukuenftigen Ereignisse
    pub fn abonnieren(&self) -> EreignisAbo {
        let (tx, rx) = mpsc::unbounded_channel();
        self.abonnenten.lock().push(tx);
        EreignisAbo { rx }
    }

    /// Anzahl der aktiven Abonnenten
    pub fn abonnenten_anzahl(&self) -> usize {
        let mut abonnenten = self.abonnenten.lock();
        abonnenten.retain(|tx| !tx.is_closed());
        abonnenten.len()
    }
}

/// Empfaenger-Seite eines Bus-Abonnements
#[derive(Debug)]
pub struct EreignisAbo {
    rx: mpsc::UnboundedReceiver<SitzungsEreignis>,
}

impl EreignisAbo {
    /// Gibt das naechste wartende Ereignis zurueck, ohne zu blockieren
    pub fn empfangen(&mut self) -> Option<SitzungsEreignis> {
        self.rx.try_recv().ok()
    }
}
