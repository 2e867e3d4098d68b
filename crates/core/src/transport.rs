//! Kollaborateur-Traits an der Transport- und Sitzungsgrenze
//!
//! Der Kern kennt weder Sockets noch Verbindungsaufbau. Er spricht ueber ein
//! opakes Peer-Handle mit einem Transport, der nie blockiert.

use std::fmt;
use std::hash::Hash;

use crate::types::PlayerId;

/// Opakes Verbindungs-Handle eines Transports
///
/// Jeder Typ mit Gleichheit und Hash kann als Handle dienen.
pub trait PeerHandle: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> PeerHandle for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Sende-Primitive eines Transports
///
/// Beide Methoden kehren sofort zurueck. `false` bedeutet, dass das Paket
/// fuer dieses Ziel nicht eingereiht werden konnte.
pub trait Transport<P: PeerHandle>: Send + Sync {
    /// Sendet zuverlaessig und geordnet an ein Ziel
    fn zuverlaessig_senden(&self, ziel: &P, daten: &[u8]) -> bool;

    /// Sendet unzuverlaessig (Sprachdaten) an ein Ziel
    fn unzuverlaessig_senden(&self, ziel: &P, daten: &[u8]) -> bool;

    /// Sendet zuverlaessig an mehrere Ziele
    ///
    /// Ein nicht erreichbares Ziel verhindert nicht die Zustellung an die
    /// uebrigen. Gibt die Anzahl erfolgreicher Sendungen zurueck.
    fn an_alle_zuverlaessig(&self, ziele: &[P], daten: &[u8]) -> usize {
        ziele
            .iter()
            .filter(|ziel| {
                let ok = self.zuverlaessig_senden(ziel, daten);
                if !ok {
                    tracing::debug!(ziel = ?ziel, "Zuverlaessiges Senden fehlgeschlagen");
                }
                ok
            })
            .count()
    }

    /// Sendet unzuverlaessig an mehrere Ziele
    fn an_alle_unzuverlaessig(&self, ziele: &[P], daten: &[u8]) -> usize {
        ziele
            .iter()
            .filter(|ziel| {
                let ok = self.unzuverlaessig_senden(ziel, daten);
                if !ok {
                    tracing::trace!(ziel = ?ziel, "Unzuverlaessiges Senden fehlgeschlagen");
                }
                ok
            })
            .count()
    }
}

/// Sicht eines Clients auf die laufende Sitzung
pub trait LokaleSitzung: Send + Sync {
    /// Vom Server vergebene Sitzungs-ID
    fn sitzungs_id(&self) -> u32;

    /// Eigene Teilnehmer-ID (None solange der Handshake laeuft)
    fn lokale_id(&self) -> Option<PlayerId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct HalbKaputt {
        gesendet: Mutex<Vec<u32>>,
    }

    impl Transport<u32> for HalbKaputt {
        fn zuverlaessig_senden(&self, ziel: &u32, _daten: &[u8]) -> bool {
            if ziel % 2 == 0 {
                return false;
            }
            self.gesendet.lock().push(*ziel);
            true
        }

        fn unzuverlaessig_senden(&self, ziel: &u32, daten: &[u8]) -> bool {
            self.zuverlaessig_senden(ziel, daten)
        }
    }

    #[test]
    fn ein_fehlschlag_stoppt_nicht_den_rest() {
        let t = HalbKaputt {
            gesendet: Mutex::new(Vec::new()),
        };
        let n = t.an_alle_zuverlaessig(&[1, 2, 3, 4, 5], b"x");
        assert_eq!(n, 3);
        assert_eq!(*t.gesendet.lock(), vec![1, 3, 5]);
    }
}
