//! In-Process-Transport ueber tokio-Queues
//!
//! Jede Verbindung bekommt eine begrenzte Sende-Queue. Gesendet wird
//! nicht-blockierend mit `try_send`; eine volle oder geschlossene Queue
//! zaehlt als fehlgeschlagene Zustellung fuer genau dieses Ziel.
//! Ein Netzwerk-Adapter liest die Queue einer Verbindung und schreibt
//! sie auf den Socket.

use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use tokio::sync::mpsc;

use sprechfunk_core::transport::{PeerHandle, Transport};

/// Opakes Handle einer Verbindung zum Server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerbindungsId(pub u64);

impl fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "verbindung-{}", self.0)
    }
}

/// Transport mit einer Sende-Queue pro Verbindung
pub struct KanalTransport<P: PeerHandle> {
    queues: DashMap<P, mpsc::Sender<Bytes>>,
    kapazitaet: usize,
}

impl<P: PeerHandle> KanalTransport<P> {
    pub fn neu(kapazitaet: usize) -> Self {
        Self {
            queues: DashMap::new(),
            kapazitaet: kapazitaet.max(1),
        }
    }

    /// Registriert eine Verbindung und gibt das Ende ihrer Sende-Queue zurueck
    ///
    /// Eine bereits registrierte Verbindung bekommt eine neue Queue; die
    /// alte wird geschlossen.
    pub fn verbinden(&self, peer: P) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(self.kapazitaet);
        if self.queues.insert(peer.clone(), tx).is_some() {
            tracing::debug!(peer = ?peer, "Sende-Queue ersetzt");
        }
        rx
    }

    /// Entfernt die Sende-Queue einer Verbindung
    pub fn trennen(&self, peer: &P) -> bool {
        self.queues.remove(peer).is_some()
    }

    pub fn ist_verbunden(&self, peer: &P) -> bool {
        self.queues.contains_key(peer)
    }

    /// Anzahl registrierter Verbindungen
    pub fn anzahl(&self) -> usize {
        self.queues.len()
    }

    fn einreihen(&self, ziel: &P, daten: &[u8], zuverlaessig: bool) -> bool {
        let Some(tx) = self.queues.get(ziel) else {
            tracing::trace!(ziel = ?ziel, "Ziel ohne Sende-Queue");
            return false;
        };
        match tx.try_send(Bytes::copy_from_slice(daten)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                if zuverlaessig {
                    tracing::warn!(ziel = ?ziel, "Sende-Queue voll – Nachricht verworfen");
                } else {
                    tracing::trace!(ziel = ?ziel, "Sende-Queue voll – Voice-Frame verworfen");
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(ziel = ?ziel, "Sende-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

impl<P: PeerHandle> Transport<P> for KanalTransport<P> {
    fn zuverlaessig_senden(&self, ziel: &P, daten: &[u8]) -> bool {
        self.einreihen(ziel, daten, true)
    }

    fn unzuverlaessig_senden(&self, ziel: &P, daten: &[u8]) -> bool {
        self.einreihen(ziel, daten, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zustellung_an_registrierte_verbindung() {
        let t = KanalTransport::neu(4);
        let mut rx = t.verbinden(VerbindungsId(1));
        assert!(t.zuverlaessig_senden(&VerbindungsId(1), b"hallo"));
        assert!(!t.zuverlaessig_senden(&VerbindungsId(2), b"hallo"));
        assert_eq!(rx.try_recv().ok(), Some(Bytes::from_static(b"hallo")));
    }

    #[test]
    fn volle_queue_verwirft_nur_fuer_dieses_ziel() {
        let t = KanalTransport::neu(1);
        let _voll = t.verbinden(VerbindungsId(1));
        let mut frei = t.verbinden(VerbindungsId(2));

        assert!(t.unzuverlaessig_senden(&VerbindungsId(1), b"a"));
        let ziele = [VerbindungsId(1), VerbindungsId(2)];
        assert_eq!(t.an_alle_unzuverlaessig(&ziele, b"b"), 1);
        assert_eq!(frei.try_recv().ok(), Some(Bytes::from_static(b"b")));
    }

    #[test]
    fn getrennte_verbindung_ist_nicht_erreichbar() {
        let t = KanalTransport::neu(4);
        let rx = t.verbinden(VerbindungsId(1));
        drop(rx);
        assert!(!t.zuverlaessig_senden(&VerbindungsId(1), b"x"));
        assert!(t.ist_verbunden(&VerbindungsId(1)));
        assert!(t.trennen(&VerbindungsId(1)));
        assert!(!t.trennen(&VerbindungsId(1)));
        assert!(!t.ist_verbunden(&VerbindungsId(1)));
        assert_eq!(t.anzahl(), 0);
    }
}
