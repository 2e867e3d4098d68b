//! sprechfunk-server – Bibliotheks-Root
//!
//! Der Server ist die Sitzungs-Autoritaet einer Sprechfunk-Sitzung. Er
//! nimmt rohe Pakete aus einer Eingangs-Queue entgegen, reicht sie an den
//! `NachrichtenVerteiler` weiter und stellt Antworten ueber die
//! Sende-Queues der Verbindungen zu.
//!
//! Der Verbindungsaufbau selbst gehoert nicht zum Server: ein Adapter
//! (Socket, Relay, Test) holt sich per `ServerHandle::verbinden` eine
//! `Verbindung` und pumpt Pakete in beide Richtungen.

pub mod config;
pub mod logging;
pub mod transport;

use anyhow::Result;
use bytes::Bytes;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use sprechfunk_core::event::EreignisBus;
use sprechfunk_protocol::pool::PufferPool;
use sprechfunk_signaling::{
    ClientSammlung, NachrichtenVerteiler, PlayerIdRegistry, SitzungsAutoritaet, Verarbeitet,
};

use config::ServerConfig;
use transport::{KanalTransport, VerbindungsId};

// ---------------------------------------------------------------------------
// Eingang
// ---------------------------------------------------------------------------

/// Ereignis in der Eingangs-Queue des Servers
#[derive(Debug)]
pub enum Eingang {
    /// Ein Paket ist ueber eine Verbindung angekommen
    Paket { quelle: VerbindungsId, daten: Bytes },
    /// Die Verbindung wurde geschlossen
    Getrennt { quelle: VerbindungsId },
}

/// Eine Verbindung aus Sicht des Adapters
///
/// Beim Drop wird der Server ueber die Trennung informiert. Die Meldung
/// laeuft ueber eine eigene, unbegrenzte Queue und geht deshalb auch bei
/// voller Eingangs-Queue nicht verloren.
pub struct Verbindung {
    id: VerbindungsId,
    eingang: mpsc::Sender<Eingang>,
    trennung: mpsc::UnboundedSender<VerbindungsId>,
    ausgang: mpsc::Receiver<Bytes>,
}

impl Verbindung {
    pub fn id(&self) -> VerbindungsId {
        self.id
    }

    /// Reicht ein empfangenes Paket an den Server weiter
    ///
    /// Wartet, solange die Eingangs-Queue voll ist.
    pub async fn senden(&self, daten: Bytes) -> Result<()> {
        self.eingang
            .send(Eingang::Paket {
                quelle: self.id,
                daten,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Server laeuft nicht mehr"))
    }

    /// Naechstes Paket vom Server an diese Verbindung
    pub async fn empfangen(&mut self) -> Option<Bytes> {
        self.ausgang.recv().await
    }
}

impl Drop for Verbindung {
    fn drop(&mut self) {
        // Schlaegt nur fehl, wenn der Server schon beendet ist
        if self.trennung.send(self.id).is_err() {
            tracing::debug!(verbindung = %self.id, "Server beendet, Trennung nicht gemeldet");
        }
    }
}

/// Klonbarer Zugang zum laufenden Server
#[derive(Clone)]
pub struct ServerHandle {
    transport: Arc<KanalTransport<VerbindungsId>>,
    eingang: mpsc::Sender<Eingang>,
    trennung: mpsc::UnboundedSender<VerbindungsId>,
    naechste_id: Arc<AtomicU64>,
}

impl ServerHandle {
    /// Oeffnet eine neue Verbindung zum Server
    pub fn verbinden(&self) -> Verbindung {
        let id = VerbindungsId(self.naechste_id.fetch_add(1, Ordering::Relaxed));
        let ausgang = self.transport.verbinden(id);
        tracing::debug!(verbindung = %id, "Verbindung geoeffnet");
        Verbindung {
            id,
            eingang: self.eingang.clone(),
            trennung: self.trennung.clone(),
            ausgang,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    config: ServerConfig,
    transport: Arc<KanalTransport<VerbindungsId>>,
    verteiler: NachrichtenVerteiler<VerbindungsId>,
    eingang_tx: mpsc::Sender<Eingang>,
    eingang_rx: mpsc::Receiver<Eingang>,
    trennung_tx: mpsc::UnboundedSender<VerbindungsId>,
    trennung_rx: mpsc::UnboundedReceiver<VerbindungsId>,
    naechste_id: Arc<AtomicU64>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        let sitzungs_id = config.sitzungs_id();
        let transport = Arc::new(KanalTransport::neu(config.sitzung.sende_kapazitaet));
        let clients = ClientSammlung::neu(Arc::new(PlayerIdRegistry::neu()), EreignisBus::neu());
        let autoritaet = SitzungsAutoritaet::neu(
            sitzungs_id,
            transport.clone(),
            clients,
            Arc::new(PufferPool::default()),
        );
        let (eingang_tx, eingang_rx) = mpsc::channel(config.sitzung.eingang_kapazitaet.max(1));
        let (trennung_tx, trennung_rx) = mpsc::unbounded_channel();

        Self {
            config,
            transport,
            verteiler: NachrichtenVerteiler::neu(Arc::new(autoritaet)),
            eingang_tx,
            eingang_rx,
            trennung_tx,
            trennung_rx,
            naechste_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sitzungs_id(&self) -> u32 {
        self.verteiler.autoritaet().sitzungs_id()
    }

    pub fn autoritaet(&self) -> Arc<SitzungsAutoritaet<VerbindungsId>> {
        Arc::clone(self.verteiler.autoritaet())
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            transport: Arc::clone(&self.transport),
            eingang: self.eingang_tx.clone(),
            trennung: self.trennung_tx.clone(),
            naechste_id: Arc::clone(&self.naechste_id),
        }
    }

    /// Verarbeitet die Eingangs-Queue bis `shutdown` fertig ist oder alle
    /// Handles und Verbindungen gedroppt wurden
    pub async fn laufen(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let Self {
            transport,
            verteiler,
            eingang_tx,
            mut eingang_rx,
            trennung_tx,
            mut trennung_rx,
            ..
        } = self;
        drop(eingang_tx);
        drop(trennung_tx);
        tokio::pin!(shutdown);

        tracing::info!(
            sitzungs_id = verteiler.autoritaet().sitzungs_id(),
            "Server laeuft"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    break;
                }
                Some(quelle) = trennung_rx.recv() => {
                    eingang_verarbeiten(&verteiler, &transport, Eingang::Getrennt { quelle });
                }
                eingang = eingang_rx.recv() => {
                    let Some(eingang) = eingang else {
                        tracing::info!("Keine Verbindungen mehr, Server wird beendet");
                        break;
                    };
                    eingang_verarbeiten(&verteiler, &transport, eingang);
                }
            }
        }

        // Trennungen, die vor dem Ende noch gemeldet wurden
        while let Ok(quelle) = trennung_rx.try_recv() {
            eingang_verarbeiten(&verteiler, &transport, Eingang::Getrennt { quelle });
        }
        Ok(())
    }

    /// Startet den Server und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            sitzungs_id = self.sitzungs_id(),
            eingang_kapazitaet = self.config.sitzung.eingang_kapazitaet,
            sende_kapazitaet = self.config.sitzung.sende_kapazitaet,
            "Server startet"
        );

        // Handle festhalten, damit der Server nicht ohne Verbindungen endet
        let _handle = self.handle();
        self.laufen(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
        })
        .await
    }
}

fn eingang_verarbeiten(
    verteiler: &NachrichtenVerteiler<VerbindungsId>,
    transport: &KanalTransport<VerbindungsId>,
    eingang: Eingang,
) {
    match eingang {
        // Die Trennung kann vor noch wartenden Paketen verarbeitet werden
        Eingang::Paket { quelle, .. } if !transport.ist_verbunden(&quelle) => {
            tracing::debug!(verbindung = %quelle, "Paket einer getrennten Verbindung verworfen");
        }
        Eingang::Paket { quelle, daten } => match verteiler.verarbeiten(&quelle, daten) {
            Ok(Verarbeitet::Handshake(Some(id))) => {
                tracing::debug!(verbindung = %quelle, player_id = %id, "Handshake verarbeitet");
            }
            Ok(ergebnis) => {
                tracing::trace!(verbindung = %quelle, ergebnis = ?ergebnis, "Paket verarbeitet");
            }
            Err(e) if e.ist_eingabefehler() => {
                tracing::debug!(verbindung = %quelle, fehler = %e, "Ungueltiges Paket verworfen");
            }
            Err(e) => {
                tracing::warn!(verbindung = %quelle, fehler = %e, "Paket konnte nicht verarbeitet werden");
            }
        },
        Eingang::Getrennt { quelle } => {
            // Erst austragen (RemoveClient geht auch an die eigene Queue),
            // dann die Sende-Queue entfernen
            match verteiler.autoritaet().verbindung_entfernen(&quelle) {
                Some(info) => {
                    tracing::info!(verbindung = %quelle, name = %info.name, "Teilnehmer getrennt");
                }
                None => tracing::debug!(verbindung = %quelle, "Verbindung ohne Teilnehmer getrennt"),
            }
            transport.trennen(&quelle);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
