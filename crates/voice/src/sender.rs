//! Ausgehende Sprachdaten des lokalen Sprechers
//!
//! Der `VoiceSender` verfolgt die offenen Kanaele und baut pro kodiertem
//! Frame ein Voice-Paket an alle Teilnehmer, die es hoeren sollen:
//! - Spieler-Kanal: genau der Empfaenger (per ID nachgeschlagen)
//! - Raum-Kanal: alle Teilnehmer, die im Raum zuhoeren
//!
//! Ziele werden dedupliziert, jedes Paket geht also hoechstens einmal an
//! einen Teilnehmer.
//!
//! ## Nebenlaeufigkeit
//! Kanal-Ereignisse und der Audio-Sendepfad kommen aus verschiedenen
//! Kontexten. Die Kanalmenge liegt hinter einem Mutex; der Sendepfad nimmt
//! darunter nur einen Schnappschuss und serialisiert ausserhalb.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sprechfunk_core::diagnose;
use sprechfunk_core::event::{EreignisAbo, EreignisBus, SitzungsEreignis};
use sprechfunk_core::kanal::{KanalEigenschaften, KanalTyp};
use sprechfunk_core::transport::{LokaleSitzung, PeerHandle, Transport};
use sprechfunk_core::types::{PlayerId, RoomId};
use sprechfunk_core::{ClientVerzeichnis, Result};
use sprechfunk_protocol::nachricht::{KanalDeskriptor, PacketWriter};
use sprechfunk_protocol::pool::PufferPool;

use crate::kanal::{KanalMenge, OffenerKanal};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration des Senders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// So viele Frames ohne lokale ID werden nur auf debug geloggt
    pub ohne_id_schonfrist: u32,
    /// Danach wird jeder N-te verworfene Frame als Warnung geloggt
    pub ohne_id_warn_intervall: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            ohne_id_schonfrist: 99,
            ohne_id_warn_intervall: 50,
        }
    }
}

/// Ergebnis eines Sendeversuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendeErgebnis {
    /// Paket wurde an so viele Ziele uebergeben
    Gesendet { ziele: usize, sequenz: u16 },
    /// Noch keine lokale ID vergeben
    OhneId,
    /// Keine offenen Kanaele
    KeineKanaele,
    /// Kanaele offen, aber niemand hoert zu
    KeineZiele,
    /// Sender wurde gestoppt
    Gestoppt,
}

#[derive(Debug, Default)]
struct SendeZustand {
    sequenz: u16,
    hatte_id: bool,
    ohne_id_zaehler: u32,
}

/// Spieler-Kanal, dessen Empfaenger noch nicht bekannt ist
#[derive(Debug, Clone)]
struct AusstehenderKanal {
    spieler: String,
    eigenschaften: Arc<KanalEigenschaften>,
}

// ---------------------------------------------------------------------------
// VoiceSender
// ---------------------------------------------------------------------------

/// Sendet kodierte Frames des lokalen Sprechers an alle Zuhoerer
pub struct VoiceSender<P: PeerHandle> {
    config: SenderConfig,
    transport: Arc<dyn Transport<P>>,
    sitzung: Arc<dyn LokaleSitzung>,
    clients: Arc<dyn ClientVerzeichnis<P>>,
    pool: Arc<PufferPool>,
    kanaele: Mutex<KanalMenge>,
    ausstehend: Mutex<Vec<AusstehenderKanal>>,
    abo: Mutex<Option<EreignisAbo>>,
    zustand: Mutex<SendeZustand>,
    gestoppt: AtomicBool,
}

impl<P: PeerHandle> VoiceSender<P> {
    /// Erstellt einen Sender und abonniert die Kanal- und Spieler-Ereignisse
    pub fn neu(
        config: SenderConfig,
        transport: Arc<dyn Transport<P>>,
        sitzung: Arc<dyn LokaleSitzung>,
        clients: Arc<dyn ClientVerzeichnis<P>>,
        pool: Arc<PufferPool>,
        ereignisse: &EreignisBus,
    ) -> Self {
        Self {
            config,
            transport,
            sitzung,
            clients,
            pool,
            kanaele: Mutex::new(KanalMenge::neu()),
            ausstehend: Mutex::new(Vec::new()),
            abo: Mutex::new(Some(ereignisse.abonnieren())),
            zustand: Mutex::new(SendeZustand::default()),
            gestoppt: AtomicBool::new(false),
        }
    }

    /// Beendet das Abonnement und verwirft alle Kanaele
    pub fn stoppen(&self) {
        self.gestoppt.store(true, Ordering::Release);
        self.abo.lock().take();
        self.kanaele.lock().leeren();
        self.ausstehend.lock().clear();
        tracing::debug!("VoiceSender gestoppt");
    }

    pub fn ist_gestoppt(&self) -> bool {
        self.gestoppt.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Ereignisse
    // -----------------------------------------------------------------------

    /// Arbeitet alle wartenden Ereignisse ab
    ///
    /// Bricht beim ersten Defekt ab; nachfolgende Ereignisse bleiben fuer den
    /// naechsten Aufruf in der Queue. Gibt die Anzahl verarbeiteter
    /// Ereignisse zurueck.
    pub fn ereignisse_verarbeiten(&self) -> Result<usize> {
        let mut verarbeitet = 0;
        loop {
            let ereignis = {
                let mut abo = self.abo.lock();
                match abo.as_mut().and_then(EreignisAbo::empfangen) {
                    Some(e) => e,
                    None => return Ok(verarbeitet),
                }
            };
            self.ereignis_anwenden(ereignis)?;
            verarbeitet += 1;
        }
    }

    fn ereignis_anwenden(&self, ereignis: SitzungsEreignis) -> Result<()> {
        match ereignis {
            SitzungsEreignis::SpielerKanalGeoeffnet {
                spieler,
                eigenschaften,
            } => self.spieler_kanal_oeffnen(&spieler, &eigenschaften),
            SitzungsEreignis::SpielerKanalGeschlossen {
                spieler,
                eigenschaften,
            } => self.spieler_kanal_schliessen(&spieler, &eigenschaften),
            SitzungsEreignis::RaumKanalGeoeffnet { raum, eigenschaften } => {
                self.raum_kanal_oeffnen(&raum, &eigenschaften)
            }
            SitzungsEreignis::RaumKanalGeschlossen { raum, eigenschaften } => {
                self.raum_kanal_schliessen(&raum, &eigenschaften)
            }
            SitzungsEreignis::SpielerBeigetreten { name, .. } => self.spieler_beigetreten(&name),
            SitzungsEreignis::SpielerVerlassen { name } => {
                self.spieler_verlassen(&name);
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Kanal-Verwaltung
    // -----------------------------------------------------------------------

    /// Oeffnet einen Kanal zu einem Spieler
    ///
    /// Ist der Spieler noch unbekannt, wartet der Kanal bis zu seinem Beitritt.
    pub fn spieler_kanal_oeffnen(
        &self,
        spieler: &str,
        eigenschaften: &Arc<KanalEigenschaften>,
    ) -> Result<()> {
        if self.ist_gestoppt() {
            return Ok(());
        }
        let Some(info) = self.clients.client_nach_name(spieler) else {
            tracing::debug!(spieler, "Spieler unbekannt, Kanal wartet auf Beitritt");
            self.ausstehend.lock().push(AusstehenderKanal {
                spieler: spieler.to_string(),
                eigenschaften: Arc::clone(eigenschaften),
            });
            return Ok(());
        };
        self.kanaele
            .lock()
            .oeffnen(KanalTyp::Spieler, eigenschaften, info.player_id.0, &info.name)
    }

    /// Schliesst einen Kanal zu einem Spieler (auch einen noch wartenden)
    pub fn spieler_kanal_schliessen(
        &self,
        spieler: &str,
        eigenschaften: &Arc<KanalEigenschaften>,
    ) -> Result<()> {
        self.ausstehend.lock().retain(|a| {
            !(a.spieler == spieler && KanalEigenschaften::gleiche_referenz(&a.eigenschaften, eigenschaften))
        });

        let Some(info) = self.clients.client_nach_name(spieler) else {
            return Ok(());
        };
        self.kanaele
            .lock()
            .schliessen(KanalTyp::Spieler, eigenschaften, info.player_id.0)
            .map(|_| ())
    }

    pub fn raum_kanal_oeffnen(&self, raum: &str, eigenschaften: &Arc<KanalEigenschaften>) -> Result<()> {
        if self.ist_gestoppt() {
            return Ok(());
        }
        self.kanaele
            .lock()
            .oeffnen(KanalTyp::Raum, eigenschaften, RoomId::aus_name(raum).0, raum)
    }

    pub fn raum_kanal_schliessen(
        &self,
        raum: &str,
        eigenschaften: &Arc<KanalEigenschaften>,
    ) -> Result<()> {
        self.kanaele
            .lock()
            .schliessen(KanalTyp::Raum, eigenschaften, RoomId::aus_name(raum).0)
            .map(|_| ())
    }

    /// Oeffnet alle wartenden Kanaele zu diesem Spieler
    pub fn spieler_beigetreten(&self, name: &str) -> Result<()> {
        let wartend: Vec<AusstehenderKanal> = {
            let mut ausstehend = self.ausstehend.lock();
            let (passend, rest) = ausstehend.drain(..).partition(|a| a.spieler == name);
            *ausstehend = rest;
            passend
        };

        // Ein Fehler bricht nicht ab: die restlichen Kanaele werden trotzdem
        // geoeffnet, gemeldet wird der erste Fehler
        let mut erster_fehler = None;
        for a in wartend {
            if let Err(e) = self.spieler_kanal_oeffnen(&a.spieler, &a.eigenschaften) {
                tracing::warn!(spieler = name, fehler = %e, "Wartender Kanal konnte nicht geoeffnet werden");
                erster_fehler.get_or_insert(e);
            }
        }
        match erster_fehler {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Entfernt Kanaele zu einem gegangenen Spieler
    ///
    /// Nicht schliessende Kanaele warten danach wieder auf einen Spieler
    /// gleichen Namens.
    pub fn spieler_verlassen(&self, name: &str) {
        let entfernt = self.kanaele.lock().spieler_entfernen(name);
        let wieder: Vec<AusstehenderKanal> = entfernt
            .into_iter()
            .filter(|k| !k.ist_schliessend())
            .map(|k| AusstehenderKanal {
                spieler: k.name().to_string(),
                eigenschaften: Arc::clone(k.eigenschaften()),
            })
            .collect();

        if !wieder.is_empty() {
            tracing::debug!(spieler = name, anzahl = wieder.len(), "Spieler-Kanaele warten erneut");
            self.ausstehend.lock().extend(wieder);
        }
    }

    /// Anzahl verfolgter Kanaele (offen und schliessend)
    pub fn kanal_anzahl(&self) -> usize {
        self.kanaele.lock().len()
    }

    /// Anzahl wartender Spieler-Kanaele
    pub fn ausstehend_anzahl(&self) -> usize {
        self.ausstehend.lock().len()
    }

    /// Aktuelle Kanal-Sitzungs-ID
    pub fn kanal_sitzung(&self) -> u16 {
        self.kanaele.lock().kanal_sitzung()
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Sendet einen kodierten Frame an alle Zuhoerer
    pub fn senden(&self, kodiert: &[u8]) -> SendeErgebnis {
        if self.ist_gestoppt() {
            return SendeErgebnis::Gestoppt;
        }

        let Some(lokale_id) = self.lokale_id_pruefen() else {
            return SendeErgebnis::OhneId;
        };

        let (schnappschuss, kanal_sitzung) = {
            let kanaele = self.kanaele.lock();
            if kanaele.is_empty() {
                tracing::debug!("Keine offenen Kanaele, Frame verworfen");
                return SendeErgebnis::KeineKanaele;
            }
            (kanaele.kanaele().to_vec(), kanaele.kanal_sitzung())
        };

        let ziele = self.ziele_ermitteln(&schnappschuss);
        if ziele.is_empty() {
            tracing::trace!("Niemand hoert zu, Frame verworfen");
            return SendeErgebnis::KeineZiele;
        }

        let deskriptoren: Vec<KanalDeskriptor> =
            schnappschuss.iter().map(OffenerKanal::deskriptor).collect();

        let sequenz = {
            let mut zustand = self.zustand.lock();
            let s = zustand.sequenz;
            zustand.sequenz = s.wrapping_add(1);
            s
        };

        let mut writer = PacketWriter::neu(self.pool.holen());
        writer.voice_data_schreiben(
            self.sitzung.sitzungs_id(),
            lokale_id,
            sequenz,
            kanal_sitzung,
            &deskriptoren,
            kodiert,
        );
        let paket = writer.fertig();

        let erreicht = self.transport.an_alle_unzuverlaessig(&ziele, &paket);
        self.pool.zurueckgeben(paket);

        tracing::trace!(sequenz, ziele = ziele.len(), erreicht, "Voice-Frame gesendet");

        // Schliessende Kanaele gelten nach der Uebergabe als mitgeteilt,
        // auch wenn der Transport keinen Empfaenger erreicht hat
        self.kanaele
            .lock()
            .gesendete_schliessende_entfernen(&schnappschuss);

        SendeErgebnis::Gesendet {
            ziele: erreicht,
            sequenz,
        }
    }

    /// Naechste Sequenznummer
    pub fn sequenz(&self) -> u16 {
        self.zustand.lock().sequenz
    }

    fn lokale_id_pruefen(&self) -> Option<PlayerId> {
        let mut zustand = self.zustand.lock();
        match self.sitzung.lokale_id() {
            Some(id) => {
                zustand.hatte_id = true;
                zustand.ohne_id_zaehler = 0;
                Some(id)
            }
            None if zustand.hatte_id => {
                tracing::warn!(
                    diagnose = diagnose::LOKALE_ID_VERLOREN,
                    "Lokale Client-ID wurde nach der Vergabe entfernt"
                );
                None
            }
            None => {
                let zaehler = zustand.ohne_id_zaehler;
                zustand.ohne_id_zaehler = zaehler.saturating_add(1);
                let intervall = self.config.ohne_id_warn_intervall.max(1);
                if zaehler >= self.config.ohne_id_schonfrist
                    && zustand.ohne_id_zaehler % intervall == 0
                {
                    tracing::warn!(
                        verworfen = zustand.ohne_id_zaehler,
                        "Voice vor Vergabe einer Client-ID gesendet"
                    );
                } else {
                    tracing::debug!(
                        verworfen = zustand.ohne_id_zaehler,
                        "Voice vor Vergabe einer Client-ID gesendet"
                    );
                }
                None
            }
        }
    }

    fn ziele_ermitteln(&self, kanaele: &[OffenerKanal]) -> Vec<P> {
        let mut gesehen = HashSet::new();
        let mut ziele = Vec::new();

        for kanal in kanaele {
            match kanal.typ() {
                KanalTyp::Spieler => {
                    let id = PlayerId(kanal.empfaenger());
                    match self.clients.client_nach_id(id) {
                        Some(info) => {
                            if gesehen.insert(info.player_id) {
                                ziele.push(info.verbindung);
                            }
                        }
                        None => tracing::debug!(
                            diagnose = diagnose::UNBEKANNTER_EMPFAENGER,
                            spieler = %id,
                            "Voice an unbekannte Spieler-ID"
                        ),
                    }
                }
                KanalTyp::Raum => {
                    for info in self.clients.clients_in_raum(RoomId(kanal.empfaenger())) {
                        if gesehen.insert(info.player_id) {
                            ziele.push(info.verbindung);
                        }
                    }
                }
            }
        }
        ziele
    }
}

impl<P: PeerHandle> std::fmt::Debug for VoiceSender<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSender")
            .field("kanaele", &self.kanal_anzahl())
            .field("ausstehend", &self.ausstehend_anzahl())
            .field("gestoppt", &self.ist_gestoppt())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sprechfunk_core::client::ClientInfo;
    use sprechfunk_core::codec::CodecEinstellungen;
    use sprechfunk_protocol::nachricht::Nachricht;
    use std::sync::atomic::{AtomicBool, AtomicU32};

    // --- Test-Kollaborateure ---

    #[derive(Default)]
    struct AufzeichnenderTransport {
        gesendet: Mutex<Vec<(u32, Vec<u8>)>>,
        aufrufe: AtomicU32,
        ablehnen: AtomicBool,
    }

    impl Transport<u32> for AufzeichnenderTransport {
        fn zuverlaessig_senden(&self, ziel: &u32, daten: &[u8]) -> bool {
            self.unzuverlaessig_senden(ziel, daten)
        }

        fn unzuverlaessig_senden(&self, ziel: &u32, daten: &[u8]) -> bool {
            self.aufrufe.fetch_add(1, Ordering::SeqCst);
            if self.ablehnen.load(Ordering::SeqCst) {
                return false;
            }
            self.gesendet.lock().push((*ziel, daten.to_vec()));
            true
        }
    }

    /// Sammelt formatierte Log-Zeilen fuer Assertions
    #[derive(Clone, Default)]
    struct LogPuffer(Arc<Mutex<Vec<u8>>>);

    impl LogPuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl std::io::Write for LogPuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogPuffer {
        type Writer = LogPuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[derive(Default)]
    struct TestSitzung {
        lokale_id: Mutex<Option<PlayerId>>,
    }

    impl LokaleSitzung for TestSitzung {
        fn sitzungs_id(&self) -> u32 {
            42
        }
        fn lokale_id(&self) -> Option<PlayerId> {
            *self.lokale_id.lock()
        }
    }

    #[derive(Default)]
    struct TestClients {
        clients: Mutex<Vec<ClientInfo<u32>>>,
    }

    impl TestClients {
        fn hinzufuegen(&self, id: u16, name: &str, raeume: &[&str]) {
            let mut info = ClientInfo::neu(PlayerId(id), name, CodecEinstellungen::default(), 100 + id as u32);
            info.raeume = raeume.iter().map(|r| r.to_string()).collect();
            self.clients.lock().push(info);
        }

        fn entfernen(&self, name: &str) {
            self.clients.lock().retain(|c| c.name != name);
        }
    }

    impl ClientVerzeichnis<u32> for TestClients {
        fn client_nach_name(&self, name: &str) -> Option<ClientInfo<u32>> {
            self.clients.lock().iter().find(|c| c.name == name).cloned()
        }
        fn client_nach_id(&self, id: PlayerId) -> Option<ClientInfo<u32>> {
            self.clients.lock().iter().find(|c| c.player_id == id).cloned()
        }
        fn clients_in_raum(&self, raum: RoomId) -> Vec<ClientInfo<u32>> {
            self.clients
                .lock()
                .iter()
                .filter(|c| c.ist_in_raum(raum))
                .cloned()
                .collect()
        }
    }

    struct Aufbau {
        sender: VoiceSender<u32>,
        transport: Arc<AufzeichnenderTransport>,
        sitzung: Arc<TestSitzung>,
        clients: Arc<TestClients>,
        bus: EreignisBus,
    }

    fn aufbau() -> Aufbau {
        let transport = Arc::new(AufzeichnenderTransport::default());
        let sitzung = Arc::new(TestSitzung::default());
        *sitzung.lokale_id.lock() = Some(PlayerId(0));
        let clients = Arc::new(TestClients::default());
        let bus = EreignisBus::neu();
        let sender = VoiceSender::neu(
            SenderConfig::default(),
            transport.clone(),
            sitzung.clone(),
            clients.clone(),
            Arc::new(PufferPool::default()),
            &bus,
        );
        Aufbau {
            sender,
            transport,
            sitzung,
            clients,
            bus,
        }
    }

    fn voice(daten: &[u8]) -> sprechfunk_protocol::nachricht::VoiceData {
        match Nachricht::dekodieren(Bytes::copy_from_slice(daten)) {
            Ok(Nachricht::VoiceData(v)) => v,
            andere => panic!("Erwartet VoiceData, erhalten {andere:?}"),
        }
    }

    #[test]
    fn ohne_kanaele_kein_transport_aufruf() {
        let a = aufbau();
        assert_eq!(a.sender.senden(b"frame"), SendeErgebnis::KeineKanaele);
        assert_eq!(a.transport.aufrufe.load(Ordering::SeqCst), 0);
        assert_eq!(a.sender.sequenz(), 0);
    }

    #[test]
    fn ohne_lokale_id_wird_verworfen() {
        let a = aufbau();
        *a.sitzung.lokale_id.lock() = None;
        a.clients.hinzufuegen(1, "bert", &["Lobby"]);
        a.sender.raum_kanal_oeffnen("Lobby", &Arc::new(KanalEigenschaften::default())).expect("oeffnen");
        for _ in 0..200 {
            assert_eq!(a.sender.senden(b"x"), SendeErgebnis::OhneId);
        }
        assert_eq!(a.transport.aufrufe.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ziele_werden_dedupliziert() {
        let a = aufbau();
        a.clients.hinzufuegen(1, "bert", &["Lobby"]);
        a.clients.hinzufuegen(2, "carl", &["Lobby"]);

        a.sender.raum_kanal_oeffnen("Lobby", &Arc::new(KanalEigenschaften::default())).expect("raum");
        a.sender.spieler_kanal_oeffnen("bert", &Arc::new(KanalEigenschaften::default())).expect("spieler");

        assert_eq!(a.sender.senden(b"abc"), SendeErgebnis::Gesendet { ziele: 2, sequenz: 0 });

        let gesendet = a.transport.gesendet.lock();
        let mut ziele: Vec<u32> = gesendet.iter().map(|(z, _)| *z).collect();
        ziele.sort_unstable();
        assert_eq!(ziele, vec![101, 102]);

        let v = voice(&gesendet[0].1);
        assert_eq!(v.sitzungs_id, 42);
        assert_eq!(v.absender, PlayerId(0));
        assert_eq!(v.kanaele.len(), 2);
        assert_eq!(&v.nutzdaten[..], b"abc");
    }

    #[test]
    fn sequenz_zaehlt_nur_gesendete_frames() {
        let a = aufbau();
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.raum_kanal_oeffnen("Leer", &e).expect("raum");
        assert_eq!(a.sender.senden(b"x"), SendeErgebnis::KeineZiele);
        assert_eq!(a.sender.sequenz(), 0);

        a.clients.hinzufuegen(1, "bert", &["Leer"]);
        a.sender.senden(b"x");
        a.sender.senden(b"x");
        assert_eq!(a.sender.sequenz(), 2);
    }

    #[test]
    fn schliessender_kanal_wird_einmal_gesendet() {
        let a = aufbau();
        a.clients.hinzufuegen(1, "bert", &["Lobby"]);
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.raum_kanal_oeffnen("Lobby", &e).expect("oeffnen");
        a.sender.raum_kanal_schliessen("Lobby", &e).expect("schliessen");

        assert!(matches!(a.sender.senden(b"x"), SendeErgebnis::Gesendet { .. }));
        let v = voice(&a.transport.gesendet.lock()[0].1);
        assert!(v.kanaele[0].bitfeld.schliessend());
        assert_eq!(v.kanaele[0].name.as_deref(), Some("Lobby"));

        assert_eq!(a.sender.kanal_anzahl(), 0);
        assert_eq!(a.sender.senden(b"x"), SendeErgebnis::KeineKanaele);
    }

    #[test]
    fn unbekannter_spieler_wartet_bis_zum_beitritt() {
        let a = aufbau();
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.spieler_kanal_oeffnen("dora", &e).expect("wartet");
        assert_eq!(a.sender.ausstehend_anzahl(), 1);
        assert_eq!(a.sender.kanal_anzahl(), 0);

        a.clients.hinzufuegen(4, "dora", &[]);
        a.bus.senden(SitzungsEreignis::SpielerBeigetreten {
            name: "dora".into(),
            codec: CodecEinstellungen::default(),
        });
        assert_eq!(a.sender.ereignisse_verarbeiten().expect("ereignisse"), 1);
        assert_eq!(a.sender.ausstehend_anzahl(), 0);
        assert_eq!(a.sender.kanal_anzahl(), 1);
    }

    #[test]
    fn fehler_beim_beitritt_oeffnet_restliche_kanaele() {
        let a = aufbau();
        let erster = Arc::new(KanalEigenschaften::default());
        let dritter = Arc::new(KanalEigenschaften::default());
        a.sender.spieler_kanal_oeffnen("dora", &erster).expect("wartet");
        a.sender.spieler_kanal_oeffnen("dora", &erster).expect("wartet");
        a.sender.spieler_kanal_oeffnen("dora", &dritter).expect("wartet");
        assert_eq!(a.sender.ausstehend_anzahl(), 3);

        a.clients.hinzufuegen(4, "dora", &[]);
        let fehler = a.sender.spieler_beigetreten("dora").unwrap_err();
        assert_eq!(fehler.diagnose(), Some(diagnose::KANAL_BEREITS_OFFEN));

        // Der zweite Eintrag kollidiert, der dritte ist trotzdem offen
        assert_eq!(a.sender.kanal_anzahl(), 2);
        assert_eq!(a.sender.ausstehend_anzahl(), 0);
        assert!(matches!(a.sender.senden(b"x"), SendeErgebnis::Gesendet { ziele: 1, .. }));
        assert_eq!(voice(&a.transport.gesendet.lock()[0].1).kanaele.len(), 2);
    }

    #[test]
    fn schliessender_kanal_wird_auch_ohne_erreichten_empfaenger_entfernt() {
        let a = aufbau();
        a.transport.ablehnen.store(true, Ordering::SeqCst);
        a.clients.hinzufuegen(1, "bert", &["Lobby"]);
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.raum_kanal_oeffnen("Lobby", &e).expect("oeffnen");
        a.sender.raum_kanal_schliessen("Lobby", &e).expect("schliessen");

        assert_eq!(
            a.sender.senden(b"x"),
            SendeErgebnis::Gesendet { ziele: 0, sequenz: 0 }
        );
        assert_eq!(a.transport.aufrufe.load(Ordering::SeqCst), 1);
        assert_eq!(a.sender.kanal_anzahl(), 0);
        assert_eq!(a.sender.senden(b"x"), SendeErgebnis::KeineKanaele);
    }

    #[test]
    fn warnung_ohne_id_ist_gedrosselt() {
        let puffer = LogPuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(puffer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        let a = aufbau();
        *a.sitzung.lokale_id.lock() = None;
        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..250 {
                assert_eq!(a.sender.senden(b"x"), SendeErgebnis::OhneId);
            }
        });

        // Schonfrist 99, danach jede 50. Meldung: 100, 150, 200, 250
        let text = puffer.text();
        let warnungen = text
            .lines()
            .filter(|l| l.contains("Voice vor Vergabe einer Client-ID gesendet"))
            .count();
        assert_eq!(warnungen, 4, "{text}");
        assert!(text.contains("verworfen=100"));
        assert!(!text.contains("verworfen=99"));
    }

    #[test]
    fn spieler_verlassen_stellt_kanal_zurueck() {
        let a = aufbau();
        a.clients.hinzufuegen(4, "dora", &[]);
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.spieler_kanal_oeffnen("dora", &e).expect("oeffnen");

        a.clients.entfernen("dora");
        a.sender.spieler_verlassen("dora");
        assert_eq!(a.sender.kanal_anzahl(), 0);
        assert_eq!(a.sender.ausstehend_anzahl(), 1);

        // Schliessen entfernt auch den wartenden Kanal
        a.sender.spieler_kanal_schliessen("dora", &e).expect("schliessen");
        assert_eq!(a.sender.ausstehend_anzahl(), 0);
    }

    #[test]
    fn schliessender_spielerkanal_wird_beim_verlassen_nicht_zurueckgestellt() {
        let a = aufbau();
        a.clients.hinzufuegen(4, "dora", &[]);
        let e = Arc::new(KanalEigenschaften::default());
        a.sender.spieler_kanal_oeffnen("dora", &e).expect("oeffnen");
        a.sender.spieler_kanal_schliessen("dora", &e).expect("schliessen");
        a.sender.spieler_verlassen("dora");
        assert_eq!(a.sender.ausstehend_anzahl(), 0);
    }

    #[test]
    fn defekt_aus_ereignis_wird_gemeldet() {
        let a = aufbau();
        let e = Arc::new(KanalEigenschaften::default());
        for _ in 0..2 {
            a.bus.senden(SitzungsEreignis::RaumKanalGeoeffnet {
                raum: "Lobby".into(),
                eigenschaften: Arc::clone(&e),
            });
        }
        let fehler = a.sender.ereignisse_verarbeiten().unwrap_err();
        assert_eq!(fehler.diagnose(), Some(diagnose::KANAL_BEREITS_OFFEN));
    }

    #[test]
    fn stoppen_trennt_vom_bus() {
        let a = aufbau();
        a.clients.hinzufuegen(1, "bert", &["Lobby"]);
        a.sender.raum_kanal_oeffnen("Lobby", &Arc::new(KanalEigenschaften::default())).expect("oeffnen");
        a.sender.stoppen();

        assert_eq!(a.bus.abonnenten_anzahl(), 0);
        assert_eq!(a.sender.kanal_anzahl(), 0);
        assert_eq!(a.sender.senden(b"x"), SendeErgebnis::Gestoppt);
        assert_eq!(a.sender.ereignisse_verarbeiten().expect("leer"), 0);
    }
}
