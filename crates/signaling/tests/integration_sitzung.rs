//! End-to-End: mehrere Teilnehmer an einer Sitzungs-Autoritaet

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use sprechfunk_core::codec::CodecEinstellungen;
use sprechfunk_core::event::{EreignisBus, SitzungsEreignis};
use sprechfunk_core::transport::Transport;
use sprechfunk_core::types::PlayerId;
use sprechfunk_protocol::nachricht::{Nachricht, PacketWriter};
use sprechfunk_protocol::pool::PufferPool;
use sprechfunk_signaling::{
    ClientSammlung, NachrichtenVerteiler, PlayerIdRegistry, SitzungsAutoritaet, Verarbeitet,
};

/// Eine Queue pro Verbindung, wie ein echter Transport mit Sende-Task
#[derive(Default)]
struct Postaemter {
    queues: DashMap<u32, mpsc::UnboundedSender<Bytes>>,
}

impl Postaemter {
    fn verbinden(&self, peer: u32) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.insert(peer, tx);
        rx
    }

    fn trennen(&self, peer: u32) {
        self.queues.remove(&peer);
    }
}

impl Transport<u32> for Postaemter {
    fn zuverlaessig_senden(&self, ziel: &u32, daten: &[u8]) -> bool {
        self.queues
            .get(ziel)
            .map(|tx| tx.send(Bytes::copy_from_slice(daten)).is_ok())
            .unwrap_or(false)
    }

    fn unzuverlaessig_senden(&self, ziel: &u32, daten: &[u8]) -> bool {
        self.zuverlaessig_senden(ziel, daten)
    }
}

fn server() -> (NachrichtenVerteiler<u32>, Arc<Postaemter>, EreignisBus) {
    let post = Arc::new(Postaemter::default());
    let bus = EreignisBus::neu();
    let clients = ClientSammlung::neu(Arc::new(PlayerIdRegistry::neu()), bus.clone());
    let autoritaet = SitzungsAutoritaet::neu(4711, post.clone(), clients, Arc::new(PufferPool::default()));
    (NachrichtenVerteiler::neu(Arc::new(autoritaet)), post, bus)
}

fn handshake(name: &str) -> Bytes {
    let mut w = PacketWriter::neu(Default::default());
    w.handshake_request_schreiben(Some(name), &CodecEinstellungen::default());
    w.fertig().freeze()
}

async fn naechste(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Nachricht {
    let roh = rx.recv().await.expect("Queue offen");
    Nachricht::dekodieren(roh).expect("gueltiges Paket")
}

#[tokio::test]
async fn raumwechsel_erreicht_alle_teilnehmer() {
    let (verteiler, post, _bus) = server();
    let mut anna = post.verbinden(1);
    let mut bert = post.verbinden(2);

    verteiler.verarbeiten(&1, handshake("anna")).expect("anna");
    verteiler.verarbeiten(&2, handshake("bert")).expect("bert");

    let Nachricht::HandshakeResponse(antwort) = naechste(&mut bert).await else {
        panic!("bert erwartet eine HandshakeResponse");
    };
    assert_eq!(antwort.sitzungs_id, 4711);
    assert_eq!(antwort.player_id, PlayerId(1));
    assert_eq!(antwort.roster.len(), 2);
    assert!(matches!(naechste(&mut anna).await, Nachricht::HandshakeResponse(_)));

    // bert fuehrt eine eigene, nicht-autoritative Buchhaltung
    let bert_sicht: ClientSammlung<u32> =
        ClientSammlung::neu(Arc::new(PlayerIdRegistry::neu()), EreignisBus::neu());
    for eintrag in &antwort.roster {
        bert_sicht
            .holen_oder_anlegen(&eintrag.name, eintrag.codec, 0)
            .expect("roster");
    }

    let mut w = PacketWriter::neu(Default::default());
    w.delta_channel_state_schreiben(4711, true, PlayerId(0), "Funkraum");
    let r = verteiler.verarbeiten(&1, w.fertig().freeze()).expect("delta");
    assert_eq!(r, Verarbeitet::Weitergeleitet(2));

    let Nachricht::DeltaChannelState(delta) = naechste(&mut bert).await else {
        panic!("bert erwartet den Raumwechsel");
    };
    assert!(bert_sicht.delta_anwenden(&delta));
    assert_eq!(
        bert_sicht.raum_belegung(),
        verteiler.autoritaet().clients().raum_belegung()
    );
}

#[tokio::test]
async fn neu_verbinden_ersetzt_die_alte_verbindung() {
    let (verteiler, post, bus) = server();
    let mut ereignisse = bus.abonnieren();
    let _anna_alt = post.verbinden(1);
    let mut bert = post.verbinden(2);

    verteiler.verarbeiten(&1, handshake("anna")).expect("anna");
    verteiler.verarbeiten(&2, handshake("bert")).expect("bert");
    assert!(matches!(naechste(&mut bert).await, Nachricht::HandshakeResponse(_)));

    // Die alte Verbindung ist tot, anna kommt ueber eine neue herein
    post.trennen(1);
    let mut anna_neu = post.verbinden(3);
    let r = verteiler.verarbeiten(&3, handshake("anna")).expect("anna neu");
    assert_eq!(r, Verarbeitet::Handshake(Some(PlayerId(0))));

    let Nachricht::RemoveClient(weg) = naechste(&mut bert).await else {
        panic!("bert erwartet RemoveClient");
    };
    assert_eq!(weg.player_id, PlayerId(0));

    let Nachricht::HandshakeResponse(antwort) = naechste(&mut anna_neu).await else {
        panic!("anna erwartet eine HandshakeResponse");
    };
    assert_eq!(antwort.player_id, PlayerId(0));

    let mut verlauf = Vec::new();
    while let Some(e) = ereignisse.empfangen() {
        verlauf.push(e);
    }
    let namen: Vec<_> = verlauf
        .iter()
        .map(|e| match e {
            SitzungsEreignis::SpielerBeigetreten { name, .. } => format!("+{name}"),
            SitzungsEreignis::SpielerVerlassen { name } => format!("-{name}"),
            andere => panic!("unerwartetes Ereignis {andere:?}"),
        })
        .collect();
    assert_eq!(namen, ["+anna", "+bert", "-anna", "+anna"]);
}
