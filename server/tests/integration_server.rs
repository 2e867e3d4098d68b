//! End-to-End: Verbindungen -> Eingangs-Queue -> Sitzungs-Autoritaet -> Sende-Queues

use bytes::Bytes;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

use sprechfunk_core::codec::CodecEinstellungen;
use sprechfunk_core::types::PlayerId;
use sprechfunk_protocol::nachricht::{HandshakeRequest, Nachricht, PacketWriter};
use sprechfunk_server::{config::ServerConfig, Server, Verbindung};

fn config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.sitzung.id = 99;
    config
}

fn handshake(name: &str) -> Bytes {
    let mut w = PacketWriter::neu(Default::default());
    w.handshake_request_schreiben(Some(name), &CodecEinstellungen::default());
    w.fertig().freeze()
}

async fn naechste(v: &mut Verbindung) -> Nachricht {
    let roh = timeout(Duration::from_secs(2), v.empfangen())
        .await
        .expect("Antwort innerhalb von 2s")
        .expect("Sende-Queue offen");
    Nachricht::dekodieren(roh).expect("gueltiges Paket")
}

#[tokio::test]
async fn handshake_raumwechsel_und_trennung() {
    let server = Server::neu(config());
    assert_eq!(server.sitzungs_id(), 99);
    let handle = server.handle();
    let (stopp_tx, stopp_rx) = oneshot::channel::<()>();
    let lauf = tokio::spawn(server.laufen(async {
        let _ = stopp_rx.await;
    }));

    let mut anna = handle.verbinden();
    let mut bert = handle.verbinden();

    anna.senden(handshake("anna")).await.expect("senden");
    let Nachricht::HandshakeResponse(antwort) = naechste(&mut anna).await else {
        panic!("anna erwartet eine HandshakeResponse");
    };
    assert_eq!(antwort.sitzungs_id, 99);
    assert_eq!(antwort.player_id, PlayerId(0));

    bert.senden(handshake("bert")).await.expect("senden");
    let Nachricht::HandshakeResponse(antwort) = naechste(&mut bert).await else {
        panic!("bert erwartet eine HandshakeResponse");
    };
    assert_eq!(antwort.player_id, PlayerId(1));
    assert_eq!(antwort.roster.len(), 2);

    // Raumwechsel geht an beide, unveraendert
    let mut w = PacketWriter::neu(Default::default());
    w.delta_channel_state_schreiben(99, true, PlayerId(1), "Funkraum");
    let delta = w.fertig().freeze();
    bert.senden(delta.clone()).await.expect("senden");
    for v in [&mut anna, &mut bert] {
        let roh = timeout(Duration::from_secs(2), v.empfangen())
            .await
            .expect("Weiterleitung")
            .expect("Queue offen");
        assert_eq!(roh, delta);
    }

    // Paket fuer eine fremde Sitzung wird nicht weitergeleitet
    let mut w = PacketWriter::neu(Default::default());
    w.delta_channel_state_schreiben(98, false, PlayerId(1), "Funkraum");
    bert.senden(w.fertig().freeze()).await.expect("senden");

    // bert trennt sich, anna bekommt RemoveClient
    drop(bert);
    let Nachricht::RemoveClient(weg) = naechste(&mut anna).await else {
        panic!("anna erwartet RemoveClient");
    };
    assert_eq!(weg.sitzungs_id, 99);
    assert_eq!(weg.player_id, PlayerId(1));

    stopp_tx.send(()).expect("Server laeuft noch");
    lauf.await.expect("Task").expect("Server ohne Fehler");
}

#[tokio::test]
async fn server_endet_ohne_handles() {
    let server = Server::neu(config());
    let handle = server.handle();
    let verbindung = handle.verbinden();
    drop(handle);

    let lauf = tokio::spawn(server.laufen(std::future::pending()));
    drop(verbindung);

    timeout(Duration::from_secs(2), lauf)
        .await
        .expect("Server endet")
        .expect("Task")
        .expect("Server ohne Fehler");
}

#[tokio::test]
async fn trennung_bei_voller_eingangs_queue_geht_nicht_verloren() {
    let mut config = config();
    config.sitzung.eingang_kapazitaet = 1;
    let server = Server::neu(config);
    let autoritaet = server.autoritaet();
    let handle = server.handle();

    let mut anna = handle.verbinden();
    let bert = handle.verbinden();
    autoritaet
        .handshake_verarbeiten(
            &bert.id(),
            HandshakeRequest {
                name: Some("bert".into()),
                codec: CodecEinstellungen::default(),
            },
        )
        .expect("Handshake");
    assert_eq!(autoritaet.clients().anzahl(), 1);

    // Server laeuft noch nicht: annas Handshake belegt die einzige Stelle
    anna.senden(handshake("anna")).await.expect("senden");
    drop(bert);

    let (stopp_tx, stopp_rx) = oneshot::channel::<()>();
    let lauf = tokio::spawn(server.laufen(async {
        let _ = stopp_rx.await;
    }));

    let Nachricht::HandshakeResponse(antwort) = naechste(&mut anna).await else {
        panic!("anna erwartet eine HandshakeResponse");
    };
    assert_eq!(antwort.sitzungs_id, 99);

    timeout(Duration::from_secs(2), async {
        while autoritaet.clients().anzahl() != 1
            || autoritaet.clients().nach_verbindung(&anna.id()).is_none()
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bert wird aus dem Roster entfernt");

    stopp_tx.send(()).expect("Server laeuft noch");
    lauf.await.expect("Task").expect("Server ohne Fehler");
}
