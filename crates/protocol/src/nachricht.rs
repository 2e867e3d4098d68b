//! Binaere Nachrichten zwischen Clients und Sitzungs-Server
//!
//! Direkte Byte-Serialisierung, kein serde (Performance-kritisch, Voice-Pfad).
//! Alle Mehrbyte-Felder sind big-endian.
//!
//! ## Kopf (7 Bytes, jede Nachricht)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       2   Magic 0x8BC7
//!  2       1   MessageType
//!  3       4   Sitzungs-ID
//!  7+      N   Nachrichtenspezifischer Inhalt
//! ```
//!
//! Strings: `u16` Laenge + UTF-8. Die Laenge `0xFFFF` steht fuer "kein Wert".

use bytes::{Buf, BufMut, Bytes, BytesMut};
use sprechfunk_core::codec::{AudioCodec, CodecEinstellungen};
use sprechfunk_core::types::PlayerId;
use sprechfunk_core::{Result, SprechfunkError};

use crate::kanal_bitfeld::KanalBitfeld;

/// Magic-Nummer am Anfang jedes Pakets
pub const MAGIC: u16 = 0x8BC7;

/// Groesse des gemeinsamen Kopfs in Bytes
pub const KOPF_GROESSE: usize = 7;

/// Laengen-Markierung fuer einen fehlenden String
const KEIN_STRING: u16 = 0xFFFF;

/// Maximale String-Laenge in Bytes
pub const MAX_STRING_LAENGE: usize = 0xFFFE;

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// Art der Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    HandshakeRequest = 1,
    HandshakeResponse = 2,
    ClientState = 3,
    VoiceData = 4,
    RemoveClient = 5,
    DeltaChannelState = 6,
}

impl MessageType {
    /// Konvertiert ein Byte in einen `MessageType`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::HandshakeRequest),
            2 => Some(Self::HandshakeResponse),
            3 => Some(Self::ClientState),
            4 => Some(Self::VoiceData),
            5 => Some(Self::RemoveClient),
            6 => Some(Self::DeltaChannelState),
            _ => None,
        }
    }
}

/// Gemeinsamer Kopf aller Nachrichten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kopf {
    pub typ: MessageType,
    pub sitzungs_id: u32,
}

// ---------------------------------------------------------------------------
// Nachrichten-Inhalte
// ---------------------------------------------------------------------------

/// Anmeldung eines Clients
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeRequest {
    /// Spielername; `None` wenn der Client keinen Namen mitgeschickt hat
    pub name: Option<String>,
    pub codec: CodecEinstellungen,
}

/// Ein Eintrag der Teilnehmerliste
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEintrag {
    pub player_id: PlayerId,
    pub name: String,
    pub codec: CodecEinstellungen,
}

/// Mitglieder eines Raums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaumBelegung {
    pub raum: String,
    pub mitglieder: Vec<PlayerId>,
}

/// Antwort des Servers auf einen Handshake (nur an den Anfragenden)
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeResponse {
    pub sitzungs_id: u32,
    /// Vergebene ID des Anfragenden
    pub player_id: PlayerId,
    /// Alle bekannten Teilnehmer
    pub roster: Vec<RosterEintrag>,
    /// Raum-Mitgliedschaften
    pub raeume: Vec<RaumBelegung>,
}

/// Vollstaendiger Raum-Zustand eines Clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub sitzungs_id: u32,
    pub player_id: PlayerId,
    pub raeume: Vec<String>,
}

/// Einzelne Aenderung einer Raum-Mitgliedschaft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaChannelState {
    pub sitzungs_id: u32,
    /// `true` = Raum betreten, `false` = Raum verlassen
    pub beigetreten: bool,
    pub player_id: PlayerId,
    pub raum: String,
}

/// Ein Teilnehmer wurde aus der Sitzung entfernt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveClient {
    pub sitzungs_id: u32,
    pub player_id: PlayerId,
}

/// Kanal-Deskriptor im Voice-Paket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanalDeskriptor {
    pub bitfeld: KanalBitfeld,
    /// Spieler-ID oder Raum-ID
    pub empfaenger: u16,
    /// Raumname (Raum-IDs sind Hashes und nicht umkehrbar)
    pub name: Option<String>,
}

/// Ein kodierter Audio-Frame mit Kanal-Liste
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceData {
    pub sitzungs_id: u32,
    pub absender: PlayerId,
    pub sequenz: u16,
    pub kanal_sitzung: u16,
    pub kanaele: Vec<KanalDeskriptor>,
    /// Kodierte Audiodaten (Sicht auf den Empfangspuffer, keine Kopie)
    pub nutzdaten: Bytes,
}

/// Alle dekodierbaren Nachrichten
#[derive(Debug, Clone, PartialEq)]
pub enum Nachricht {
    HandshakeRequest(HandshakeRequest),
    HandshakeResponse(HandshakeResponse),
    ClientState(ClientState),
    VoiceData(VoiceData),
    RemoveClient(RemoveClient),
    DeltaChannelState(DeltaChannelState),
}

impl Nachricht {
    /// Dekodiert eine vollstaendige Nachricht
    pub fn dekodieren(daten: Bytes) -> Result<Self> {
        let mut reader = PacketReader::neu(daten);
        let kopf = reader.kopf_lesen()?;
        let nachricht = match kopf.typ {
            MessageType::HandshakeRequest => Self::HandshakeRequest(reader.handshake_request_lesen()?),
            MessageType::HandshakeResponse => {
                Self::HandshakeResponse(reader.handshake_response_lesen(kopf)?)
            }
            MessageType::ClientState => Self::ClientState(reader.client_state_lesen(kopf)?),
            MessageType::VoiceData => Self::VoiceData(reader.voice_data_lesen(kopf)?),
            MessageType::RemoveClient => Self::RemoveClient(reader.remove_client_lesen(kopf)?),
            MessageType::DeltaChannelState => {
                Self::DeltaChannelState(reader.delta_channel_state_lesen(kopf)?)
            }
        };
        Ok(nachricht)
    }
}

// ---------------------------------------------------------------------------
// PacketWriter
// ---------------------------------------------------------------------------

/// Schreibt Nachrichten in einen (typischerweise gepoolten) Puffer
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    /// Erstellt einen Writer ueber einem leeren Puffer
    pub fn neu(mut buf: BytesMut) -> Self {
        buf.clear();
        Self { buf }
    }

    /// Gibt den geschriebenen Puffer zurueck
    pub fn fertig(self) -> BytesMut {
        self.buf
    }

    /// Bisher geschriebene Bytes
    pub fn geschrieben(&self) -> &[u8] {
        &self.buf
    }

    pub fn handshake_request_schreiben(
        &mut self,
        name: Option<&str>,
        codec: &CodecEinstellungen,
    ) -> &mut Self {
        self.kopf(MessageType::HandshakeRequest, 0);
        self.string(name);
        self.codec(codec);
        self
    }

    pub fn handshake_response_schreiben(
        &mut self,
        sitzungs_id: u32,
        player_id: PlayerId,
        roster: &[RosterEintrag],
        raeume: &[RaumBelegung],
    ) -> &mut Self {
        self.kopf(MessageType::HandshakeResponse, sitzungs_id);
        self.buf.put_u16(player_id.0);

        let roster = self.anzahl(roster, "Roster");
        for eintrag in roster {
            self.buf.put_u16(eintrag.player_id.0);
            self.string(Some(&eintrag.name));
            self.codec(&eintrag.codec);
        }

        let raeume = self.anzahl(raeume, "Raeume");
        for raum in raeume {
            self.string(Some(&raum.raum));
            let mitglieder = self.anzahl(&raum.mitglieder, "Raum-Mitglieder");
            for id in mitglieder {
                self.buf.put_u16(id.0);
            }
        }
        self
    }

    pub fn client_state_schreiben(
        &mut self,
        sitzungs_id: u32,
        player_id: PlayerId,
        raeume: &[String],
    ) -> &mut Self {
        self.kopf(MessageType::ClientState, sitzungs_id);
        self.buf.put_u16(player_id.0);
        let raeume = self.anzahl(raeume, "Raeume");
        for raum in raeume {
            self.string(Some(raum));
        }
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn voice_data_schreiben(
        &mut self,
        sitzungs_id: u32,
        absender: PlayerId,
        sequenz: u16,
        kanal_sitzung: u16,
        kanaele: &[KanalDeskriptor],
        nutzdaten: &[u8],
    ) -> &mut Self {
        self.kopf(MessageType::VoiceData, sitzungs_id);
        self.buf.put_u16(absender.0);
        self.buf.put_u16(sequenz);
        self.buf.put_u16(kanal_sitzung);
        let kanaele = self.anzahl(kanaele, "Kanaele");
        for kanal in kanaele {
            self.buf.put_u16(kanal.bitfeld.0);
            self.buf.put_u16(kanal.empfaenger);
            self.string(kanal.name.as_deref());
        }
        self.buf.put_slice(nutzdaten);
        self
    }

    pub fn remove_client_schreiben(&mut self, sitzungs_id: u32, player_id: PlayerId) -> &mut Self {
        self.kopf(MessageType::RemoveClient, sitzungs_id);
        self.buf.put_u16(player_id.0);
        self
    }

    pub fn delta_channel_state_schreiben(
        &mut self,
        sitzungs_id: u32,
        beigetreten: bool,
        player_id: PlayerId,
        raum: &str,
    ) -> &mut Self {
        self.kopf(MessageType::DeltaChannelState, sitzungs_id);
        self.buf.put_u8(beigetreten as u8);
        self.buf.put_u16(player_id.0);
        self.string(Some(raum));
        self
    }

    // -----------------------------------------------------------------------
    // Primitive
    // -----------------------------------------------------------------------

    fn kopf(&mut self, typ: MessageType, sitzungs_id: u32) {
        self.buf.reserve(KOPF_GROESSE);
        self.buf.put_u16(MAGIC);
        self.buf.put_u8(typ as u8);
        self.buf.put_u32(sitzungs_id);
    }

    /// Schreibt die Laenge einer Liste als u16 und gibt die Eintraege zurueck,
    /// die tatsaechlich geschrieben werden duerfen
    fn anzahl<'a, T>(&mut self, liste: &'a [T], was: &str) -> &'a [T] {
        let anzahl = match u16::try_from(liste.len()) {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    liste = was,
                    laenge = liste.len(),
                    "Liste passt nicht in ein u16-Laengenfeld, wird gekuerzt"
                );
                u16::MAX
            }
        };
        self.buf.put_u16(anzahl);
        &liste[..anzahl as usize]
    }

    fn string(&mut self, wert: Option<&str>) {
        match wert {
            None => self.buf.put_u16(KEIN_STRING),
            Some(s) => {
                // Auf Zeichengrenze kuerzen, damit der Empfaenger gueltiges UTF-8 liest
                let mut ende = s.len().min(MAX_STRING_LAENGE);
                while !s.is_char_boundary(ende) {
                    ende -= 1;
                }
                self.buf.put_u16(ende as u16);
                self.buf.put_slice(&s.as_bytes()[..ende]);
            }
        }
    }

    fn codec(&mut self, codec: &CodecEinstellungen) {
        self.buf.put_u8(codec.codec as u8);
        self.buf.put_u32(codec.frame_groesse);
        self.buf.put_u32(codec.abtastrate);
    }
}

// ---------------------------------------------------------------------------
// PacketReader
// ---------------------------------------------------------------------------

/// Liest Nachrichten aus einem empfangenen Paket
///
/// Prueft vor jedem Zugriff die verbleibende Laenge; beliebige Eingaben
/// fuehren zu `UngueltigeNachricht`, nie zu einem Panic.
pub struct PacketReader {
    alle: Bytes,
    rest: Bytes,
}

impl PacketReader {
    pub fn neu(daten: Bytes) -> Self {
        Self {
            rest: daten.clone(),
            alle: daten,
        }
    }

    /// Das vollstaendige, unveraenderte Paket (fuer Weiterleitung)
    pub fn alle(&self) -> &Bytes {
        &self.alle
    }

    /// Liest und validiert den Kopf
    pub fn kopf_lesen(&mut self) -> Result<Kopf> {
        self.bedarf(KOPF_GROESSE, "Kopf")?;
        let magic = self.rest.get_u16();
        if magic != MAGIC {
            return Err(SprechfunkError::ungueltig(format!(
                "Falsche Magic-Nummer: {:#06x} (erwartet {:#06x})",
                magic, MAGIC
            )));
        }
        let typ_byte = self.rest.get_u8();
        let typ = MessageType::from_u8(typ_byte)
            .ok_or(SprechfunkError::UnbekannterNachrichtentyp(typ_byte))?;
        let sitzungs_id = self.rest.get_u32();
        Ok(Kopf { typ, sitzungs_id })
    }

    pub fn handshake_request_lesen(&mut self) -> Result<HandshakeRequest> {
        let name = self.string()?;
        let codec = self.codec()?;
        Ok(HandshakeRequest { name, codec })
    }

    pub fn handshake_response_lesen(&mut self, kopf: Kopf) -> Result<HandshakeResponse> {
        let player_id = self.player_id()?;

        let anzahl = self.u16("Roster-Laenge")?;
        let mut roster = Vec::with_capacity((anzahl as usize).min(self.rest.len()));
        for _ in 0..anzahl {
            let id = self.player_id()?;
            let name = self.pflicht_string("Roster-Name")?;
            let codec = self.codec()?;
            roster.push(RosterEintrag {
                player_id: id,
                name,
                codec,
            });
        }

        let raum_anzahl = self.u16("Raum-Anzahl")?;
        let mut raeume = Vec::with_capacity((raum_anzahl as usize).min(self.rest.len()));
        for _ in 0..raum_anzahl {
            let raum = self.pflicht_string("Raumname")?;
            let mitglieder_anzahl = self.u16("Mitglieder-Anzahl")?;
            let mut mitglieder = Vec::with_capacity((mitglieder_anzahl as usize).min(self.rest.len()));
            for _ in 0..mitglieder_anzahl {
                mitglieder.push(self.player_id()?);
            }
            raeume.push(RaumBelegung { raum, mitglieder });
        }

        Ok(HandshakeResponse {
            sitzungs_id: kopf.sitzungs_id,
            player_id,
            roster,
            raeume,
        })
    }

    pub fn client_state_lesen(&mut self, kopf: Kopf) -> Result<ClientState> {
        let player_id = self.player_id()?;
        let anzahl = self.u16("Raum-Anzahl")?;
        let mut raeume = Vec::with_capacity((anzahl as usize).min(self.rest.len()));
        for _ in 0..anzahl {
            raeume.push(self.pflicht_string("Raumname")?);
        }
        Ok(ClientState {
            sitzungs_id: kopf.sitzungs_id,
            player_id,
            raeume,
        })
    }

    pub fn voice_data_lesen(&mut self, kopf: Kopf) -> Result<VoiceData> {
        let absender = self.player_id()?;
        let sequenz = self.u16("Sequenz")?;
        let kanal_sitzung = self.u16("Kanal-Sitzung")?;
        let anzahl = self.u16("Kanal-Anzahl")?;
        let mut kanaele = Vec::with_capacity((anzahl as usize).min(self.rest.len()));
        for _ in 0..anzahl {
            let bitfeld = KanalBitfeld(self.u16("Kanal-Bitfeld")?);
            let empfaenger = self.u16("Kanal-Empfaenger")?;
            let name = self.string()?;
            kanaele.push(KanalDeskriptor {
                bitfeld,
                empfaenger,
                name,
            });
        }
        // Rest sind die Audiodaten; copy_to_bytes auf Bytes ist zero-copy
        let nutzdaten = self.rest.copy_to_bytes(self.rest.remaining());
        Ok(VoiceData {
            sitzungs_id: kopf.sitzungs_id,
            absender,
            sequenz,
            kanal_sitzung,
            kanaele,
            nutzdaten,
        })
    }

    pub fn remove_client_lesen(&mut self, kopf: Kopf) -> Result<RemoveClient> {
        Ok(RemoveClient {
            sitzungs_id: kopf.sitzungs_id,
            player_id: self.player_id()?,
        })
    }

    pub fn delta_channel_state_lesen(&mut self, kopf: Kopf) -> Result<DeltaChannelState> {
        self.bedarf(1, "Beitritts-Flag")?;
        let beigetreten = self.rest.get_u8() != 0;
        let player_id = self.player_id()?;
        let raum = self.pflicht_string("Raumname")?;
        Ok(DeltaChannelState {
            sitzungs_id: kopf.sitzungs_id,
            beigetreten,
            player_id,
            raum,
        })
    }

    // -----------------------------------------------------------------------
    // Primitive
    // -----------------------------------------------------------------------

    fn bedarf(&self, n: usize, feld: &str) -> Result<()> {
        if self.rest.remaining() < n {
            return Err(SprechfunkError::ungueltig(format!(
                "{feld}: {} Bytes benoetigt, {} vorhanden",
                n,
                self.rest.remaining()
            )));
        }
        Ok(())
    }

    fn u16(&mut self, feld: &str) -> Result<u16> {
        self.bedarf(2, feld)?;
        Ok(self.rest.get_u16())
    }

    fn player_id(&mut self) -> Result<PlayerId> {
        Ok(PlayerId(self.u16("Spieler-ID")?))
    }

    fn string(&mut self) -> Result<Option<String>> {
        let laenge = self.u16("String-Laenge")?;
        if laenge == KEIN_STRING {
            return Ok(None);
        }
        self.bedarf(laenge as usize, "String")?;
        let roh = self.rest.copy_to_bytes(laenge as usize);
        String::from_utf8(roh.to_vec())
            .map(Some)
            .map_err(|e| SprechfunkError::ungueltig(format!("String kein UTF-8: {e}")))
    }

    fn pflicht_string(&mut self, feld: &str) -> Result<String> {
        self.string()?
            .ok_or_else(|| SprechfunkError::ungueltig(format!("{feld} fehlt")))
    }

    fn codec(&mut self) -> Result<CodecEinstellungen> {
        self.bedarf(9, "Codec-Einstellungen")?;
        let codec_byte = self.rest.get_u8();
        let codec = AudioCodec::from_u8(codec_byte)
            .ok_or_else(|| SprechfunkError::ungueltig(format!("Unbekannter Codec: {codec_byte}")))?;
        let frame_groesse = self.rest.get_u32();
        let abtastrate = self.rest.get_u32();
        Ok(CodecEinstellungen {
            codec,
            frame_groesse,
            abtastrate,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sprechfunk_core::kanal::{KanalPrioritaet, KanalTyp};

    fn schreiber() -> PacketWriter {
        PacketWriter::neu(BytesMut::with_capacity(256))
    }

    fn dekodieren(w: PacketWriter) -> Nachricht {
        Nachricht::dekodieren(w.fertig().freeze()).expect("Decode muss erfolgreich sein")
    }

    #[test]
    fn kopf_ist_7_bytes_big_endian() {
        let mut w = schreiber();
        w.remove_client_schreiben(0x01020304, PlayerId(9));
        let bytes = w.geschrieben();
        assert_eq!(&bytes[0..2], &[0x8B, 0xC7]);
        assert_eq!(bytes[2], MessageType::RemoveClient as u8);
        assert_eq!(&bytes[3..7], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bytes.len(), KOPF_GROESSE + 2);
    }

    #[test]
    fn zu_lange_liste_wird_auf_u16_gekuerzt() {
        let raeume: Vec<String> = (0..u16::MAX as usize + 10).map(|i| format!("r{i}")).collect();
        let mut w = PacketWriter::neu(BytesMut::new());
        w.client_state_schreiben(5, PlayerId(2), &raeume);
        match dekodieren(w) {
            Nachricht::ClientState(c) => {
                assert_eq!(c.raeume.len(), u16::MAX as usize);
                assert_eq!(c.raeume[0], "r0");
                assert_eq!(c.raeume.last().map(String::as_str), Some("r65534"));
            }
            andere => panic!("Erwartet ClientState, erhalten {andere:?}"),
        }
    }

    #[test]
    fn handshake_ohne_namen_bleibt_ohne_namen() {
        let mut w = schreiber();
        w.handshake_request_schreiben(None, &CodecEinstellungen::default());
        match dekodieren(w) {
            Nachricht::HandshakeRequest(r) => {
                assert!(r.name.is_none());
                assert_eq!(r.codec, CodecEinstellungen::default());
            }
            andere => panic!("Erwartet HandshakeRequest, erhalten {andere:?}"),
        }
    }

    #[test]
    fn handshake_response_mit_roster_und_raeumen() {
        let roster = vec![
            RosterEintrag {
                player_id: PlayerId(0),
                name: "anna".into(),
                codec: CodecEinstellungen::default(),
            },
            RosterEintrag {
                player_id: PlayerId(1),
                name: "bert".into(),
                codec: CodecEinstellungen {
                    codec: AudioCodec::Identity,
                    frame_groesse: 480,
                    abtastrate: 24_000,
                },
            },
        ];
        let raeume = vec![RaumBelegung {
            raum: "Lobby".into(),
            mitglieder: vec![PlayerId(0), PlayerId(1)],
        }];

        let mut w = schreiber();
        w.handshake_response_schreiben(77, PlayerId(1), &roster, &raeume);
        match dekodieren(w) {
            Nachricht::HandshakeResponse(r) => {
                assert_eq!(r.sitzungs_id, 77);
                assert_eq!(r.player_id, PlayerId(1));
                assert_eq!(r.roster, roster);
                assert_eq!(r.raeume, raeume);
            }
            andere => panic!("Erwartet HandshakeResponse, erhalten {andere:?}"),
        }
    }

    #[test]
    fn voice_data_nutzdaten_sind_rest_des_pakets() {
        let kanaele = vec![
            KanalDeskriptor {
                bitfeld: KanalBitfeld::neu(
                    KanalTyp::Spieler,
                    1,
                    KanalPrioritaet::Standard,
                    1.0,
                    false,
                    false,
                ),
                empfaenger: 4,
                name: None,
            },
            KanalDeskriptor {
                bitfeld: KanalBitfeld::neu(KanalTyp::Raum, 0, KanalPrioritaet::Hoch, 0.5, true, true),
                empfaenger: 0xBEEF,
                name: Some("Lobby".into()),
            },
        ];

        let mut w = schreiber();
        w.voice_data_schreiben(5, PlayerId(2), 65535, 3, &kanaele, &[1, 2, 3, 4]);
        match dekodieren(w) {
            Nachricht::VoiceData(v) => {
                assert_eq!(v.absender, PlayerId(2));
                assert_eq!(v.sequenz, 65535);
                assert_eq!(v.kanal_sitzung, 3);
                assert_eq!(v.kanaele, kanaele);
                assert_eq!(&v.nutzdaten[..], &[1, 2, 3, 4]);
            }
            andere => panic!("Erwartet VoiceData, erhalten {andere:?}"),
        }
    }

    #[test]
    fn delta_channel_state_und_client_state() {
        let mut w = schreiber();
        w.delta_channel_state_schreiben(1, true, PlayerId(3), "Team Rot");
        assert_eq!(
            dekodieren(w),
            Nachricht::DeltaChannelState(DeltaChannelState {
                sitzungs_id: 1,
                beigetreten: true,
                player_id: PlayerId(3),
                raum: "Team Rot".into(),
            })
        );

        let mut w = schreiber();
        w.client_state_schreiben(1, PlayerId(3), &["a".to_string(), "b".to_string()]);
        assert_eq!(
            dekodieren(w),
            Nachricht::ClientState(ClientState {
                sitzungs_id: 1,
                player_id: PlayerId(3),
                raeume: vec!["a".into(), "b".into()],
            })
        );
    }

    #[test]
    fn falsche_magic_wird_abgelehnt() {
        let mut w = schreiber();
        w.remove_client_schreiben(1, PlayerId(1));
        let mut bytes = w.fertig();
        bytes[0] = 0;
        assert!(Nachricht::dekodieren(bytes.freeze()).is_err());
    }

    #[test]
    fn unbekannter_typ_wird_gemeldet() {
        let mut w = schreiber();
        w.remove_client_schreiben(1, PlayerId(1));
        let mut bytes = w.fertig();
        bytes[2] = 200;
        match Nachricht::dekodieren(bytes.freeze()) {
            Err(SprechfunkError::UnbekannterNachrichtentyp(200)) => {}
            andere => panic!("Erwartet UnbekannterNachrichtentyp, erhalten {andere:?}"),
        }
    }

    #[test]
    fn abgeschnittene_pakete_werden_abgelehnt() {
        let mut w = schreiber();
        w.handshake_response_schreiben(
            1,
            PlayerId(0),
            &[RosterEintrag {
                player_id: PlayerId(0),
                name: "anna".into(),
                codec: CodecEinstellungen::default(),
            }],
            &[],
        );
        let voll = w.fertig().freeze();
        for laenge in 0..voll.len() {
            assert!(
                Nachricht::dekodieren(voll.slice(..laenge)).is_err(),
                "Laenge {laenge} darf nicht dekodierbar sein"
            );
        }
    }

    #[test]
    fn writer_verwirft_alten_pufferinhalt() {
        let mut alt = BytesMut::new();
        alt.put_slice(b"muell");
        let mut w = PacketWriter::neu(alt);
        w.remove_client_schreiben(1, PlayerId(1));
        assert_eq!(w.geschrieben().len(), KOPF_GROESSE + 2);
    }

    mod eigenschaften {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn beliebige_bytes_paniken_nie(daten in proptest::collection::vec(any::<u8>(), 0..128)) {
                let _ = Nachricht::dekodieren(Bytes::from(daten));
            }

            #[test]
            fn beliebige_bytes_mit_gueltigem_kopf_paniken_nie(
                typ in 1u8..=6,
                rest in proptest::collection::vec(any::<u8>(), 0..96),
            ) {
                let mut daten = vec![0x8B, 0xC7, typ, 0, 0, 0, 1];
                daten.extend(rest);
                let _ = Nachricht::dekodieren(Bytes::from(daten));
            }
        }
    }
}
