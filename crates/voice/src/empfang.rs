//! Empfangsstelle – ordnet eingehende Voice-Pakete ihren Quellen zu
//!
//! Pro Absender werden ein Reorder-Buffer, ein Jitter-Schaetzer und die
//! Sequenz-Erweiterung gehalten. Der Reorder-Buffer erwartet einen Strom,
//! der bei 0 beginnt; die Empfangsstelle rechnet die erweiterten
//! Sequenznummern deshalb relativ zum ersten Frame eines Stroms.
//!
//! Der erste angekommene Frame legt den Strom-Anfang fest. Kommt ein
//! frueherer Frame desselben Stroms erst danach an (Vertauschung gleich zu
//! Beginn), liegt er vor dem Anfang und wird als `Verworfen` gemeldet. Das
//! kostet hoechstens die ersten Frames eines Stroms; ein Anfang mit Vorlauf
//! wuerde den Reorder-Buffer dagegen auf Frames warten lassen, die nie
//! kommen.
//!
//! Aendert sich die Kanal-Sitzung eines Absenders, beginnt ein neuer Strom:
//! Buffer und Jitter-Messung werden zurueckgesetzt und die Sitzungsnummer
//! der Quelle steigt. Der Aufrufer startet dann eine neue `SpeechSession`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

use sprechfunk_core::types::PlayerId;
use sprechfunk_protocol::nachricht::VoiceData;
use sprechfunk_protocol::sequenz::SequenzErweiterung;
use sprechfunk_protocol::voice::VoicePacket;

use crate::decoder::{BufferedDecoderPipeline, VoiceDecoder};
use crate::jitter::{JitterConfig, JitterSchaetzer};
use crate::reorder_buffer::{ReorderBuffer, ReorderBufferConfig};
use crate::sitzung::{SitzungsKontext, SpeechSession, WiedergabeConfig};

/// Ergebnis der Annahme eines Voice-Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmpfangsErgebnis {
    /// Erster Frame eines neuen Stroms dieser Quelle
    NeuerStrom { sitzung: u32, sequenz: u32 },
    /// Frame in einen laufenden Strom eingereiht
    Eingereiht { sequenz: u32 },
    /// Frame liegt vor dem Beginn des aktuellen Stroms
    Verworfen,
}

struct Quelle {
    erweiterung: SequenzErweiterung,
    basis: Option<u32>,
    kanal_sitzung: u16,
    sitzung: u32,
    puffer: Arc<ReorderBuffer>,
    jitter: Arc<JitterSchaetzer>,
}

impl Quelle {
    fn neuer_strom(&mut self, kanal_sitzung: u16) {
        self.puffer.zuruecksetzen();
        self.jitter.zuruecksetzen();
        self.erweiterung.zuruecksetzen();
        self.basis = None;
        self.kanal_sitzung = kanal_sitzung;
        self.sitzung = self.sitzung.wrapping_add(1);
    }

    /// Sequenz relativ zum Strom-Anfang
    fn einordnen(&mut self, sequenz: u16) -> Option<u32> {
        let erweitert = self.erweiterung.erweitern(sequenz)?;
        let basis = *self.basis.get_or_insert(erweitert);
        erweitert.checked_sub(basis)
    }
}

/// Empfangsseite aller entfernten Quellen
pub struct Empfangsstelle {
    puffer_config: ReorderBufferConfig,
    jitter_config: JitterConfig,
    quellen: DashMap<PlayerId, Quelle>,
}

impl Empfangsstelle {
    pub fn neu(puffer_config: ReorderBufferConfig, jitter_config: JitterConfig) -> Self {
        Self {
            puffer_config,
            jitter_config,
            quellen: DashMap::new(),
        }
    }

    /// Nimmt ein dekodiertes Voice-Paket an
    pub fn empfangen(&self, voice: VoiceData, jetzt: Instant) -> EmpfangsErgebnis {
        let absender = voice.absender;
        let (mut quelle, neu) = match self.quellen.entry(absender) {
            Entry::Vacant(e) => {
                tracing::debug!(absender = %absender, kanal_sitzung = voice.kanal_sitzung, "Neue Quelle");
                let quelle = Quelle {
                    erweiterung: SequenzErweiterung::neu(),
                    basis: None,
                    kanal_sitzung: voice.kanal_sitzung,
                    sitzung: 0,
                    puffer: Arc::new(ReorderBuffer::neu(self.puffer_config.clone())),
                    jitter: Arc::new(JitterSchaetzer::neu(self.jitter_config.clone())),
                };
                (e.insert(quelle), true)
            }
            Entry::Occupied(e) => {
                let mut quelle = e.into_ref();
                let neu = quelle.kanal_sitzung != voice.kanal_sitzung;
                if neu {
                    tracing::debug!(
                        absender = %absender,
                        alt = quelle.kanal_sitzung,
                        neu = voice.kanal_sitzung,
                        "Kanal-Sitzung gewechselt, Strom beginnt neu"
                    );
                    quelle.neuer_strom(voice.kanal_sitzung);
                }
                (quelle, neu)
            }
        };

        let Some(sequenz) = quelle.einordnen(voice.sequenz) else {
            tracing::trace!(absender = %absender, sequenz = voice.sequenz, "Frame vor Strom-Anfang verworfen");
            return EmpfangsErgebnis::Verworfen;
        };

        quelle.jitter.ankunft_erfassen(sequenz, jetzt);
        quelle
            .puffer
            .push(VoicePacket::neu(sequenz, absender, voice.nutzdaten));

        if neu {
            EmpfangsErgebnis::NeuerStrom {
                sitzung: quelle.sitzung,
                sequenz,
            }
        } else {
            EmpfangsErgebnis::Eingereiht { sequenz }
        }
    }

    /// Baut die Wiedergabe-Sitzung fuer den aktuellen Strom einer Quelle
    pub fn wiedergabe_starten(
        &self,
        absender: PlayerId,
        spieler: impl Into<String>,
        decoder: Box<dyn VoiceDecoder>,
        config: WiedergabeConfig,
        jetzt: Instant,
    ) -> Option<SpeechSession> {
        let quelle = self.quellen.get(&absender)?;
        let pipeline = BufferedDecoderPipeline::neu(Arc::clone(&quelle.puffer), decoder);
        Some(SpeechSession::neu(
            SitzungsKontext {
                spieler: spieler.into(),
                id: quelle.sitzung,
            },
            quelle.jitter.clone(),
            Box::new(pipeline),
            config,
            jetzt,
        ))
    }

    /// Markiert den Strom einer Quelle als beendet
    pub fn strom_beenden(&self, absender: PlayerId) -> bool {
        match self.quellen.get(&absender) {
            Some(quelle) => {
                quelle.puffer.stoppen();
                true
            }
            None => false,
        }
    }

    /// Vergisst eine Quelle (z.B. nach RemoveClient)
    pub fn quelle_entfernen(&self, absender: PlayerId) -> bool {
        match self.quellen.remove(&absender) {
            Some((_, quelle)) => {
                quelle.puffer.stoppen();
                true
            }
            None => false,
        }
    }

    pub fn puffer(&self, absender: PlayerId) -> Option<Arc<ReorderBuffer>> {
        self.quellen.get(&absender).map(|q| Arc::clone(&q.puffer))
    }

    pub fn quellen_anzahl(&self) -> usize {
        self.quellen.len()
    }
}

impl Default for Empfangsstelle {
    fn default() -> Self {
        Self::neu(ReorderBufferConfig::default(), JitterConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
