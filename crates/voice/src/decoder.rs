//! Dekodier-Pipeline und Codec-Vertraege
//!
//! Die Wiedergabe-Sitzung kennt nur [`DecoderPipeline`]. Die gepufferte
//! Pipeline verbindet einen [`ReorderBuffer`] mit einem [`VoiceDecoder`]:
//! pro fehlendem Frame liefert der Decoder Ersatz-Samples (beim
//! Identity-Codec Stille).
//!
//! Der Identity-Codec uebertraegt rohe f32-Samples (little-endian) und dient
//! Tests und Loopback.

use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;

use crate::reorder_buffer::ReorderBuffer;
use crate::sitzung::SitzungsKontext;

// ---------------------------------------------------------------------------
// Codec-Vertraege
// ---------------------------------------------------------------------------

/// Dekodiert einen Frame in Samples
pub trait VoiceDecoder: Send {
    /// Samples pro Frame
    fn frame_groesse(&self) -> usize;

    /// Dekodiert `eingabe` in `ausgabe` (Laenge = `frame_groesse`)
    ///
    /// `None` bedeutet: der Frame fehlt, Ersatz erzeugen.
    fn dekodieren(&mut self, eingabe: Option<&[u8]>, ausgabe: &mut [f32]);

    /// Verwirft internen Zustand (neuer Strom)
    fn zuruecksetzen(&mut self) {}
}

/// Kodiert einen Frame; die Sequenznummer vergibt der Sender
pub trait VoiceEncoder: Send {
    /// Samples pro Frame
    fn frame_groesse(&self) -> usize;

    fn kodieren(&mut self, samples: &[f32]) -> Bytes;
}

/// Unkomprimierte Samples
#[derive(Debug, Clone)]
pub struct IdentityDecoder {
    frame_groesse: usize,
}

impl IdentityDecoder {
    pub fn neu(frame_groesse: usize) -> Self {
        Self { frame_groesse }
    }
}

impl VoiceDecoder for IdentityDecoder {
    fn frame_groesse(&self) -> usize {
        self.frame_groesse
    }

    fn dekodieren(&mut self, eingabe: Option<&[u8]>, ausgabe: &mut [f32]) {
        ausgabe.fill(0.0);
        let Some(eingabe) = eingabe else {
            return;
        };
        for (ziel, roh) in ausgabe.iter_mut().zip(eingabe.chunks_exact(4)) {
            *ziel = f32::from_le_bytes([roh[0], roh[1], roh[2], roh[3]]);
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityEncoder {
    frame_groesse: usize,
}

impl IdentityEncoder {
    pub fn neu(frame_groesse: usize) -> Self {
        Self { frame_groesse }
    }
}

impl VoiceEncoder for IdentityEncoder {
    fn frame_groesse(&self) -> usize {
        self.frame_groesse
    }

    fn kodieren(&mut self, samples: &[f32]) -> Bytes {
        let mut buf = BytesMut::with_capacity(samples.len() * 4);
        for s in samples {
            buf.put_f32_le(*s);
        }
        buf.freeze()
    }
}

// ---------------------------------------------------------------------------
// DecoderPipeline
// ---------------------------------------------------------------------------

/// Liefert dekodierte Samples einer Quelle an die Wiedergabe
pub trait DecoderPipeline: Send {
    /// Bereitet die Pipeline fuer eine Sitzung vor
    fn vorbereiten(&mut self, kontext: &SitzungsKontext);

    /// Fuellt `ausgabe` mit Samples; `false` wenn keine weiteren folgen
    fn lesen(&mut self, ausgabe: &mut [f32]) -> bool;

    /// Gepufferte, noch nicht dekodierte Frames
    fn puffer_anzahl(&self) -> usize;

    /// Aktuelle Verlustrate
    fn paketverlust(&self) -> f32;
}

/// Pipeline ueber einem Reorder-Buffer
pub struct BufferedDecoderPipeline {
    puffer: Arc<ReorderBuffer>,
    decoder: Box<dyn VoiceDecoder>,
    /// Dekodierte, noch nicht ausgelieferte Samples
    frame: Vec<f32>,
    position: usize,
    beendet: bool,
}

impl BufferedDecoderPipeline {
    pub fn neu(puffer: Arc<ReorderBuffer>, decoder: Box<dyn VoiceDecoder>) -> Self {
        Self {
            puffer,
            decoder,
            frame: Vec::new(),
            position: 0,
            beendet: false,
        }
    }

    pub fn puffer(&self) -> &Arc<ReorderBuffer> {
        &self.puffer
    }

    fn naechsten_frame_dekodieren(&mut self) {
        let (paket, mehr) = self.puffer.lesen();
        self.frame.resize(self.decoder.frame_groesse(), 0.0);
        self.decoder
            .dekodieren(paket.as_ref().map(|p| &p.nutzdaten()[..]), &mut self.frame);
        self.position = 0;
        if !mehr {
            self.beendet = true;
        }
    }
}

impl DecoderPipeline for BufferedDecoderPipeline {
    fn vorbereiten(&mut self, kontext: &SitzungsKontext) {
        tracing::debug!(spieler = %kontext.spieler, sitzung = kontext.id, "Dekodier-Pipeline vorbereitet");
        self.decoder.zuruecksetzen();
        self.frame.clear();
        self.position = 0;
        self.beendet = false;
    }

    fn lesen(&mut self, ausgabe: &mut [f32]) -> bool {
        let mut geschrieben = 0;
        while geschrieben < ausgabe.len() {
            if self.position >= self.frame.len() {
                if self.beendet || self.decoder.frame_groesse() == 0 {
                    ausgabe[geschrieben..].fill(0.0);
                    return false;
                }
                self.naechsten_frame_dekodieren();
            }

            let n = (self.frame.len() - self.position).min(ausgabe.len() - geschrieben);
            ausgabe[geschrieben..geschrieben + n]
                .copy_from_slice(&self.frame[self.position..self.position + n]);
            self.position += n;
            geschrieben += n;
        }

        !(self.beendet && self.position >= self.frame.len())
    }

    fn puffer_anzahl(&self) -> usize {
        self.puffer.anzahl()
    }

    fn paketverlust(&self) -> f32 {
        self.puffer.paketverlust()
    }
}
