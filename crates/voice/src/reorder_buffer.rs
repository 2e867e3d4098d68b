//! Reorder-Buffer fuer kodierte Audio-Frames einer entfernten Quelle
//!
//! Frames kommen ungeordnet und lueckenhaft an. Der Buffer haelt sie in
//! einem Min-Heap nach Sequenznummer und liefert pro `lesen` genau einen
//! Sequenzschritt: den erwarteten Frame oder "nicht vorhanden".
//!
//! ## Nebenlaeufigkeit
//! - `push` kommt aus dem Netzwerk-Empfang, `lesen` aus dem Audio-Callback
//! - Heap, erwartete Sequenz und Verlustfenster liegen hinter einem Mutex
//! - `anzahl`, `vollstaendig` und `paketverlust` sind Atomics und lassen
//!   sich ohne Lock abfragen
//! - Der Verworfen-Callback wird ausserhalb des Locks aufgerufen

use serde::{Deserialize, Serialize};
use sprechfunk_core::diagnose;
use sprechfunk_protocol::voice::VoicePacket;
use parking_lot::Mutex;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::verlust::VerlustFenster;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration fuer den Reorder-Buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderBufferConfig {
    /// Ab dieser Anzahl gepufferter Frames wird gewarnt (keine Begrenzung)
    pub rueckstau_warnung: usize,
    /// Ab so vielen Frames Verspaetung wird ein verworfener Frame als Warnung geloggt
    pub verspaetung_warnung: u32,
    /// Fenstergroesse der Verlustschaetzung
    pub verlust_fenster: usize,
}

impl Default for ReorderBufferConfig {
    fn default() -> Self {
        Self {
            rueckstau_warnung: 40,
            verspaetung_warnung: 30,
            verlust_fenster: crate::verlust::STANDARD_FENSTER,
        }
    }
}

/// Wird fuer jeden nicht ausgelieferten Frame aufgerufen
pub type VerworfenCallback = Box<dyn Fn(VoicePacket) + Send + Sync>;

// ---------------------------------------------------------------------------
// Heap-Eintrag
// ---------------------------------------------------------------------------

/// Ordnet Frames ausschliesslich nach Sequenznummer
struct NachSequenz(VoicePacket);

impl PartialEq for NachSequenz {
    fn eq(&self, other: &Self) -> bool {
        self.0.sequenz() == other.0.sequenz()
    }
}

impl Eq for NachSequenz {}

impl PartialOrd for NachSequenz {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for NachSequenz {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0.sequenz().cmp(&other.0.sequenz())
    }
}

struct Zustand {
    heap: BinaryHeap<Reverse<NachSequenz>>,
    erwartet: u32,
    verlust: VerlustFenster,
}

impl Zustand {
    fn minimum(&self) -> Option<u32> {
        self.heap.peek().map(|Reverse(eintrag)| eintrag.0.sequenz())
    }

    fn minimum_entnehmen(&mut self) -> Option<VoicePacket> {
        self.heap.pop().map(|Reverse(eintrag)| eintrag.0)
    }
}

// ---------------------------------------------------------------------------
// ReorderBuffer
// ---------------------------------------------------------------------------

/// Puffert kodierte Frames und liefert sie in Sequenz-Reihenfolge aus
pub struct ReorderBuffer {
    config: ReorderBufferConfig,
    zustand: Mutex<Zustand>,
    anzahl: AtomicUsize,
    vollstaendig: AtomicBool,
    /// f32-Bits der aktuellen Verlustrate
    paketverlust: AtomicU32,
    verworfen: Option<VerworfenCallback>,
}

impl ReorderBuffer {
    pub fn neu(config: ReorderBufferConfig) -> Self {
        let verlust = VerlustFenster::neu(config.verlust_fenster);
        Self {
            config,
            zustand: Mutex::new(Zustand {
                heap: BinaryHeap::with_capacity(32),
                erwartet: 0,
                verlust,
            }),
            anzahl: AtomicUsize::new(0),
            vollstaendig: AtomicBool::new(false),
            paketverlust: AtomicU32::new(0f32.to_bits()),
            verworfen: None,
        }
    }

    /// Setzt den Callback fuer verworfene Frames
    pub fn mit_verworfen_callback(
        mut self,
        callback: impl Fn(VoicePacket) + Send + Sync + 'static,
    ) -> Self {
        self.verworfen = Some(Box::new(callback));
        self
    }

    /// Fuegt einen Frame ein, O(log n)
    ///
    /// Ein wachsender Rueckstau wird nur geloggt, nicht begrenzt.
    pub fn push(&self, frame: VoicePacket) {
        tracing::trace!(sequenz = frame.sequenz(), "Frame gepuffert");

        let anzahl = {
            let mut zustand = self.zustand.lock();
            zustand.heap.push(Reverse(NachSequenz(frame)));
            self.anzahl.fetch_add(1, Ordering::AcqRel);
            zustand.heap.len()
        };

        let schwelle = self.config.rueckstau_warnung;
        if schwelle > 0 && anzahl > schwelle && (anzahl - schwelle - 1) % schwelle == 0 {
            tracing::warn!(
                diagnose = diagnose::PUFFER_RUECKSTAU,
                anzahl,
                "Reorder-Buffer waechst stark, Empfaenger liest vermutlich nicht"
            );
        }
    }

    /// Liest genau einen Sequenzschritt
    ///
    /// Verspaetete Frames (Sequenz kleiner als erwartet) werden zuerst
    /// verworfen. Liegt der erwartete Frame vor, wird er geliefert, sonst
    /// `None`. In beiden Faellen rueckt die erwartete Sequenz um 1 vor.
    ///
    /// Der zweite Wert ist `false` genau dann, wenn der Strom beendet und
    /// der Heap leer ist.
    pub fn lesen(&self) -> (Option<VoicePacket>, bool) {
        let mut verworfen = Vec::new();

        let (frame, mehr) = {
            let mut zustand = self.zustand.lock();
            let erwartet = zustand.erwartet;

            while zustand.minimum().is_some_and(|s| s < erwartet) {
                let Some(spaet) = zustand.minimum_entnehmen() else {
                    break;
                };
                self.anzahl.fetch_sub(1, Ordering::AcqRel);

                let verspaetung = erwartet - spaet.sequenz();
                if verspaetung > self.config.verspaetung_warnung {
                    tracing::warn!(
                        diagnose = diagnose::SEHR_SPAETER_FRAME,
                        verspaetung,
                        "Sehr spaeter Frame verworfen"
                    );
                } else {
                    tracing::trace!(verspaetung, "Verspaeteten Frame verworfen");
                }
                verworfen.push(spaet);
            }

            let frame = if zustand.minimum() == Some(erwartet) {
                let frame = zustand.minimum_entnehmen();
                self.anzahl.fetch_sub(1, Ordering::AcqRel);
                frame
            } else {
                tracing::trace!(sequenz = erwartet, "Frame nicht rechtzeitig vorhanden");
                None
            };

            zustand.verlust.erfassen(frame.is_some());
            self.paketverlust
                .store(zustand.verlust.verlust().to_bits(), Ordering::Release);
            zustand.erwartet = erwartet.wrapping_add(1);

            let mehr = !(self.vollstaendig.load(Ordering::Acquire) && zustand.heap.is_empty());
            (frame, mehr)
        };

        self.verworfen_melden(verworfen);
        (frame, mehr)
    }

    /// Markiert den Strom als beendet; gepufferte Frames laufen normal ab
    pub fn stoppen(&self) {
        tracing::trace!("Reorder-Buffer gestoppt");
        self.vollstaendig.store(true, Ordering::Release);
    }

    /// Verwirft alle Frames und setzt den Buffer auf Anfang
    ///
    /// Jeder gepufferte Frame geht an den Verworfen-Callback.
    pub fn zuruecksetzen(&self) {
        tracing::trace!("Reorder-Buffer zurueckgesetzt");

        let verworfen = {
            let mut zustand = self.zustand.lock();
            let mut verworfen = Vec::with_capacity(zustand.heap.len());
            while let Some(frame) = zustand.minimum_entnehmen() {
                self.anzahl.fetch_sub(1, Ordering::AcqRel);
                verworfen.push(frame);
            }
            zustand.verlust.leeren();
            zustand.erwartet = 0;
            self.paketverlust.store(0f32.to_bits(), Ordering::Release);
            self.vollstaendig.store(false, Ordering::Release);
            verworfen
        };

        self.verworfen_melden(verworfen);
    }

    /// Anzahl gepufferter Frames (lock-frei)
    pub fn anzahl(&self) -> usize {
        self.anzahl.load(Ordering::Acquire)
    }

    /// Naechste erwartete Sequenznummer
    pub fn erwartete_sequenz(&self) -> u32 {
        self.zustand.lock().erwartet
    }

    /// Verlustrate der letzten Lesevorgaenge (lock-frei)
    pub fn paketverlust(&self) -> f32 {
        f32::from_bits(self.paketverlust.load(Ordering::Acquire))
    }

    pub fn ist_vollstaendig(&self) -> bool {
        self.vollstaendig.load(Ordering::Acquire)
    }

    fn verworfen_melden(&self, frames: Vec<VoicePacket>) {
        if let Some(callback) = &self.verworfen {
            for frame in frames {
                callback(frame);
            }
        }
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::neu(ReorderBufferConfig::default())
    }
}

impl std::fmt::Debug for ReorderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderBuffer")
            .field("anzahl", &self.anzahl())
            .field("vollstaendig", &self.ist_vollstaendig())
            .field("paketverlust", &self.paketverlust())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
