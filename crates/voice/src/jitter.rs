//! Jitter-Schaetzung fuer eine entfernte Quelle
//!
//! Fuer jeden empfangenen Frame wird die Abweichung zwischen tatsaechlicher
//! und erwarteter Ankunftszeit gemessen. Erwartet wird der erste Frame plus
//! `(sequenz - erste_sequenz) * frame_dauer`. Der Jitter ist die
//! Standardabweichung dieser Abweichungen ueber ein gleitendes Fenster.
//!
//! Die Konfidenz waechst linear mit der Anzahl Messungen und erreicht 1,
//! sobald das Fenster voll ist.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Liefert Jitter und Konfidenz an die Wiedergabe-Sitzung
pub trait JitterQuelle: Send + Sync {
    /// Standardabweichung des Jitters in Sekunden
    fn jitter(&self) -> f32;

    /// Vertrauen in die Messung, 0 bis 1
    fn konfidenz(&self) -> f32;
}

/// Konfiguration fuer die Jitter-Schaetzung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Dauer eines Frames in Millisekunden
    pub frame_dauer_ms: f32,
    /// Anzahl Messungen im gleitenden Fenster
    pub fenster: usize,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            frame_dauer_ms: 20.0,
            fenster: 128,
        }
    }
}

#[derive(Debug, Default)]
struct Messung {
    referenz: Option<(u32, Instant)>,
    abweichungen: VecDeque<f64>,
    summe: f64,
    summe_quadrate: f64,
}

/// Schaetzt den Netzwerk-Jitter einer Quelle
///
/// Thread-safe: Messungen kommen aus dem Empfangspfad, gelesen wird aus
/// der Wiedergabe.
#[derive(Debug)]
pub struct JitterSchaetzer {
    config: JitterConfig,
    messung: Mutex<Messung>,
}

impl JitterSchaetzer {
    pub fn neu(config: JitterConfig) -> Self {
        Self {
            messung: Mutex::new(Messung {
                abweichungen: VecDeque::with_capacity(config.fenster),
                ..Default::default()
            }),
            config,
        }
    }

    /// Erfasst die Ankunft eines Frames mit erweiterter Sequenznummer
    pub fn ankunft_erfassen(&self, sequenz: u32, jetzt: Instant) {
        let fenster = self.config.fenster.max(2);
        let frame_dauer = self.config.frame_dauer_ms as f64 / 1000.0;
        let mut m = self.messung.lock();

        let Some((erste_sequenz, erste_ankunft)) = m.referenz else {
            m.referenz = Some((sequenz, jetzt));
            return;
        };

        let erwartet = (sequenz as f64 - erste_sequenz as f64) * frame_dauer;
        let tatsaechlich = if jetzt >= erste_ankunft {
            (jetzt - erste_ankunft).as_secs_f64()
        } else {
            -(erste_ankunft - jetzt).as_secs_f64()
        };
        let abweichung = tatsaechlich - erwartet;

        if m.abweichungen.len() == fenster {
            if let Some(alt) = m.abweichungen.pop_front() {
                m.summe -= alt;
                m.summe_quadrate -= alt * alt;
            }
        }
        m.abweichungen.push_back(abweichung);
        m.summe += abweichung;
        m.summe_quadrate += abweichung * abweichung;

        tracing::trace!(sequenz, abweichung_ms = abweichung * 1000.0, "Jitter gemessen");
    }

    /// Anzahl Messungen im Fenster
    pub fn messungen(&self) -> usize {
        self.messung.lock().abweichungen.len()
    }

    /// Vergisst alle Messungen (neuer Strom)
    pub fn zuruecksetzen(&self) {
        let mut m = self.messung.lock();
        m.referenz = None;
        m.abweichungen.clear();
        m.summe = 0.0;
        m.summe_quadrate = 0.0;
    }
}

impl Default for JitterSchaetzer {
    fn default() -> Self {
        Self::neu(JitterConfig::default())
    }
}

impl JitterQuelle for JitterSchaetzer {
    fn jitter(&self) -> f32 {
        let m = self.messung.lock();
        let n = m.abweichungen.len();
        if n < 2 {
            return 0.0;
        }
        let n = n as f64;
        let mittel = m.summe / n;
        // Empirische Varianz (n-1); Rundungsfehler koennen knapp unter 0 landen
        let varianz = ((m.summe_quadrate - n * mittel * mittel) / (n - 1.0)).max(0.0);
        varianz.sqrt() as f32
    }

    fn konfidenz(&self) -> f32 {
        let fenster = self.config.fenster.max(2);
        (self.messung.lock().abweichungen.len() as f32 / fenster as f32).min(1.0)
    }
}
