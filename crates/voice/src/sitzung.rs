//! Wiedergabe-Sitzung einer entfernten Quelle
//!
//! Bindet eine Dekodier-Pipeline an einen Aktivierungszeitpunkt. Die
//! Verzoegerung ergibt sich aus dem gemessenen Jitter:
//!
//! ```text
//! delay = clamp(lerp(initial, jitter * sigma_faktor, konfidenz), min, max)
//! ```
//!
//! Bei Konfidenz 0 gilt die feste Startverzoegerung, mit wachsender
//! Konfidenz naehert sie sich 2.5 Standardabweichungen des Jitters.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::decoder::DecoderPipeline;
use crate::jitter::JitterQuelle;

/// Konfiguration der Wiedergabe-Verzoegerung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WiedergabeConfig {
    /// Verzoegerung ohne Jitter-Messung (ms)
    pub initiale_verzoegerung_ms: u64,
    pub min_verzoegerung_ms: u64,
    pub max_verzoegerung_ms: u64,
    /// Vielfaches der Jitter-Standardabweichung
    pub sigma_faktor: f32,
}

impl Default for WiedergabeConfig {
    fn default() -> Self {
        Self {
            initiale_verzoegerung_ms: 100,
            min_verzoegerung_ms: 50,
            max_verzoegerung_ms: 750,
            sigma_faktor: 2.5,
        }
    }
}

impl WiedergabeConfig {
    /// Berechnet die Verzoegerung fuer Jitter (Sekunden) und Konfidenz
    pub fn verzoegerung(&self, jitter: f32, konfidenz: f32) -> Duration {
        // In Millisekunden rechnen, damit die Grenzwerte exakt bleiben
        let initial = self.initiale_verzoegerung_ms as f64;
        let min = self.min_verzoegerung_ms as f64;
        let max = (self.max_verzoegerung_ms as f64).max(min);

        let konfidenz = if konfidenz.is_finite() { konfidenz as f64 } else { 0.0 };
        let ziel = if jitter.is_finite() {
            jitter as f64 * 1000.0 * self.sigma_faktor as f64
        } else {
            max
        };
        let wert = initial + (ziel - initial) * konfidenz;

        Duration::from_micros((wert.clamp(min, max) * 1000.0).round() as u64)
    }
}

/// Kennt die Sitzung, fuer die dekodiert wird
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SitzungsKontext {
    /// Name des sprechenden Spielers
    pub spieler: String,
    /// Laufende Nummer der Sitzung fuer diesen Spieler
    pub id: u32,
}

/// Wiedergabe-Sitzung einer Quelle
pub struct SpeechSession {
    kontext: SitzungsKontext,
    pipeline: Box<dyn DecoderPipeline>,
    jitter: Arc<dyn JitterQuelle>,
    config: WiedergabeConfig,
    erstellt: Instant,
    start: Instant,
}

impl SpeechSession {
    pub fn neu(
        kontext: SitzungsKontext,
        jitter: Arc<dyn JitterQuelle>,
        pipeline: Box<dyn DecoderPipeline>,
        config: WiedergabeConfig,
        jetzt: Instant,
    ) -> Self {
        Self {
            kontext,
            pipeline,
            jitter,
            config,
            erstellt: jetzt,
            start: jetzt,
        }
    }

    /// Aktuelle Verzoegerung, abgeleitet aus der Jitter-Messung
    pub fn verzoegerung(&self) -> Duration {
        self.config
            .verzoegerung(self.jitter.jitter(), self.jitter.konfidenz())
    }

    /// Erstellung + Verzoegerung
    pub fn ziel_aktivierungszeit(&self) -> Instant {
        self.erstellt + self.verzoegerung()
    }

    /// Start + Verzoegerung
    pub fn aktivierungszeit(&self) -> Instant {
        self.start + self.verzoegerung()
    }

    /// Setzt den Start auf `jetzt - verzoegerung` und bereitet die Pipeline vor
    pub fn vorbereiten(&mut self, jetzt: Instant) {
        let verzoegerung = self.verzoegerung();
        self.start = start_vor(jetzt, verzoegerung);
        tracing::debug!(
            spieler = %self.kontext.spieler,
            verzoegerung_ms = verzoegerung.as_millis() as u64,
            "Wiedergabe-Sitzung vorbereitet"
        );
        self.pipeline.vorbereiten(&self.kontext);
    }

    /// Zieht Samples aus der Pipeline; `false` wenn keine weiteren folgen
    pub fn lesen(&mut self, ausgabe: &mut [f32]) -> bool {
        self.pipeline.lesen(ausgabe)
    }

    /// Aktivierungszeit erreicht?
    pub fn ist_bereit(&self, jetzt: Instant) -> bool {
        jetzt >= self.aktivierungszeit()
    }

    pub fn kontext(&self) -> &SitzungsKontext {
        &self.kontext
    }

    pub fn puffer_anzahl(&self) -> usize {
        self.pipeline.puffer_anzahl()
    }

    pub fn paketverlust(&self) -> f32 {
        self.pipeline.paketverlust()
    }
}

impl std::fmt::Debug for SpeechSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSession")
            .field("kontext", &self.kontext)
            .field("verzoegerung", &self.verzoegerung())
            .finish()
    }
}

/// `jetzt - verzoegerung`; liegt das vor dem Ursprung der Uhr, gilt `jetzt`
fn start_vor(jetzt: Instant, verzoegerung: Duration) -> Instant {
    match jetzt.checked_sub(verzoegerung) {
        Some(start) => start,
        None => {
            tracing::warn!(
                verzoegerung_ms = verzoegerung.as_millis() as u64,
                "Verzoegerung groesser als die Laufzeit der Uhr, Start ohne Vorlauf"
            );
            jetzt
        }
    }
}
