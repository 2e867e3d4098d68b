//! Paketverlust ueber ein gleitendes Fenster
//!
//! Ringpuffer der letzten N Zustell-Ergebnisse (Treffer/Fehlschlag). Der
//! Verlust ist der Anteil der Fehlschlaege an den gespeicherten Ergebnissen.

/// Standard-Fenstergroesse
pub const STANDARD_FENSTER: usize = 128;

#[derive(Debug, Clone)]
pub struct VerlustFenster {
    ergebnisse: Vec<bool>,
    position: usize,
    gefuellt: usize,
    fehlschlaege: usize,
}

impl VerlustFenster {
    /// Erstellt ein Fenster mit `groesse` Eintraegen (mindestens 1)
    pub fn neu(groesse: usize) -> Self {
        Self {
            ergebnisse: vec![true; groesse.max(1)],
            position: 0,
            gefuellt: 0,
            fehlschlaege: 0,
        }
    }

    /// Traegt ein Ergebnis ein; das aelteste faellt bei vollem Fenster heraus
    pub fn erfassen(&mut self, zugestellt: bool) {
        if self.gefuellt == self.ergebnisse.len() {
            if !self.ergebnisse[self.position] {
                self.fehlschlaege -= 1;
            }
        } else {
            self.gefuellt += 1;
        }

        self.ergebnisse[self.position] = zugestellt;
        if !zugestellt {
            self.fehlschlaege += 1;
        }
        self.position = (self.position + 1) % self.ergebnisse.len();
    }

    /// Verlustrate in [0, 1]; 0 solange nichts erfasst wurde
    pub fn verlust(&self) -> f32 {
        if self.gefuellt == 0 {
            return 0.0;
        }
        self.fehlschlaege as f32 / self.gefuellt as f32
    }

    pub fn leeren(&mut self) {
        self.position = 0;
        self.gefuellt = 0;
        self.fehlschlaege = 0;
    }
}

impl Default for VerlustFenster {
    fn default() -> Self {
        Self::neu(STANDARD_FENSTER)
    }
}
