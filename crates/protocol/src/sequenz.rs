//! Erweiterung der 16-Bit-Sequenznummern
//!
//! Auf dem Draht sind Sequenznummern 16 Bit breit und laufen nach 65535
//! wieder bei 0 los. Der Reorder-Buffer vergleicht dagegen mit einfachem
//! `<` und braucht deshalb einen monoton steigenden Zaehler. Jede empfangene
//! Nummer wird relativ zur hoechsten bisher erweiterten Nummer eingeordnet
//! (naechster Nachbar im Fenster +-32768).

/// Pro Quelle ein Zustand
#[derive(Debug, Default, Clone)]
pub struct SequenzErweiterung {
    hoechste: Option<u32>,
}

impl SequenzErweiterung {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erweitert eine Draht-Sequenznummer auf 32 Bit
    ///
    /// Gibt `None` zurueck, wenn der Frame vor dem Beginn des Stroms liegen
    /// wuerde (verspaeteter Frame direkt nach einem Reset).
    pub fn erweitern(&mut self, sequenz: u16) -> Option<u32> {
        let Some(hoechste) = self.hoechste else {
            self.hoechste = Some(sequenz as u32);
            return Some(sequenz as u32);
        };

        let delta = sequenz.wrapping_sub(hoechste as u16) as i16;
        let erweitert = hoechste as i64 + delta as i64;
        if erweitert < 0 || erweitert > u32::MAX as i64 {
            return None;
        }
        let erweitert = erweitert as u32;
        if erweitert > hoechste {
            self.hoechste = Some(erweitert);
        }
        Some(erweitert)
    }

    /// Vergisst den bisherigen Stand (neuer Strom)
    pub fn zuruecksetzen(&mut self) {
        self.hoechste = None;
    }
}
