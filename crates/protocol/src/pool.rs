//! Wiederverwendbare Sende-Puffer
//!
//! Der Sende-Pfad baut pro Audio-Frame ein Paket zusammen. Statt jedes Mal
//! neu zu allokieren, werden Puffer nach dem Senden zurueckgegeben.

use bytes::BytesMut;
use parking_lot::Mutex;

/// Standard-Kapazitaet eines neuen Puffers (passt fuer einen Opus-Frame plus Kanal-Liste)
pub const STANDARD_KAPAZITAET: usize = 1500;

/// Maximale Anzahl vorgehaltener Puffer
pub const STANDARD_VORRAT: usize = 32;

/// Thread-sicherer Pool fuer `BytesMut`-Puffer
#[derive(Debug)]
pub struct PufferPool {
    frei: Mutex<Vec<BytesMut>>,
    kapazitaet: usize,
    max_vorrat: usize,
}

impl PufferPool {
    pub fn neu(kapazitaet: usize, max_vorrat: usize) -> Self {
        Self {
            frei: Mutex::new(Vec::with_capacity(max_vorrat)),
            kapazitaet,
            max_vorrat,
        }
    }

    /// Holt einen leeren Puffer (wiederverwendet oder neu)
    pub fn holen(&self) -> BytesMut {
        self.frei
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.kapazitaet))
    }

    /// Gibt einen Puffer an den Pool zurueck
    ///
    /// Ist der Vorrat voll, wird der Puffer verworfen.
    pub fn zurueckgeben(&self, mut puffer: BytesMut) {
        puffer.clear();
        let mut frei = self.frei.lock();
        if frei.len() < self.max_vorrat {
            frei.push(puffer);
        }
    }

    /// Anzahl aktuell vorgehaltener Puffer
    pub fn vorrat(&self) -> usize {
        self.frei.lock().len()
    }
}

impl Default for PufferPool {
    fn default() -> Self {
        Self::neu(STANDARD_KAPAZITAET, STANDARD_VORRAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn puffer_wird_wiederverwendet_und_geleert() {
        let pool = PufferPool::neu(64, 2);
        let mut p = pool.holen();
        p.put_slice(b"hallo");
        pool.zurueckgeben(p);
        assert_eq!(pool.vorrat(), 1);

        let p = pool.holen();
        assert!(p.is_empty());
        assert!(p.capacity() >= 64);
        assert_eq!(pool.vorrat(), 0);
    }

    #[test]
    fn vorrat_ist_begrenzt() {
        let pool = PufferPool::neu(8, 2);
        for _ in 0..5 {
            pool.zurueckgeben(BytesMut::new());
        }
        assert_eq!(pool.vorrat(), 2);
    }
}
