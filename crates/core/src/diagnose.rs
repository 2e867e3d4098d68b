//! Eindeutige Diagnose-IDs fuer Protokoll-Defekte und Ressourcen-Warnungen
//!
//! Jede ID taucht genau an einer Stelle im Code auf, damit ein Log-Eintrag
//! eindeutig seiner Ursache zugeordnet werden kann.

/// Ein bereits schliessender Kanal sollte erneut geschlossen werden
pub const KANAL_BEREITS_SCHLIESSEND: &str = "SF-K001";

/// Ein offener Kanal sollte erneut geoeffnet werden
pub const KANAL_BEREITS_OFFEN: &str = "SF-K002";

/// Der Reorder-Buffer waechst ueber die Warnschwelle
pub const PUFFER_RUECKSTAU: &str = "SF-P001";

/// Ein Frame kam extrem verspaetet an
pub const SEHR_SPAETER_FRAME: &str = "SF-P002";

/// Die lokale Client-ID wurde nach der Vergabe wieder entfernt
pub const LOKALE_ID_VERLOREN: &str = "SF-S001";

/// Ein Spieler-Kanal verweist auf eine unbekannte Spieler-ID
pub const UNBEKANNTER_EMPFAENGER: &str = "SF-S002";
