//! Persisted wifi credentials. The store is a JSON file holding
//! `{"wifi": [{ssid, key}, ...]}`, newest first, capped at the ten most
//! recent networks. Loading is deliberately forgiving: a missing or
//! mangled file just yields an empty store and gets rewritten on the
//! next save, which is how the firmware treated its config partition.
//! Actually joining a network is the connection manager's job, not ours;
//! this module only remembers credentials and picks which stored network
//! to try from a scan result.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Most remembered networks; adding an eleventh evicts the oldest.
pub const MAX_ENTRIES: usize = 10;

/// Default config file name.
pub const CONFIG_NAME: &str = "wifi.cfg";

/// One remembered network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiEntry {
    /// Network name.
    pub ssid: String,
    /// Passphrase, absent for open networks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// The remembered-network list.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStore {
    wifi: Vec<WifiEntry>,
}

impl WifiStore {
    /// Reads the store from disk. Any failure to read or parse yields an
    /// empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!("{} open error: {}", CONFIG_NAME, error);
                }
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(store) => store,
            Err(error) => {
                warn!("{} format error, recreating: {}", CONFIG_NAME, error);
                Self::default()
            }
        }
    }

    /// Writes the store back to disk as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(io::Error::from)?;
        fs::write(path, text)
    }

    /// Remembers a network at the front of the list. Exact duplicates
    /// are skipped; the list is trimmed to [`MAX_ENTRIES`].
    pub fn add(&mut self, entry: WifiEntry) {
        if self.wifi.contains(&entry) {
            return;
        }
        self.wifi.insert(0, entry);
        self.wifi.truncate(MAX_ENTRIES);
    }

    /// Forgets the first exact match. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, entry: &WifiEntry) -> bool {
        match self.wifi.iter().position(|saved| saved == entry) {
            Some(index) => {
                self.wifi.remove(index);
                true
            }
            None => false,
        }
    }

    /// The first remembered network that shows up in a scan result, in
    /// stored (most recently added) order.
    pub fn first_known<'a>(&'a self, visible: &[String]) -> Option<&'a WifiEntry> {
        self.wifi
            .iter()
            .find(|entry| visible.iter().any(|ssid| *ssid == entry.ssid))
    }

    /// All remembered networks, newest first.
    pub fn entries(&self) -> &[WifiEntry] {
        &self.wifi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(ssid: &str, key: Option<&str>) -> WifiEntry {
        WifiEntry {
            ssid: ssid.to_owned(),
            key: key.map(str::to_owned),
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_NAME);

        let mut store = WifiStore::default();
        store.add(entry("hehe-free", Some("threegeeks")));
        store.add(entry("dianzibu", None));
        store.save(&path).unwrap();

        let loaded = WifiStore::load(&path);
        assert_eq!(loaded, store);
        assert_eq!(loaded.entries()[0].ssid, "dianzibu");
    }

    #[test]
    fn missing_or_mangled_file_yields_empty_store() {
        let dir = tempdir().unwrap();
        assert_eq!(
            WifiStore::load(dir.path().join("nope.cfg")),
            WifiStore::default()
        );

        let path = dir.path().join(CONFIG_NAME);
        fs::write(&path, "not json at all").unwrap();
        assert_eq!(WifiStore::load(&path), WifiStore::default());
    }

    #[test]
    fn duplicates_are_skipped() {
        let mut store = WifiStore::default();
        store.add(entry("net", Some("key")));
        store.add(entry("net", Some("key")));
        assert_eq!(store.entries().len(), 1);

        // same ssid with a different key is a distinct entry
        store.add(entry("net", Some("other")));
        assert_eq!(store.entries().len(), 2);
    }

    #[test]
    fn list_caps_at_ten_most_recent() {
        let mut store = WifiStore::default();
        for i in 0..12 {
            store.add(entry(&format!("net{}", i), None));
        }
        assert_eq!(store.entries().len(), MAX_ENTRIES);
        assert_eq!(store.entries()[0].ssid, "net11");
        assert_eq!(store.entries()[MAX_ENTRIES - 1].ssid, "net2");
    }

    #[test]
    fn remove_drops_exact_match_only() {
        let mut store = WifiStore::default();
        store.add(entry("net", Some("key")));
        assert!(!store.remove(&entry("net", None)));
        assert!(store.remove(&entry("net", Some("key"))));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn picks_first_stored_network_present_in_scan() {
        let mut store = WifiStore::default();
        store.add(entry("home", Some("a")));
        store.add(entry("lab", Some("b")));

        let visible = vec!["cafe".to_owned(), "home".to_owned(), "lab".to_owned()];
        assert_eq!(store.first_known(&visible).unwrap().ssid, "lab");

        let visible = vec!["home".to_owned()];
        assert_eq!(store.first_known(&visible).unwrap().ssid, "home");

        assert!(store.first_known(&["cafe".to_owned()]).is_none());
    }
}
