//! Static catalog of the tracked indicators: display label, value kind and
//! chart color per asset key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::ValueKind;

/// Lower-cased, trimmed asset key such as `"selic"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated key list, dropping empty entries and duplicates.
    pub fn parse_list(value: &str) -> Vec<Self> {
        let mut keys: Vec<Self> = Vec::new();
        for key in value.split(',').map(Self::new) {
            if !key.0.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl From<String> for AssetKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AssetKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<AssetKey> for String {
    fn from(value: AssetKey) -> Self {
        value.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Neutral gray for keys the catalog does not know.
pub const DEFAULT_COLOR: Rgb = Rgb(0x9E, 0x9E, 0x9E);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub key: AssetKey,
    pub label: String,
    pub kind: ValueKind,
    pub color: Rgb,
}

struct Entry {
    key: &'static str,
    label: &'static str,
    kind: ValueKind,
    color: Rgb,
}

const fn entry(key: &'static str, label: &'static str, kind: ValueKind, color: Rgb) -> Entry {
    Entry {
        key,
        label,
        kind,
        color,
    }
}

const CATALOG: [Entry; 10] = [
    entry("selic", "SELIC", ValueKind::Percentage, Rgb(0xFF, 0x63, 0x84)),
    entry("cdi", "CDI", ValueKind::Percentage, Rgb(0x36, 0xA2, 0xEB)),
    entry("dolar", "Dólar", ValueKind::Currency, Rgb(0xFF, 0xCE, 0x56)),
    entry("bitcoin", "Bitcoin", ValueKind::Currency, Rgb(0x4B, 0xC0, 0xC0)),
    entry("ibovespa", "Ibovespa", ValueKind::Points, Rgb(0x99, 0x66, 0xFF)),
    entry("sp500", "S&P 500", ValueKind::Points, Rgb(0xFF, 0x9F, 0x40)),
    entry("ifix", "IFIX", ValueKind::Percentage, Rgb(0xC9, 0xCB, 0xCF)),
    entry("ipca", "IPCA", ValueKind::Percentage, Rgb(0x8A, 0x2B, 0xE2)),
    entry("inpc", "INPC", ValueKind::Percentage, Rgb(0xE7, 0xE9, 0xED)),
    entry("poupanca", "Poupança", ValueKind::Percentage, Rgb(0x32, 0xCD, 0x32)),
];

/// Every tracked asset, in canonical order.
pub fn all_assets() -> Vec<AssetKey> {
    CATALOG.iter().map(|entry| AssetKey::new(entry.key)).collect()
}

pub fn is_known(key: &str) -> bool {
    find(&AssetKey::new(key)).is_some()
}

/// Describe an asset. Lookup is case-insensitive; unknown keys get a plain
/// descriptor labelled with the upper-cased key.
pub fn describe(key: &str) -> AssetDescriptor {
    describe_key(&AssetKey::new(key))
}

pub fn describe_key(key: &AssetKey) -> AssetDescriptor {
    match find(key) {
        Some(entry) => AssetDescriptor {
            key: key.clone(),
            label: entry.label.to_string(),
            kind: entry.kind,
            color: entry.color,
        },
        None => AssetDescriptor {
            key: key.clone(),
            label: key.as_str().to_uppercase(),
            kind: ValueKind::Plain,
            color: DEFAULT_COLOR,
        },
    }
}

fn find(key: &AssetKey) -> Option<&'static Entry> {
    CATALOG.iter().find(|entry| entry.key == key.as_str())
}
