use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle registration plate as read from the fleet sheet (trimmed).
///
/// Plates are compared case-insensitively; [`VehicleId::key_form`] is the
/// canonical spelling used in deduplication keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uppercased plate, e.g. `"bz 10 abc"` → `"BZ 10 ABC"`.
    pub fn key_form(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A tracked document kind (road toll, inspection, insurance, ...).
///
/// The set of kinds is open: it is whatever the fleet sheet's columns
/// activate on a given run, so this is a label rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentType(String);

impl DocumentType {
    pub fn new(label: &str) -> Self {
        Self(label.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key_form(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
