//! Structure element roles (the `/S` entry of a structure element).

use std::fmt;

/// The role of a structure element.
///
/// Only the roles the remediation passes create or inspect get their own
/// variant; everything else round-trips through [`StructRole::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructRole {
    Document,
    P,
    /// Heading with level 1..=6.
    H(u8),
    Figure,
    Table,
    TR,
    TH,
    TD,
    Link,
    Other(String),
}

impl StructRole {
    /// Parse a role from the name stored under `/S`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Document" => StructRole::Document,
            "P" => StructRole::P,
            "Figure" => StructRole::Figure,
            "Table" => StructRole::Table,
            "TR" => StructRole::TR,
            "TH" => StructRole::TH,
            "TD" => StructRole::TD,
            "Link" => StructRole::Link,
            _ => match name.strip_prefix('H').and_then(|n| n.parse::<u8>().ok()) {
                Some(level @ 1..=6) => StructRole::H(level),
                _ => StructRole::Other(name.to_string()),
            },
        }
    }

    /// A heading role, clamping the level into 1..=6.
    pub fn heading(level: u8) -> Self {
        StructRole::H(level.clamp(1, 6))
    }

    /// The heading level, if this is H1..H6.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            StructRole::H(level) => Some(*level),
            _ => None,
        }
    }

    pub fn as_name(&self) -> String {
        match self {
            StructRole::Document => "Document".to_string(),
            StructRole::P => "P".to_string(),
            StructRole::H(level) => format!("H{level}"),
            StructRole::Figure => "Figure".to_string(),
            StructRole::Table => "Table".to_string(),
            StructRole::TR => "TR".to_string(),
            StructRole::TH => "TH".to_string(),
            StructRole::TD => "TD".to_string(),
            StructRole::Link => "Link".to_string(),
            StructRole::Other(name) => name.clone(),
        }
    }
}

impl fmt::Display for StructRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_name())
    }
}
