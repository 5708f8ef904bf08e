use std::fmt;

use serde::{Deserialize, Serialize};

/// The two game editions the storefront sells for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameVersion {
    #[serde(rename = "path-of-exile-1")]
    PathOfExile1,
    #[serde(rename = "path-of-exile-2")]
    PathOfExile2,
}

impl GameVersion {
    pub const ALL: [GameVersion; 2] = [GameVersion::PathOfExile1, GameVersion::PathOfExile2];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameVersion::PathOfExile1 => "path-of-exile-1",
            GameVersion::PathOfExile2 => "path-of-exile-2",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "path-of-exile-1" => Some(GameVersion::PathOfExile1),
            "path-of-exile-2" => Some(GameVersion::PathOfExile2),
            _ => None,
        }
    }

    /// Short prefix used in seeded record ids.
    pub fn short(&self) -> &'static str {
        match self {
            GameVersion::PathOfExile1 => "poe1",
            GameVersion::PathOfExile2 => "poe2",
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        for gv in GameVersion::ALL {
            assert_eq!(GameVersion::from_str(gv.as_str()), Some(gv));
            let json = serde_json::to_string(&gv).unwrap();
            assert_eq!(json, format!("\"{}\"", gv.as_str()));
        }
        assert_eq!(GameVersion::from_str("path-of-exile-3"), None);
    }
}
