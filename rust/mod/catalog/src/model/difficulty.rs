use serde::{Deserialize, Serialize};

use super::GameVersion;

/// A game mode (softcore, hardcore, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
    pub id: String,
    pub name: String,
    pub game_version: GameVersion,
}
