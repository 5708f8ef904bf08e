use tracing::info;

use storefront_core::{ServiceError, new_id, now_rfc3339};
use storefront_sql::Value;

use super::{CatalogService, required};
use crate::model::{GameVersion, League, NewLeague};

const TABLE: &str = "leagues";

impl CatalogService {
    /// Active leagues for a game version, oldest first.
    pub fn active_leagues(&self, game_version: GameVersion) -> Result<Vec<League>, ServiceError> {
        self.query_records(
            "SELECT data FROM leagues WHERE game_version = ?1 AND is_active = 1
             ORDER BY create_at ASC",
            &[game_version.as_str().into()],
        )
    }

    /// Every league, optionally restricted to one game version. Newest first.
    pub fn list_leagues(&self, game_version: Option<GameVersion>) -> Result<Vec<League>, ServiceError> {
        match game_version {
            Some(gv) => self.query_records(
                "SELECT data FROM leagues WHERE game_version = ?1 ORDER BY create_at DESC",
                &[gv.as_str().into()],
            ),
            None => self.query_records("SELECT data FROM leagues ORDER BY create_at DESC", &[]),
        }
    }

    pub fn get_league(&self, id: &str) -> Result<League, ServiceError> {
        self.get_record(TABLE, id)
    }

    pub fn add_league(&self, input: NewLeague) -> Result<League, ServiceError> {
        required("name", &input.name)?;
        required("imageUrl", &input.image_url)?;
        let game_version = GameVersion::from_str(&input.game_version).ok_or_else(|| {
            ServiceError::Validation(format!("invalid gameVersion '{}'", input.game_version))
        })?;

        let now = now_rfc3339();
        let league = League {
            id: new_id(),
            name: input.name,
            image_url: input.image_url,
            game_version,
            description: input.description,
            difficulty: input.difficulty,
            is_active: input.is_active,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        self.insert_record(TABLE, &league.id, &league, &indexes(&league))?;
        info!(id = %league.id, name = %league.name, "league added");
        Ok(league)
    }

    /// Merge-patch a league. `id` and `createdAt` cannot be changed.
    pub fn update_league(&self, id: &str, patch: serde_json::Value) -> Result<League, ServiceError> {
        let current = self.get_league(id)?;
        let updated = Self::apply_patch(&current, patch)?;
        required("name", &updated.name)?;
        required("imageUrl", &updated.image_url)?;
        self.update_record(TABLE, id, &updated, &indexes(&updated))?;
        info!(id, "league updated");
        Ok(updated)
    }

    pub fn delete_league(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record(TABLE, id)?;
        info!(id, "league deleted");
        Ok(())
    }
}

fn indexes(l: &League) -> Vec<(&'static str, Value)> {
    vec![
        ("name", l.name.as_str().into()),
        ("game_version", l.game_version.as_str().into()),
        ("is_active", l.is_active.into()),
        ("create_at", Value::opt_text(l.created_at.as_deref())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::service;

    fn new_league(name: &str, gv: &str) -> NewLeague {
        NewLeague {
            name: name.into(),
            image_url: "https://cdn.example/league.png".into(),
            game_version: gv.into(),
            description: None,
            difficulty: None,
            is_active: true,
        }
    }

    #[test]
    fn add_and_list_by_game() {
        let svc = service();
        svc.add_league(new_league("Settlers", "path-of-exile-1")).unwrap();
        svc.add_league(new_league("Dawn", "path-of-exile-2")).unwrap();

        let poe1 = svc.active_leagues(GameVersion::PathOfExile1).unwrap();
        assert_eq!(poe1.len(), 1);
        assert_eq!(poe1[0].name, "Settlers");
        assert_eq!(svc.list_leagues(None).unwrap().len(), 2);
    }

    #[test]
    fn deactivated_leagues_are_hidden() {
        let svc = service();
        let l = svc.add_league(new_league("Settlers", "path-of-exile-1")).unwrap();
        let updated = svc
            .update_league(&l.id, serde_json::json!({"isActive": false, "id": "hijack"}))
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.id, l.id);
        assert_eq!(updated.created_at, l.created_at);

        assert!(svc.active_leagues(GameVersion::PathOfExile1).unwrap().is_empty());
        assert_eq!(
            svc.list_leagues(Some(GameVersion::PathOfExile1)).unwrap().len(),
            1
        );
    }

    #[test]
    fn add_requires_name_image_and_valid_game() {
        let svc = service();
        let mut input = new_league("", "path-of-exile-1");
        assert!(matches!(svc.add_league(input.clone()), Err(ServiceError::Validation(_))));
        input.name = "Settlers".into();
        input.image_url = " ".into();
        assert!(matches!(svc.add_league(input.clone()), Err(ServiceError::Validation(_))));
        input.image_url = "https://cdn.example/x.png".into();
        input.game_version = "poe3".into();
        assert!(matches!(svc.add_league(input), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn update_keeps_required_fields() {
        let svc = service();
        let league = svc.add_league(new_league("Settlers", "path-of-exile-1")).unwrap();
        for patch in [serde_json::json!({"imageUrl": ""}), serde_json::json!({"name": "  "})] {
            assert!(matches!(
                svc.update_league(&league.id, patch),
                Err(ServiceError::Validation(_))
            ));
        }
        let stored = svc.get_league(&league.id).unwrap();
        assert_eq!(stored.image_url, "https://cdn.example/league.png");

        let renamed = svc
            .update_league(&league.id, serde_json::json!({"name": "Settlers of Kalguur"}))
            .unwrap();
        assert_eq!(renamed.name, "Settlers of Kalguur");
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let svc = service();
        assert!(matches!(svc.delete_league("nope"), Err(ServiceError::NotFound(_))));
    }
}
