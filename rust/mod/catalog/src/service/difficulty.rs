use storefront_core::ServiceError;

use super::CatalogService;
use crate::model::{Difficulty, GameVersion};

impl CatalogService {
    /// Difficulties available for a game version.
    pub fn difficulties(&self, game_version: GameVersion) -> Result<Vec<Difficulty>, ServiceError> {
        self.query_records(
            "SELECT data FROM difficulties WHERE game_version = ?1 ORDER BY name DESC",
            &[game_version.as_str().into()],
        )
    }
}
