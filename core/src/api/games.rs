use crate::gateway::Gateway;
use crate::keys::{APK_FILES, GAME_CATEGORIES, POPULAR_GAMES, PROVIDERS};
use crate::resource::Collection;
use crate::types::{ApkFile, GameCategory, PopularGame, Provider};

/// Game catalogue. Providers, popular games and APK files upload files,
/// so their writes go through `create_form` / `update_form`.
#[derive(Debug, Clone)]
pub struct GamesApi {
    gateway: Gateway,
}

impl GamesApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn categories(&self) -> Collection<GameCategory> {
        Collection::new(self.gateway.clone(), GAME_CATEGORIES)
    }

    pub fn providers(&self) -> Collection<Provider> {
        Collection::new(self.gateway.clone(), PROVIDERS)
    }

    pub fn popular_games(&self) -> Collection<PopularGame> {
        Collection::new(self.gateway.clone(), POPULAR_GAMES)
    }

    pub fn apk_files(&self) -> Collection<ApkFile> {
        Collection::new(self.gateway.clone(), APK_FILES)
    }
}
