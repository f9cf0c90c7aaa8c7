//! Portal system list - View Model

use chrono::{DateTime, Utc};
use contracts::domain::a001_portal_system::aggregate::{
    apply_favorites, default_catalog, toggle_favorite, PortalSystem, SystemCategory, SystemFilter,
};
use crate::shared::config_store::{ConfigError, ConfigStore};
use leptos::prelude::*;
use serde_json::json;

#[derive(Clone, Copy)]
pub struct PortalListVm {
    pub systems: RwSignal<Vec<PortalSystem>>,
    pub query: RwSignal<String>,
    pub category: RwSignal<Option<SystemCategory>>,
    pub favorites_only: RwSignal<bool>,
    pub chat_open: RwSignal<bool>,
    pub last_update: RwSignal<DateTime<Utc>>,
}

impl PortalListVm {
    pub fn new(favorites: &[u32]) -> Self {
        let mut systems = default_catalog();
        apply_favorites(&mut systems, favorites);
        Self {
            systems: RwSignal::new(systems),
            query: RwSignal::new(String::new()),
            category: RwSignal::new(None),
            favorites_only: RwSignal::new(false),
            chat_open: RwSignal::new(false),
            last_update: RwSignal::new(Utc::now()),
        }
    }

    pub fn filter(&self) -> SystemFilter {
        SystemFilter {
            query: self.query.get(),
            category: self.category.get(),
            favorites_only: self.favorites_only.get(),
        }
    }

    pub fn visible(&self) -> Vec<PortalSystem> {
        let filter = self.filter();
        self.systems.with(|systems| filter.apply(systems))
    }

    pub fn favorite_count(&self) -> usize {
        self.systems.with(|systems| systems.iter().filter(|s| s.favorited).count())
    }

    /// Flips one favorite and returns the ids to persist.
    pub fn toggle(&self, id: u32) -> Vec<u32> {
        let mut ids = Vec::new();
        self.systems.update(|systems| ids = toggle_favorite(systems, id));
        self.last_update.set(Utc::now());
        ids
    }

    /// Toggles and persists `portal.favorites`; a failed write undoes the toggle.
    pub fn toggle_saved(&self, id: u32, store: &ConfigStore) -> Result<(), ConfigError> {
        let ids = self.toggle(id);
        if let Err(e) = store.set("portal.favorites", json!(ids)) {
            self.toggle(id);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config_store::MemoryStorage;
    use crate::shared::event_bus::EventBus;
    use std::sync::Arc;

    fn store(storage: MemoryStorage) -> ConfigStore {
        let store = ConfigStore::new(Arc::new(storage), EventBus::new());
        store.load();
        store
    }

    fn favorited(vm: &PortalListVm, id: u32) -> bool {
        vm.systems
            .with_untracked(|systems| systems.iter().any(|s| s.id == id && s.favorited))
    }

    #[test]
    fn test_toggle_is_persisted() {
        let owner = Owner::new();
        owner.set();
        let store = store(MemoryStorage::default());
        let vm = PortalListVm::new(&store.snapshot().portal.favorites);

        vm.toggle_saved(1, &store).unwrap();
        assert!(favorited(&vm, 1));
        assert!(store.snapshot().portal.favorites.contains(&1));
    }

    #[test]
    fn test_failed_write_reverts_toggle() {
        let owner = Owner::new();
        owner.set();
        let store = store(MemoryStorage::read_only());
        let before = store.snapshot().portal.favorites;
        let vm = PortalListVm::new(&before);
        let count = vm.favorite_count();

        assert!(vm.toggle_saved(1, &store).is_err());
        assert!(!favorited(&vm, 1));
        assert_eq!(vm.favorite_count(), count);
        assert_eq!(store.snapshot().portal.favorites, before);
    }
}
