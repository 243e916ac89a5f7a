//! Save/load walkthrough: a scene of entities whose named links point at
//! other entities.
//!
//! Entity handles are only meaningful inside one run, so saving assigns
//! each one a UUID and loading allocates fresh handles for those UUIDs.

use std::collections::{BTreeMap, HashMap};

use engine_data::ReferenceMap;
use engine_reflect::Dictionary;
use engine_reflect::bindings::hash_map_view;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::driver::DictionaryDriver;

/// In-memory entity handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u32);

/// Named links from one entity to others, e.g. `"follow" -> camera target`.
pub type Links = BTreeMap<String, Entity>;

/// A saved scene: the entity ids plus each entity's encoded links.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedScene {
    /// Every entity id, in save order.
    pub ids: Vec<Uuid>,
    /// MessagePack-encoded link dictionaries, keyed by owning entity id.
    pub links: Vec<(Uuid, Vec<u8>)>,
}

/// Handle `offset` places after `first`.
///
/// # Errors
///
/// Returns an error if the handle does not fit in a `u32`.
fn handle_at(first: u32, offset: usize) -> anyhow::Result<Entity> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| first.checked_add(offset))
        .map(Entity)
        .ok_or_else(|| anyhow::anyhow!("entity handle {first} + {offset} does not fit in u32"))
}

/// Build a chain of `count` entities, handles `1..=count`, where each links
/// to the previous one as `"parent"` and to the first one as `"root"`.
///
/// # Errors
///
/// Returns an error if `count` exceeds the handle space.
pub fn build_chain(count: usize) -> anyhow::Result<BTreeMap<Entity, Links>> {
    let mut scene = BTreeMap::new();
    let mut previous = None;
    for n in 0..count {
        let entity = handle_at(1, n)?;
        let mut links = Links::new();
        if let Some(parent) = previous {
            links.insert("parent".into(), parent);
            links.insert("root".into(), Entity(1));
        }
        scene.insert(entity, links);
        previous = Some(entity);
    }
    Ok(scene)
}

/// Save `scene`, assigning a fresh UUID to every entity.
///
/// # Errors
///
/// Returns an error if a link points at an entity outside the scene, or if
/// encoding fails.
pub fn save(scene: &BTreeMap<Entity, Links>) -> anyhow::Result<SavedScene> {
    let mut refs = ReferenceMap::new();
    for entity in scene.keys() {
        refs.add(*entity, Uuid::new_v4());
    }

    let view = Links::dictionary_view();
    let driver = DictionaryDriver::new(&view);
    let mut saved = SavedScene {
        ids: Vec::with_capacity(scene.len()),
        links: Vec::with_capacity(scene.len()),
    };
    for (entity, links) in scene {
        let id = refs.get_id(entity);
        saved.ids.push(id);
        saved.links.push((id, driver.save::<String, Entity, Uuid>(links, &refs)?));
    }

    info!(entities = saved.ids.len(), "scene saved");
    Ok(saved)
}

/// Load `saved`, allocating handles from `first_handle` upwards.
///
/// Links are restored into `HashMap`s through a view built without
/// `Default` on the value type, so the driver inserts by move.
///
/// # Errors
///
/// Returns an error if a link names an id that is not in the scene, if the
/// handles would run past `u32::MAX`, or if decoding fails.
pub fn load(
    saved: &SavedScene,
    first_handle: u32,
) -> anyhow::Result<HashMap<Entity, HashMap<String, Entity>>> {
    let mut refs = ReferenceMap::new();
    for (offset, id) in saved.ids.iter().enumerate() {
        refs.add(handle_at(first_handle, offset)?, *id);
    }

    let view = hash_map_view::<String, Entity>();
    let driver = DictionaryDriver::new(&view);
    let mut scene = HashMap::with_capacity(saved.ids.len());
    for (owner, bytes) in &saved.links {
        let mut links = HashMap::new();
        driver.restore::<String, Entity, Uuid>(&mut links, bytes, &refs)?;
        scene.insert(refs.try_get_ref(owner)?, links);
    }

    info!(entities = scene.len(), "scene loaded");
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_chain_links() {
        let scene = build_chain(3).unwrap();
        assert!(scene[&Entity(1)].is_empty());
        assert_eq!(scene[&Entity(3)]["parent"], Entity(2));
        assert_eq!(scene[&Entity(3)]["root"], Entity(1));
    }

    #[test]
    fn test_round_trip_rehomes_handles() {
        let scene = build_chain(4).unwrap();
        let saved = save(&scene).unwrap();
        let loaded = load(&saved, 500).unwrap();

        assert_eq!(loaded.len(), 4);
        // Save order is handle order, so the chain maps 1..=4 to 500..=503.
        assert!(loaded[&Entity(500)].is_empty());
        assert_eq!(loaded[&Entity(503)]["parent"], Entity(502));
        assert_eq!(loaded[&Entity(503)]["root"], Entity(500));
    }

    #[test]
    fn test_link_outside_scene_fails_save() {
        let mut scene = build_chain(2).unwrap();
        scene
            .get_mut(&Entity(2))
            .unwrap()
            .insert("target".into(), Entity(42));
        assert!(save(&scene).is_err());
    }

    #[test]
    fn test_handles_past_u32_max_fail_load() {
        let saved = save(&build_chain(3).unwrap()).unwrap();
        assert!(load(&saved, u32::MAX - 2).is_ok());
        let err = load(&saved, u32::MAX - 1).unwrap_err();
        assert!(err.to_string().contains("does not fit in u32"));
    }

    #[test]
    fn test_handle_at_checks_range() {
        assert_eq!(handle_at(1, 0).unwrap(), Entity(1));
        assert_eq!(handle_at(u32::MAX, 0).unwrap(), Entity(u32::MAX));
        assert!(handle_at(u32::MAX, 1).is_err());
        assert!(handle_at(0, usize::MAX).is_err());
    }

    #[test]
    fn test_unknown_owner_fails_load() {
        let mut saved = save(&build_chain(2).unwrap()).unwrap();
        saved.links[0].0 = Uuid::new_v4();
        assert!(load(&saved, 1).is_err());
    }
}
