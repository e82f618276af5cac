//! TOML scene descriptions.
//!
//! A scene declares reusable value profiles, an item hierarchy and core roots:
//!
//! ```toml
//! [profiles.panel]
//! duration = { closed = 0.2, opened = 0.4 }
//! chain_delay = { opened = 0.1 }
//!
//! [[profiles.panel.tweens]]
//! effect = "alpha"
//!
//! [[items]]
//! name = "menu"
//! profile = "panel"
//!
//! [[items.children]]
//! name = "play"
//! delay = { opened = 0.2 }
//!
//! [[roots]]
//! name = "main"
//! states = [{ name = "menu", items = ["menu"], default = true }]
//! ```
//!
//! Item values are resolved by deep-merging the item's own keys over its
//! profile over [`ItemValues::default`], so a keyed value may override one
//! direction only. An item's `tweens` replace the profile's tweens.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::{Result, SceneError};
use crate::host::Host;
use crate::id::ItemId;
use crate::item::{Item, ItemValues};
use crate::roots::CoreRoot;
use crate::tween::Tween;

/// Named set of item values and tweens shared by several items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub tweens: Vec<Tween>,
    #[serde(flatten)]
    pub values: toml::Table,
}

/// One item of the scene hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Mirror lifecycle events into the engine's event queue.
    #[serde(default)]
    pub queue_events: bool,
    /// Replaces the profile's tweens when present.
    #[serde(default)]
    pub tweens: Option<Vec<Tween>>,
    #[serde(default)]
    pub children: Vec<ItemSpec>,
    /// Item value overrides.
    #[serde(flatten)]
    pub values: toml::Table,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSpec {
    pub name: String,
    #[serde(default)]
    pub states: Vec<StateSpec>,
}

/// Parsed scene file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub profiles: HashMap<String, Profile>,
    pub items: Vec<ItemSpec>,
    pub roots: Vec<RootSpec>,
}

/// Handles of the items created by [`Scene::build`].
#[derive(Debug, Clone, Default)]
pub struct SceneHandles {
    pub items: HashMap<String, ItemId>,
    pub roots: Vec<String>,
}

impl SceneHandles {
    pub fn get(&self, name: &str) -> Option<ItemId> {
        self.items.get(name).copied()
    }
}

struct PreparedItem {
    item: Item,
    parent: Option<usize>,
}

impl FromStr for Scene {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl Scene {
    /// Read and parse a scene file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scene = contents.parse::<Scene>()?;
        debug!(path = %path.display(), items = scene.items.len(), "scene parsed");
        Ok(scene)
    }

    /// Spawn every item into `engine`, register the core roots, apply start
    /// actions and signal the scene load.
    ///
    /// The whole scene is validated before anything is spawned, so an error
    /// leaves the engine untouched.
    pub fn build(&self, engine: &mut Engine, host: &mut dyn Host) -> Result<SceneHandles> {
        let base = match toml::Value::try_from(ItemValues::default())? {
            toml::Value::Table(table) => table,
            _ => toml::Table::new(),
        };

        let mut prepared = Vec::new();
        for spec in &self.items {
            self.prepare(spec, None, &base, &mut prepared)?;
        }

        let names: HashSet<&str> = prepared.iter().map(|p| p.item.name.as_str()).collect();
        for root in &self.roots {
            for state in &root.states {
                if let Some(missing) = state.items.iter().find(|i| !names.contains(i.as_str())) {
                    return Err(SceneError::UnknownItem {
                        root: root.name.clone(),
                        state: state.name.clone(),
                        item: missing.clone(),
                    });
                }
            }
        }

        let mut handles = SceneHandles::default();
        let mut ids = Vec::with_capacity(prepared.len());
        for PreparedItem { item, parent } in prepared {
            let name = item.name.clone();
            let id = engine.spawn(item);
            if let Some(parent) = parent {
                engine.tree_mut().attach(id, ids[parent]);
            }
            handles.items.insert(name, id);
            ids.push(id);
        }
        engine.refresh_all(host);

        for spec in &self.roots {
            let mut root = CoreRoot::new(spec.name.clone());
            for state in &spec.states {
                let items = state.items.iter().filter_map(|name| handles.get(name));
                root.add_state(state.name.clone(), items, state.default);
            }
            engine.register_root(root);
            handles.roots.push(spec.name.clone());
        }

        for id in &ids {
            engine.start(*id, host);
        }
        engine.scene_loaded(host);

        debug!(items = ids.len(), roots = handles.roots.len(), "scene built");
        Ok(handles)
    }

    fn prepare(
        &self,
        spec: &ItemSpec,
        parent: Option<usize>,
        base: &toml::Table,
        out: &mut Vec<PreparedItem>,
    ) -> Result<()> {
        if out.iter().any(|p| p.item.name == spec.name) {
            return Err(SceneError::DuplicateItem(spec.name.clone()));
        }

        let profile = match &spec.profile {
            Some(name) => Some(self.profiles.get(name).ok_or_else(|| {
                SceneError::UnknownProfile {
                    item: spec.name.clone(),
                    profile: name.clone(),
                }
            })?),
            None => None,
        };

        let mut table = base.clone();
        if let Some(profile) = profile {
            merge_tables(&mut table, &profile.values);
        }
        merge_tables(&mut table, &spec.values);
        for key in table.keys().filter(|key| !base.contains_key(*key)) {
            warn!(item = %spec.name, key = %key, "ignoring unknown item value");
        }

        let values: ItemValues =
            toml::Value::Table(table)
                .try_into()
                .map_err(|source| SceneError::InvalidValues {
                    item: spec.name.clone(),
                    source,
                })?;

        let tweens = match (&spec.tweens, profile) {
            (Some(tweens), _) => tweens.clone(),
            (None, Some(profile)) => profile.tweens.clone(),
            (None, None) => Vec::new(),
        };

        let mut item = Item::with_values(spec.name.clone(), values).with_tweens(tweens);
        item.enabled = spec.enabled;
        item.set_queue_events(spec.queue_events);

        let index = out.len();
        out.push(PreparedItem { item, parent });
        for child in &spec.children {
            self.prepare(child, Some(index), base, out)?;
        }
        Ok(())
    }
}

/// Recursively merge `overrides` into `base`. Nested tables merge key by
/// key, every other value replaces.
fn merge_tables(base: &mut toml::Table, overrides: &toml::Table) {
    for (key, value) in overrides {
        if let (Some(toml::Value::Table(inner)), toml::Value::Table(nested)) =
            (base.get_mut(key), value)
        {
            merge_tables(inner, nested);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}
