use crate::entities::item::ItemInstance;
use crate::entities::slots::AUGMENT_SLOTS;
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const ITEM_TYPE_LARGE_THROWING: u8 = 7;
pub const ITEM_TYPE_SMALL_THROWING: u8 = 19;
pub const ITEM_TYPE_POTION: u8 = 21;
pub const ITEM_TYPE_ARROW: u8 = 27;

pub const BAG_TYPE_QUIVER: u8 = 2;
pub const BAG_TYPE_BANDOLIER: u8 = 8;

pub const CLICK_TYPE_EXPENDABLE: u8 = 3;

pub const PLAYER_CLASS_COUNT: u16 = 16;
pub const PLAYER_RACE_COUNT: u16 = 16;

/// Per-level kill thresholds tracked for an evolving family.
pub const EVOLVE_LEVEL_SLOTS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    #[default]
    Common,
    Container,
    Book,
}

/// Numeric stats scaled by self-scaling items.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    pub strength: i8,
    pub stamina: i8,
    pub agility: i8,
    pub dexterity: i8,
    pub intelligence: i8,
    pub wisdom: i8,
    pub charisma: i8,
    pub magic_resist: i8,
    pub poison_resist: i8,
    pub disease_resist: i8,
    pub cold_resist: i8,
    pub fire_resist: i8,
    pub hp: i32,
    pub mana: i32,
    pub ac: i32,
    pub skill_mod_value: i32,
    pub bane_damage: i8,
    pub bard_value: i32,
    pub elemental_damage: u8,
    pub damage: u32,
    pub combat_effects: i8,
    pub shielding: i8,
    pub stun_resist: i8,
    pub strike_through: i8,
    pub extra_damage: u32,
    pub spell_shield: i8,
    pub avoidance: i8,
    pub accuracy: i8,
    pub faction_amounts: [i32; 4],
    pub endurance: u32,
    pub dot_shielding: u32,
    pub attack: u32,
    pub regen: u32,
    pub mana_regen: u32,
    pub endurance_regen: u32,
    pub haste: u32,
    pub damage_shield: u32,
}

impl StatBlock {
    /// Every field multiplied by `mult`, truncated back to its own width.
    pub fn scaled(&self, mult: f32) -> StatBlock {
        let i8s = |value: i8| (f32::from(value) * mult) as i8;
        let i32s = |value: i32| (value as f32 * mult) as i32;
        let u32s = |value: u32| (value as f32 * mult) as u32;
        StatBlock {
            strength: i8s(self.strength),
            stamina: i8s(self.stamina),
            agility: i8s(self.agility),
            dexterity: i8s(self.dexterity),
            intelligence: i8s(self.intelligence),
            wisdom: i8s(self.wisdom),
            charisma: i8s(self.charisma),
            magic_resist: i8s(self.magic_resist),
            poison_resist: i8s(self.poison_resist),
            disease_resist: i8s(self.disease_resist),
            cold_resist: i8s(self.cold_resist),
            fire_resist: i8s(self.fire_resist),
            hp: i32s(self.hp),
            mana: i32s(self.mana),
            ac: i32s(self.ac),
            skill_mod_value: i32s(self.skill_mod_value),
            bane_damage: i8s(self.bane_damage),
            bard_value: i32s(self.bard_value),
            elemental_damage: (f32::from(self.elemental_damage) * mult) as u8,
            damage: u32s(self.damage),
            combat_effects: i8s(self.combat_effects),
            shielding: i8s(self.shielding),
            stun_resist: i8s(self.stun_resist),
            strike_through: i8s(self.strike_through),
            extra_damage: u32s(self.extra_damage),
            spell_shield: i8s(self.spell_shield),
            avoidance: i8s(self.avoidance),
            accuracy: i8s(self.accuracy),
            faction_amounts: self.faction_amounts.map(i32s),
            endurance: u32s(self.endurance),
            dot_shielding: u32s(self.dot_shielding),
            attack: u32s(self.attack),
            regen: u32s(self.regen),
            mana_regen: u32s(self.mana_regen),
            endurance_regen: u32s(self.endurance_regen),
            haste: u32s(self.haste),
            damage_shield: u32s(self.damage_shield),
        }
    }
}

/// Shared description of an evolving item family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolveInfo {
    pub first_item: u32,
    pub max_level: u8,
    pub all_kills: bool,
    /// Kills needed to leave level `n`, stored at `n - 1`.
    pub level_kills: [u32; EVOLVE_LEVEL_SLOTS],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDefinition {
    pub id: u32,
    pub name: String,
    pub class: ItemClass,
    pub item_type: u8,
    pub size: u8,
    pub bag_type: u8,
    pub bag_slots: u8,
    pub bag_size: u8,
    pub stackable: bool,
    pub stack_size: i16,
    pub max_charges: i16,
    pub click_type: u8,
    /// Equip bitmask, one bit per worn slot.
    pub equip_slots: u32,
    pub classes: u32,
    pub races: u32,
    pub lore_group: i32,
    pub no_drop: bool,
    pub no_rent: bool,
    pub color: u32,
    pub delay: u8,
    /// Type bits this item carries when used as an augment.
    pub aug_type: u32,
    /// Accepted augment type per augment slot; 0 means the slot does not exist.
    pub aug_slot_types: [u8; AUGMENT_SLOTS],
    /// Non-zero marks a self-scaling item.
    pub charm_file_id: u32,
    pub evolve_level: i8,
    pub evolve: Option<EvolveInfo>,
    pub stats: StatBlock,
}

impl ItemDefinition {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_container(&self) -> bool {
        self.class == ItemClass::Container
    }

    pub fn is_expendable(&self) -> bool {
        self.click_type == CLICK_TYPE_EXPENDABLE || self.item_type == ITEM_TYPE_POTION
    }

    pub fn is_arrow(&self) -> bool {
        self.item_type == ITEM_TYPE_ARROW
    }

    pub fn is_self_scaling(&self) -> bool {
        self.charm_file_id != 0
    }

    pub fn is_evolving(&self) -> bool {
        self.is_self_scaling() || self.evolve.is_some()
    }

    /// Class and race bitmask check; `race` is the player race index (1-based).
    pub fn is_equipable(&self, race: u16, class: u16) -> bool {
        let race = if race == 18 { 16 } else { race };
        let class_ok = (1..=PLAYER_CLASS_COUNT).contains(&class) && self.classes & (1 << (class - 1)) != 0;
        let race_ok = (1..=PLAYER_RACE_COUNT).contains(&race) && self.races & (1 << (race - 1)) != 0;
        class_ok && race_ok
    }
}

/// Source of immutable item definitions.
pub trait ItemRepository {
    fn lookup(&mut self, id: u32) -> Option<Arc<ItemDefinition>>;

    /// Fresh instance of `id`; self-scaling and evolving definitions come back initialised.
    fn instantiate(&mut self, id: u32, charges: i16) -> Option<ItemInstance> {
        self.lookup(id)
            .map(|definition| ItemInstance::from_definition(definition, charges))
    }
}

#[derive(Debug, Default, Clone)]
pub struct ItemCatalog {
    definitions: HashMap<u32, Arc<ItemDefinition>>,
}

impl ItemCatalog {
    pub fn get(&self, id: u32) -> Option<&Arc<ItemDefinition>> {
        self.definitions.get(&id)
    }

    pub fn insert(&mut self, definition: ItemDefinition) -> StoreResult<Arc<ItemDefinition>> {
        if self.definitions.contains_key(&definition.id) {
            return Err(StoreError::DuplicateDefinition(definition.id));
        }
        let definition = Arc::new(definition);
        self.definitions.insert(definition.id, Arc::clone(&definition));
        Ok(definition)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ItemDefinition>> {
        self.definitions.values()
    }

    /// Reads a YAML list of definitions.
    pub fn load_yaml(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    pub fn from_yaml_str(content: &str, context: &str) -> StoreResult<Self> {
        let list: Vec<ItemDefinition> =
            serde_yaml::from_str(content).map_err(|err| StoreError::yaml(context, err))?;
        let mut catalog = ItemCatalog::default();
        for definition in list {
            catalog.insert(definition)?;
        }
        tracing::debug!(definitions = catalog.len(), source = %context, "item catalog loaded");
        Ok(catalog)
    }
}

impl ItemRepository for ItemCatalog {
    fn lookup(&mut self, id: u32) -> Option<Arc<ItemDefinition>> {
        self.definitions.get(&id).cloned()
    }
}
