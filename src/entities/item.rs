use crate::entities::evolving::{Evolution, EvolutionState};
use crate::entities::slots::{
    equip_bit, location_supports_containers, SlotLocation, SlotType, AUGMENT_SLOTS, CONTENTS_OUT_OF_RANGE,
    EQUIPMENT_BEGIN, EQUIPMENT_END, ITEMS_PER_BAG, SLOT_CURSOR, SLOT_INVALID, SLOT_POWER_SOURCE,
};
use crate::world::item_types::{ItemClass, ItemDefinition, ITEM_TYPE_ARROW, ITEM_TYPE_LARGE_THROWING, ITEM_TYPE_SMALL_THROWING};
use crate::world::limits::InventoryLimits;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique instance identifier, kept across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SerialNumber(pub u64);

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

impl SerialNumber {
    /// Saturates at `u64::MAX` instead of wrapping.
    pub fn next() -> Self {
        match NEXT_SERIAL.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |serial| serial.checked_add(1)) {
            Ok(serial) => SerialNumber(serial),
            Err(serial) => {
                tracing::error!(serial, "item serial counter exhausted; serials are no longer unique");
                SerialNumber(serial)
            }
        }
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseType {
    #[default]
    Normal,
    /// Placeholder for a world object that behaves like a bag.
    WorldContainer,
}

/// Tri-state predicate on one boolean item property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    Ignore,
    Set,
    NotSet,
}

impl FlagFilter {
    pub fn matches(self, flag: bool) -> bool {
        match self {
            FlagFilter::Ignore => true,
            FlagFilter::Set => flag,
            FlagFilter::NotSet => !flag,
        }
    }
}

/// One item in the storage tree. Owns its bag contents or augments.
#[derive(Debug, Clone)]
pub struct ItemInstance {
    definition: Option<Arc<ItemDefinition>>,
    use_type: UseType,
    charges: i16,
    color: u32,
    no_drop: bool,
    price: u32,
    merchant_slot: i16,
    merchant_count: i32,
    current_slot: i16,
    serial: SerialNumber,
    contents: BTreeMap<u8, ItemInstance>,
    custom_data: BTreeMap<String, String>,
    evolution: Option<Evolution>,
}

fn contents_index(sub: i16) -> Option<u8> {
    if (sub as u16) & CONTENTS_OUT_OF_RANGE != 0 {
        None
    } else {
        Some(sub as u8)
    }
}

impl ItemInstance {
    /// Plain instance; no evolution state is attached.
    pub fn new(definition: Option<Arc<ItemDefinition>>, charges: i16) -> Self {
        let color = definition
            .as_ref()
            .filter(|def| def.class == ItemClass::Common)
            .map_or(0, |def| def.color);
        Self {
            definition,
            use_type: UseType::Normal,
            charges,
            color,
            no_drop: false,
            price: 0,
            merchant_slot: 0,
            merchant_count: 1,
            current_slot: SLOT_INVALID,
            serial: SerialNumber::next(),
            contents: BTreeMap::new(),
            custom_data: BTreeMap::new(),
            evolution: None,
        }
    }

    /// Instance of `definition`; scaling and evolving definitions get initialised evolution state.
    pub fn from_definition(definition: Arc<ItemDefinition>, charges: i16) -> Self {
        let evolution = definition.is_evolving().then(|| {
            let mut evolution = Evolution::for_definition(&definition);
            evolution.initialize(&definition);
            evolution
        });
        Self {
            evolution,
            ..Self::new(Some(definition), charges)
        }
    }

    pub fn placeholder(use_type: UseType) -> Self {
        Self {
            use_type,
            ..Self::new(None, 0)
        }
    }

    /// Effective definition: the scaled one when present.
    pub fn definition(&self) -> Option<&ItemDefinition> {
        self.evolution
            .as_ref()
            .and_then(Evolution::scaled_definition)
            .or(self.definition.as_ref())
            .map(Arc::as_ref)
    }

    pub fn unscaled_definition(&self) -> Option<&Arc<ItemDefinition>> {
        self.definition.as_ref()
    }

    pub fn id(&self) -> u32 {
        self.definition.as_ref().map_or(0, |def| def.id)
    }

    pub fn use_type(&self) -> UseType {
        self.use_type
    }

    pub fn is_type(&self, class: ItemClass) -> bool {
        if self.use_type == UseType::WorldContainer && class == ItemClass::Container {
            return true;
        }
        self.definition().is_some_and(|def| def.class == class)
    }

    pub fn charges(&self) -> i16 {
        self.charges
    }

    pub fn set_charges(&mut self, charges: i16) {
        self.charges = charges;
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn set_color(&mut self, color: u32) {
        self.color = color;
    }

    pub fn instance_no_drop(&self) -> bool {
        self.no_drop
    }

    pub fn set_instance_no_drop(&mut self, no_drop: bool) {
        self.no_drop = no_drop;
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn set_price(&mut self, price: u32) {
        self.price = price;
    }

    pub fn merchant_slot(&self) -> i16 {
        self.merchant_slot
    }

    pub fn set_merchant_slot(&mut self, slot: i16) {
        self.merchant_slot = slot;
    }

    pub fn merchant_count(&self) -> i32 {
        self.merchant_count
    }

    pub fn set_merchant_count(&mut self, count: i32) {
        self.merchant_count = count;
    }

    /// Slot id this instance was last placed at by an inventory.
    pub fn current_slot(&self) -> i16 {
        self.current_slot
    }

    pub(crate) fn set_current_slot(&mut self, slot: i16) {
        self.current_slot = slot;
    }

    pub fn serial_number(&self) -> SerialNumber {
        self.serial
    }

    pub fn set_serial_number(&mut self, serial: SerialNumber) {
        self.serial = serial;
    }

    pub fn is_stackable(&self) -> bool {
        self.definition().is_some_and(|def| def.stackable)
    }

    pub fn is_expendable(&self) -> bool {
        self.definition().is_some_and(ItemDefinition::is_expendable)
    }

    pub fn is_no_drop(&self) -> bool {
        self.no_drop || self.definition().is_some_and(|def| def.no_drop)
    }

    pub fn is_weapon(&self) -> bool {
        match self.definition() {
            Some(def) if def.class == ItemClass::Common => {
                if def.item_type == ITEM_TYPE_ARROW && def.stats.damage != 0 {
                    true
                } else {
                    def.stats.damage != 0 && def.delay != 0
                }
            }
            _ => false,
        }
    }

    pub fn is_ammo(&self) -> bool {
        self.definition().is_some_and(|def| {
            matches!(
                def.item_type,
                ITEM_TYPE_ARROW | ITEM_TYPE_LARGE_THROWING | ITEM_TYPE_SMALL_THROWING
            )
        })
    }

    pub fn is_augmentable(&self) -> bool {
        self.definition()
            .is_some_and(|def| def.aug_slot_types.iter().any(|slot_type| *slot_type != 0))
    }

    pub fn is_augmented(&self) -> bool {
        self.is_common() && (0..AUGMENT_SLOTS as i16).any(|slot| self.augment_item_id(slot) != 0)
    }

    pub fn is_equipable_by(&self, race: u16, class: u16) -> bool {
        self.definition()
            .is_some_and(|def| def.equip_slots != 0 && def.is_equipable(race, class))
    }

    /// True for a worn possessions slot whose bit is set in the equip mask.
    pub fn is_equipable_at(&self, location: &SlotLocation) -> bool {
        let Some(def) = self.definition() else {
            return false;
        };
        if location.slot_type() != Some(SlotType::Possessions) || location.is_bag_interior() || location.is_augment() {
            return false;
        }
        let worn = (EQUIPMENT_BEGIN..=EQUIPMENT_END).contains(&location.main_slot)
            || location.main_slot == SLOT_POWER_SOURCE;
        worn && equip_bit(location.main_slot).is_some_and(|bit| def.equip_slots & (1 << bit) != 0)
    }

    /// Whether some worn slot is allowed both by this item and by `wear_mask`.
    pub fn available_wear_slot(&self, wear_mask: u32) -> bool {
        match self.definition() {
            Some(def) if def.class == ItemClass::Common => {
                (EQUIPMENT_BEGIN..=EQUIPMENT_END).any(|slot| def.equip_slots & wear_mask & (1 << slot) != 0)
            }
            _ => false,
        }
    }

    /// Placement check for `location` under `limits`.
    pub fn is_slot_allowed(&self, location: &SlotLocation, limits: &InventoryLimits) -> bool {
        if self.definition.is_none() || location.is_augment() {
            return false;
        }
        if location_supports_containers(location) {
            return true;
        }
        if self.is_equipable_at(location) {
            return equip_bit(location.main_slot)
                .is_some_and(|bit| limits.equipment_bitmask() & (1 << bit) != 0);
        }
        let Some(slot_type) = location.slot_type() else {
            return false;
        };
        let main_ok = match slot_type {
            SlotType::Possessions => {
                (limits.personal_start()..=limits.personal_end()).contains(&location.main_slot)
                    || location.main_slot == SLOT_CURSOR
            }
            _ => location.main_slot >= 0 && location.main_slot < limits.slot_type_size(slot_type),
        };
        if location.is_bag_interior() {
            main_ok && location.sub_slot >= 0 && location.sub_slot < i16::from(limits.bag_slots_max())
        } else {
            main_ok && slot_type != SlotType::Possessions
        }
    }

    fn is_common(&self) -> bool {
        self.definition().is_some_and(|def| def.class == ItemClass::Common)
    }

    /// Usable bag width; a definition-less world container gets the standard bag width.
    pub fn bag_capacity(&self) -> u8 {
        match self.definition() {
            Some(def) => def.bag_slots,
            None if self.use_type == UseType::WorldContainer => ITEMS_PER_BAG as u8,
            None => 0,
        }
    }

    pub fn is_non_empty_container(&self) -> bool {
        self.is_type(ItemClass::Container) && self.contents.keys().any(|sub| *sub < self.bag_capacity())
    }

    /// This item plus whatever sits inside its bag slots.
    pub fn total_item_count(&self) -> usize {
        if !self.is_type(ItemClass::Container) {
            return 1;
        }
        let capacity = self.bag_capacity();
        1 + self.contents.keys().filter(|sub| **sub < capacity).count()
    }

    pub fn contents(&self) -> impl Iterator<Item = (u8, &ItemInstance)> {
        self.contents.iter().map(|(sub, item)| (*sub, item))
    }

    pub fn contents_len(&self) -> usize {
        self.contents.len()
    }

    pub fn get_item(&self, sub: i16) -> Option<&ItemInstance> {
        contents_index(sub).and_then(|index| self.contents.get(&index))
    }

    pub fn get_item_mut(&mut self, sub: i16) -> Option<&mut ItemInstance> {
        contents_index(sub).and_then(move |index| self.contents.get_mut(&index))
    }

    pub fn item_id_at(&self, sub: i16) -> u32 {
        self.get_item(sub).map_or(0, ItemInstance::id)
    }

    /// Stores a copy of `item` at `sub`, dropping whatever was there.
    pub fn put_item(&mut self, sub: i16, item: &ItemInstance) {
        self.put_item_owned(sub, item.clone());
    }

    /// Moves `item` in at `sub`; out-of-range indices drop it.
    pub fn put_item_owned(&mut self, sub: i16, item: ItemInstance) {
        match contents_index(sub) {
            Some(index) => {
                self.contents.insert(index, item);
            }
            None => tracing::debug!(sub, item = item.id(), "contents index out of range"),
        }
    }

    pub fn pop_item(&mut self, sub: i16) -> Option<ItemInstance> {
        contents_index(sub).and_then(|index| self.contents.remove(&index))
    }

    pub fn delete_item(&mut self, sub: i16) {
        self.pop_item(sub);
    }

    /// First empty bag position below the bag's capacity.
    pub fn first_open_slot(&self) -> Option<u8> {
        (0..self.bag_capacity()).find(|sub| !self.contents.contains_key(sub))
    }

    fn augment_index(&self, slot: i16) -> Option<i16> {
        let in_range = (0..AUGMENT_SLOTS as i16).contains(&slot);
        (in_range && self.is_common()).then_some(slot)
    }

    pub fn get_augment(&self, slot: i16) -> Option<&ItemInstance> {
        self.augment_index(slot).and_then(|slot| self.get_item(slot))
    }

    pub fn augment_item_id(&self, slot: i16) -> u32 {
        self.get_augment(slot).map_or(0, ItemInstance::id)
    }

    pub fn put_augment(&mut self, slot: i16, augment: &ItemInstance) {
        if let Some(slot) = self.augment_index(slot) {
            self.put_item(slot, augment);
        }
    }

    pub fn remove_augment(&mut self, slot: i16) -> Option<ItemInstance> {
        self.augment_index(slot).and_then(|slot| self.pop_item(slot))
    }

    pub fn delete_augment(&mut self, slot: i16) {
        self.remove_augment(slot);
    }

    /// First empty augment slot accepting `aug_type`; `-1` accepts any slot.
    pub fn available_augment_slot(&self, aug_type: i32) -> Option<u8> {
        let def = self.definition().filter(|def| def.class == ItemClass::Common)?;
        (0..AUGMENT_SLOTS as u8).find(|slot| {
            if self.contents.contains_key(slot) {
                return false;
            }
            let slot_type = def.aug_slot_types[usize::from(*slot)];
            aug_type == -1
                || (slot_type != 0
                    && 1i64.checked_shl(u32::from(slot_type - 1)).unwrap_or(0) & i64::from(aug_type) != 0)
        })
    }

    /// Drops every child.
    pub fn clear(&mut self) {
        self.contents.clear();
    }

    /// Drops children whose no-drop and no-rent flags both match their filters.
    pub fn clear_by_flags(&mut self, no_drop: FlagFilter, no_rent: FlagFilter) {
        if no_drop == FlagFilter::Ignore && no_rent == FlagFilter::Ignore {
            return;
        }
        self.contents.retain(|_, child| match child.definition() {
            Some(def) => !(no_drop.matches(def.no_drop) && no_rent.matches(def.no_rent)),
            None => true,
        });
    }

    pub fn custom_data(&self, key: &str) -> Option<&str> {
        self.custom_data.get(key).map(String::as_str)
    }

    /// Parsed value of `key`; `None` when absent or not a `T`.
    pub fn custom_data_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.custom_data(key).and_then(|value| value.parse().ok())
    }

    pub fn set_custom_data(&mut self, key: impl Into<String>, value: impl ToString) {
        self.custom_data.insert(key.into(), value.to_string());
    }

    pub fn delete_custom_data(&mut self, key: &str) {
        self.custom_data.remove(key);
    }

    pub fn custom_data_map(&self) -> &BTreeMap<String, String> {
        &self.custom_data
    }

    /// `key^value` pairs joined with `^`, in key order.
    pub fn custom_data_string(&self) -> String {
        self.custom_data
            .iter()
            .map(|(key, value)| format!("{key}^{value}"))
            .collect::<Vec<_>>()
            .join("^")
    }

    pub fn evolution(&self) -> Option<&Evolution> {
        self.evolution.as_ref()
    }

    pub fn evolution_mut(&mut self) -> Option<&mut Evolution> {
        self.evolution.as_mut()
    }

    pub fn set_evolution(&mut self, evolution: Option<Evolution>) {
        self.evolution = evolution;
    }

    pub fn is_evolving(&self) -> bool {
        matches!(self.evolution_state(), EvolutionState::Evolving(_))
    }

    pub fn is_scaling(&self) -> bool {
        self.evolution_state() == EvolutionState::Scaling
    }

    pub fn evolution_state(&self) -> EvolutionState {
        self.evolution.as_ref().map_or(EvolutionState::NotEvolving, Evolution::state)
    }

    /// Recomputes the scaled definition from the unscaled one.
    pub fn scale_item(&mut self) {
        if let (Some(evolution), Some(base)) = (self.evolution.as_mut(), self.definition.as_ref()) {
            evolution.scale(base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::slots::{SLOT_PRIMARY, SLOT_RANGE};
    use crate::world::item_types::StatBlock;

    fn def(id: u32, build: impl FnOnce(&mut ItemDefinition)) -> Arc<ItemDefinition> {
        let mut def = ItemDefinition::new(id, format!("item {id}"));
        build(&mut def);
        Arc::new(def)
    }

    fn bag() -> ItemInstance {
        ItemInstance::new(
            Some(def(17005, |d| {
                d.class = ItemClass::Container;
                d.bag_slots = 4;
                d.bag_size = 3;
            })),
            0,
        )
    }

    fn sword() -> ItemInstance {
        ItemInstance::new(
            Some(def(5019, |d| {
                d.equip_slots = 1 << SLOT_PRIMARY;
                d.aug_slot_types = [1, 3, 0, 0, 0, 0];
                d.delay = 30;
                d.stats.damage = 8;
            })),
            0,
        )
    }

    #[test]
    fn clone_is_deep_and_keeps_serial() {
        let mut original = bag();
        original.put_item(0, &sword());
        original.set_custom_data("quest", 1);

        let mut copy = original.clone();
        assert_eq!(copy.serial_number(), original.serial_number());
        copy.get_item_mut(0).unwrap().set_charges(9);
        copy.put_item(1, &sword());
        copy.set_custom_data("quest", 2);

        assert_eq!(original.get_item(0).unwrap().charges(), 0);
        assert!(original.get_item(1).is_none());
        assert_eq!(original.custom_data("quest"), Some("1"));
        assert!(Arc::ptr_eq(
            original.unscaled_definition().unwrap(),
            copy.unscaled_definition().unwrap()
        ));
    }

    #[test]
    fn only_common_items_take_definition_colour() {
        let dyed = |class| {
            ItemInstance::new(
                Some(def(900, |d| {
                    d.class = class;
                    d.color = 0x00ff_8800;
                })),
                0,
            )
        };
        assert_eq!(dyed(ItemClass::Common).color(), 0x00ff_8800);
        assert_eq!(dyed(ItemClass::Container).color(), 0);
        assert_eq!(dyed(ItemClass::Book).color(), 0);
    }

    #[test]
    fn equipable_by_race_and_class() {
        let robe = ItemInstance::new(
            Some(def(1200, |d| {
                d.equip_slots = 1 << SLOT_PRIMARY;
                d.classes = 1 << 1;
                d.races = (1 << 0) | (1 << 15);
            })),
            0,
        );
        assert!(robe.is_equipable_by(1, 2));
        assert!(robe.is_equipable_by(16, 2));
        assert!(robe.is_equipable_by(18, 2));
        assert!(!robe.is_equipable_by(2, 2));
        assert!(!robe.is_equipable_by(1, 1));

        let unwearable = ItemInstance::new(
            Some(def(1201, |d| {
                d.classes = u32::MAX;
                d.races = u32::MAX;
            })),
            0,
        );
        assert!(!unwearable.is_equipable_by(1, 1));
        assert!(!ItemInstance::placeholder(UseType::Normal).is_equipable_by(1, 1));
    }

    #[test]
    fn serials_are_distinct() {
        let a = ItemInstance::placeholder(UseType::Normal);
        let b = ItemInstance::placeholder(UseType::Normal);
        assert_ne!(a.serial_number(), b.serial_number());
    }

    #[test]
    fn put_replaces_and_rejects_out_of_range() {
        let mut container = bag();
        container.put_item(2, &sword());
        let replacement = bag();
        container.put_item(2, &replacement);
        assert_eq!(container.item_id_at(2), 17005);
        assert_eq!(container.contents_len(), 1);

        container.put_item(-1, &sword());
        container.put_item(0x0100, &sword());
        assert_eq!(container.contents_len(), 1);
        assert!(container.pop_item(-3).is_none());

        let popped = container.pop_item(2).unwrap();
        assert_eq!(popped.id(), 17005);
        assert!(container.get_item(2).is_none());
    }

    #[test]
    fn world_container_reports_container_class() {
        let world = ItemInstance::placeholder(UseType::WorldContainer);
        assert!(world.is_type(ItemClass::Container));
        assert!(!world.is_type(ItemClass::Common));
        assert_eq!(world.first_open_slot(), Some(0));
        assert!(!ItemInstance::placeholder(UseType::Normal).is_type(ItemClass::Container));
    }

    #[test]
    fn first_open_slot_respects_capacity() {
        let mut container = bag();
        for sub in 0..3 {
            container.put_item(sub, &sword());
        }
        assert_eq!(container.first_open_slot(), Some(3));
        container.put_item(3, &sword());
        assert_eq!(container.first_open_slot(), None);
        assert_eq!(container.total_item_count(), 5);
        assert!(container.is_non_empty_container());
    }

    #[test]
    fn augments_only_on_common_items() {
        let mut weapon = sword();
        let gem = ItemInstance::new(Some(def(44000, |d| d.aug_type = 1)), 0);
        assert!(weapon.is_augmentable());
        assert_eq!(weapon.available_augment_slot(-1), Some(0));
        assert_eq!(weapon.available_augment_slot(0b100), Some(1));
        assert_eq!(weapon.available_augment_slot(0b1000), None);

        weapon.put_augment(0, &gem);
        assert!(weapon.is_augmented());
        assert_eq!(weapon.augment_item_id(0), 44000);
        assert_eq!(weapon.available_augment_slot(0b1), None);
        weapon.put_augment(AUGMENT_SLOTS as i16, &gem);
        assert_eq!(weapon.contents_len(), 1);

        let mut container = bag();
        container.put_augment(0, &gem);
        assert!(container.get_augment(0).is_none());

        assert_eq!(weapon.remove_augment(0).unwrap().id(), 44000);
        assert!(!weapon.is_augmented());
    }

    #[test]
    fn clear_by_flags_is_a_conjunction() {
        let no_drop = def(1, |d| d.no_drop = true);
        let no_rent = def(2, |d| d.no_rent = true);
        let both = def(3, |d| {
            d.no_drop = true;
            d.no_rent = true;
        });
        let plain = def(4, |_| {});
        let mut container = bag();
        for (sub, definition) in [no_drop, no_rent, both, plain].into_iter().enumerate() {
            container.put_item_owned(sub as i16, ItemInstance::new(Some(definition), 0));
        }

        container.clear_by_flags(FlagFilter::Ignore, FlagFilter::Ignore);
        assert_eq!(container.contents_len(), 4);

        let mut only_both = container.clone();
        only_both.clear_by_flags(FlagFilter::Set, FlagFilter::Set);
        assert_eq!(only_both.item_id_at(2), 0);
        assert_eq!(only_both.contents_len(), 3);

        let mut rentable = container.clone();
        rentable.clear_by_flags(FlagFilter::Ignore, FlagFilter::NotSet);
        assert_eq!(rentable.item_id_at(1), 2);
        assert_eq!(rentable.item_id_at(2), 3);
        assert_eq!(rentable.contents_len(), 2);
    }

    #[test]
    fn slot_allowed_rules() {
        let limits = InventoryLimits::server();
        let weapon = sword();
        assert!(weapon.is_slot_allowed(&SlotLocation::main(SlotType::Possessions, SLOT_PRIMARY), &limits));
        assert!(!weapon.is_slot_allowed(&SlotLocation::main(SlotType::Possessions, SLOT_RANGE), &limits));
        assert!(weapon.is_slot_allowed(&SlotLocation::main(SlotType::Possessions, 22), &limits));
        assert!(weapon.is_slot_allowed(&SlotLocation::main(SlotType::Bank, 3), &limits));
        assert!(weapon.is_slot_allowed(&SlotLocation::in_bag(SlotType::Possessions, 23, 9), &limits));
        assert!(!weapon.is_slot_allowed(&SlotLocation::in_bag(SlotType::Possessions, 23, 10), &limits));
        assert!(weapon.is_slot_allowed(&SlotLocation::main(SlotType::Tribute, 0), &limits));
        assert!(!weapon.is_slot_allowed(&SlotLocation::main(SlotType::Tribute, 5), &limits));
        assert!(!weapon.is_slot_allowed(&SlotLocation::main(SlotType::Bank, 3).with_aug(0), &limits));
        assert!(!ItemInstance::placeholder(UseType::Normal)
            .is_slot_allowed(&SlotLocation::main(SlotType::Possessions, 22), &limits));
    }

    #[test]
    fn weapon_and_ammo_classification() {
        assert!(sword().is_weapon());
        let arrow = ItemInstance::new(
            Some(def(8005, |d| {
                d.item_type = ITEM_TYPE_ARROW;
                d.stats = StatBlock {
                    damage: 5,
                    ..StatBlock::default()
                };
            })),
            20,
        );
        assert!(arrow.is_weapon());
        assert!(arrow.is_ammo());
        assert!(!bag().is_weapon());
        assert!(sword().available_wear_slot(1 << SLOT_PRIMARY));
        assert!(!sword().available_wear_slot(1 << SLOT_RANGE));
    }

    #[test]
    fn custom_data_string_joins_pairs() {
        let mut item = sword();
        item.set_custom_data("b", true);
        item.set_custom_data("a", 1.5);
        item.set_custom_data("c", "x");
        assert_eq!(item.custom_data_string(), "a^1.5^b^true^c^x");
        assert_eq!(item.custom_data_as::<f32>("a"), Some(1.5));
        assert_eq!(item.custom_data_as::<bool>("b"), Some(true));
        assert_eq!(item.custom_data_as::<i32>("c"), None);
        item.delete_custom_data("b");
        assert_eq!(item.custom_data("b"), None);
        assert_eq!(item.custom_data_string(), "a^1.5^c^x");
    }

    #[test]
    fn scaling_instance_exposes_scaled_definition() {
        let charm = def(52000, |d| {
            d.charm_file_id = 3;
            d.stats.hp = 100;
        });
        let mut item = ItemInstance::from_definition(charm, 0);
        assert!(item.is_scaling());
        item.evolution_mut().unwrap().set_exp(5000);
        item.scale_item();
        assert_eq!(item.definition().unwrap().stats.hp, 50);
        assert_eq!(item.unscaled_definition().unwrap().stats.hp, 100);
        let copy = item.clone();
        assert_eq!(copy.definition().unwrap().stats.hp, 50);
    }
}
