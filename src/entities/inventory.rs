use crate::entities::cursor::CursorQueue;
use crate::entities::item::ItemInstance;
use crate::entities::placement;
use crate::entities::slots::{
    Bucket, SlotCodec, SlotLocation, SlotScheme, SlotType, AUGMENT_SLOTS, AUGSLOT_INVALID, ITEMS_PER_BAG,
    PERSONAL_BEGIN, PERSONAL_END, SLOT_AUGMENT, SLOT_CURSOR, SLOT_INVALID, SUBSLOT_INVALID,
    WORLD_CONTAINER_BEGIN, WORLD_CONTAINER_END,
};
use crate::world::item_types::{ItemClass, ItemDefinition, BAG_TYPE_QUIVER};
use crate::world::limits::InventoryLimits;
use bitflags::bitflags;
use std::collections::BTreeMap;

bitflags! {
    /// Buckets searched by the `has_item*` family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InvWhere: u8 {
        const WORN = 0x01;
        const PERSONAL = 0x02;
        const BANK = 0x04;
        const SHARED_BANK = 0x08;
        const TRADING = 0x10;
        const CURSOR = 0x20;
    }
}

impl InvWhere {
    fn buckets(self) -> impl Iterator<Item = Bucket> {
        [
            (InvWhere::WORN, Bucket::Worn),
            (InvWhere::PERSONAL, Bucket::Personal),
            (InvWhere::BANK, Bucket::Bank),
            (InvWhere::SHARED_BANK, Bucket::SharedBank),
            (InvWhere::TRADING, Bucket::Trade),
            (InvWhere::CURSOR, Bucket::Cursor),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, bucket)| bucket)
    }
}

/// Where a flat slot id lands.
#[derive(Debug, Clone, Copy)]
enum Resolved {
    Bucket(Bucket, i16),
    BagInterior { parent: i16, sub: u8 },
    Auxiliary(SlotLocation),
    Invalid,
}

/// What a search predicate says about one instance.
#[derive(Debug, Clone, Copy, Default)]
struct Probe {
    counts: bool,
    augment: bool,
}

type Entries<'a> = Box<dyn Iterator<Item = (i16, &'a ItemInstance)> + 'a>;

/// One character's storage: flat-addressed buckets, the cursor queue and the
/// auxiliary buckets addressed by [`SlotLocation`].
#[derive(Debug, Clone)]
pub struct Inventory {
    codec: SlotCodec,
    limits: InventoryLimits,
    worn: BTreeMap<i16, ItemInstance>,
    personal: BTreeMap<i16, ItemInstance>,
    bank: BTreeMap<i16, ItemInstance>,
    shared_bank: BTreeMap<i16, ItemInstance>,
    trade: BTreeMap<i16, ItemInstance>,
    auxiliary: BTreeMap<SlotType, BTreeMap<i16, ItemInstance>>,
    cursor: CursorQueue,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(InventoryLimits::server(), SlotScheme::Canonical)
    }
}

impl Inventory {
    pub fn new(limits: InventoryLimits, scheme: SlotScheme) -> Self {
        if !limits.is_set() {
            tracing::warn!("inventory created with unset limits; auxiliary buckets will reject every item");
        }
        Self {
            codec: SlotCodec::new(scheme),
            limits,
            worn: BTreeMap::new(),
            personal: BTreeMap::new(),
            bank: BTreeMap::new(),
            shared_bank: BTreeMap::new(),
            trade: BTreeMap::new(),
            auxiliary: BTreeMap::new(),
            cursor: CursorQueue::new(),
        }
    }

    pub fn codec(&self) -> &SlotCodec {
        &self.codec
    }

    pub fn limits(&self) -> &InventoryLimits {
        &self.limits
    }

    fn resolve(&self, slot_id: i16) -> Resolved {
        if let Some(bucket) = self.codec.bucket_of(slot_id) {
            return Resolved::Bucket(bucket, slot_id);
        }
        if (WORLD_CONTAINER_BEGIN..=WORLD_CONTAINER_END).contains(&slot_id) {
            return Resolved::Auxiliary(self.codec.locate(slot_id));
        }
        let parent = self.codec.parent_slot(slot_id);
        if parent == SLOT_INVALID {
            return Resolved::Invalid;
        }
        Resolved::BagInterior {
            parent,
            sub: self.codec.sub_index(slot_id),
        }
    }

    fn bucket_map(&self, bucket: Bucket) -> Option<&BTreeMap<i16, ItemInstance>> {
        match bucket {
            Bucket::Worn => Some(&self.worn),
            Bucket::Personal => Some(&self.personal),
            Bucket::Bank => Some(&self.bank),
            Bucket::SharedBank => Some(&self.shared_bank),
            Bucket::Trade => Some(&self.trade),
            Bucket::Cursor => None,
        }
    }

    fn bucket_map_mut(&mut self, bucket: Bucket) -> Option<&mut BTreeMap<i16, ItemInstance>> {
        match bucket {
            Bucket::Worn => Some(&mut self.worn),
            Bucket::Personal => Some(&mut self.personal),
            Bucket::Bank => Some(&mut self.bank),
            Bucket::SharedBank => Some(&mut self.shared_bank),
            Bucket::Trade => Some(&mut self.trade),
            Bucket::Cursor => None,
        }
    }

    /// Occupied slots of one flat bucket in slot order; the cursor yields its whole queue.
    pub fn items_in(&self, bucket: Bucket) -> Entries<'_> {
        match self.bucket_map(bucket) {
            Some(map) => Box::new(map.iter().map(|(slot, item)| (*slot, item))),
            None => Box::new(self.cursor.iter().map(|item| (SLOT_CURSOR, item))),
        }
    }

    pub fn auxiliary_items(&self) -> impl Iterator<Item = (SlotType, i16, &ItemInstance)> {
        self.auxiliary
            .iter()
            .flat_map(|(slot_type, map)| map.iter().map(move |(main, item)| (*slot_type, *main, item)))
    }

    pub fn get_item(&self, slot_id: i16) -> Option<&ItemInstance> {
        match self.resolve(slot_id) {
            Resolved::Bucket(Bucket::Cursor, _) => self.cursor.peek_front(),
            Resolved::Bucket(bucket, slot) => self.bucket_map(bucket).and_then(|map| map.get(&slot)),
            Resolved::BagInterior { parent, sub } => self
                .get_item(parent)
                .filter(|bag| bag.is_type(ItemClass::Container))
                .and_then(|bag| bag.get_item(i16::from(sub))),
            Resolved::Auxiliary(location) => self.item_at(&location),
            Resolved::Invalid => None,
        }
    }

    pub fn get_item_mut(&mut self, slot_id: i16) -> Option<&mut ItemInstance> {
        match self.resolve(slot_id) {
            Resolved::Bucket(Bucket::Cursor, _) => self.cursor.peek_front_mut(),
            Resolved::Bucket(bucket, slot) => self.bucket_map_mut(bucket).and_then(|map| map.get_mut(&slot)),
            Resolved::BagInterior { parent, sub } => self
                .get_item_mut(parent)
                .filter(|bag| bag.is_type(ItemClass::Container))
                .and_then(|bag| bag.get_item_mut(i16::from(sub))),
            Resolved::Auxiliary(location) => self.item_at_mut(&location),
            Resolved::Invalid => None,
        }
    }

    /// Item at position `bag_index` of the bag sitting at `slot_id`.
    pub fn get_bag_item(&self, slot_id: i16, bag_index: u8) -> Option<&ItemInstance> {
        self.get_item(self.codec.compose_slot(slot_id, bag_index))
    }

    /// Queues a copy of `item` behind whatever is already held.
    pub fn push_cursor(&mut self, item: &ItemInstance) -> i16 {
        let mut copy = item.clone();
        copy.set_current_slot(SLOT_CURSOR);
        self.cursor.push(copy);
        SLOT_CURSOR
    }

    pub fn cursor_items(&self) -> impl Iterator<Item = &ItemInstance> {
        self.cursor.iter()
    }

    pub fn cursor_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    /// Replaces the occupant of `slot_id` with a copy of `item`.
    ///
    /// Returns the slot used, or [`SLOT_INVALID`] when the slot cannot hold
    /// anything; the copy is dropped in that case.
    pub fn put_item(&mut self, slot_id: i16, item: &ItemInstance) -> i16 {
        self.delete_item(slot_id, 0);
        if item.unscaled_definition().is_none() {
            return slot_id;
        }
        self.put_owned(slot_id, item.clone())
    }

    /// Stores `item` at a slot the caller already emptied.
    fn put_owned(&mut self, slot_id: i16, mut item: ItemInstance) -> i16 {
        item.set_current_slot(slot_id);
        let placed = match self.resolve(slot_id) {
            Resolved::Bucket(Bucket::Cursor, _) => {
                self.cursor.push_front(item);
                return SLOT_CURSOR;
            }
            Resolved::Bucket(bucket, slot) => match self.bucket_map_mut(bucket) {
                Some(map) => {
                    map.insert(slot, item);
                    return slot;
                }
                None => item,
            },
            Resolved::BagInterior { .. } if item.is_type(ItemClass::Container) => {
                tracing::error!(slot_id, item = item.id(), "container put inside a bag; item destroyed");
                return SLOT_INVALID;
            }
            Resolved::BagInterior { parent, sub } => match self.get_item_mut(parent) {
                Some(bag) if bag.is_type(ItemClass::Container) => {
                    bag.put_item_owned(i16::from(sub), item);
                    return slot_id;
                }
                _ => item,
            },
            Resolved::Auxiliary(location) => {
                return match self.put_at_owned(&location, item) {
                    Ok(()) => slot_id,
                    Err(item) => {
                        tracing::error!(slot_id, item = item.id(), "put into unresolvable slot; item destroyed");
                        SLOT_INVALID
                    }
                };
            }
            Resolved::Invalid => item,
        };
        tracing::error!(slot_id, item = placed.id(), "put into unresolvable slot; item destroyed");
        SLOT_INVALID
    }

    /// Removes the item at `slot_id` and hands it to the caller.
    pub fn pop_item(&mut self, slot_id: i16) -> Option<ItemInstance> {
        match self.resolve(slot_id) {
            Resolved::Bucket(Bucket::Cursor, _) => self.cursor.pop(),
            Resolved::Bucket(bucket, slot) => self.bucket_map_mut(bucket).and_then(|map| map.remove(&slot)),
            Resolved::BagInterior { parent, sub } => self
                .get_item_mut(parent)
                .filter(|bag| bag.is_type(ItemClass::Container))
                .and_then(|bag| bag.pop_item(i16::from(sub))),
            Resolved::Auxiliary(location) => self.pop_at(&location),
            Resolved::Invalid => None,
        }
    }

    /// With `quantity == 0` the item is destroyed outright. Otherwise charges are
    /// consumed; a spent stackable, uncharged or expendable item is destroyed,
    /// anything else goes back and `false` is returned.
    pub fn delete_item(&mut self, slot_id: i16, quantity: u8) -> bool {
        let Some(mut item) = self.pop_item(slot_id) else {
            return true;
        };
        if quantity == 0 {
            return true;
        }
        item.set_charges(item.charges().saturating_sub(i16::from(quantity)));
        if item.charges() <= 0 {
            let uncharged = item.definition().map_or(true, |def| def.max_charges == 0);
            if item.is_stackable() || uncharged || item.is_expendable() {
                return true;
            }
        }
        self.put_owned(slot_id, item);
        false
    }

    fn bag_parent(&self, slot_id: i16) -> Option<i16> {
        match self.resolve(slot_id) {
            Resolved::BagInterior { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Container and position a bag-interior slot id refers to.
    fn bag_target(&self, slot_id: i16) -> Option<(Option<&ItemInstance>, u8)> {
        match self.resolve(slot_id) {
            Resolved::BagInterior { parent, sub } => Some((self.get_item(parent), sub)),
            Resolved::Auxiliary(location) if location.is_bag_interior() => {
                let holder = SlotLocation {
                    sub_slot: SUBSLOT_INVALID,
                    ..location
                };
                Some((self.item_at(&holder), location.sub_slot as u8))
            }
            _ => None,
        }
    }

    fn can_occupy(&self, item: &ItemInstance, slot_id: i16, location: &SlotLocation) -> bool {
        if !item.is_slot_allowed(location, &self.limits) {
            return false;
        }
        match self.bag_target(slot_id) {
            Some((Some(bag), sub)) => placement::can_place_in_bag(item, bag, sub),
            Some((None, _)) => false,
            None => true,
        }
    }

    /// Exchanges two slots after checking both moves; on rejection nothing changes.
    pub fn swap_item(&mut self, slot_a: i16, slot_b: i16) -> bool {
        if slot_a == slot_b {
            return true;
        }
        let location_a = self.codec.locate(slot_a);
        let location_b = self.codec.locate(slot_b);
        if location_a.is_delete_request() || location_b.is_delete_request() {
            tracing::warn!(slot_a, slot_b, "swap with an unresolvable slot");
            return false;
        }
        if self.bag_parent(slot_a) == Some(slot_b) || self.bag_parent(slot_b) == Some(slot_a) {
            tracing::debug!(slot_a, slot_b, "swap rejected: bag and its own contents");
            return false;
        }
        if let Some(item) = self.get_item(slot_a) {
            if !self.can_occupy(item, slot_b, &location_b) {
                tracing::debug!(slot_a, slot_b, item = item.id(), "swap rejected");
                return false;
            }
        }
        if let Some(item) = self.get_item(slot_b) {
            if !self.can_occupy(item, slot_a, &location_a) {
                tracing::debug!(slot_a, slot_b, item = item.id(), "swap rejected");
                return false;
            }
        }

        let item_a = self.pop_item(slot_a);
        let item_b = self.pop_item(slot_b);
        if let Some(item) = item_b {
            self.put_owned(slot_a, item);
        }
        if let Some(item) = item_a {
            self.put_owned(slot_b, item);
        }
        true
    }

    fn search(&self, places: InvWhere, quantity: u8, probe: impl Fn(&ItemInstance, bool) -> Probe) -> i16 {
        for bucket in places.buckets() {
            // running total restarts for every bucket
            let mut found: u32 = 0;
            for (slot, item) in self.items_in(bucket) {
                let hit = probe(item, false);
                if hit.counts {
                    found = found.saturating_add(charge_count(item));
                    if found >= u32::from(quantity) {
                        return slot;
                    }
                }
                if hit.augment {
                    return SLOT_AUGMENT;
                }
                if !item.is_type(ItemClass::Container) {
                    continue;
                }
                for (sub, child) in item.contents() {
                    let hit = probe(child, true);
                    if hit.counts {
                        found = found.saturating_add(charge_count(child));
                        if found >= u32::from(quantity) {
                            return self.codec.compose_slot(slot, sub);
                        }
                    }
                    if hit.augment {
                        return SLOT_AUGMENT;
                    }
                }
            }
        }
        SLOT_INVALID
    }

    /// Slot where the running charge total for `item_id` reaches `quantity`.
    ///
    /// The total restarts per bucket, and the slot returned is the stack that
    /// crossed the threshold rather than the first stack seen. A matching
    /// augment answers [`SLOT_AUGMENT`] when at most one is wanted.
    pub fn has_item(&self, item_id: u32, quantity: u8, places: InvWhere) -> i16 {
        self.search(places, quantity, |item, _| Probe {
            counts: item.id() == item_id,
            augment: item_id != 0
                && quantity <= 1
                && (0..AUGMENT_SLOTS as i16).any(|slot| item.augment_item_id(slot) == item_id),
        })
    }

    pub fn has_item_by_use(&self, item_type: u8, quantity: u8, places: InvWhere) -> i16 {
        self.search(places, quantity, |item, _| Probe {
            counts: item.is_type(ItemClass::Common)
                && item.definition().is_some_and(|def| def.item_type == item_type),
            augment: false,
        })
    }

    pub fn has_item_by_lore_group(&self, lore_group: i32, places: InvWhere) -> i16 {
        self.search(places, 1, |item, nested| Probe {
            counts: (!nested || item.is_type(ItemClass::Common))
                && item.definition().is_some_and(|def| def.lore_group == lore_group),
            augment: (0..AUGMENT_SLOTS as i16).any(|slot| {
                item.get_augment(slot)
                    .and_then(ItemInstance::definition)
                    .is_some_and(|def| def.lore_group == lore_group)
            }),
        })
    }

    /// Dry run of placing `quantity` of `definition` into personal slots and their bags.
    pub fn has_space_for_item(&self, definition: &ItemDefinition, quantity: i16) -> bool {
        let mut remaining = i32::from(quantity);
        if remaining <= 0 {
            return true;
        }

        if definition.stackable {
            for slot in PERSONAL_BEGIN..=PERSONAL_END {
                let Some(item) = self.get_item(slot) else {
                    continue;
                };
                if let Some(room) = stack_room(item, definition) {
                    if remaining <= room {
                        return true;
                    }
                    remaining -= room;
                }
                if item.is_type(ItemClass::Container) {
                    for sub in 0..item.bag_capacity() {
                        let room = item.get_item(i16::from(sub)).and_then(|child| stack_room(child, definition));
                        if let Some(room) = room {
                            if remaining <= room {
                                return true;
                            }
                            remaining -= room;
                        }
                    }
                }
            }
        }

        let stack_size = i32::from(definition.stack_size);
        let take_empty = |remaining: &mut i32| -> bool {
            if !definition.stackable {
                if *remaining == 1 {
                    return true;
                }
                *remaining -= 1;
            } else {
                if *remaining <= stack_size {
                    return true;
                }
                *remaining -= stack_size;
            }
            false
        };

        for slot in PERSONAL_BEGIN..=PERSONAL_END {
            match self.get_item(slot) {
                None => {
                    if take_empty(&mut remaining) {
                        return true;
                    }
                }
                Some(_) if definition.is_container() => {}
                Some(bag) if bag.is_type(ItemClass::Container) => {
                    let fits = bag
                        .definition()
                        .is_some_and(|container| placement::can_item_fit_in_container(definition, container));
                    if !fits {
                        continue;
                    }
                    for sub in 0..bag.bag_capacity() {
                        if bag.get_item(i16::from(sub)).is_none() && take_empty(&mut remaining) {
                            return true;
                        }
                    }
                }
                Some(_) => {}
            }
        }
        false
    }

    /// First empty personal slot, then (unless `for_bag`) the first empty
    /// position in a personal bag at least `min_size` big, then the cursor.
    pub fn find_free_slot(&self, for_bag: bool, try_cursor: bool, min_size: u8, is_arrow: bool) -> i16 {
        if let Some(slot) = (PERSONAL_BEGIN..=PERSONAL_END).find(|slot| self.get_item(*slot).is_none()) {
            return slot;
        }

        if !for_bag {
            for slot in PERSONAL_BEGIN..=PERSONAL_END {
                let Some(bag) = self.get_item(slot).filter(|item| item.is_type(ItemClass::Container)) else {
                    continue;
                };
                let (bag_size, bag_type) = bag.definition().map_or((0, 0), |def| (def.bag_size, def.bag_type));
                if bag_size < min_size || (bag_type == BAG_TYPE_QUIVER && !is_arrow) {
                    continue;
                }
                if let Some(sub) = bag.first_open_slot() {
                    return self.codec.compose_slot(slot, sub);
                }
            }
        }

        if try_cursor {
            return SLOT_CURSOR;
        }
        SLOT_INVALID
    }

    /// [`Inventory::find_free_slot`] with the flags taken from `definition`;
    /// containers only ever land in main personal slots.
    pub fn find_free_slot_for(&self, definition: &ItemDefinition, try_cursor: bool) -> i16 {
        self.find_free_slot(definition.is_container(), try_cursor, definition.size, definition.is_arrow())
    }

    /// True when the item at `slot_id`, or anything in its first ten bag
    /// positions, is no-drop.
    pub fn check_no_drop(&self, slot_id: i16) -> bool {
        let Some(item) = self.get_item(slot_id) else {
            return false;
        };
        if item.is_no_drop() {
            return true;
        }
        item.is_type(ItemClass::Container)
            && (0..ITEMS_PER_BAG).any(|sub| item.get_item(sub).is_some_and(ItemInstance::is_no_drop))
    }

    pub fn can_item_fit_in_container(&self, item: &ItemDefinition, container: &ItemDefinition) -> bool {
        placement::can_item_fit_in_container(item, container)
    }

    pub fn set_custom_item_data(&mut self, slot_id: i16, key: &str, value: impl ToString) -> bool {
        match self.get_item_mut(slot_id) {
            Some(item) => {
                item.set_custom_data(key, value);
                true
            }
            None => false,
        }
    }

    pub fn custom_item_data(&self, slot_id: i16, key: &str) -> Option<&str> {
        self.get_item(slot_id).and_then(|item| item.custom_data(key))
    }

    fn uses_flat_id(location: &SlotLocation) -> bool {
        location
            .slot_type()
            .is_some_and(|slot_type| slot_type.is_flat_addressable() && slot_type != SlotType::World)
    }

    fn without_aug(location: &SlotLocation) -> SlotLocation {
        SlotLocation {
            aug_slot: AUGSLOT_INVALID,
            ..*location
        }
    }

    /// Lookup by structured address, covering buckets without a flat id band.
    pub fn item_at(&self, location: &SlotLocation) -> Option<&ItemInstance> {
        if location.is_augment() {
            return self
                .item_at(&Self::without_aug(location))
                .and_then(|item| item.get_augment(location.aug_slot));
        }
        if Self::uses_flat_id(location) {
            let slot_id = self.codec.flatten(location);
            return (slot_id != SLOT_INVALID).then(|| self.get_item(slot_id)).flatten();
        }
        let holder = self.auxiliary.get(&location.slot_type()?)?.get(&location.main_slot)?;
        if location.is_bag_interior() {
            holder.get_item(location.sub_slot)
        } else {
            Some(holder)
        }
    }

    fn item_at_mut(&mut self, location: &SlotLocation) -> Option<&mut ItemInstance> {
        if location.is_augment() {
            return self
                .item_at_mut(&Self::without_aug(location))
                .filter(|item| item.is_type(ItemClass::Common))
                .and_then(|item| item.get_item_mut(location.aug_slot));
        }
        if Self::uses_flat_id(location) {
            let slot_id = self.codec.flatten(location);
            if slot_id == SLOT_INVALID {
                return None;
            }
            return self.get_item_mut(slot_id);
        }
        let holder = self
            .auxiliary
            .get_mut(&location.slot_type()?)?
            .get_mut(&location.main_slot)?;
        if location.is_bag_interior() {
            holder.get_item_mut(location.sub_slot)
        } else {
            Some(holder)
        }
    }

    /// Replaces the occupant at `location` with a copy of `item`.
    pub fn put_at(&mut self, location: &SlotLocation, item: &ItemInstance) -> bool {
        if location.is_augment() {
            return match self.item_at_mut(&Self::without_aug(location)) {
                Some(holder) => {
                    holder.put_augment(location.aug_slot, item);
                    holder.get_augment(location.aug_slot).is_some()
                }
                None => false,
            };
        }
        if Self::uses_flat_id(location) {
            let slot_id = self.codec.flatten(location);
            return slot_id != SLOT_INVALID && self.put_item(slot_id, item) != SLOT_INVALID;
        }
        self.pop_at(location);
        match self.put_at_owned(location, item.clone()) {
            Ok(()) => true,
            Err(item) => {
                tracing::error!(?location, item = item.id(), "put into unresolvable location; item destroyed");
                false
            }
        }
    }

    fn put_at_owned(&mut self, location: &SlotLocation, item: ItemInstance) -> Result<(), ItemInstance> {
        let Some(slot_type) = location.slot_type() else {
            return Err(item);
        };
        if location.main_slot < 0 || location.main_slot >= self.limits.slot_type_size(slot_type) {
            return Err(item);
        }
        let bucket = self.auxiliary.entry(slot_type).or_default();
        if !location.is_bag_interior() {
            bucket.insert(location.main_slot, item);
            return Ok(());
        }
        if item.is_type(ItemClass::Container) {
            return Err(item);
        }
        match bucket.get_mut(&location.main_slot) {
            Some(holder) if holder.is_type(ItemClass::Container) && location.sub_slot >= 0 => {
                holder.put_item_owned(location.sub_slot, item);
                Ok(())
            }
            _ => Err(item),
        }
    }

    pub fn pop_at(&mut self, location: &SlotLocation) -> Option<ItemInstance> {
        if location.is_augment() {
            return self
                .item_at_mut(&Self::without_aug(location))
                .and_then(|item| item.remove_augment(location.aug_slot));
        }
        if Self::uses_flat_id(location) {
            let slot_id = self.codec.flatten(location);
            return (slot_id != SLOT_INVALID).then(|| self.pop_item(slot_id)).flatten();
        }
        let bucket = self.auxiliary.get_mut(&location.slot_type()?)?;
        if location.is_bag_interior() {
            bucket.get_mut(&location.main_slot)?.pop_item(location.sub_slot)
        } else {
            bucket.remove(&location.main_slot)
        }
    }

    /// Every instance owned by this inventory, bag contents and augments included.
    pub fn total_items(&self) -> usize {
        fn count(item: &ItemInstance) -> usize {
            1 + item.contents().map(|(_, child)| count(child)).sum::<usize>()
        }
        Bucket::SEARCH_ORDER
            .into_iter()
            .flat_map(|bucket| self.items_in(bucket))
            .map(|(_, item)| count(item))
            .chain(self.auxiliary_items().map(|(_, _, item)| count(item)))
            .sum()
    }

    fn dump_collection(&self, title: &str, bucket: Bucket) -> String {
        let mut out = format!("{title}:\n");
        for (slot, item) in self.items_in(bucket) {
            let Some(def) = item.definition() else {
                continue;
            };
            out.push_str(&format!("Slot {slot}: {} ({})\n", def.name, charge_count(item)));
            if !item.is_type(ItemClass::Container) {
                continue;
            }
            for (sub, child) in item.contents() {
                if let Some(child_def) = child.definition() {
                    out.push_str(&format!(
                        "\tSlot {}: {} ({})\n",
                        self.codec.compose_slot(slot, sub),
                        child_def.name,
                        charge_count(child)
                    ));
                }
            }
        }
        out
    }

    pub fn dump_worn_items(&self) -> String {
        self.dump_collection("Worn items", Bucket::Worn)
    }

    pub fn dump_inventory(&self) -> String {
        self.dump_collection("Inventory items", Bucket::Personal)
    }

    pub fn dump_bank_items(&self) -> String {
        self.dump_collection("Bank items", Bucket::Bank)
    }

    pub fn dump_shared_bank_items(&self) -> String {
        self.dump_collection("Shared Bank items", Bucket::SharedBank)
    }

    pub fn dump_entire_inventory(&self) -> String {
        let mut out = self.dump_worn_items();
        out.push_str(&self.dump_inventory());
        out.push_str(&self.dump_bank_items());
        out.push_str(&self.dump_shared_bank_items());
        out.push('\n');
        out
    }
}

/// Charges counted toward a quantity; spent or uncharged items count once.
fn charge_count(item: &ItemInstance) -> u32 {
    match item.charges() {
        charges if charges <= 0 => 1,
        charges => charges as u32,
    }
}

fn stack_room(item: &ItemInstance, definition: &ItemDefinition) -> Option<i32> {
    if item.id() != definition.id {
        return None;
    }
    let stack_size = i32::from(item.definition()?.stack_size);
    let charges = i32::from(item.charges());
    (charges < stack_size).then_some(stack_size - charges)
}
