use crate::world::limits::InventoryLimits;
use serde::{Deserialize, Serialize};

pub const SLOT_INVALID: i16 = -1;
pub const SLOT_AUGMENT: i16 = -2;
pub const SLOT_CURSOR: i16 = 30;
pub const SLOT_POWER_SOURCE: i16 = 9999;

pub const SLOT_CHARM: i16 = 0;
pub const SLOT_EAR01: i16 = 1;
pub const SLOT_HEAD: i16 = 2;
pub const SLOT_FACE: i16 = 3;
pub const SLOT_EAR02: i16 = 4;
pub const SLOT_NECK: i16 = 5;
pub const SLOT_SHOULDER: i16 = 6;
pub const SLOT_ARMS: i16 = 7;
pub const SLOT_BACK: i16 = 8;
pub const SLOT_BRACER01: i16 = 9;
pub const SLOT_BRACER02: i16 = 10;
pub const SLOT_RANGE: i16 = 11;
pub const SLOT_HANDS: i16 = 12;
pub const SLOT_PRIMARY: i16 = 13;
pub const SLOT_SECONDARY: i16 = 14;
pub const SLOT_RING01: i16 = 15;
pub const SLOT_RING02: i16 = 16;
pub const SLOT_CHEST: i16 = 17;
pub const SLOT_LEGS: i16 = 18;
pub const SLOT_FEET: i16 = 19;
pub const SLOT_WAIST: i16 = 20;
pub const SLOT_AMMO: i16 = 21;

pub const EQUIPMENT_BEGIN: i16 = 0;
pub const EQUIPMENT_END: i16 = 21;
pub const PERSONAL_BEGIN: i16 = 22;
pub const PERSONAL_END: i16 = 29;
pub const TRIBUTE_BEGIN: i16 = 400;
pub const TRIBUTE_END: i16 = 404;
pub const PERSONAL_BAGS_BEGIN: i16 = 251;
pub const PERSONAL_BAGS_END: i16 = 330;
pub const CURSOR_BAG_BEGIN: i16 = 331;
pub const CURSOR_BAG_END: i16 = 340;
pub const BANK_BEGIN: i16 = 2000;
pub const BANK_END: i16 = 2023;
pub const BANK_BAGS_BEGIN: i16 = 2031;
pub const BANK_BAGS_END: i16 = 2270;
pub const SHARED_BANK_BEGIN: i16 = 2500;
pub const SHARED_BANK_END: i16 = 2501;
pub const SHARED_BANK_BAGS_BEGIN: i16 = 2531;
pub const SHARED_BANK_BAGS_END: i16 = 2550;
pub const TRADE_BEGIN: i16 = 3000;
pub const TRADE_END: i16 = 3007;
pub const TRADE_BAGS_BEGIN: i16 = 3031;
pub const TRADE_BAGS_END: i16 = 3110;
pub const LEGACY_TRADE_BAGS_BEGIN: i16 = 3100;
pub const LEGACY_TRADE_BAGS_END: i16 = 3179;
pub const WORLD_CONTAINER_BEGIN: i16 = 4000;
pub const WORLD_CONTAINER_END: i16 = 4009;

/// Width of every bag interior band.
pub const ITEMS_PER_BAG: i16 = 10;

/// Augment sub-indices `0..AUGMENT_SLOTS` of a common item.
pub const AUGMENT_SLOTS: usize = 6;

/// Any set bit here puts a contents index outside the addressable `0..=255` band.
pub const CONTENTS_OUT_OF_RANGE: u16 = 0xFF00;

pub const SLOTTYPE_INVALID: i16 = -1;
pub const MAINSLOT_INVALID: i16 = -1;
pub const SUBSLOT_INVALID: i16 = -1;
pub const AUGSLOT_INVALID: i16 = -1;

pub const MATERIAL_HEAD: u8 = 0;
pub const MATERIAL_CHEST: u8 = 1;
pub const MATERIAL_ARMS: u8 = 2;
pub const MATERIAL_BRACER: u8 = 3;
pub const MATERIAL_HANDS: u8 = 4;
pub const MATERIAL_LEGS: u8 = 5;
pub const MATERIAL_FEET: u8 = 6;
pub const MATERIAL_PRIMARY: u8 = 7;
pub const MATERIAL_SECONDARY: u8 = 8;
pub const MATERIAL_INVALID: u8 = 0xFF;

/// Equip bitmask position used for the power source slot.
pub const POWER_SOURCE_BIT: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum SlotType {
    Possessions = 0,
    Bank = 1,
    SharedBank = 2,
    Trade = 3,
    World = 4,
    Limbo = 5,
    Tribute = 6,
    TrophyTribute = 7,
    GuildTribute = 8,
    Merchant = 9,
    Deleted = 10,
    Corpse = 11,
    Bazaar = 12,
    Inspect = 13,
    RealEstate = 14,
    ViewModPc = 15,
    ViewModBank = 16,
    ViewModSharedBank = 17,
    ViewModLimbo = 18,
    AltStorage = 19,
    Archived = 20,
    Mail = 21,
    GuildTrophyTribute = 22,
    Krono = 23,
    Other = 24,
}

impl SlotType {
    pub const COUNT: usize = 25;

    pub const ALL: [SlotType; SlotType::COUNT] = [
        SlotType::Possessions,
        SlotType::Bank,
        SlotType::SharedBank,
        SlotType::Trade,
        SlotType::World,
        SlotType::Limbo,
        SlotType::Tribute,
        SlotType::TrophyTribute,
        SlotType::GuildTribute,
        SlotType::Merchant,
        SlotType::Deleted,
        SlotType::Corpse,
        SlotType::Bazaar,
        SlotType::Inspect,
        SlotType::RealEstate,
        SlotType::ViewModPc,
        SlotType::ViewModBank,
        SlotType::ViewModSharedBank,
        SlotType::ViewModLimbo,
        SlotType::AltStorage,
        SlotType::Archived,
        SlotType::Mail,
        SlotType::GuildTrophyTribute,
        SlotType::Krono,
        SlotType::Other,
    ];

    pub fn index(self) -> usize {
        self as i16 as usize
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| SlotType::ALL.get(index).copied())
    }

    /// Slot types that have a flat slot id band of their own.
    pub fn is_flat_addressable(self) -> bool {
        matches!(
            self,
            SlotType::Possessions
                | SlotType::Bank
                | SlotType::SharedBank
                | SlotType::Trade
                | SlotType::World
                | SlotType::Tribute
        )
    }
}

/// Storage areas reachable through flat slot ids, in search priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Worn,
    Personal,
    Bank,
    SharedBank,
    Trade,
    Cursor,
}

impl Bucket {
    pub const SEARCH_ORDER: [Bucket; 6] = [
        Bucket::Worn,
        Bucket::Personal,
        Bucket::Bank,
        Bucket::SharedBank,
        Bucket::Trade,
        Bucket::Cursor,
    ];
}

/// Structured address: bucket kind, bucket-local main slot, bag sub-slot and augment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotLocation {
    pub slot_type: i16,
    pub main_slot: i16,
    pub sub_slot: i16,
    pub aug_slot: i16,
}

impl Default for SlotLocation {
    fn default() -> Self {
        Self::invalid()
    }
}

impl SlotLocation {
    pub const fn invalid() -> Self {
        Self {
            slot_type: SLOTTYPE_INVALID,
            main_slot: MAINSLOT_INVALID,
            sub_slot: SUBSLOT_INVALID,
            aug_slot: AUGSLOT_INVALID,
        }
    }

    pub fn main(slot_type: SlotType, main_slot: i16) -> Self {
        Self {
            slot_type: slot_type as i16,
            main_slot,
            sub_slot: SUBSLOT_INVALID,
            aug_slot: AUGSLOT_INVALID,
        }
    }

    pub fn in_bag(slot_type: SlotType, main_slot: i16, sub_slot: i16) -> Self {
        Self {
            sub_slot,
            ..Self::main(slot_type, main_slot)
        }
    }

    pub fn with_aug(self, aug_slot: i16) -> Self {
        Self { aug_slot, ..self }
    }

    pub fn slot_type(&self) -> Option<SlotType> {
        SlotType::from_i16(self.slot_type)
    }

    /// Every field at its invalid value: "no slot" / "remove this item".
    pub fn is_delete_request(&self) -> bool {
        self.slot_type == SLOTTYPE_INVALID
            && self.main_slot == MAINSLOT_INVALID
            && self.sub_slot == SUBSLOT_INVALID
            && self.aug_slot == AUGSLOT_INVALID
    }

    pub fn is_bag_interior(&self) -> bool {
        self.sub_slot != SUBSLOT_INVALID
    }

    pub fn is_augment(&self) -> bool {
        self.aug_slot != AUGSLOT_INVALID
    }

    fn is_within(&self, limits: &InventoryLimits) -> bool {
        let Some(slot_type) = self.slot_type() else {
            return false;
        };
        let size = limits.slot_type_size(slot_type);
        let main_ok = (self.main_slot >= 0 && self.main_slot < size)
            || (slot_type == SlotType::Possessions && self.main_slot == SLOT_POWER_SOURCE);
        let sub_ok = self.sub_slot >= SUBSLOT_INVALID && self.sub_slot < i16::from(limits.bag_slots_max());
        let aug_ok = self.aug_slot >= AUGSLOT_INVALID && self.aug_slot < i16::from(limits.augments_max());
        main_ok && sub_ok && aug_ok
    }

    /// Server-side locations must name a real position; a delete request is not one.
    pub fn is_valid_server_slot(&self, limits: &InventoryLimits) -> bool {
        !self.is_delete_request() && self.is_within(limits)
    }

    /// Mobs and clients may also name the delete request.
    pub fn is_valid_mob_slot(&self, limits: &InventoryLimits) -> bool {
        self.is_delete_request() || self.is_within(limits)
    }

    /// Clients accept exactly what mobs do; only the limits table differs.
    pub fn is_valid_client_slot(&self, limits: &InventoryLimits) -> bool {
        self.is_valid_mob_slot(limits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotScheme {
    /// One band per bag-interior bucket; compose and decode are exact inverses.
    #[default]
    Canonical,
    /// Decoding reproduces the historic aliases: bank main slots also read as bag
    /// interiors and trade bag interiors decode from `3100..=3179`.
    Legacy,
}

/// Converts between flat slot ids and structured locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotCodec {
    scheme: SlotScheme,
}

impl SlotCodec {
    pub fn new(scheme: SlotScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> SlotScheme {
        self.scheme
    }

    /// Slot id of the bag holding `slot_id`, or [`SLOT_INVALID`].
    pub fn parent_slot(&self, slot_id: i16) -> i16 {
        match self.scheme {
            SlotScheme::Canonical => canonical_parent(slot_id),
            SlotScheme::Legacy => legacy_parent(slot_id),
        }
    }

    /// Position inside the parent bag; 0 for ids outside every bag band.
    pub fn sub_index(&self, slot_id: i16) -> u8 {
        let start = match self.scheme {
            SlotScheme::Canonical => canonical_band_start(slot_id),
            SlotScheme::Legacy => legacy_band_start(slot_id),
        };
        match start {
            Some(start) => ((slot_id - start) % ITEMS_PER_BAG) as u8,
            None => 0,
        }
    }

    /// Slot id for position `sub_index` inside the bag sitting at `parent_slot`.
    pub fn compose_slot(&self, parent_slot: i16, sub_index: u8) -> i16 {
        if !supports_containers(parent_slot) || i16::from(sub_index) >= ITEMS_PER_BAG {
            return SLOT_INVALID;
        }
        let sub = i16::from(sub_index);
        if parent_slot == SLOT_CURSOR {
            CURSOR_BAG_BEGIN + sub
        } else if (PERSONAL_BEGIN..=PERSONAL_END).contains(&parent_slot) {
            PERSONAL_BAGS_BEGIN + (parent_slot - PERSONAL_BEGIN) * ITEMS_PER_BAG + sub
        } else if (BANK_BEGIN..=BANK_END).contains(&parent_slot) {
            BANK_BAGS_BEGIN + (parent_slot - BANK_BEGIN) * ITEMS_PER_BAG + sub
        } else if (SHARED_BANK_BEGIN..=SHARED_BANK_END).contains(&parent_slot) {
            SHARED_BANK_BAGS_BEGIN + (parent_slot - SHARED_BANK_BEGIN) * ITEMS_PER_BAG + sub
        } else if (TRADE_BEGIN..=TRADE_END).contains(&parent_slot) {
            TRADE_BAGS_BEGIN + (parent_slot - TRADE_BEGIN) * ITEMS_PER_BAG + sub
        } else {
            SLOT_INVALID
        }
    }

    /// Main-slot bucket for `slot_id`, ignoring bag interiors.
    pub fn bucket_of(&self, slot_id: i16) -> Option<Bucket> {
        if slot_id == SLOT_CURSOR {
            Some(Bucket::Cursor)
        } else if (TRADE_BEGIN..=TRADE_END).contains(&slot_id) {
            Some(Bucket::Trade)
        } else if (SHARED_BANK_BEGIN..=SHARED_BANK_END).contains(&slot_id) {
            Some(Bucket::SharedBank)
        } else if (BANK_BEGIN..=BANK_END).contains(&slot_id) {
            Some(Bucket::Bank)
        } else if (PERSONAL_BEGIN..=PERSONAL_END).contains(&slot_id) {
            Some(Bucket::Personal)
        } else if is_worn_slot(slot_id) {
            Some(Bucket::Worn)
        } else {
            None
        }
    }

    pub fn is_bag_interior(&self, slot_id: i16) -> bool {
        self.bucket_of(slot_id).is_none() && self.parent_slot(slot_id) != SLOT_INVALID
    }

    /// Decodes a flat slot id; unknown ids decode to [`SlotLocation::invalid`].
    pub fn locate(&self, slot_id: i16) -> SlotLocation {
        if slot_id == SLOT_CURSOR || (EQUIPMENT_BEGIN..=PERSONAL_END).contains(&slot_id) {
            return SlotLocation::main(SlotType::Possessions, slot_id);
        }
        if slot_id == SLOT_POWER_SOURCE {
            return SlotLocation::main(SlotType::Possessions, SLOT_POWER_SOURCE);
        }
        if (TRIBUTE_BEGIN..=TRIBUTE_END).contains(&slot_id) {
            return SlotLocation::main(SlotType::Tribute, slot_id - TRIBUTE_BEGIN);
        }
        if (BANK_BEGIN..=BANK_END).contains(&slot_id) {
            return SlotLocation::main(SlotType::Bank, slot_id - BANK_BEGIN);
        }
        if (SHARED_BANK_BEGIN..=SHARED_BANK_END).contains(&slot_id) {
            return SlotLocation::main(SlotType::SharedBank, slot_id - SHARED_BANK_BEGIN);
        }
        if (TRADE_BEGIN..=TRADE_END).contains(&slot_id) {
            return SlotLocation::main(SlotType::Trade, slot_id - TRADE_BEGIN);
        }
        if (WORLD_CONTAINER_BEGIN..=WORLD_CONTAINER_END).contains(&slot_id) {
            return SlotLocation::in_bag(SlotType::World, 0, slot_id - WORLD_CONTAINER_BEGIN);
        }

        let parent = self.parent_slot(slot_id);
        if parent == SLOT_INVALID {
            return SlotLocation::invalid();
        }
        let sub = i16::from(self.sub_index(slot_id));
        match self.bucket_of(parent) {
            Some(Bucket::Cursor) | Some(Bucket::Personal) => {
                SlotLocation::in_bag(SlotType::Possessions, parent, sub)
            }
            Some(Bucket::Bank) => SlotLocation::in_bag(SlotType::Bank, parent - BANK_BEGIN, sub),
            Some(Bucket::SharedBank) => {
                SlotLocation::in_bag(SlotType::SharedBank, parent - SHARED_BANK_BEGIN, sub)
            }
            Some(Bucket::Trade) => SlotLocation::in_bag(SlotType::Trade, parent - TRADE_BEGIN, sub),
            _ => SlotLocation::invalid(),
        }
    }

    /// Inverse of [`SlotCodec::locate`] for locations with a flat id.
    pub fn flatten(&self, location: &SlotLocation) -> i16 {
        if location.is_augment() {
            return SLOT_INVALID;
        }
        let Some(slot_type) = location.slot_type() else {
            return SLOT_INVALID;
        };
        let main = location.main_slot;
        let parent = match slot_type {
            SlotType::Possessions => {
                if (EQUIPMENT_BEGIN..=SLOT_CURSOR).contains(&main) || main == SLOT_POWER_SOURCE {
                    main
                } else {
                    return SLOT_INVALID;
                }
            }
            SlotType::Bank if (0..=BANK_END - BANK_BEGIN).contains(&main) => BANK_BEGIN + main,
            SlotType::SharedBank if (0..=SHARED_BANK_END - SHARED_BANK_BEGIN).contains(&main) => {
                SHARED_BANK_BEGIN + main
            }
            SlotType::Trade if (0..=TRADE_END - TRADE_BEGIN).contains(&main) => TRADE_BEGIN + main,
            SlotType::Tribute if !location.is_bag_interior() && (0..=TRIBUTE_END - TRIBUTE_BEGIN).contains(&main) => {
                return TRIBUTE_BEGIN + main;
            }
            SlotType::World
                if main == 0
                    && (0..=WORLD_CONTAINER_END - WORLD_CONTAINER_BEGIN).contains(&location.sub_slot) =>
            {
                return WORLD_CONTAINER_BEGIN + location.sub_slot;
            }
            _ => return SLOT_INVALID,
        };
        if !location.is_bag_interior() {
            return parent;
        }
        match u8::try_from(location.sub_slot) {
            Ok(sub) => self.compose_slot(parent, sub),
            Err(_) => SLOT_INVALID,
        }
    }
}

/// True only for slots whose occupant may itself hold items.
pub fn supports_containers(slot_id: i16) -> bool {
    (PERSONAL_BEGIN..=SLOT_CURSOR).contains(&slot_id)
        || (BANK_BEGIN..=BANK_END).contains(&slot_id)
        || (SHARED_BANK_BEGIN..=SHARED_BANK_END).contains(&slot_id)
        || (TRADE_BEGIN..=TRADE_END).contains(&slot_id)
}

/// Structured form of [`supports_containers`]; bag interiors never qualify.
pub fn location_supports_containers(location: &SlotLocation) -> bool {
    !location.is_bag_interior() && supports_containers(SlotCodec::default().flatten(location))
}

pub fn is_worn_slot(slot_id: i16) -> bool {
    (EQUIPMENT_BEGIN..=EQUIPMENT_END).contains(&slot_id)
        || (TRIBUTE_BEGIN..=TRIBUTE_END).contains(&slot_id)
        || slot_id == SLOT_POWER_SOURCE
}

/// Bit of an item's equip mask that allows it in worn slot `slot_id`.
pub fn equip_bit(slot_id: i16) -> Option<u32> {
    if (EQUIPMENT_BEGIN..=EQUIPMENT_END).contains(&slot_id) {
        Some(slot_id as u32)
    } else if slot_id == SLOT_POWER_SOURCE {
        Some(POWER_SOURCE_BIT)
    } else {
        None
    }
}

pub fn slot_from_material(material: u8) -> i16 {
    match material {
        MATERIAL_HEAD => SLOT_HEAD,
        MATERIAL_CHEST => SLOT_CHEST,
        MATERIAL_ARMS => SLOT_ARMS,
        // two bracer slots share one material
        MATERIAL_BRACER => SLOT_BRACER01,
        MATERIAL_HANDS => SLOT_HANDS,
        MATERIAL_LEGS => SLOT_LEGS,
        MATERIAL_FEET => SLOT_FEET,
        MATERIAL_PRIMARY => SLOT_PRIMARY,
        MATERIAL_SECONDARY => SLOT_SECONDARY,
        _ => SLOT_INVALID,
    }
}

pub fn material_from_slot(slot_id: i16) -> u8 {
    match slot_id {
        SLOT_HEAD => MATERIAL_HEAD,
        SLOT_CHEST => MATERIAL_CHEST,
        SLOT_ARMS => MATERIAL_ARMS,
        SLOT_BRACER01 | SLOT_BRACER02 => MATERIAL_BRACER,
        SLOT_HANDS => MATERIAL_HANDS,
        SLOT_LEGS => MATERIAL_LEGS,
        SLOT_FEET => MATERIAL_FEET,
        SLOT_PRIMARY => MATERIAL_PRIMARY,
        SLOT_SECONDARY => MATERIAL_SECONDARY,
        _ => MATERIAL_INVALID,
    }
}

fn canonical_parent(slot_id: i16) -> i16 {
    if (PERSONAL_BAGS_BEGIN..=PERSONAL_BAGS_END).contains(&slot_id) {
        PERSONAL_BEGIN + (slot_id - PERSONAL_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (CURSOR_BAG_BEGIN..=CURSOR_BAG_END).contains(&slot_id) {
        SLOT_CURSOR
    } else if (BANK_BAGS_BEGIN..=BANK_BAGS_END).contains(&slot_id) {
        BANK_BEGIN + (slot_id - BANK_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (SHARED_BANK_BAGS_BEGIN..=SHARED_BANK_BAGS_END).contains(&slot_id) {
        SHARED_BANK_BEGIN + (slot_id - SHARED_BANK_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (TRADE_BAGS_BEGIN..=TRADE_BAGS_END).contains(&slot_id) {
        TRADE_BEGIN + (slot_id - TRADE_BAGS_BEGIN) / ITEMS_PER_BAG
    } else {
        SLOT_INVALID
    }
}

fn canonical_band_start(slot_id: i16) -> Option<i16> {
    [
        (PERSONAL_BAGS_BEGIN, PERSONAL_BAGS_END),
        (CURSOR_BAG_BEGIN, CURSOR_BAG_END),
        (BANK_BAGS_BEGIN, BANK_BAGS_END),
        (SHARED_BANK_BAGS_BEGIN, SHARED_BANK_BAGS_END),
        (TRADE_BAGS_BEGIN, TRADE_BAGS_END),
        (WORLD_CONTAINER_BEGIN, WORLD_CONTAINER_END),
    ]
    .into_iter()
    .find(|(start, end)| (*start..=*end).contains(&slot_id))
    .map(|(start, _)| start)
}

fn legacy_parent(slot_id: i16) -> i16 {
    if (PERSONAL_BAGS_BEGIN..=PERSONAL_BAGS_END).contains(&slot_id) {
        PERSONAL_BEGIN + (slot_id - PERSONAL_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (CURSOR_BAG_BEGIN..=CURSOR_BAG_END).contains(&slot_id) {
        SLOT_CURSOR
    } else if (BANK_BEGIN..=BANK_END).contains(&slot_id) {
        BANK_BEGIN + (slot_id - BANK_BEGIN) / ITEMS_PER_BAG
    } else if (BANK_BAGS_BEGIN..=BANK_BAGS_END).contains(&slot_id) {
        BANK_BEGIN + (slot_id - BANK_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (SHARED_BANK_BAGS_BEGIN..=SHARED_BANK_BAGS_END).contains(&slot_id) {
        SHARED_BANK_BEGIN + (slot_id - SHARED_BANK_BAGS_BEGIN) / ITEMS_PER_BAG
    } else if (LEGACY_TRADE_BAGS_BEGIN..=LEGACY_TRADE_BAGS_END).contains(&slot_id) {
        TRADE_BEGIN + (slot_id - LEGACY_TRADE_BAGS_BEGIN) / ITEMS_PER_BAG
    } else {
        SLOT_INVALID
    }
}

fn legacy_band_start(slot_id: i16) -> Option<i16> {
    [
        (PERSONAL_BAGS_BEGIN, PERSONAL_BAGS_END),
        (CURSOR_BAG_BEGIN, CURSOR_BAG_END),
        (BANK_BEGIN, BANK_END),
        (BANK_BAGS_BEGIN, BANK_BAGS_END),
        (SHARED_BANK_BAGS_BEGIN, SHARED_BANK_BAGS_END),
        (LEGACY_TRADE_BAGS_BEGIN, LEGACY_TRADE_BAGS_END),
        (WORLD_CONTAINER_BEGIN, WORLD_CONTAINER_END),
    ]
    .into_iter()
    .find(|(start, end)| (*start..=*end).contains(&slot_id))
    .map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag_interior_ids() -> impl Iterator<Item = i16> {
        (PERSONAL_BAGS_BEGIN..=PERSONAL_BAGS_END)
            .chain(CURSOR_BAG_BEGIN..=CURSOR_BAG_END)
            .chain(BANK_BAGS_BEGIN..=BANK_BAGS_END)
            .chain(SHARED_BANK_BAGS_BEGIN..=SHARED_BANK_BAGS_END)
            .chain(TRADE_BAGS_BEGIN..=TRADE_BAGS_END)
    }

    #[test]
    fn canonical_bag_interiors_round_trip() {
        let codec = SlotCodec::default();
        for slot in bag_interior_ids() {
            let parent = codec.parent_slot(slot);
            assert_ne!(parent, SLOT_INVALID, "slot {slot}");
            assert_eq!(codec.compose_slot(parent, codec.sub_index(slot)), slot);
        }
    }

    #[test]
    fn personal_bag_band_layout() {
        let codec = SlotCodec::default();
        assert_eq!(codec.parent_slot(251), 22);
        assert_eq!(codec.sub_index(251), 0);
        assert_eq!(codec.parent_slot(254), 22);
        assert_eq!(codec.sub_index(254), 3);
        assert_eq!(codec.parent_slot(260), 22);
        assert_eq!(codec.sub_index(260), 9);
        assert_eq!(codec.parent_slot(261), 23);
        assert_eq!(codec.sub_index(261), 0);
        assert_eq!(codec.compose_slot(22, 3), 254);
        assert_eq!(codec.parent_slot(330), 29);
    }

    #[test]
    fn unknown_ids_are_invalid() {
        let codec = SlotCodec::default();
        for slot in [-5, 31, 250, 341, 1999, 2024, 2271, 2502, 3008, 3111, 5000] {
            assert_eq!(codec.parent_slot(slot), SLOT_INVALID, "slot {slot}");
            assert_eq!(codec.sub_index(slot), 0);
        }
        assert!(codec.locate(31).is_delete_request());
    }

    #[test]
    fn compose_requires_container_slot() {
        let codec = SlotCodec::default();
        assert_eq!(codec.compose_slot(SLOT_PRIMARY, 0), SLOT_INVALID);
        assert_eq!(codec.compose_slot(TRIBUTE_BEGIN, 0), SLOT_INVALID);
        assert_eq!(codec.compose_slot(22, ITEMS_PER_BAG as u8), SLOT_INVALID);
        assert_eq!(codec.compose_slot(SLOT_CURSOR, 4), 335);
        assert_eq!(codec.compose_slot(2001, 0), 2041);
        assert_eq!(codec.compose_slot(3007, 9), 3110);
    }

    #[test]
    fn container_support_table() {
        assert!(supports_containers(22));
        assert!(supports_containers(SLOT_CURSOR));
        assert!(supports_containers(2023));
        assert!(supports_containers(2501));
        assert!(supports_containers(3000));
        assert!(!supports_containers(SLOT_PRIMARY));
        assert!(!supports_containers(251));
        assert!(!supports_containers(SLOT_POWER_SOURCE));
    }

    #[test]
    fn legacy_scheme_keeps_aliases() {
        let legacy = SlotCodec::new(SlotScheme::Legacy);
        assert_eq!(legacy.parent_slot(2005), 2000);
        assert_eq!(legacy.sub_index(2005), 5);
        assert_eq!(legacy.parent_slot(3100), 3000);
        assert_eq!(legacy.sub_index(3100), 0);
        assert_eq!(legacy.parent_slot(3031), SLOT_INVALID);
        // composition still writes into the 3031 band
        assert_eq!(legacy.compose_slot(3000, 0), 3031);

        let canonical = SlotCodec::default();
        assert_eq!(canonical.parent_slot(2005), SLOT_INVALID);
        assert_eq!(canonical.parent_slot(3100), 3006);
        assert_eq!(canonical.sub_index(3100), 9);
    }

    #[test]
    fn locate_and_flatten_agree() {
        let codec = SlotCodec::default();
        let ids = (EQUIPMENT_BEGIN..=SLOT_CURSOR)
            .chain(TRIBUTE_BEGIN..=TRIBUTE_END)
            .chain(BANK_BEGIN..=BANK_END)
            .chain(SHARED_BANK_BEGIN..=SHARED_BANK_END)
            .chain(TRADE_BEGIN..=TRADE_END)
            .chain(WORLD_CONTAINER_BEGIN..=WORLD_CONTAINER_END)
            .chain(std::iter::once(SLOT_POWER_SOURCE))
            .chain(bag_interior_ids());
        for slot in ids {
            let location = codec.locate(slot);
            assert!(!location.is_delete_request(), "slot {slot}");
            assert_eq!(codec.flatten(&location), slot, "slot {slot}");
        }
    }

    #[test]
    fn locate_bag_interiors() {
        let codec = SlotCodec::default();
        assert_eq!(codec.locate(263), SlotLocation::in_bag(SlotType::Possessions, 23, 2));
        assert_eq!(codec.locate(2045), SlotLocation::in_bag(SlotType::Bank, 1, 4));
        assert_eq!(codec.locate(333), SlotLocation::in_bag(SlotType::Possessions, SLOT_CURSOR, 2));
        assert_eq!(codec.locate(402), SlotLocation::main(SlotType::Tribute, 2));
    }

    #[test]
    fn validity_at_band_edges() {
        let server = InventoryLimits::server();
        let mob = InventoryLimits::mob();
        let codec = SlotCodec::default();
        for slot in [0, 29, 30, 251, 340, 2000, 2270, SLOT_POWER_SOURCE] {
            let location = codec.locate(slot);
            assert!(location.is_valid_server_slot(&server), "slot {slot}");
            assert!(location.is_valid_client_slot(&server), "slot {slot}");
        }
        for slot in [250, 341, 3179] {
            let location = codec.locate(slot);
            assert!(!location.is_valid_server_slot(&server), "slot {slot}");
            assert!(location.is_valid_mob_slot(&server), "slot {slot}");
            assert!(location.is_valid_client_slot(&server), "slot {slot}");
        }

        let legacy = SlotCodec::new(SlotScheme::Legacy).locate(3179);
        assert_eq!(legacy, SlotLocation::in_bag(SlotType::Trade, 7, 9));
        assert!(legacy.is_valid_server_slot(&server));

        assert!(!codec.locate(2000).is_valid_mob_slot(&mob));
        assert!(codec.locate(29).is_valid_mob_slot(&mob));
        assert!(!SlotLocation::main(SlotType::Limbo, 36).is_valid_server_slot(&server));
        assert!(!SlotLocation::in_bag(SlotType::Bank, 0, 10).is_valid_server_slot(&server));
    }

    #[test]
    fn delete_request_sentinel() {
        let location = SlotLocation::invalid();
        assert!(location.is_delete_request());
        assert!(!SlotLocation::main(SlotType::Bank, 0).is_delete_request());
        assert!(!location.with_aug(0).is_delete_request());
    }

    #[test]
    fn material_mapping() {
        assert_eq!(slot_from_material(MATERIAL_BRACER), SLOT_BRACER01);
        assert_eq!(material_from_slot(SLOT_BRACER02), MATERIAL_BRACER);
        assert_eq!(material_from_slot(SLOT_FEET), MATERIAL_FEET);
        assert_eq!(material_from_slot(SLOT_AMMO), MATERIAL_INVALID);
        assert_eq!(slot_from_material(42), SLOT_INVALID);
    }

    #[test]
    fn slot_type_index_round_trip() {
        for slot_type in SlotType::ALL {
            assert_eq!(SlotType::from_i16(slot_type as i16), Some(slot_type));
        }
        assert_eq!(SlotType::from_i16(25), None);
        assert_eq!(SlotType::from_i16(-1), None);
    }
}
