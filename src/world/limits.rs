use crate::entities::slots::{
    SlotType, AUGMENT_SLOTS, EQUIPMENT_BEGIN, EQUIPMENT_END, ITEMS_PER_BAG, PERSONAL_BEGIN, PERSONAL_END,
};
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const SERVER_SLOT_TYPE_SIZES: [i16; SlotType::COUNT] = [
    31, // possessions: worn, personal and cursor
    24, // bank
    2,  // shared bank
    8,  // trade
    10, // world
    36, // limbo
    5,  // tribute
    0,  // trophy tribute
    0,  // guild tribute
    80, // merchant
    0,  // deleted
    31, // corpse
    80, // bazaar
    22, // inspect
    0,  // real estate
    31, // view mod pc
    24, // view mod bank
    2,  // view mod shared bank
    36, // view mod limbo
    0,  // alt storage
    0,  // archived
    8,  // mail
    0,  // guild trophy tribute
    1,  // krono
    0,  // other
];

const MOB_UNUSED: [SlotType; 15] = [
    SlotType::Bank,
    SlotType::SharedBank,
    SlotType::World,
    SlotType::Limbo,
    SlotType::Deleted,
    SlotType::RealEstate,
    SlotType::ViewModPc,
    SlotType::ViewModBank,
    SlotType::ViewModSharedBank,
    SlotType::ViewModLimbo,
    SlotType::AltStorage,
    SlotType::Archived,
    SlotType::Mail,
    SlotType::Krono,
    SlotType::Other,
];

pub const SIZE_UNUSED: i16 = 0;

const EQUIPMENT_BITMASK: u32 = 0x007F_FFFF;
const EQUIPMENT_BITMASK_PRE_SOF: u32 = 0x003F_FFFF;
const EQUIPMENT_BITMASK_PRE_TI: u32 = 0x003F_FFFE;
const PERSONAL_BITMASK: u32 = 0x3FC0_0000;

const BANK_SIZE_PRE_SOF: i16 = 16;
const CORPSE_SIZE_PRE_ROF: i16 = 30;
const BAZAAR_SIZE_PRE_ROF: i16 = 80;
const AUGMENTS_PRE_ROF: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ClientVersion {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "62")]
    Client62,
    #[serde(rename = "titanium")]
    Titanium,
    #[serde(rename = "sof")]
    SoF,
    #[serde(rename = "sod")]
    SoD,
    #[serde(rename = "underfoot")]
    Underfoot,
    #[serde(rename = "rof")]
    RoF,
}

impl ClientVersion {
    pub fn tag(self) -> &'static str {
        match self {
            ClientVersion::Unknown => "unknown",
            ClientVersion::Client62 => "62",
            ClientVersion::Titanium => "titanium",
            ClientVersion::SoF => "sof",
            ClientVersion::SoD => "sod",
            ClientVersion::Underfoot => "underfoot",
            ClientVersion::RoF => "rof",
        }
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ClientVersion {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(ClientVersion::Unknown),
            "62" | "client62" => Ok(ClientVersion::Client62),
            "titanium" | "ti" => Ok(ClientVersion::Titanium),
            "sof" => Ok(ClientVersion::SoF),
            "sod" => Ok(ClientVersion::SoD),
            "underfoot" | "uf" => Ok(ClientVersion::Underfoot),
            "rof" => Ok(ClientVersion::RoF),
            other => Err(StoreError::Config(format!("unknown client version '{other}'"))),
        }
    }
}

/// Capacity table for one inventory. Set once, then treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryLimits {
    slot_type_sizes: [i16; SlotType::COUNT],
    equipment_start: i16,
    equipment_end: i16,
    equipment_bitmask: u32,
    personal_start: i16,
    personal_end: i16,
    personal_bitmask: u32,
    bandolier_slots_max: u8,
    potion_belt_slots_max: u8,
    bag_slots_max: u8,
    augments_max: u8,
    limits_set: bool,
}

impl InventoryLimits {
    pub fn server() -> Self {
        let mut limits = Self::default();
        limits.set_server_limits();
        limits
    }

    pub fn mob() -> Self {
        let mut limits = Self::default();
        limits.set_mob_limits();
        limits
    }

    pub fn client(version: ClientVersion) -> Self {
        let mut limits = Self::default();
        limits.set_client_limits(version);
        limits
    }

    fn fill_server(&mut self) {
        self.slot_type_sizes = SERVER_SLOT_TYPE_SIZES;
        self.equipment_start = EQUIPMENT_BEGIN;
        self.equipment_end = EQUIPMENT_END;
        self.equipment_bitmask = EQUIPMENT_BITMASK;
        self.personal_start = PERSONAL_BEGIN;
        self.personal_end = PERSONAL_END;
        self.personal_bitmask = PERSONAL_BITMASK;
        self.bandolier_slots_max = 4;
        self.potion_belt_slots_max = 4;
        self.bag_slots_max = ITEMS_PER_BAG as u8;
        self.augments_max = AUGMENT_SLOTS as u8;
    }

    /// Returns false and leaves the table alone when limits were already set.
    pub fn set_server_limits(&mut self) -> bool {
        if self.limits_set {
            return false;
        }
        self.fill_server();
        self.limits_set = true;
        true
    }

    pub fn set_mob_limits(&mut self) -> bool {
        if self.limits_set {
            return false;
        }
        self.fill_server();
        for slot_type in MOB_UNUSED {
            self.slot_type_sizes[slot_type.index()] = SIZE_UNUSED;
        }
        self.limits_set = true;
        true
    }

    pub fn set_client_limits(&mut self, version: ClientVersion) -> bool {
        if self.limits_set {
            return false;
        }
        self.fill_server();

        // newest first; each older client narrows further
        if version < ClientVersion::RoF {
            self.slot_type_sizes[SlotType::Corpse.index()] = CORPSE_SIZE_PRE_ROF;
            self.slot_type_sizes[SlotType::Bazaar.index()] = BAZAAR_SIZE_PRE_ROF;
            self.augments_max = AUGMENTS_PRE_ROF;
        }
        if version < ClientVersion::SoF {
            self.slot_type_sizes[SlotType::Bank.index()] = BANK_SIZE_PRE_SOF;
            self.slot_type_sizes[SlotType::ViewModBank.index()] = BANK_SIZE_PRE_SOF;
            self.equipment_bitmask = EQUIPMENT_BITMASK_PRE_SOF;
        }
        if version < ClientVersion::Titanium {
            self.equipment_bitmask = EQUIPMENT_BITMASK_PRE_TI;
        }
        if version == ClientVersion::Unknown {
            tracing::warn!("client limits requested for an unknown client version");
        }

        self.limits_set = true;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_set(&self) -> bool {
        self.limits_set
    }

    pub fn slot_type_size(&self, slot_type: SlotType) -> i16 {
        self.slot_type_sizes[slot_type.index()]
    }

    pub fn equipment_start(&self) -> i16 {
        self.equipment_start
    }

    pub fn equipment_end(&self) -> i16 {
        self.equipment_end
    }

    pub fn equipment_bitmask(&self) -> u32 {
        self.equipment_bitmask
    }

    pub fn personal_start(&self) -> i16 {
        self.personal_start
    }

    pub fn personal_end(&self) -> i16 {
        self.personal_end
    }

    pub fn personal_bitmask(&self) -> u32 {
        self.personal_bitmask
    }

    pub fn bandolier_slots_max(&self) -> u8 {
        self.bandolier_slots_max
    }

    pub fn potion_belt_slots_max(&self) -> u8 {
        self.potion_belt_slots_max
    }

    pub fn bag_slots_max(&self) -> u8 {
        self.bag_slots_max
    }

    pub fn augments_max(&self) -> u8 {
        self.augments_max
    }

    fn apply(&mut self, patch: &LimitsOverride) {
        for (slot_type, size) in &patch.slot_sizes {
            self.slot_type_sizes[slot_type.index()] = *size;
        }
        if let Some(mask) = patch.equipment_bitmask {
            self.equipment_bitmask = mask;
        }
        if let Some(end) = patch.personal_end {
            self.personal_end = end;
        }
        if let Some(value) = patch.bandolier_slots_max {
            self.bandolier_slots_max = value;
        }
        if let Some(value) = patch.potion_belt_slots_max {
            self.potion_belt_slots_max = value;
        }
        if let Some(value) = patch.bag_slots_max {
            self.bag_slots_max = value.min(ITEMS_PER_BAG as u8);
        }
        if let Some(value) = patch.augments_max {
            self.augments_max = value.min(AUGMENT_SLOTS as u8);
        }
    }

    pub fn summary(&self) -> String {
        let sizes = SlotType::ALL
            .iter()
            .filter(|slot_type| self.slot_type_size(**slot_type) > 0)
            .map(|slot_type| format!("{:?}={}", slot_type, self.slot_type_size(*slot_type)))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "equipment {}..={} mask {:#010x}, personal {}..={}, bag slots {}, augments {}; {}",
            self.equipment_start,
            self.equipment_end,
            self.equipment_bitmask,
            self.personal_start,
            self.personal_end,
            self.bag_slots_max,
            self.augments_max,
            sizes
        )
    }
}

/// Partial limits read from configuration and laid over the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsOverride {
    pub slot_sizes: BTreeMap<SlotType, i16>,
    pub equipment_bitmask: Option<u32>,
    pub personal_end: Option<i16>,
    pub bandolier_slots_max: Option<u8>,
    pub potion_belt_slots_max: Option<u8>,
    pub bag_slots_max: Option<u8>,
    pub augments_max: Option<u8>,
}

pub trait LimitsProvider {
    fn limits_for(&self, version: ClientVersion) -> InventoryLimits;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLimits;

impl LimitsProvider for BuiltinLimits {
    fn limits_for(&self, version: ClientVersion) -> InventoryLimits {
        InventoryLimits::client(version)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfiguredLimits {
    overrides: BTreeMap<ClientVersion, LimitsOverride>,
}

impl ConfiguredLimits {
    pub fn new(overrides: BTreeMap<ClientVersion, LimitsOverride>) -> Self {
        Self { overrides }
    }

    pub fn from_yaml_str(content: &str) -> StoreResult<Self> {
        let overrides = serde_yaml::from_str(content).map_err(|err| StoreError::yaml("limits", err))?;
        Ok(Self { overrides })
    }
}

impl LimitsProvider for ConfiguredLimits {
    fn limits_for(&self, version: ClientVersion) -> InventoryLimits {
        let mut limits = BuiltinLimits.limits_for(version);
        if let Some(patch) = self.overrides.get(&version) {
            tracing::debug!(client = %version, "applying configured limits override");
            limits.apply(patch);
        }
        limits
    }
}
