use crate::entities::evolving::EvolutionState;
use crate::entities::inventory::Inventory;
use crate::entities::item::{ItemInstance, UseType};
use crate::entities::slots::{Bucket, SlotCodec, SlotLocation, SlotScheme, SlotType, SLOT_CURSOR, SLOT_INVALID};
use crate::error::{StoreError, StoreResult};
use crate::world::item_types::ItemRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvolvingRecord {
    pub exp: u32,
    pub evolve_level: i8,
    pub activated: bool,
}

/// One persisted item and everything nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRecord {
    pub definition_id: u32,
    pub charges: i16,
    pub color: u32,
    pub instance_no_drop: bool,
    pub serial_number: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolving: Option<EvolvingRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<(u8, ItemRecord)>,
}

/// Top-level placement of one item.
///
/// Flat-addressed items carry their slot id and no slot type. Items of the
/// structured-only buckets carry the bucket in `slot_type` and its main slot
/// in `slot_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot_id: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_type: Option<SlotType>,
    pub item: ItemRecord,
}

impl ItemRecord {
    pub fn from_instance(item: &ItemInstance) -> Self {
        let evolving = item.evolution().and_then(|evolution| match evolution.state() {
            EvolutionState::NotEvolving => None,
            _ => Some(EvolvingRecord {
                exp: evolution.exp(),
                evolve_level: evolution.evolve_level(),
                activated: evolution.is_activated(),
            }),
        });
        Self {
            definition_id: item.id(),
            charges: item.charges(),
            color: item.color(),
            instance_no_drop: item.instance_no_drop(),
            serial_number: item.serial_number().0,
            custom_data: item.custom_data_map().clone(),
            evolving,
            children: item
                .contents()
                .map(|(sub, child)| (sub, ItemRecord::from_instance(child)))
                .collect(),
        }
    }

    /// Rebuilds the instance; `None` when its definition is unknown.
    ///
    /// Restored items receive fresh serial numbers. Children with unknown
    /// definitions are dropped and counted in `report`.
    pub fn to_instance<R>(&self, repo: &mut R, placeholder: bool, report: &mut RestoreReport) -> Option<ItemInstance>
    where
        R: ItemRepository + ?Sized,
    {
        let mut item = if placeholder && self.definition_id == 0 {
            ItemInstance::placeholder(UseType::WorldContainer)
        } else {
            match repo.instantiate(self.definition_id, self.charges) {
                Some(item) => item,
                None => {
                    tracing::warn!(definition = self.definition_id, "unknown definition skipped on restore");
                    report.unknown_definitions.push(self.definition_id);
                    return None;
                }
            }
        };
        item.set_color(self.color);
        item.set_instance_no_drop(self.instance_no_drop);
        for (key, value) in &self.custom_data {
            item.set_custom_data(key.as_str(), value);
        }
        if let (Some(saved), Some(evolution)) = (self.evolving, item.evolution_mut()) {
            evolution.set_exp(saved.exp);
            evolution.set_activated(saved.activated);
            if saved.evolve_level >= 1 {
                evolution.set_evolve_level(saved.evolve_level);
            }
        }
        if item.is_scaling() {
            item.scale_item();
        }
        for (sub, child) in &self.children {
            if let Some(child) = child.to_instance(repo, false, report) {
                item.put_item_owned(i16::from(*sub), child);
            }
        }
        Some(item)
    }
}

/// Outcome of [`restore`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub unknown_definitions: Vec<u32>,
    pub migrated_slots: usize,
}

impl RestoreReport {
    pub fn skipped(&self) -> usize {
        self.unknown_definitions.len()
    }
}

/// Every occupied slot: flat buckets in search order, the cursor queue front
/// to back, then the structured-only buckets.
pub fn snapshot(inventory: &Inventory) -> Vec<SlotRecord> {
    let mut records: Vec<SlotRecord> = Bucket::SEARCH_ORDER
        .into_iter()
        .flat_map(|bucket| inventory.items_in(bucket))
        .map(|(slot_id, item)| SlotRecord {
            slot_id,
            slot_type: None,
            item: ItemRecord::from_instance(item),
        })
        .collect();
    records.extend(inventory.auxiliary_items().map(|(slot_type, main_slot, item)| SlotRecord {
        slot_id: main_slot,
        slot_type: Some(slot_type),
        item: ItemRecord::from_instance(item),
    }));
    records
}

/// Places `records` into `inventory`.
///
/// Unknown definitions are skipped and reported. A slot the inventory cannot
/// resolve aborts the restore with [`StoreError::InvalidSlot`].
pub fn restore<R>(records: &[SlotRecord], repo: &mut R, inventory: &mut Inventory) -> StoreResult<RestoreReport>
where
    R: ItemRepository + ?Sized,
{
    let mut report = RestoreReport::default();
    for record in records {
        if let Some(slot_type) = record.slot_type {
            let location = SlotLocation::main(slot_type, record.slot_id);
            let placeholder = slot_type == SlotType::World;
            let Some(item) = record.item.to_instance(repo, placeholder, &mut report) else {
                continue;
            };
            if !inventory.put_at(&location, &item) {
                return Err(StoreError::InvalidSlot(record.slot_id));
            }
            report.restored += 1;
            continue;
        }

        let slot_id = normalize_slot(inventory.codec(), record.slot_id, &mut report)
            .ok_or(StoreError::InvalidSlot(record.slot_id))?;
        let Some(item) = record.item.to_instance(repo, false, &mut report) else {
            continue;
        };
        let placed = if slot_id == SLOT_CURSOR {
            inventory.push_cursor(&item)
        } else {
            inventory.put_item(slot_id, &item)
        };
        if placed == SLOT_INVALID {
            return Err(StoreError::InvalidSlot(record.slot_id));
        }
        report.restored += 1;
    }
    tracing::debug!(
        restored = report.restored,
        skipped = report.skipped(),
        migrated = report.migrated_slots,
        "inventory restored"
    );
    Ok(report)
}

/// Maps ids from the legacy numbering onto the active scheme.
///
/// Only ids the active scheme cannot decode are migrated. Legacy trade-bag
/// ids `3100..=3110` are also canonical ids (bags at 3006 and 3007), so they
/// keep their canonical meaning; `3111..=3179` are migrated.
fn normalize_slot(codec: &SlotCodec, slot_id: i16, report: &mut RestoreReport) -> Option<i16> {
    if !codec.locate(slot_id).is_delete_request() {
        return Some(slot_id);
    }
    if codec.scheme() == SlotScheme::Legacy {
        return None;
    }
    let location = SlotCodec::new(SlotScheme::Legacy).locate(slot_id);
    if location.is_delete_request() {
        return None;
    }
    let migrated = codec.flatten(&location);
    if migrated == SLOT_INVALID {
        return None;
    }
    tracing::warn!(slot_id, migrated, "legacy slot id seen on load");
    report.migrated_slots += 1;
    Some(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::evolving::FULL_SCALE_EXP;
    use crate::entities::slots::SLOT_PRIMARY;
    use crate::world::item_types::{ItemCatalog, ItemClass, ItemDefinition};

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::default();
        let mut bag = ItemDefinition::new(17005, "Backpack");
        bag.class = ItemClass::Container;
        bag.bag_slots = 8;
        bag.bag_size = 3;
        catalog.insert(bag).unwrap();
        let mut sword = ItemDefinition::new(5019, "Long Sword");
        sword.equip_slots = 1 << SLOT_PRIMARY;
        sword.aug_slot_types = [1, 0, 0, 0, 0, 0];
        catalog.insert(sword).unwrap();
        let mut arrows = ItemDefinition::new(8005, "Arrow");
        arrows.stackable = true;
        arrows.stack_size = 100;
        arrows.size = 1;
        catalog.insert(arrows).unwrap();
        catalog.insert(ItemDefinition::new(44000, "Gem")).unwrap();
        let mut charm = ItemDefinition::new(52000, "Charm");
        charm.charm_file_id = 7;
        charm.stats.hp = 100;
        catalog.insert(charm).unwrap();
        catalog
    }

    fn sample(catalog: &mut ItemCatalog) -> Inventory {
        let mut inv = Inventory::default();
        let mut sword = catalog.instantiate(5019, 0).unwrap();
        sword.put_augment(0, &catalog.instantiate(44000, 0).unwrap());
        sword.set_custom_data("owner", "Kael");
        inv.put_item(SLOT_PRIMARY, &sword);
        inv.put_item(23, &catalog.instantiate(17005, 0).unwrap());
        inv.put_item(263, &catalog.instantiate(8005, 40).unwrap());
        inv.push_cursor(&catalog.instantiate(8005, 1).unwrap());
        inv.push_cursor(&catalog.instantiate(8005, 2).unwrap());
        inv.put_at(&SlotLocation::main(SlotType::Limbo, 2), &catalog.instantiate(44000, 0).unwrap());
        inv
    }

    #[test]
    fn snapshot_orders_buckets_cursor_then_auxiliary() {
        let mut catalog = catalog();
        let records = snapshot(&sample(&mut catalog));
        let slots: Vec<_> = records.iter().map(|r| (r.slot_id, r.slot_type)).collect();
        assert_eq!(
            slots,
            vec![
                (SLOT_PRIMARY, None),
                (23, None),
                (SLOT_CURSOR, None),
                (SLOT_CURSOR, None),
                (2, Some(SlotType::Limbo)),
            ]
        );
        assert_eq!(records[0].item.children.len(), 1);
        assert_eq!(records[0].item.custom_data.get("owner").map(String::as_str), Some("Kael"));
        assert_eq!(records[1].item.children[0].0, 2);
        assert_eq!(records[2].item.charges, 1);
    }

    #[test]
    fn restore_rebuilds_equivalent_inventory() {
        let mut catalog = catalog();
        let original = sample(&mut catalog);
        let records = snapshot(&original);

        let mut restored = Inventory::default();
        let report = restore(&records, &mut catalog, &mut restored).unwrap();
        assert_eq!(report.restored, 5);
        assert_eq!(report.skipped(), 0);

        assert_eq!(restored.dump_entire_inventory(), original.dump_entire_inventory());
        assert_eq!(restored.has_item(44000, 1, crate::entities::inventory::InvWhere::WORN), -2);
        let cursor: Vec<_> = restored.cursor_items().map(ItemInstance::charges).collect();
        assert_eq!(cursor, vec![1, 2]);
        assert!(restored.item_at(&SlotLocation::main(SlotType::Limbo, 2)).is_some());
        assert_eq!(restored.custom_item_data(SLOT_PRIMARY, "owner"), Some("Kael"));
        assert_ne!(
            restored.get_item(SLOT_PRIMARY).unwrap().serial_number(),
            original.get_item(SLOT_PRIMARY).unwrap().serial_number()
        );
    }

    #[test]
    fn unknown_definitions_are_skipped() {
        let mut catalog = catalog();
        let records = vec![
            SlotRecord {
                slot_id: 22,
                slot_type: None,
                item: ItemRecord {
                    definition_id: 999,
                    ..ItemRecord::default()
                },
            },
            SlotRecord {
                slot_id: 23,
                slot_type: None,
                item: ItemRecord {
                    definition_id: 8005,
                    charges: 3,
                    ..ItemRecord::default()
                },
            },
        ];
        let mut inv = Inventory::default();
        let report = restore(&records, &mut catalog, &mut inv).unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.unknown_definitions, vec![999]);
        assert!(inv.get_item(22).is_none());
        assert_eq!(inv.get_item(23).unwrap().charges(), 3);
    }

    #[test]
    fn unresolvable_slot_fails() {
        let mut catalog = catalog();
        let records = vec![SlotRecord {
            slot_id: 9000,
            slot_type: None,
            item: ItemRecord {
                definition_id: 8005,
                ..ItemRecord::default()
            },
        }];
        let err = restore(&records, &mut catalog, &mut Inventory::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSlot(9000)));
    }

    #[test]
    fn legacy_trade_bag_ids_migrate() {
        let mut catalog = catalog();
        let records = vec![
            SlotRecord {
                slot_id: 3001,
                slot_type: None,
                item: ItemRecord {
                    definition_id: 17005,
                    ..ItemRecord::default()
                },
            },
            SlotRecord {
                slot_id: 3115,
                slot_type: None,
                item: ItemRecord {
                    definition_id: 8005,
                    charges: 5,
                    ..ItemRecord::default()
                },
            },
        ];
        let mut inv = Inventory::default();
        let report = restore(&records, &mut catalog, &mut inv).unwrap();
        assert_eq!(report.migrated_slots, 1);
        assert_eq!(report.restored, 2);
        assert_eq!(inv.get_item(3046).unwrap().charges(), 5);
        assert_eq!(inv.get_bag_item(3001, 5).unwrap().id(), 8005);
    }

    #[test]
    fn shared_trade_bag_ids_keep_canonical_meaning() {
        let codec = SlotCodec::default();
        let mut report = RestoreReport::default();
        assert_eq!(normalize_slot(&codec, 3105, &mut report), Some(3105));
        assert_eq!(normalize_slot(&codec, 3110, &mut report), Some(3110));
        assert_eq!(report.migrated_slots, 0);
        assert_eq!(normalize_slot(&codec, 3111, &mut report), Some(3042));
        assert_eq!(normalize_slot(&codec, 3179, &mut report), Some(3110));
        assert_eq!(report.migrated_slots, 2);
        assert_eq!(normalize_slot(&codec, 3180, &mut report), None);
    }

    #[test]
    fn scaling_progress_survives() {
        let mut catalog = catalog();
        let mut charm = catalog.instantiate(52000, 0).unwrap();
        assert!(charm.is_scaling());
        charm.evolution_mut().unwrap().set_exp((FULL_SCALE_EXP / 2.0) as u32);
        charm.scale_item();
        let mut inv = Inventory::default();
        inv.put_item(0, &charm);

        let records = snapshot(&inv);
        assert_eq!(records[0].item.evolving.map(|e| e.exp), Some(5000));
        let mut restored = Inventory::default();
        restore(&records, &mut catalog, &mut restored).unwrap();
        let item = restored.get_item(0).unwrap();
        assert_eq!(item.definition().unwrap().stats.hp, 50);
        assert_eq!(item.unscaled_definition().unwrap().stats.hp, 100);
    }
}
