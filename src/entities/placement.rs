use crate::entities::item::ItemInstance;
use crate::world::item_types::{
    ItemClass, ItemDefinition, BAG_TYPE_BANDOLIER, BAG_TYPE_QUIVER, ITEM_TYPE_ARROW, ITEM_TYPE_SMALL_THROWING,
};

/// Size and bag-type filter for putting `item` inside `container`.
pub fn can_item_fit_in_container(item: &ItemDefinition, container: &ItemDefinition) -> bool {
    if item.size > container.bag_size {
        return false;
    }
    match container.bag_type {
        BAG_TYPE_QUIVER => item.item_type == ITEM_TYPE_ARROW,
        BAG_TYPE_BANDOLIER => item.item_type == ITEM_TYPE_SMALL_THROWING,
        _ => true,
    }
}

/// Whether `item` may sit at `sub` inside `container`.
///
/// Containers never nest, which keeps the tree two levels deep and acyclic.
pub fn can_place_in_bag(item: &ItemInstance, container: &ItemInstance, sub: u8) -> bool {
    if !container.is_type(ItemClass::Container) || sub >= container.bag_capacity() {
        return false;
    }
    if item.is_type(ItemClass::Container) {
        return false;
    }
    match (item.definition(), container.definition()) {
        (Some(item), Some(container)) => can_item_fit_in_container(item, container),
        (Some(_), None) => true,
        (None, _) => false,
    }
}
