use crate::entities::item::ItemInstance;
use std::collections::VecDeque;

/// Items held in hand. Only the front is visible; the rest queue behind it.
#[derive(Debug, Clone, Default)]
pub struct CursorQueue {
    items: VecDeque<ItemInstance>,
}

impl CursorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ItemInstance) {
        self.items.push_back(item);
    }

    pub fn push_front(&mut self, item: ItemInstance) {
        self.items.push_front(item);
    }

    pub fn pop(&mut self) -> Option<ItemInstance> {
        self.items.pop_front()
    }

    pub fn peek_front(&self) -> Option<&ItemInstance> {
        self.items.front()
    }

    pub fn peek_front_mut(&mut self) -> Option<&mut ItemInstance> {
        self.items.front_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInstance> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::UseType;

    #[test]
    fn fifo_with_front_insert() {
        let first = ItemInstance::placeholder(UseType::Normal);
        let second = ItemInstance::placeholder(UseType::Normal);
        let urgent = ItemInstance::placeholder(UseType::Normal);
        let (s1, s2, s3) = (first.serial_number(), second.serial_number(), urgent.serial_number());

        let mut cursor = CursorQueue::new();
        cursor.push(first);
        cursor.push(second);
        cursor.push_front(urgent);
        assert_eq!(cursor.len(), 3);
        assert_eq!(cursor.peek_front().map(ItemInstance::serial_number), Some(s3));

        let order: Vec<_> = std::iter::from_fn(|| cursor.pop()).map(|item| item.serial_number()).collect();
        assert_eq!(order, vec![s3, s1, s2]);
        assert!(cursor.is_empty());
        assert!(cursor.pop().is_none());
    }
}
