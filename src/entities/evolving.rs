use crate::world::item_types::{EvolveInfo, ItemDefinition, EVOLVE_LEVEL_SLOTS};
use std::sync::Arc;

/// Evolve level marking a self-scaling item with no discrete levels.
pub const SCALING_LEVEL: i8 = -1;

/// Experience at which a scaling item reaches its full stats.
pub const FULL_SCALE_EXP: f32 = 10_000.0;

/// Returned when no further kills can be counted toward a level.
pub const KILLS_UNREACHABLE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionState {
    NotEvolving,
    Scaling,
    Evolving(i8),
}

/// Experience-driven state carried by scaling and evolving items.
///
/// Only stores and scales; deciding when to gain experience or level up is
/// left to the game rules driving the inventory.
#[derive(Debug, Clone, Default)]
pub struct Evolution {
    exp: u32,
    evolve_level: i8,
    activated: bool,
    info: Option<Arc<EvolveInfo>>,
    scaled: Option<Arc<ItemDefinition>>,
}

impl Evolution {
    pub fn for_definition(definition: &ItemDefinition) -> Self {
        Self {
            info: definition.evolve.clone().map(Arc::new),
            ..Self::default()
        }
    }

    /// Scaling items scale right away; evolving items start at their definition's level.
    pub fn initialize(&mut self, base: &ItemDefinition) {
        if base.is_self_scaling() {
            self.evolve_level = SCALING_LEVEL;
            self.scale(base);
        } else if self.info.is_some() {
            self.set_evolve_level(base.evolve_level.max(1));
        }
    }

    pub fn state(&self) -> EvolutionState {
        match self.evolve_level {
            SCALING_LEVEL => EvolutionState::Scaling,
            level if level >= 1 && self.info.is_some() => EvolutionState::Evolving(level),
            _ => EvolutionState::NotEvolving,
        }
    }

    /// Rebuilds the scaled definition from `base` at the current experience.
    pub fn scale(&mut self, base: &ItemDefinition) {
        let mult = self.exp as f32 / FULL_SCALE_EXP;
        let mut scaled = base.clone();
        scaled.stats = base.stats.scaled(mult);
        // consumers must not scale the result again
        scaled.charm_file_id = 0;
        self.scaled = Some(Arc::new(scaled));
    }

    pub fn scaled_definition(&self) -> Option<&Arc<ItemDefinition>> {
        self.scaled.as_ref()
    }

    pub fn exp(&self) -> u32 {
        self.exp
    }

    pub fn set_exp(&mut self, exp: u32) {
        self.exp = exp;
    }

    pub fn add_exp(&mut self, exp: u32) {
        self.exp = self.exp.saturating_add(exp);
    }

    pub fn evolve_level(&self) -> i8 {
        self.evolve_level
    }

    pub fn set_evolve_level(&mut self, level: i8) {
        let max = i8::try_from(self.max_evolve_level()).unwrap_or(i8::MAX);
        self.evolve_level = if level > max && self.info.is_some() { max } else { level };
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn set_activated(&mut self, activated: bool) {
        self.activated = activated;
    }

    pub fn info(&self) -> Option<&EvolveInfo> {
        self.info.as_deref()
    }

    pub fn evolve_on_all_kills(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.all_kills)
    }

    pub fn max_evolve_level(&self) -> u8 {
        self.info.as_ref().map_or(0, |info| info.max_level)
    }

    /// Kills required to leave `level`; [`KILLS_UNREACHABLE`] at the top level
    /// or wherever the table holds no usable threshold.
    pub fn kills_needed(&self, level: u8) -> u32 {
        let Some(info) = self.info.as_ref() else {
            return KILLS_UNREACHABLE;
        };
        if level == info.max_level || level == 0 || usize::from(level) > EVOLVE_LEVEL_SLOTS {
            return KILLS_UNREACHABLE;
        }
        match info.level_kills[usize::from(level) - 1] {
            0 => KILLS_UNREACHABLE,
            kills => kills,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::item_types::StatBlock;

    fn charm(hp: i32) -> ItemDefinition {
        let mut def = ItemDefinition::new(52000, "Charm of Growth");
        def.charm_file_id = 7;
        def.stats = StatBlock {
            hp,
            ..StatBlock::default()
        };
        def
    }

    fn family() -> EvolveInfo {
        EvolveInfo {
            first_item: 90000,
            max_level: 4,
            all_kills: true,
            level_kills: [10, 0, 30, 40, 0, 0, 0, 0, 0],
        }
    }

    #[test]
    fn scaling_halves_at_half_exp() {
        let base = charm(100);
        let mut evolution = Evolution::for_definition(&base);
        evolution.set_exp(5000);
        evolution.initialize(&base);
        assert_eq!(evolution.state(), EvolutionState::Scaling);
        let scaled = evolution.scaled_definition().unwrap();
        assert_eq!(scaled.stats.hp, 50);
        assert_eq!(scaled.charm_file_id, 0);
        assert_eq!(base.stats.hp, 100);
    }

    #[test]
    fn rescale_replaces_previous_result() {
        let base = charm(200);
        let mut evolution = Evolution::for_definition(&base);
        evolution.initialize(&base);
        assert_eq!(evolution.scaled_definition().unwrap().stats.hp, 0);
        evolution.add_exp(10_000);
        evolution.scale(&base);
        assert_eq!(evolution.scaled_definition().unwrap().stats.hp, 200);
    }

    #[test]
    fn kills_needed_sentinels() {
        let mut def = ItemDefinition::new(90001, "Blade of Ages");
        def.evolve = Some(family());
        def.evolve_level = 1;
        let mut evolution = Evolution::for_definition(&def);
        evolution.initialize(&def);
        assert_eq!(evolution.state(), EvolutionState::Evolving(1));
        assert_eq!(evolution.kills_needed(1), 10);
        assert_eq!(evolution.kills_needed(2), KILLS_UNREACHABLE);
        assert_eq!(evolution.kills_needed(3), 30);
        assert_eq!(evolution.kills_needed(4), KILLS_UNREACHABLE);
        assert_eq!(evolution.kills_needed(0), KILLS_UNREACHABLE);
        assert!(evolution.evolve_on_all_kills());

        let plain = Evolution::default();
        assert_eq!(plain.kills_needed(1), KILLS_UNREACHABLE);
        assert_eq!(plain.state(), EvolutionState::NotEvolving);
    }

    #[test]
    fn evolve_level_clamps_to_family_max() {
        let mut def = ItemDefinition::new(90001, "Blade of Ages");
        def.evolve = Some(family());
        let mut evolution = Evolution::for_definition(&def);
        evolution.set_evolve_level(9);
        assert_eq!(evolution.evolve_level(), 4);
        evolution.set_exp(u32::MAX - 1);
        evolution.add_exp(5);
        assert_eq!(evolution.exp(), u32::MAX);
    }

    #[test]
    fn clones_share_family_info() {
        let mut def = ItemDefinition::new(90001, "Blade of Ages");
        def.evolve = Some(family());
        let evolution = Evolution::for_definition(&def);
        let copy = evolution.clone();
        assert_eq!(copy.max_evolve_level(), 4);
        assert!(std::ptr::eq(evolution.info().unwrap(), copy.info().unwrap()));
    }
}
