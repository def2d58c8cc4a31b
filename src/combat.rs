//! Combat: ally vs enemy, damage keyed by matched element, player streaks.

use crate::grid::Element;
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};

/// Which combatant took a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Ally,
    Enemy,
}

/// Terminal result of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
}

/// Health is fractional: streak damage moves in half-steps of the base.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub affinity: Element,
    pub health: f64,
    pub max_health: f64,
}

impl Combatant {
    pub fn new(affinity: Element, max_health: f64) -> Self {
        Self {
            affinity,
            health: max_health,
            max_health,
        }
    }

    /// Health in 0.0..=1.0 for gauges.
    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub fn is_down(&self) -> bool {
        self.health <= 0.0
    }

    fn take(&mut self, damage: f64) {
        self.health = (self.health - damage).clamp(0.0, self.max_health);
    }
}

/// Consecutive player matches of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Streak {
    pub count: u32,
    /// Element of the last player-initiated match.
    pub element: Option<Element>,
}

/// What one match group did in combat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub element: Element,
    pub player_move: bool,
    /// Damage rolled for the group (applied only when `target` is set).
    pub damage: f64,
    pub target: Option<Side>,
    pub streak: u32,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatTuning {
    pub base_damage: u32,
    pub max_health: u32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            base_damage: 10,
            max_health: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Combat {
    pub ally: Combatant,
    pub enemy: Combatant,
    pub streak: Streak,
    base_damage: f64,
    outcome: Option<Outcome>,
}

impl Combat {
    /// New round with two distinct random affinities.
    pub fn new<R: Rng + ?Sized>(rng: &mut R, tuning: CombatTuning) -> Self {
        let ally = *Element::ALL.choose(rng).unwrap_or(&Element::Water);
        let enemy = Element::ALL
            .into_iter()
            .filter(|e| *e != ally)
            .choose(rng)
            .unwrap_or(Element::Fire);
        Self::with_affinities(ally, enemy, tuning)
    }

    pub fn with_affinities(ally: Element, enemy: Element, tuning: CombatTuning) -> Self {
        Self {
            ally: Combatant::new(ally, f64::from(tuning.max_health)),
            enemy: Combatant::new(enemy, f64::from(tuning.max_health)),
            streak: Streak::default(),
            base_damage: f64::from(tuning.base_damage),
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Damage at the current streak: base x (1 + streak x 0.5).
    fn damage(&self) -> f64 {
        self.base_damage * (1.0 + f64::from(self.streak.count) * 0.5)
    }

    /// Resolve one match group. Only player-initiated groups move the streak;
    /// cascade groups of the streak element reuse the current multiplier.
    pub fn apply_match(&mut self, element: Element, player_move: bool) -> Strike {
        if self.outcome.is_some() {
            return Strike {
                element,
                player_move,
                damage: 0.0,
                target: None,
                streak: self.streak.count,
                outcome: self.outcome,
            };
        }

        let damage = if player_move {
            if self.streak.element == Some(element) {
                self.streak.count += 1;
                self.damage()
            } else {
                self.streak.count = 0;
                self.streak.element = Some(element);
                self.base_damage
            }
        } else if self.streak.element == Some(element) {
            self.damage()
        } else {
            self.base_damage
        };

        let target = if element == self.ally.affinity {
            self.enemy.take(damage);
            Some(Side::Enemy)
        } else if element == self.enemy.affinity {
            self.ally.take(damage);
            Some(Side::Ally)
        } else {
            None
        };

        if self.ally.is_down() {
            self.outcome = Some(Outcome::Defeat);
        } else if self.enemy.is_down() {
            self.outcome = Some(Outcome::Victory);
        }

        if let Some(side) = target {
            log::debug!(
                "{element:?} hits {side:?} for {damage} (player={player_move}, streak={})",
                self.streak.count
            );
        }
        if let Some(outcome) = self.outcome {
            log::info!("round decided: {outcome:?}");
        }

        Strike {
            element,
            player_move,
            damage,
            target,
            streak: self.streak.count,
            outcome: self.outcome,
        }
    }
}
