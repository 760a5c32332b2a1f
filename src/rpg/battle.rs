//! Battle resolution: monster fights and player duels. Outcomes are decided
//! by a single probability roll over relative power; race guard and revival
//! rules hook into the calculation at fixed points so the formula stays
//! testable with a forced roll.

use chrono::Utc;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use crate::rpg::catalog::{Catalog, GuardRule, HealthBand};
use crate::rpg::engine::{apply_time_decay, ensure_ready, grant_exp, RpgEngine};
use crate::rpg::errors::RpgError;
use crate::rpg::store::DocumentStore;
use crate::rpg::types::{ExpGain, UserRecord};

/// Result of a monster fight.
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    pub foe: String,
    pub won: bool,
    /// Money gained on a win, or lost (negative) on a defeat.
    pub money_delta: i64,
    pub exp: Option<ExpGain>,
    /// Set when a race revival rule waived the defeat penalty.
    pub revived: bool,
    pub win_chance: f64,
}

/// Result of a player duel.
#[derive(Debug, Clone)]
pub struct DuelOutcome {
    pub winner: String,
    pub loser: String,
    pub bet: i64,
    pub win_chance: f64,
    pub exp: ExpGain,
}

/// A player's battle power: levels and derived combat stats (equipment is
/// already folded into attack/defense), scaled by the race multiplier.
pub fn power(user: &UserRecord, catalog: &Catalog) -> f64 {
    let base = user.level as f64 * 5.0
        + user.stats.attack as f64 * 2.0
        + user.stats.defense as f64
        + user.stats.speed as f64;
    let multiplier = catalog
        .race(&user.race)
        .map_or(1.0, |r| r.power_multiplier);
    base * multiplier
}

fn guard_applies(rule: &GuardRule, health: u32, max_health: u32) -> bool {
    if max_health == 0 {
        return false;
    }
    let pct = health * 100 / max_health;
    match rule.band {
        HealthBand::Low => pct <= rule.threshold_pct,
        HealthBand::High => pct >= rule.threshold_pct,
    }
}

/// Foe power as seen by this player: the race guard rule shaves off its
/// reduction percentage while the player's health sits in the rule's band.
pub fn effective_foe_power(user: &UserRecord, catalog: &Catalog, foe_power: f64) -> f64 {
    match catalog.race(&user.race).and_then(|r| r.guard.as_ref()) {
        Some(rule) if guard_applies(rule, user.stats.health, user.stats.max_health) => {
            foe_power * (100 - rule.reduction_pct.min(100)) as f64 / 100.0
        }
        _ => foe_power,
    }
}

/// Win probability: `user / (user + foe)`, defaulting to an even coin when
/// both sides are powerless.
pub fn win_probability(user_power: f64, foe_power: f64) -> f64 {
    let total = user_power + foe_power;
    if total <= 0.0 {
        0.5
    } else {
        user_power / total
    }
}

/// Whether a revival rule fires for a battle that began at `start_health`.
pub fn revival_fires(user: &UserRecord, catalog: &Catalog, start_health: u32) -> bool {
    match catalog.race(&user.race).and_then(|r| r.revival.as_ref()) {
        Some(rule) if user.stats.max_health > 0 => {
            start_health * 100 / user.stats.max_health >= rule.health_above_pct
        }
        _ => false,
    }
}

/// Apply a decided monster-fight outcome. Split from the roll so defeat and
/// revival paths can be tested deterministically.
pub fn apply_battle_outcome(
    user: &mut UserRecord,
    catalog: &Catalog,
    rng: &mut StdRng,
    monster_id: &str,
    won: bool,
    win_chance: f64,
) -> Result<BattleOutcome, RpgError> {
    let monster = catalog
        .monster(monster_id)
        .ok_or_else(|| RpgError::InvalidArgument(format!("unknown monster: {}", monster_id)))?;
    let start_health = user.stats.health;

    if won {
        let money = if monster.money_max > monster.money_min {
            rng.gen_range(monster.money_min..=monster.money_max)
        } else {
            monster.money_min
        };
        user.money = user.money.saturating_add(money);
        let exp = grant_exp(user, catalog, rng.gen_range(monster.exp_min..=monster.exp_max));
        return Ok(BattleOutcome {
            foe: monster.name.clone(),
            won: true,
            money_delta: money,
            exp: Some(exp),
            revived: false,
            win_chance,
        });
    }

    let revived = revival_fires(user, catalog, start_health);
    user.stats.health = 1;
    let penalty = if revived {
        0
    } else {
        monster.defeat_penalty.min(user.money)
    };
    user.money -= penalty;
    Ok(BattleOutcome {
        foe: monster.name.clone(),
        won: false,
        money_delta: -penalty,
        exp: None,
        revived,
        win_chance,
    })
}

impl<S: DocumentStore> RpgEngine<S> {
    /// Fight a catalog monster. Gated by the `battle` cooldown.
    pub async fn fight_monster(&self, id: &str, monster_id: &str) -> Result<BattleOutcome, RpgError> {
        self.mutate_user(id, |user, catalog, rng| {
            let monster = catalog.monster(monster_id).ok_or_else(|| {
                RpgError::InvalidArgument(format!("unknown monster: {}", monster_id))
            })?;
            let now = Utc::now();
            apply_time_decay(user, now);
            ensure_ready(user, "battle", &catalog.settings, now)?;

            let user_power = power(user, catalog);
            let foe_power = effective_foe_power(user, catalog, monster.power);
            let chance = win_probability(user_power, foe_power);
            let won = rng.gen::<f64>() < chance;
            debug!(
                "{} vs {}: power {:.1} vs {:.1}, chance {:.2}, won={}",
                user.id, monster.name, user_power, foe_power, chance, won
            );

            let outcome = apply_battle_outcome(user, catalog, rng, monster_id, won, chance)?;
            user.cooldowns.insert("battle".to_string(), now);
            Ok(outcome)
        })
        .await
    }

    /// Duel another player for a money bet. Both sides must be able to cover
    /// the bet; the challenger carries the `duel` cooldown.
    pub async fn duel(
        &self,
        challenger_id: &str,
        opponent_id: &str,
        bet: i64,
    ) -> Result<DuelOutcome, RpgError> {
        if bet < 0 {
            return Err(RpgError::InvalidArgument("bet cannot be negative".into()));
        }
        if challenger_id == opponent_id {
            return Err(RpgError::InvalidArgument("you cannot duel yourself".into()));
        }
        self.mutate(|doc, catalog, rng| {
            let now = Utc::now();
            let mut challenger = doc
                .find_user(challenger_id)
                .cloned()
                .ok_or_else(|| RpgError::UserNotFound(challenger_id.to_string()))?;
            let mut opponent = doc
                .find_user(opponent_id)
                .cloned()
                .ok_or_else(|| RpgError::UserNotFound(opponent_id.to_string()))?;

            apply_time_decay(&mut challenger, now);
            ensure_ready(&challenger, "duel", &catalog.settings, now)?;
            for user in [&challenger, &opponent] {
                if user.money < bet {
                    return Err(RpgError::InsufficientMoney {
                        needed: bet,
                        held: user.money,
                    });
                }
            }

            let challenger_power = power(&challenger, catalog);
            let opponent_power =
                effective_foe_power(&challenger, catalog, power(&opponent, catalog));
            let chance = win_probability(challenger_power, opponent_power);
            let challenger_won = rng.gen::<f64>() < chance;

            let (winner, loser) = if challenger_won {
                (&mut challenger, &mut opponent)
            } else {
                (&mut opponent, &mut challenger)
            };
            winner.money += bet;
            loser.money -= bet;
            let exp = grant_exp(winner, catalog, 50);
            let outcome = DuelOutcome {
                winner: winner.id.clone(),
                loser: loser.id.clone(),
                bet,
                win_chance: chance,
                exp,
            };

            challenger.cooldowns.insert("duel".to_string(), now);
            *doc.find_user_mut(challenger_id).ok_or_else(|| {
                RpgError::UserNotFound(challenger_id.to_string())
            })? = challenger;
            *doc.find_user_mut(opponent_id)
                .ok_or_else(|| RpgError::UserNotFound(opponent_id.to_string()))? = opponent;
            Ok(outcome)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::engine::tests::{engine, sample_user};
    use crate::rpg::engine::new_user;
    use rand::SeedableRng;

    #[test]
    fn power_scales_with_race_multiplier() {
        let catalog = Catalog::builtin();
        let human = sample_user(&catalog);
        let mut dragonkin = new_user(&catalog, "d", "D", "dragonkin");
        dragonkin.stats = human.stats.clone();
        let human_power = power(&human, &catalog);
        let dragon_power = power(&dragonkin, &catalog);
        assert!((dragon_power - human_power * 1.25 / 1.0).abs() < 1e-9);
    }

    #[test]
    fn win_probability_is_relative_power() {
        assert!((win_probability(100.0, 100.0) - 0.5).abs() < 1e-9);
        assert!((win_probability(300.0, 100.0) - 0.75).abs() < 1e-9);
        assert_eq!(win_probability(0.0, 0.0), 0.5);
    }

    #[test]
    fn high_guard_reduces_foe_power_only_when_healthy() {
        let catalog = Catalog::builtin();
        let mut elf = new_user(&catalog, "e", "E", "elf");
        // Elf guard: -25% foe power at or above 70% health.
        elf.stats.health = elf.stats.max_health;
        assert!((effective_foe_power(&elf, &catalog, 100.0) - 75.0).abs() < 1e-9);

        elf.stats.health = elf.stats.max_health / 2;
        assert!((effective_foe_power(&elf, &catalog, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn low_guard_fires_when_wounded() {
        let catalog = Catalog::builtin();
        let mut orc = new_user(&catalog, "o", "O", "orc");
        orc.stats.health = orc.stats.max_health / 10;
        assert!((effective_foe_power(&orc, &catalog, 100.0) - 70.0).abs() < 1e-9);

        orc.stats.health = orc.stats.max_health;
        assert!((effective_foe_power(&orc, &catalog, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn forced_defeat_charges_penalty_and_drops_health() {
        let catalog = Catalog::builtin();
        // Orcs have no revival rule.
        let mut orc = new_user(&catalog, "o", "O", "orc");
        let money_before = orc.money;
        let mut rng = StdRng::seed_from_u64(1);
        let outcome =
            apply_battle_outcome(&mut orc, &catalog, &mut rng, "wolf", false, 0.4).expect("loss");
        assert!(!outcome.won);
        assert!(!outcome.revived);
        let penalty = catalog.monster("wolf").unwrap().defeat_penalty;
        assert_eq!(orc.money, money_before - penalty);
        assert_eq!(orc.stats.health, 1);
    }

    #[test]
    fn revival_waives_the_penalty_at_full_health() {
        let catalog = Catalog::builtin();
        let mut human = sample_user(&catalog);
        let money_before = human.money;
        let mut rng = StdRng::seed_from_u64(2);
        let outcome =
            apply_battle_outcome(&mut human, &catalog, &mut rng, "wolf", false, 0.4).expect("loss");
        assert!(outcome.revived);
        assert_eq!(outcome.money_delta, 0);
        assert_eq!(human.money, money_before);
        assert_eq!(human.stats.health, 1);
    }

    #[test]
    fn defeat_penalty_never_goes_below_zero_money() {
        let catalog = Catalog::builtin();
        let mut orc = new_user(&catalog, "o", "O", "orc");
        orc.money = 100;
        let mut rng = StdRng::seed_from_u64(3);
        apply_battle_outcome(&mut orc, &catalog, &mut rng, "dragon", false, 0.1).expect("loss");
        assert_eq!(orc.money, 0);
    }

    #[test]
    fn forced_win_pays_within_the_monster_range() {
        let catalog = Catalog::builtin();
        let mut user = sample_user(&catalog);
        let money_before = user.money;
        let mut rng = StdRng::seed_from_u64(4);
        let outcome =
            apply_battle_outcome(&mut user, &catalog, &mut rng, "slime", true, 0.9).expect("win");
        let monster = catalog.monster("slime").unwrap();
        assert!(outcome.money_delta >= monster.money_min);
        assert!(outcome.money_delta <= monster.money_max);
        assert_eq!(user.money, money_before + outcome.money_delta);
        assert!(outcome.exp.is_some());
    }

    #[tokio::test]
    async fn duel_moves_the_bet_between_players() {
        let engine = engine();
        engine.create_user("a", "Alice").await.expect("a");
        engine.create_user("b", "Bob").await.expect("b");
        let before_a = engine.user("a").await.unwrap().money;
        let before_b = engine.user("b").await.unwrap().money;

        let outcome = engine.duel("a", "b", 500).await.expect("duel");
        let after_a = engine.user("a").await.unwrap().money;
        let after_b = engine.user("b").await.unwrap().money;
        if outcome.winner == "a" {
            assert_eq!(after_a, before_a + 500);
            assert_eq!(after_b, before_b - 500);
        } else {
            assert_eq!(after_a, before_a - 500);
            assert_eq!(after_b, before_b + 500);
        }
    }

    #[tokio::test]
    async fn duel_rejects_self_and_uncovered_bets() {
        let engine = engine();
        engine.create_user("a", "Alice").await.expect("a");
        engine.create_user("b", "Bob").await.expect("b");

        let err = engine.duel("a", "a", 10).await.unwrap_err();
        assert!(matches!(err, RpgError::InvalidArgument(_)));

        let rich = engine.user("a").await.unwrap().money;
        let err = engine.duel("a", "b", rich + 1).await.unwrap_err();
        assert!(matches!(err, RpgError::InsufficientMoney { .. }));
    }

    #[tokio::test]
    async fn monster_fight_sets_the_battle_cooldown() {
        let engine = engine();
        engine.create_user("a", "Alice").await.expect("a");
        engine.fight_monster("a", "slime").await.expect("fight");
        let err = engine.fight_monster("a", "slime").await.unwrap_err();
        assert!(err.is_cooldown());
    }
}
