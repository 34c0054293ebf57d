//! Rivalry between populations: stragglers defecting and cell-sharing combat.

use crate::grid::SpatialIndex;
use crate::population::Population;

/// Outcome of two rivals meeting on one cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatOutcome {
    /// First fighter survives
    FirstWins,
    /// Second fighter survives
    SecondWins,
    /// Equal stats, both die
    Draw,
}

/// Higher energy wins
pub fn duel(first_energy: f64, second_energy: f64) -> CombatOutcome {
    if first_energy > second_energy {
        CombatOutcome::FirstWins
    } else if first_energy < second_energy {
        CombatOutcome::SecondWins
    } else {
        CombatOutcome::Draw
    }
}

/// Summary of one rivalry pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RivalryReport {
    pub defections: usize,
    pub casualties: usize,
}

/// Move the straggler of `source` to `dest` if it is exhausted and not already rogue.
///
/// Returns whether an agent changed sides.
pub fn defect(source: &mut Population, dest: &mut Population, rogue_energy: f64) -> bool {
    let idx = match source.straggler() {
        Some(idx) => idx,
        None => return false,
    };
    let candidate = &source.terrans()[idx];
    if candidate.rogue || candidate.energy > rogue_energy {
        return false;
    }

    let mut deserter = source.remove(idx);
    deserter.rogue = true;
    log::debug!(
        "Terran at ({}, {}) defected from population {} to {}",
        deserter.x,
        deserter.y,
        source.id(),
        dest.id()
    );
    dest.adopt(deserter);
    true
}

/// Pair up rivals sharing a cell and remove the losers.
///
/// Returns the number of agents killed.
pub fn resolve_combat(a: &mut Population, b: &mut Population) -> usize {
    let size = a.size();
    let index_a = SpatialIndex::from_positions(size, a.positions());
    let index_b = SpatialIndex::from_positions(size, b.positions());

    let mut cells = a.positions();
    cells.sort_unstable();
    cells.dedup();

    let mut fallen_a = Vec::new();
    let mut fallen_b = Vec::new();
    for (x, y) in cells {
        for (&i, &j) in index_a.get(x, y).iter().zip(index_b.get(x, y)) {
            match duel(a.terrans()[i].energy, b.terrans()[j].energy) {
                CombatOutcome::FirstWins => fallen_b.push(j),
                CombatOutcome::SecondWins => fallen_a.push(i),
                CombatOutcome::Draw => {
                    fallen_a.push(i);
                    fallen_b.push(j);
                }
            }
        }
    }

    for &i in &fallen_a {
        a.terrans_mut()[i].health = 0.0;
    }
    for &j in &fallen_b {
        b.terrans_mut()[j].health = 0.0;
    }
    let casualties = fallen_a.len() + fallen_b.len();
    if casualties > 0 {
        log::debug!(
            "Combat between populations {} and {}: {} killed",
            a.id(),
            b.id(),
            casualties
        );
        a.prune();
        b.prune();
    }
    casualties
}

/// Two distinct mutable elements of a slice
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// Defection toward each population's rival `(i + 1) % n`, then combat for every pair
pub fn apply(populations: &mut [Population], rogue_energy: f64) -> RivalryReport {
    let mut report = RivalryReport::default();
    let n = populations.len();
    if n < 2 {
        return report;
    }

    for i in 0..n {
        let (source, dest) = pair_mut(populations, i, (i + 1) % n);
        if defect(source, dest, rogue_energy) {
            report.defections += 1;
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = pair_mut(populations, i, j);
            report.casualties += resolve_combat(a, b);
        }
    }
    report
}
