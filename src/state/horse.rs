//! Horse roster generation.
//!
//! A roster is a fixed set of horses with unique names and unique colors.
//! Names and colors are drawn without replacement from their candidate pools
//! by sampling an index set, so uniqueness follows from the pools themselves
//! holding distinct entries.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::index;
use rand::Rng;

use super::config::RaceConfig;
use super::error::RaceError;

/// Lowest condition score a horse can have.
pub const MIN_CONDITION: u8 = 1;

/// Highest condition score a horse can have.
pub const MAX_CONDITION: u8 = 100;

/// A horse in the roster. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horse {
    /// 1-based generation order
    pub id: u32,
    pub name: String,
    pub color: String,
    /// Fitness score in [1, 100]
    pub condition: u8,
}

impl Horse {
    pub fn new(id: u32, name: impl Into<String>, color: impl Into<String>, condition: u8) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            condition,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "color": self.color,
            "condition": self.condition
        })
    }
}

/// Shared horses. Rounds hold clones of the `Arc`, never of the horse.
pub type Roster = Vec<Arc<Horse>>;

/// Distinct entries of a pool, in first-seen order.
pub fn distinct_entries(pool: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    pool.iter()
        .map(String::as_str)
        .filter(|entry| seen.insert(*entry))
        .collect()
}

/// Draw `amount` entries from `pool` without replacement.
fn draw<'a, R: Rng + ?Sized>(
    rng: &mut R,
    pool_name: &'static str,
    pool: &[&'a str],
    amount: usize,
) -> Result<Vec<&'a str>, RaceError> {
    if pool.len() < amount {
        return Err(RaceError::PoolExhausted {
            pool: pool_name,
            available: pool.len(),
            required: amount,
        });
    }

    Ok(index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect())
}

/// Order names case-insensitively, falling back to byte order.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Generate a roster of `config.roster_size` horses.
///
/// Ids follow generation order. The returned roster is sorted by name
/// ignoring case (exact byte order breaks case-only differences), then by
/// condition descending. Fails with `PoolExhausted` when either pool has too
/// few distinct entries.
pub fn generate_roster<R: Rng + ?Sized>(
    config: &RaceConfig,
    rng: &mut R,
) -> Result<Roster, RaceError> {
    let size = config.roster_size;

    // Both pools are checked before any randomness is consumed.
    let names = distinct_entries(&config.horse_names);
    let colors = distinct_entries(&config.colors);
    let names = draw(rng, "name", &names, size)?;
    let colors = draw(rng, "color", &colors, size)?;

    let mut horses: Vec<Horse> = names
        .into_iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (name, color))| {
            let condition = rng.gen_range(MIN_CONDITION..=MAX_CONDITION);
            Horse::new(i as u32 + 1, name, color, condition)
        })
        .collect();

    horses.sort_by(|a, b| {
        compare_names(&a.name, &b.name).then_with(|| b.condition.cmp(&a.condition))
    });

    Ok(horses.into_iter().map(Arc::new).collect())
}
