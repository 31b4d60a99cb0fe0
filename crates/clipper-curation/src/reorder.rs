//! Broadcaster-diversity ordering.
//!
//! Produces a permutation in which no two adjacent items share a key
//! (typically the broadcaster), optionally keeping the first item in place.
//!
//! Inputs shorter than `max_exact_len` go through an exhaustive
//! depth-first search over positions, swapping candidates into place on an
//! owned index buffer and restoring them when a branch fails. An element
//! already in position is tried first, so an input that satisfies the
//! constraint comes back unchanged. Branches whose remaining items can no
//! longer be separated are cut using a multiplicity bound: `r` remaining
//! slots after a key `p` can hold at most `ceil(r / 2)` copies of any key
//! and at most `floor(r / 2)` copies of `p`.
//!
//! Longer inputs are built in a single greedy pass guided by the same
//! bound: each position takes the earliest remaining item that keeps the rest
//! separable, so the ranking order is disturbed as little as possible.
//! Inputs shown unsatisfiable get a best-effort adjacent-swap repair. The
//! result is only reported as satisfied after it has been checked.

use std::collections::HashMap;
use std::hash::Hash;

use clipper_models::DiversityOutcome;
use tracing::debug;

/// Reordering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderOptions {
    /// Keep the first (top-ranked) item at position 0.
    pub anchor_first: bool,
    /// Inputs with at least this many items are built greedily instead of
    /// by exhaustive search.
    pub max_exact_len: usize,
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            anchor_first: true,
            max_exact_len: 15,
        }
    }
}

/// Reordered items and how the ordering was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Reordered<T> {
    pub items: Vec<T>,
    pub outcome: DiversityOutcome,
}

impl<T> Reordered<T> {
    /// True when no two adjacent items share a key.
    pub fn satisfied(&self) -> bool {
        self.outcome.is_satisfied()
    }
}

/// True when two adjacent items share a key.
pub fn has_adjacent_duplicates<T, K, F>(items: &[T], key_fn: F) -> bool
where
    K: Eq,
    F: Fn(&T) -> K,
{
    items.windows(2).any(|pair| key_fn(&pair[0]) == key_fn(&pair[1]))
}

/// Reorder `items` so that no two adjacent items share a key.
pub fn reorder<T, K, F>(items: Vec<T>, key_fn: F, options: &ReorderOptions) -> Reordered<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let n = items.len();
    if n <= 1 {
        return Reordered {
            items,
            outcome: DiversityOutcome::Exact,
        };
    }

    let keys = intern_keys(&items, &key_fn);
    let start = usize::from(options.anchor_first);
    let mut order: Vec<usize> = (0..n).collect();

    let outcome = if !satisfiable(&keys, options.anchor_first) {
        repair(&mut order, &keys, start);
        DiversityOutcome::Unsatisfiable
    } else if n < options.max_exact_len {
        let mut counts = key_counts(&keys, &order[start..]);
        if search(&mut order, &keys, &mut counts, start) {
            DiversityOutcome::Exact
        } else {
            repair(&mut order, &keys, start);
            DiversityOutcome::Unsatisfiable
        }
    } else {
        let mut counts = key_counts(&keys, &order[start..]);
        if !construct(&mut order, &keys, &mut counts, start) {
            repair(&mut order, &keys, start);
        }
        if conflicts(&order, &keys) == 0 {
            DiversityOutcome::Repaired
        } else {
            DiversityOutcome::Skipped
        }
    };

    debug!(
        items = n,
        anchor_first = options.anchor_first,
        outcome = ?outcome,
        remaining_conflicts = conflicts(&order, &keys),
        "Reordered for diversity"
    );

    Reordered {
        items: apply_order(items, &order),
        outcome,
    }
}

/// Map every item's key to a dense id.
fn intern_keys<T, K, F>(items: &[T], key_fn: &F) -> Vec<usize>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut ids: HashMap<K, usize> = HashMap::new();
    items
        .iter()
        .map(|item| {
            let next = ids.len();
            *ids.entry(key_fn(item)).or_insert(next)
        })
        .collect()
}

/// Occurrences of each key id among the items at `positions`.
fn key_counts(keys: &[usize], positions: &[usize]) -> Vec<usize> {
    let distinct = keys.iter().max().map_or(0, |max| max + 1);
    let mut counts = vec![0; distinct];
    for &index in positions {
        counts[keys[index]] += 1;
    }
    counts
}

/// Whether `remaining` items with the given key counts can be laid out with
/// no equal neighbours, the first of them differing from `prev`.
fn arrangeable(counts: &[usize], remaining: usize, prev: Option<usize>) -> bool {
    let half_up = remaining.div_ceil(2);
    let half_down = remaining / 2;
    counts.iter().enumerate().all(|(key, &count)| {
        if Some(key) == prev {
            count <= half_down
        } else {
            count <= half_up
        }
    })
}

fn satisfiable(keys: &[usize], anchor_first: bool) -> bool {
    let positions: Vec<usize> = (0..keys.len()).collect();
    if anchor_first {
        let counts = key_counts(keys, &positions[1..]);
        arrangeable(&counts, keys.len() - 1, Some(keys[0]))
    } else {
        arrangeable(&key_counts(keys, &positions), keys.len(), None)
    }
}

/// Depth-first search over positions `i..n` of `order`.
///
/// `counts` holds the key counts of the items at positions `i..n`.
fn search(order: &mut [usize], keys: &[usize], counts: &mut [usize], i: usize) -> bool {
    let n = order.len();
    if i == n {
        return true;
    }

    let prev = (i > 0).then(|| keys[order[i - 1]]);
    let mut tried: Vec<usize> = Vec::new();

    for j in i..n {
        let key = keys[order[j]];
        if Some(key) == prev || tried.contains(&key) {
            continue;
        }
        tried.push(key);

        counts[key] -= 1;
        if arrangeable(counts, n - i - 1, Some(key)) {
            order.swap(i, j);
            if search(order, keys, counts, i + 1) {
                return true;
            }
            order.swap(i, j);
        }
        counts[key] += 1;
    }

    false
}

/// Greedy pass over positions `start..n` of `order`.
///
/// Each position takes the earliest remaining item whose key differs from
/// its predecessor and leaves the rest arrangeable; the items it skips keep
/// their relative order. The bound in [`arrangeable`] is exact, so this only
/// returns false for input that failed [`satisfiable`].
fn construct(order: &mut [usize], keys: &[usize], counts: &mut [usize], start: usize) -> bool {
    let n = order.len();

    for i in start..n {
        let prev = (i > 0).then(|| keys[order[i - 1]]);
        let mut placed = false;

        for j in i..n {
            let key = keys[order[j]];
            if Some(key) == prev {
                continue;
            }
            counts[key] -= 1;
            if arrangeable(counts, n - i - 1, Some(key)) {
                order[i..=j].rotate_right(1);
                placed = true;
                break;
            }
            counts[key] += 1;
        }

        if !placed {
            return false;
        }
    }

    true
}

fn conflicts(order: &[usize], keys: &[usize]) -> usize {
    order
        .windows(2)
        .filter(|pair| keys[pair[0]] == keys[pair[1]])
        .count()
}

/// Conflicting adjacent pairs touching position `a` or `b`.
fn local_conflicts(order: &[usize], keys: &[usize], a: usize, b: usize) -> usize {
    let mut pairs: Vec<usize> = Vec::with_capacity(4);
    for p in [a, b] {
        if p > 0 {
            pairs.push(p - 1);
        }
        if p + 1 < order.len() {
            pairs.push(p);
        }
    }
    pairs.sort_unstable();
    pairs.dedup();
    pairs
        .into_iter()
        .filter(|&left| keys[order[left]] == keys[order[left + 1]])
        .count()
}

/// Swap positions `a` and `b` if that strictly lowers the number of
/// conflicts, otherwise leave the order untouched.
fn try_swap(order: &mut [usize], keys: &[usize], a: usize, b: usize) -> bool {
    let before = local_conflicts(order, keys, a, b);
    order.swap(a, b);
    if local_conflicts(order, keys, a, b) < before {
        true
    } else {
        order.swap(a, b);
        false
    }
}

/// Greedy adjacent-swap repair over positions `start..n`, used when no
/// conflict-free order exists.
///
/// For each conflicting pair, first looks forward then backward for the
/// nearest element whose swap lowers the conflict count.
fn repair(order: &mut [usize], keys: &[usize], start: usize) {
    let n = order.len();
    let first = start.max(1);

    for i in first..n {
        if keys[order[i]] == keys[order[i - 1]] {
            for j in i + 1..n {
                if try_swap(order, keys, i, j) {
                    break;
                }
            }
        }
    }

    for i in first..n {
        if keys[order[i]] == keys[order[i - 1]] {
            for j in (start..i).rev() {
                if try_swap(order, keys, i, j) {
                    break;
                }
            }
        }
    }
}

fn apply_order<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order.iter().filter_map(|&index| slots[index].take()).collect()
}
