//! Weighted Reciprocal Rank Fusion: `score(d) = sum_i weight_i / (rank_i + k)` with zero-based
//! ranks.

use std::{cmp::Ordering, collections::HashMap, hash::Hash};

pub const DEFAULT_K: f32 = 60.0;

/// One ranked input list and the weight its ranks contribute with.
#[derive(Clone, Debug)]
pub struct WeightedList<T> {
	pub items: Vec<T>,
	pub weight: f32,
}
impl<T> WeightedList<T> {
	pub fn new(items: Vec<T>, weight: f32) -> Self {
		Self { items, weight }
	}
}

#[derive(Clone, Debug)]
pub struct Fused<T> {
	/// First occurrence of the item across the input lists.
	pub item: T,
	pub score: f32,
	/// Number of input lists the item appeared in.
	pub hits: usize,
}

pub fn contribution(rank: usize, weight: f32, k: f32) -> f32 {
	weight / (rank as f32 + k)
}

/// Fuses ranked lists by item key. Items found in only one list still score. Output is sorted by
/// score descending, ties broken by key ascending.
pub fn fuse<T, K, F>(lists: Vec<WeightedList<T>>, k: f32, key: F) -> Vec<Fused<T>>
where
	K: Clone + Eq + Hash + Ord,
	F: Fn(&T) -> K,
{
	let mut slots: HashMap<K, usize> = HashMap::new();
	let mut fused: Vec<(K, Fused<T>)> = Vec::new();

	for list in lists {
		let mut seen_in_list: Vec<K> = Vec::new();

		for (rank, item) in list.items.into_iter().enumerate() {
			let item_key = key(&item);

			// A duplicate within one list keeps its best rank only.
			if seen_in_list.contains(&item_key) {
				continue;
			}

			seen_in_list.push(item_key.clone());

			let score = contribution(rank, list.weight, k);

			match slots.get(&item_key) {
				Some(&slot) => {
					let entry = &mut fused[slot].1;

					entry.score += score;
					entry.hits += 1;
				},
				None => {
					slots.insert(item_key.clone(), fused.len());
					fused.push((item_key, Fused { item, score, hits: 1 }));
				},
			}
		}
	}

	fused.sort_by(|(a_key, a), (b_key, b)| {
		b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a_key.cmp(b_key))
	});

	fused.into_iter().map(|(_, entry)| entry).collect()
}
