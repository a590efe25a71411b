use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::compiled_state::CompiledState;
use super::state_array::KeyedState;

/// Accumulates transition counts for one context during ingestion.
///
/// A `BuilderState` corresponds to a canonical context window (`state`: up to
/// `seq_len` most recent characters, or a sentinel) and stores how many times
/// each next character was observed after that context.
///
/// Conceptually, this is a node in a Markov chain under construction, where
/// outgoing edges are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during ingestion
/// - Normalize its counts into a `CompiledState` distribution
/// - Merge with another state having the same context (parallel ingestion support)
///
/// ## Invariants
/// - All transitions belong to the same context (`state`)
/// - Counts only ever increase during ingestion
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BuilderState {
	/// Identifier of the state (context window or sentinel).
	state: String,
	/// Outgoing transitions indexed by the next character.
	/// The value represents how many times this transition was observed.
	/// Example: { 'e' => 42, 'a' => 3 }
	transitions: HashMap<char, usize>,
}

impl BuilderState {
	/// Creates a new empty state for the given context.
	pub(crate) fn new(state: &str) -> Self {
		Self {
			state: state.to_owned(),
			transitions: HashMap::new(),
		}
	}

	/// Records an occurrence of a transition toward `next_char`.
	///
	/// - If the transition already exists, its occurrence count is increased.
	/// - Otherwise, a new transition is created with an initial count of 1.
	pub(crate) fn add_transition(&mut self, next_char: char) {
		*self.transitions.entry(next_char).or_insert(0) += 1;
	}

	/// Normalizes the accumulated counts into a `CompiledState`.
	///
	/// Each probability is the transition count divided by the total count.
	/// A state whose total count is zero (only reachable through hand-edited
	/// serialized data) falls back to a uniform distribution over its
	/// observed transitions instead of dividing by zero.
	pub(crate) fn compile(&self) -> CompiledState {
		let transitions: Vec<char> = self.transitions.keys().copied().collect();
		let counts: Vec<usize> = transitions.iter().map(|c| self.transitions[c]).collect();
		let total: usize = counts.iter().sum();

		let probs: Vec<f64> = if total == 0 {
			vec![1.0 / transitions.len() as f64; transitions.len()]
		} else {
			counts.iter().map(|&c| c as f64 / total as f64).collect()
		};

		CompiledState::new(&self.state, transitions, probs)
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same context (`state`).
	/// Transition occurrence counts are summed.
	///
	/// This method is intended for parallel ingestion, where multiple partial
	/// builders are combined into a single one.
	///
	/// # Errors
	/// Returns an error if the state contexts do not match.
	pub(crate) fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.state != other.state {
			return Err("State mismatch".to_owned());
		}

		for (next_char, occurrence) in &other.transitions {
			*self.transitions.entry(*next_char).or_insert(0) += *occurrence;
		}

		Ok(())
	}

	/// Occurrence count recorded for `next_char` (0 if never observed).
	#[cfg(test)]
	pub(crate) fn count(&self, next_char: char) -> usize {
		self.transitions.get(&next_char).copied().unwrap_or(0)
	}
}

impl KeyedState for BuilderState {
	fn state_key(&self) -> &str {
		&self.state
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_add_transition_accumulates() {
		let mut state = BuilderState::new("ab");
		state.add_transition('c');
		state.add_transition('c');
		state.add_transition('d');

		assert_eq!(state.count('c'), 2);
		assert_eq!(state.count('d'), 1);
		assert_eq!(state.count('e'), 0);
	}

	#[test]
	fn test_compile_normalizes_counts() {
		let mut state = BuilderState::new("a");
		state.add_transition('b');
		state.add_transition('c');
		state.add_transition('c');
		state.add_transition('c');

		let compiled = state.compile();
		assert_eq!(compiled.probs().len(), compiled.transitions().len());
		assert!((compiled.probs().iter().sum::<f64>() - 1.0).abs() < 1e-9);

		let index = compiled.transitions().iter().position(|&c| c == 'c').unwrap();
		assert!((compiled.probs()[index] - 0.75).abs() < 1e-9);
	}

	#[test]
	fn test_compile_zero_counts_falls_back_to_uniform() {
		let state = BuilderState {
			state: "x".to_owned(),
			transitions: HashMap::from([('a', 0), ('b', 0), ('c', 0), ('d', 0)]),
		};

		let compiled = state.compile();
		assert_eq!(compiled.probs().len(), 4);
		for &prob in compiled.probs() {
			assert!((prob - 0.25).abs() < 1e-9);
		}
	}

	#[test]
	fn test_merge_sums_counts() {
		let mut left = BuilderState::new("a");
		left.add_transition('b');

		let mut right = BuilderState::new("a");
		right.add_transition('b');
		right.add_transition('c');

		left.merge(&right).unwrap();
		assert_eq!(left.count('b'), 2);
		assert_eq!(left.count('c'), 1);
	}

	#[test]
	fn test_merge_rejects_context_mismatch() {
		let mut left = BuilderState::new("a");
		let right = BuilderState::new("b");
		assert!(left.merge(&right).is_err());
	}
}
