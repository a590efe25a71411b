use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state_array::KeyedState;

/// An immutable, normalized next-character distribution for one context.
///
/// `transitions[i]` pairs positionally with `probs[i]`; the probabilities
/// sum to 1.0 within floating tolerance.
///
/// ## Responsibilities:
/// - Hold the normalized distribution produced by compilation
/// - Draw one next character using weighted random sampling
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompiledState {
	/// Identifier of the state (context window or sentinel).
	state: String,
	/// Observed next characters, paired positionally with `probs`.
	transitions: Vec<char>,
	/// Probability of each transition, summing to 1.0.
	probs: Vec<f64>,
}

impl CompiledState {
	/// Creates a compiled state from already-normalized parallel arrays.
	pub(crate) fn new(state: &str, transitions: Vec<char>, probs: Vec<f64>) -> Self {
		Self {
			state: state.to_owned(),
			transitions,
			probs,
		}
	}

	/// Draws the next character using weighted random sampling.
	///
	/// The probability of selecting a character is its stored probability,
	/// and the drawn character always belongs to the stored transition set.
	///
	/// This method performs:
	/// - one draw from the supplied random source
	/// - a cumulative subtraction scan to select a bucket
	///
	/// Returns `None` if the state has no transitions.
	pub(crate) fn sample(&self, rng: &mut impl Rng) -> Option<char> {
		if self.transitions.is_empty() {
			return None;
		}

		let mut r = rng.random_range(0.0..1.0);

		let mut fallback: Option<char> = None;
		for (next_char, prob) in self.transitions.iter().zip(&self.probs) {
			if r < *prob {
				return Some(*next_char);
			}
			r -= *prob;
			fallback = Some(*next_char);
		}

		// Floating slack can exhaust the scan; the last bucket absorbs it.
		fallback
	}

	/// Observed next characters.
	#[cfg(test)]
	pub(crate) fn transitions(&self) -> &[char] {
		&self.transitions
	}

	/// Probability of each transition, paired positionally with `transitions`.
	#[cfg(test)]
	pub(crate) fn probs(&self) -> &[f64] {
		&self.probs
	}
}

impl KeyedState for CompiledState {
	fn state_key(&self) -> &str {
		&self.state
	}
}
