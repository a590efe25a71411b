use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::compiled_state::CompiledState;
use super::termination::TerminationPolicy;

/// Maximum number of characters sampled in a single generation attempt.
pub const MAX_LENGTH: usize = 30;

/// An immutable, sampling-ready Markov chain.
///
/// Produced once by compiling a `ChainBuilder`; read-only thereafter; used
/// repeatedly for generation.
///
/// # Responsibilities
/// - Own the normalized per-context distributions
/// - Run the generation loop under the configured termination policy
/// - Round-trip through the JSON chain format
///
/// # Invariants
/// - Contains a state keyed by the start sentinel (the initial generation
///   context)
/// - Generated output never contains a sentinel
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompiledChain {
	/// Maximum context length used to select the next-character distribution.
	seq_len: usize,
	/// Start sentinel, whose state is the initial generation context.
	start: char,
	/// End sentinel, whose sampling terminates an attempt.
	end: char,
	/// Mapping from a context to its compiled distribution.
	#[serde(with = "super::state_array")]
	states: HashMap<String, CompiledState>,
	/// Termination policy, selected at compilation. Not part of the wire
	/// format: a deserialized chain starts strict.
	#[serde(skip)]
	termination: TerminationPolicy,
}

impl CompiledChain {
	pub(crate) fn new(
		states: HashMap<String, CompiledState>,
		start: char,
		end: char,
		seq_len: usize,
		termination: TerminationPolicy,
	) -> Self {
		Self {
			seq_len,
			start,
			end,
			states,
			termination,
		}
	}

	/// Returns the maximum context length of this chain.
	pub fn seq_len(&self) -> usize {
		self.seq_len
	}

	/// Returns the number of compiled states.
	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	/// Replaces the termination policy.
	///
	/// Useful after deserialization, since the policy is not part of the
	/// wire format.
	pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
		self.termination = termination;
		self
	}

	/// Runs a single generation attempt.
	///
	/// Starts at the start-sentinel context and samples up to `MAX_LENGTH`
	/// characters:
	/// - Under `TerminationPolicy::LengthBiased`, an early-stop draw against
	///   the length curve is made before each sample.
	/// - Sampling the end sentinel terminates the attempt.
	/// - Otherwise the character is appended and the context becomes the
	///   last `seq_len` generated characters.
	///
	/// Reaching `MAX_LENGTH` returns whatever was generated so far, without
	/// an explicit end. Sentinels never appear in the output.
	pub fn generate_once(&self, rng: &mut impl Rng) -> String {
		let mut output: Vec<char> = Vec::new();
		let mut state_key = self.start.to_string();

		for _ in 0..MAX_LENGTH {
			if let TerminationPolicy::LengthBiased(curve) = &self.termination {
				if rng.random_range(0.0..1.0) < curve.stop_probability(output.len()) {
					break;
				}
			}

			let next_char = match self.states.get(&state_key).and_then(|s| s.sample(rng)) {
				Some(next_char) => next_char,
				// A context without a compiled state ends the attempt
				None => break,
			};
			if next_char == self.end {
				break;
			}

			output.push(next_char);
			let from = output.len().saturating_sub(self.seq_len);
			state_key = output[from..].iter().collect();
		}

		output.into_iter().collect()
	}

	/// Generates a string of at least `min_len` characters.
	///
	/// Retries `generate_once` until the length constraint is satisfied,
	/// up to `nb_try` attempts.
	///
	/// # Errors
	/// Returns an error if no attempt reaches `min_len` within `nb_try`
	/// tries (a `nb_try` of 0 fails immediately). The result is never
	/// shorter than `min_len`.
	pub fn generate(
		&self,
		rng: &mut impl Rng,
		min_len: usize,
		nb_try: usize,
	) -> Result<String, String> {
		for _ in 0..nb_try {
			let output = self.generate_once(rng);
			if output.chars().count() >= min_len {
				return Ok(output);
			}
		}
		Err(format!(
			"No string of at least {} characters after {} tries",
			min_len, nb_try
		))
	}

	/// Returns this chain as a JSON string in the chain wire format.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Parses a chain from its JSON wire format.
	///
	/// The parsed chain is strict until `with_termination` is called.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Compiled state for `key`, if any.
	#[cfg(test)]
	pub(crate) fn state(&self, key: &str) -> Option<&CompiledState> {
		self.states.get(key)
	}
}
