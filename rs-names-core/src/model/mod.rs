//! Top-level module for the Markov chain generation system.
//!
//! This crate provides a variable-order character-level name generator:
//! - Mutable count accumulation (`ChainBuilder`)
//! - Immutable normalized chains (`CompiledChain`)
//! - Internal per-state representations (`BuilderState`, `CompiledState`)
//! - Termination configuration (`TerminationPolicy`, `LengthCurve`)

/// Mutable count-accumulation phase of the model.
///
/// Handles corpus ingestion with the rolling context-window algorithm,
/// optional nested back-off, merging, and compilation.
pub mod chain_builder;

/// Immutable, sampling-ready phase of the model.
///
/// Runs the generation loop under the configured termination policy.
pub mod compiled_chain;

/// Generation termination configuration.
///
/// Strict end-sentinel termination, or a logistic length-biased blend.
pub mod termination;

/// Internal representation of a single accumulating state (context).
///
/// Tracks outgoing transition counts and normalizes them on compilation.
/// This module is not exposed publicly.
mod builder_state;

/// Internal representation of a single compiled state (context).
///
/// Holds a normalized distribution and supports weighted random sampling.
/// This module is not exposed publicly.
mod compiled_state;

/// (De)serialization of a state map as the wire format's array of states.
///
/// The chain formats persist states as an array of state objects; in memory
/// they live in a map keyed by each object's context. Array order is not
/// semantically significant.
pub(crate) mod state_array {
	use std::collections::HashMap;

	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	/// A state record that knows its own context key.
	pub(crate) trait KeyedState {
		fn state_key(&self) -> &str;
	}

	pub(crate) fn serialize<T, S>(
		states: &HashMap<String, T>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		T: Serialize,
		S: Serializer,
	{
		serializer.collect_seq(states.values())
	}

	pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
	where
		T: Deserialize<'de> + KeyedState,
		D: Deserializer<'de>,
	{
		let states = Vec::<T>::deserialize(deserializer)?;
		Ok(states
			.into_iter()
			.map(|state| (state.state_key().to_owned(), state))
			.collect())
	}
}
