use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};

use super::builder_state::BuilderState;
use super::compiled_chain::CompiledChain;
use super::termination::TerminationPolicy;
use crate::io;

/// Accumulates transition counts from a corpus of names.
///
/// The builder owns one `BuilderState` per observed context and applies the
/// rolling context-window algorithm to every ingested string. Compiling
/// produces an immutable `CompiledChain`; the builder itself can keep
/// ingesting afterwards, or be serialized to resume training later.
///
/// # Responsibilities
/// - Validate the chain configuration at construction
/// - Ingest training strings one at a time, updating context counts
/// - Optionally update every shorter suffix context too (`nested_seq`)
/// - Compile the accumulated counts into a `CompiledChain`
/// - Merge with another builder having the same configuration
///
/// # Invariants
/// - `seq_len` is always >= 1
/// - `start` and `end` differ and never occur in ingested strings
/// - Counts only ever increase; states are never removed
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChainBuilder {
	/// Start sentinel, the context every training string is entered from.
	start: char,
	/// End sentinel, recorded as the transition after the final context.
	end: char,
	/// Maximum context length (number of preceding characters) used to
	/// predict the next character.
	seq_len: usize,
	/// Whether each transition also updates every shorter suffix context.
	/// This lets the compiled chain fall back to shorter contexts for
	/// contexts rarely or never seen at full length.
	nested_seq: bool,
	/// Mapping from a context to its accumulating state.
	#[serde(with = "super::state_array")]
	states: HashMap<String, BuilderState>,
}

impl ChainBuilder {
	/// Creates a new empty builder.
	///
	/// # Errors
	/// Returns an error if `seq_len` is zero or the sentinels are equal.
	pub fn new(start: char, end: char, seq_len: usize, nested_seq: bool) -> Result<Self, String> {
		if seq_len == 0 {
			return Err("seq_len must be greater than 0".to_owned());
		}
		if start == end {
			return Err("Start and end sentinels must differ".to_owned());
		}

		Ok(Self {
			start,
			end,
			seq_len,
			nested_seq,
			states: HashMap::new(),
		})
	}

	/// Builds a builder from a corpus file, with a binary cache.
	///
	/// If a postcard cache built from this corpus at the same order exists
	/// next to it, the cached builder is loaded instead of re-ingesting the
	/// corpus. Otherwise the corpus is read, ingested in parallel chunks,
	/// and the result is cached for future fast loading.
	///
	/// A cached builder whose configuration differs from the requested one
	/// is rebuilt, not trusted.
	///
	/// # Errors
	/// - File I/O or cache (de)serialization failures
	/// - Invalid configuration, or corpus strings containing a sentinel
	pub fn from_corpus_file<P: AsRef<Path>>(
		filepath: P,
		start: char,
		end: char,
		seq_len: usize,
		nested_seq: bool,
	) -> Result<Self, Box<dyn std::error::Error>> {
		let cache_path = io::build_output_path(&filepath, &format!("seq{}.bin", seq_len))?;

		if cache_path.exists() {
			let bytes = std::fs::read(&cache_path)?;
			let builder: ChainBuilder = postcard::from_bytes(&bytes)?;
			if builder.start == start
				&& builder.end == end
				&& builder.seq_len == seq_len
				&& builder.nested_seq == nested_seq
			{
				return Ok(builder);
			}
		}

		let names = io::read_names(&filepath)?;
		let builder = Self::build_parallel(&names, start, end, seq_len, nested_seq)?;

		let bytes = postcard::to_stdvec(&builder)?;
		std::fs::write(cache_path, bytes)?;

		Ok(builder)
	}

	/// Splits the corpus into chunks, ingests each chunk on its own thread,
	/// and merges the partial builders into a final one.
	///
	/// Counting is commutative, so chunked ingestion accumulates exactly
	/// the same counts as sequential ingestion.
	fn build_parallel(
		names: &[String],
		start: char,
		end: char,
		seq_len: usize,
		nested_seq: bool,
	) -> Result<Self, Box<dyn std::error::Error>> {
		let mut final_builder = Self::new(start, end, seq_len, nested_seq)?;
		if names.is_empty() {
			return Ok(final_builder);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = ((names.len() + chunks - 1) / chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in names.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();

			thread::spawn(move || {
				// Impossible to panic, the configuration was validated above
				let mut partial = Self::new(start, end, seq_len, nested_seq).unwrap();
				let result = partial.process_strings(&chunk).map(|_| partial);
				tx.send(result).expect("Failed to send from thread");
			});
		}
		drop(tx);

		for partial in rx.iter() {
			final_builder.merge(&partial?)?;
		}

		Ok(final_builder)
	}

	/// Ingests one training string, updating context counts.
	///
	/// Records a transition from the start-sentinel context to the first
	/// character, walks the string with a rolling context of up to `seq_len`
	/// most recent characters (a growth phase until the context reaches full
	/// length, then fixed-width sliding), and finally records a transition
	/// from the final context to the end sentinel.
	///
	/// With `nested_seq`, each transition also updates the shorter suffix
	/// contexts of the current context, so a single observed transition may
	/// update up to `seq_len` states.
	///
	/// # Errors
	/// Returns an error if the string is empty or contains a sentinel;
	/// sentinels are reserved and must never appear in training data.
	pub fn process_string(&mut self, string: &str) -> Result<(), String> {
		let chars: Vec<char> = string.chars().collect();
		if chars.is_empty() {
			return Err("Cannot ingest an empty string".to_owned());
		}
		if chars.contains(&self.start) || chars.contains(&self.end) {
			return Err(format!("String '{}' contains a reserved sentinel", string));
		}

		self.get_state(&self.start.to_string()).add_transition(chars[0]);
		let mut state: Vec<char> = vec![chars[0]];

		// Growth phase: the context widens until it reaches seq_len
		for i in 1..self.seq_len.min(chars.len()) {
			self.record_transition(&state, chars[i], i - 1);
			Self::push_rolling(&mut state, chars[i], self.seq_len);
		}

		// Steady phase: fixed-width sliding window
		for i in self.seq_len..chars.len() {
			self.record_transition(&state, chars[i], self.seq_len - 1);
			Self::push_rolling(&mut state, chars[i], self.seq_len);
		}

		let end = self.end;
		self.record_transition(&state, end, self.seq_len - 1);
		Ok(())
	}

	/// Ingests a batch of training strings, in input order.
	///
	/// Ingestion order does not affect the final counts.
	///
	/// # Errors
	/// Stops at the first rejected string (see `process_string`).
	pub fn process_strings(&mut self, strings: &[String]) -> Result<(), String> {
		for string in strings {
			self.process_string(string)?;
		}
		Ok(())
	}

	/// Compiles the accumulated counts into a `CompiledChain` with strict
	/// end-sentinel termination.
	///
	/// Compiling is a pure snapshot: the builder is left untouched and can
	/// keep ingesting strings or be compiled again.
	pub fn compile(&self) -> CompiledChain {
		self.compile_with(TerminationPolicy::Strict)
	}

	/// Compiles the accumulated counts into a `CompiledChain` using the
	/// given termination policy.
	pub fn compile_with(&self, termination: TerminationPolicy) -> CompiledChain {
		let states = self
			.states
			.iter()
			.map(|(key, state)| (key.clone(), state.compile()))
			.collect();
		CompiledChain::new(states, self.start, self.end, self.seq_len, termination)
	}

	/// Merges another builder into this one.
	///
	/// Both builders must share the same sentinels, order, and back-off
	/// setting. Transition occurrence counts are summed.
	///
	/// This method is intended for parallel ingestion, where multiple
	/// partial builders are combined into a single one.
	///
	/// # Errors
	/// Returns an error if the configurations do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.start != other.start || self.end != other.end {
			return Err(format!(
				"Sentinel mismatch: self=({}-{}), other=({}-{})",
				self.start, self.end, other.start, other.end
			));
		}
		if self.seq_len != other.seq_len || self.nested_seq != other.nested_seq {
			return Err("Order or back-off mismatch".to_owned());
		}

		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}

	/// Returns this builder as a JSON string in the builder wire format.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Parses a builder from its JSON wire format.
	///
	/// The parsed builder can resume ingestion where the serialized one
	/// stopped.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Returns the maximum context length of this builder.
	pub fn seq_len(&self) -> usize {
		self.seq_len
	}

	/// Returns the number of contexts observed so far.
	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	/// Increments the state for the full current context, then, with
	/// `nested_seq`, the states for its suffix contexts of length
	/// `max_suffix` down to 1 (each clamped to the context length).
	fn record_transition(&mut self, state: &[char], next_char: char, max_suffix: usize) {
		let key: String = state.iter().collect();
		self.get_state(&key).add_transition(next_char);

		if self.nested_seq {
			for suffix_len in (1..=max_suffix).rev() {
				let suffix_len = suffix_len.min(state.len());
				let key: String = state[state.len() - suffix_len..].iter().collect();
				self.get_state(&key).add_transition(next_char);
			}
		}
	}

	/// Returns the state for `key`, creating it on first access.
	fn get_state(&mut self, key: &str) -> &mut BuilderState {
		self.states
			.entry(key.to_owned())
			.or_insert_with(|| BuilderState::new(key))
	}

	/// Appends `next_char` to the rolling context, keeping only the last
	/// `seq_len` characters.
	fn push_rolling(state: &mut Vec<char>, next_char: char, seq_len: usize) {
		state.push(next_char);
		if state.len() > seq_len {
			state.remove(0);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashSet;

	fn builder(seq_len: usize, nested_seq: bool) -> ChainBuilder {
		ChainBuilder::new('^', '$', seq_len, nested_seq).unwrap()
	}

	fn owned(strings: &[&str]) -> Vec<String> {
		strings.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_new_rejects_invalid_configuration() {
		assert!(ChainBuilder::new('^', '$', 0, false).is_err());
		assert!(ChainBuilder::new('^', '^', 2, false).is_err());
		assert!(ChainBuilder::new('^', '$', 1, false).is_ok());
	}

	#[test]
	fn test_process_string_rejects_sentinels_and_empty_input() {
		let mut builder = builder(2, false);
		assert!(builder.process_string("").is_err());
		assert!(builder.process_string("a^b").is_err());
		assert!(builder.process_string("ab$").is_err());
		assert!(builder.process_string("ab").is_ok());
	}

	#[test]
	fn test_ingestion_counts_end_to_end() {
		let mut builder = builder(2, false);
		builder.process_strings(&owned(&["ab", "ac"])).unwrap();

		assert_eq!(builder.states.len(), 4);
		assert_eq!(builder.states["^"].count('a'), 2);
		assert_eq!(builder.states["a"].count('b'), 1);
		assert_eq!(builder.states["a"].count('c'), 1);
		assert_eq!(builder.states["ab"].count('$'), 1);
		assert_eq!(builder.states["ac"].count('$'), 1);
	}

	#[test]
	fn test_compilation_normalizes_end_to_end() {
		let mut builder = builder(2, false);
		builder.process_strings(&owned(&["ab", "ac"])).unwrap();
		let chain = builder.compile();

		let start = chain.state("^").unwrap();
		assert_eq!(start.transitions().len(), 1);
		assert_eq!(start.transitions()[0], 'a');
		assert!((start.probs()[0] - 1.0).abs() < 1e-9);

		let a = chain.state("a").unwrap();
		assert_eq!(a.transitions().len(), 2);
		for &prob in a.probs() {
			assert!((prob - 0.5).abs() < 1e-9);
		}
	}

	#[test]
	fn test_nested_backoff_updates_suffix_contexts() {
		let mut builder = builder(3, true);
		builder.process_string("ab").unwrap();

		assert_eq!(builder.states["^"].count('a'), 1);
		assert_eq!(builder.states["a"].count('b'), 1);
		// The end-of-string back-off from a context still shorter than
		// seq_len re-counts the full context, then its proper suffixes
		assert_eq!(builder.states["ab"].count('$'), 2);
		assert_eq!(builder.states["b"].count('$'), 1);
	}

	#[test]
	fn test_nested_backoff_in_the_sliding_window() {
		let mut builder = builder(2, true);
		builder.process_string("abcd").unwrap();

		assert_eq!(builder.states["ab"].count('c'), 1);
		assert_eq!(builder.states["b"].count('c'), 1);
		assert_eq!(builder.states["bc"].count('d'), 1);
		assert_eq!(builder.states["c"].count('d'), 1);
		assert_eq!(builder.states["cd"].count('$'), 1);
		assert_eq!(builder.states["d"].count('$'), 1);
	}

	#[test]
	fn test_disabled_backoff_only_updates_full_contexts() {
		let mut builder = builder(3, false);
		builder.process_string("ab").unwrap();

		assert_eq!(builder.states["ab"].count('$'), 1);
		assert!(!builder.states.contains_key("b"));
	}

	#[test]
	fn test_compile_leaves_the_builder_usable() {
		let mut builder = builder(2, false);
		builder.process_string("ab").unwrap();
		let _ = builder.compile();

		builder.process_string("ac").unwrap();
		let chain = builder.compile();
		assert!(chain.state("ac").is_some());
	}

	#[test]
	fn test_json_round_trip_preserves_counts() {
		let mut builder = builder(2, true);
		builder.process_strings(&owned(&["ab", "abc", "b"])).unwrap();

		let parsed = ChainBuilder::from_json(&builder.to_json().unwrap()).unwrap();
		assert_eq!(parsed.start, '^');
		assert_eq!(parsed.end, '$');
		assert_eq!(parsed.seq_len, 2);
		assert!(parsed.nested_seq);

		let keys: HashSet<&String> = builder.states.keys().collect();
		let parsed_keys: HashSet<&String> = parsed.states.keys().collect();
		assert_eq!(keys, parsed_keys);

		for (key, state) in &builder.states {
			for next_char in ['a', 'b', 'c', '$'] {
				assert_eq!(state.count(next_char), parsed.states[key].count(next_char));
			}
		}
	}

	#[test]
	fn test_json_wire_format_fields() {
		let mut builder = builder(1, false);
		builder.process_string("a").unwrap();

		let value: serde_json::Value = serde_json::from_str(&builder.to_json().unwrap()).unwrap();
		assert_eq!(value["start"], "^");
		assert_eq!(value["end"], "$");
		assert_eq!(value["seq_len"], 1);
		assert_eq!(value["nested_seq"], false);

		let states = value["states"].as_array().unwrap();
		assert_eq!(states.len(), 2);
		assert!(
			states
				.iter()
				.all(|s| s["state"].is_string() && s["transitions"].is_object())
		);
	}

	#[test]
	fn test_merge_sums_counts() {
		let mut left = builder(2, false);
		left.process_string("ab").unwrap();

		let mut right = builder(2, false);
		right.process_strings(&owned(&["ab", "ac"])).unwrap();

		left.merge(&right).unwrap();
		assert_eq!(left.states["^"].count('a'), 3);
		assert_eq!(left.states["a"].count('b'), 2);
		assert_eq!(left.states["a"].count('c'), 1);
	}

	#[test]
	fn test_merge_rejects_configuration_mismatch() {
		let mut left = builder(2, false);
		assert!(left.merge(&builder(3, false)).is_err());
		assert!(left.merge(&builder(2, true)).is_err());
		assert!(
			left.merge(&ChainBuilder::new('<', '>', 2, false).unwrap())
				.is_err()
		);
	}

	#[test]
	fn test_from_corpus_file_builds_and_caches() {
		let dir = std::env::temp_dir().join("rs_names_corpus_test");
		std::fs::create_dir_all(&dir).unwrap();
		let corpus = dir.join("names.json");
		std::fs::write(&corpus, r#"["ab","ac","bc"]"#).unwrap();
		let _ = std::fs::remove_file(dir.join("names.seq2.bin"));

		let built = ChainBuilder::from_corpus_file(&corpus, '^', '$', 2, false).unwrap();
		assert_eq!(built.states["^"].count('a'), 2);
		assert_eq!(built.states["^"].count('b'), 1);
		assert!(dir.join("names.seq2.bin").exists());

		let cached = ChainBuilder::from_corpus_file(&corpus, '^', '$', 2, false).unwrap();
		assert_eq!(cached.states["^"].count('a'), 2);

		// A cached builder with a different configuration is not trusted
		let rebuilt = ChainBuilder::from_corpus_file(&corpus, '^', '$', 2, true).unwrap();
		assert!(rebuilt.nested_seq);
	}
}
