/// Termination policy applied during generation.
///
/// Exactly one policy is active per compiled chain, selected at compilation
/// (or with `CompiledChain::with_termination` after deserialization):
///
/// # Variants
/// - `Strict`: only sampling the end sentinel (or hitting the iteration cap)
///   terminates an attempt.
/// - `LengthBiased`: before each sample, an additional early-stop draw is
///   made against a length-dependent probability from a `LengthCurve`,
///   blending chain-driven termination with a separately fitted length
///   prior. This makes the generated-length distribution more realistic
///   for short sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TerminationPolicy {
	#[default]
	Strict,
	LengthBiased(LengthCurve),
}

/// Logistic early-stop curve over the number of characters generated so far.
///
/// The stop probability for an output of `n` characters is
/// `clamp(1 / (1 + exp(-steepness * (n - midpoint))) - offset, 0, 1)`.
///
/// The defaults were fit against a corpus of short names. They are tunables,
/// not laws: refit them for corpora with a different length distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct LengthCurve {
	/// Output length at which the raw logistic reaches 0.5.
	pub midpoint: f64,
	/// Slope of the logistic around the midpoint.
	pub steepness: f64,
	/// Constant subtracted from the logistic before clipping.
	pub offset: f64,
}

impl Default for LengthCurve {
	fn default() -> Self {
		Self {
			midpoint: 6.0,
			steepness: 0.5,
			offset: 0.1,
		}
	}
}

impl LengthCurve {
	/// Early-stop probability for an output of `length` characters so far.
	///
	/// Always within `[0.0, 1.0]`.
	pub fn stop_probability(&self, length: usize) -> f64 {
		let x = length as f64 - self.midpoint;
		let p = 1.0 / (1.0 + (-self.steepness * x).exp()) - self.offset;
		p.clamp(0.0, 1.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_policy_is_strict() {
		assert_eq!(TerminationPolicy::default(), TerminationPolicy::Strict);
	}

	#[test]
	fn test_stop_probability_is_clamped() {
		let curve = LengthCurve::default();
		for length in 0..100 {
			let p = curve.stop_probability(length);
			assert!((0.0..=1.0).contains(&p));
		}

		// Far below the midpoint the offset pushes the raw value negative
		let far = LengthCurve {
			midpoint: 50.0,
			steepness: 1.0,
			offset: 0.1,
		};
		assert_eq!(far.stop_probability(0), 0.0);
	}

	#[test]
	fn test_stop_probability_is_nondecreasing() {
		let curve = LengthCurve::default();
		let mut last = 0.0;
		for length in 0..40 {
			let p = curve.stop_probability(length);
			assert!(p >= last);
			last = p;
		}
	}
}
