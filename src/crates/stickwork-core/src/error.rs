use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimingError>;

/// Precondition violations raised at the boundary of the timing calculators.
///
/// Malformed musical input (an unparseable time signature, an accent past the
/// end of the bar, an ambiguous recording) never produces one of these; it is
/// answered with a safe default instead. These errors mean the caller passed
/// counts or tempos that no musical input could have produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("{what} must be greater than zero")]
    ZeroCount { what: &'static str },

    #[error("tempo must be a positive finite number of beats per minute, got {0}")]
    InvalidTempo(f64),

    #[error("per-beat subdivision list is empty")]
    EmptySubdivisions,
}

impl TimingError {
    pub fn zero(what: &'static str) -> Self {
        TimingError::ZeroCount { what }
    }
}

/// Milliseconds per beat for a tempo, rejecting zero, negative and non-finite tempos.
pub fn ms_per_beat(bpm: f64) -> Result<f64> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(TimingError::InvalidTempo(bpm));
    }
    Ok(60_000.0 / bpm)
}
