#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{control::ControlId, dsp::lfo::bipolar_to_unipolar, modulation::SourceId};

/// Whether a route is shared by every note or evaluated per voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoiceContext {
    Mono,
    Poly,
}

impl std::fmt::Display for VoiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceContext::Mono => write!(f, "mono"),
            VoiceContext::Poly => write!(f, "poly"),
        }
    }
}

/// How a source's raw output is scaled before the amount is applied.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Use the output as-is (an LFO swings the destination both ways).
    #[default]
    Bipolar,
    /// Map -1..1 onto 0..1 so the destination only moves up from its base.
    Unipolar,
}

impl Polarity {
    #[inline]
    pub fn apply(self, raw: f32) -> f32 {
        match self {
            Polarity::Bipolar => raw,
            Polarity::Unipolar => bipolar_to_unipolar(raw),
        }
    }
}

/// Identity of a connection. Connecting an existing key replaces its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionKey {
    pub source: SourceId,
    pub destination: ControlId,
    pub context: VoiceContext,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RouteParams {
    pub amount: f32,
    pub polarity: Polarity,
}

/// A connection expressed by name, as a routing UI or a patch sees it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSpec {
    pub source: String,
    pub destination: String,
    pub amount: f32,
    pub context: VoiceContext,
    #[cfg_attr(feature = "serde", serde(default))]
    pub polarity: Polarity,
}

impl RouteSpec {
    pub fn mono(source: impl Into<String>, destination: impl Into<String>, amount: f32) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            amount,
            context: VoiceContext::Mono,
            polarity: Polarity::Bipolar,
        }
    }

    pub fn poly(source: impl Into<String>, destination: impl Into<String>, amount: f32) -> Self {
        Self {
            context: VoiceContext::Poly,
            ..Self::mono(source, destination, amount)
        }
    }

    pub fn unipolar(mut self) -> Self {
        self.polarity = Polarity::Unipolar;
        self
    }
}
