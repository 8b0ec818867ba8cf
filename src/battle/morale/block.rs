//! Per-unit morale block and the smoothing/hysteresis step

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::battle::constants::*;
use crate::core::config::MoraleConfig;
use crate::core::types::Round;

/// Four morale states, ordered from best to worst
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum MoraleState {
    #[default]
    Steady,
    Shaken,
    Wavering,
    Routing,
}

impl MoraleState {
    pub fn label(&self) -> &'static str {
        match self {
            MoraleState::Steady => "steady",
            MoraleState::Shaken => "shaken",
            MoraleState::Wavering => "wavering",
            MoraleState::Routing => "routing",
        }
    }

    /// Is this state at least as bad as `other`?
    pub fn at_least(&self, other: MoraleState) -> bool {
        *self >= other
    }

    /// Next state for a smoothed value, moving at most one step
    ///
    /// Downward checks use the enter thresholds, upward checks the exit
    /// thresholds; values inside a band keep the current state.
    pub fn classify(self, ema: i32, config: &MoraleConfig) -> MoraleState {
        match self {
            MoraleState::Steady => {
                if ema <= config.enter_shaken {
                    MoraleState::Shaken
                } else {
                    MoraleState::Steady
                }
            }
            MoraleState::Shaken => {
                if ema <= config.enter_wavering {
                    MoraleState::Wavering
                } else if ema >= config.exit_shaken {
                    MoraleState::Steady
                } else {
                    MoraleState::Shaken
                }
            }
            MoraleState::Wavering => {
                if ema <= config.enter_routing {
                    MoraleState::Routing
                } else if ema >= config.exit_wavering {
                    MoraleState::Shaken
                } else {
                    MoraleState::Wavering
                }
            }
            MoraleState::Routing => {
                if ema >= config.exit_routing {
                    MoraleState::Wavering
                } else {
                    MoraleState::Routing
                }
            }
        }
    }
}

impl fmt::Display for MoraleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The five signed factor contributions behind one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoraleFactors {
    pub leadership: i32,
    pub terrain: i32,
    pub casualties: i32,
    /// Force-ratio penalty plus formation bonus
    pub outnumbered: i32,
    pub effects: i32,
}

impl MoraleFactors {
    /// Clamp every factor to its band
    pub fn clamped(&self) -> MoraleFactors {
        let formation_max = FORMATION_BONUS_PER_ALLY * FORMATION_MAX_ALLIES as i32;
        MoraleFactors {
            leadership: self.leadership.clamp(0, LEADERSHIP_MAX),
            terrain: self.terrain.clamp(TERRAIN_MIN, TERRAIN_MAX),
            casualties: self.casualties.clamp(CASUALTIES_MIN, 0),
            outnumbered: self.outnumbered.clamp(OUTNUMBERED_MIN, formation_max),
            effects: self.effects.clamp(EFFECTS_MIN, EFFECTS_MAX),
        }
    }

    pub fn total(&self) -> i32 {
        self.leadership + self.terrain + self.casualties + self.outnumbered + self.effects
    }
}

/// One trailing history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleSample {
    pub round: Round,
    pub value: i32,
    pub ema: i32,
    pub state: MoraleState,
}

/// Morale attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleBlock {
    pub value: i32,
    pub ema: i32,
    pub state: MoraleState,
    #[serde(deserialize_with = "deserialize_history")]
    pub history: Vec<MoraleSample>,
    pub last_factors: MoraleFactors,
}

fn deserialize_history<'de, D>(deserializer: D) -> Result<Vec<MoraleSample>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut history = Vec::<MoraleSample>::deserialize(deserializer)?;
    trim_history(&mut history);
    Ok(history)
}

fn trim_history(history: &mut Vec<MoraleSample>) {
    if history.len() > MORALE_HISTORY_LEN {
        history.drain(..history.len() - MORALE_HISTORY_LEN);
    }
}

impl Default for MoraleBlock {
    fn default() -> Self {
        Self::new(MORALE_DEFAULT)
    }
}

impl MoraleBlock {
    pub fn new(value: i32) -> Self {
        let value = value.clamp(MORALE_MIN, MORALE_MAX);
        Self {
            value,
            ema: value,
            state: MoraleState::Steady,
            history: Vec::new(),
            last_factors: MoraleFactors::default(),
        }
    }

    /// Run one evaluation step; returns the transition if the state changed
    pub fn evaluate(
        &mut self,
        factors: MoraleFactors,
        round: Round,
        config: &MoraleConfig,
    ) -> Option<(MoraleState, MoraleState)> {
        let factors = factors.clamped();
        let previous = self.ema;

        let raw = (previous + factors.total()).clamp(MORALE_MIN, MORALE_MAX);
        let alpha = config.smoothing_alpha;
        let smoothed = (previous as f64 * (1.0 - alpha) + raw as f64 * alpha).round() as i32;

        self.value = raw;
        self.ema = smoothed.clamp(MORALE_MIN, MORALE_MAX);
        self.last_factors = factors;
        let change = self.reclassify(config);
        self.record(round);
        change
    }

    /// Shift value and ema directly (commander death and similar shocks)
    pub fn shift(
        &mut self,
        delta: i32,
        round: Round,
        config: &MoraleConfig,
    ) -> Option<(MoraleState, MoraleState)> {
        self.value = (self.value + delta).clamp(MORALE_MIN, MORALE_MAX);
        self.ema = (self.ema + delta).clamp(MORALE_MIN, MORALE_MAX);
        let change = self.reclassify(config);
        self.record(round);
        change
    }

    fn reclassify(&mut self, config: &MoraleConfig) -> Option<(MoraleState, MoraleState)> {
        let before = self.state;
        self.state = before.classify(self.ema, config);
        (before != self.state).then_some((before, self.state))
    }

    fn record(&mut self, round: Round) {
        self.history.push(MoraleSample {
            round,
            value: self.value,
            ema: self.ema,
            state: self.state,
        });
        trim_history(&mut self.history);
    }
}
