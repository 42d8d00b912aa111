use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::CyclerError;

/// One temperature step inside the cycled portion of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStep {
    /// Setpoint message handed to the link, without terminator
    pub message: String,
    /// How long to hold once the hold phase starts
    pub hold: Duration,
    /// Wait for the instrument to report target reached before holding
    pub wait_for_target: bool,
}

impl CycleStep {
    pub fn new(message: impl Into<String>, hold: Duration, wait_for_target: bool) -> Self {
        Self {
            message: message.into(),
            hold,
            wait_for_target,
        }
    }
}

/// Fixed tail of a run: final extension, cooldown, heater shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailSpec {
    pub extension_message: String,
    pub extension_hold: Duration,
    pub cooldown_messages: Vec<String>,
    pub cooldown_hold: Duration,
    pub shutdown_message: String,
}

/// A complete cycling program.
///
/// The default is the stock PCR profile the instrument firmware was
/// tuned against: lid preheat to 110, then 95/60/72 denature-anneal-
/// extend cycles, a 10 minute final extension, and a 2 minute cooldown
/// before the heaters are switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    /// Sent once before cycling begins, in order
    pub startup_messages: Vec<String>,
    /// The cycled steps, in order
    pub steps: Vec<CycleStep>,
    /// Cycle budget for the run
    pub max_cycles: u32,
    pub tail: TailSpec,
}

impl Default for ProgramSpec {
    fn default() -> Self {
        Self {
            startup_messages: vec!["heat_act=true".into(), "target_temp_cap=110".into()],
            steps: vec![
                CycleStep::new("target_temp_block=95", Duration::from_secs(30), true),
                CycleStep::new("target_temp_block=60", Duration::from_secs(30), true),
                CycleStep::new("target_temp_block=72", Duration::from_secs(45), true),
            ],
            max_cycles: 5,
            tail: TailSpec {
                extension_message: "target_temp_block=72".into(),
                extension_hold: Duration::from_secs(600),
                cooldown_messages: vec!["target_temp_block=0".into(), "target_temp_cap=0".into()],
                cooldown_hold: Duration::from_secs(120),
                shutdown_message: "heat_act=false".into(),
            },
        }
    }
}

impl ProgramSpec {
    /// Reject programs the sequencer cannot run
    pub fn validate(&self) -> Result<(), CyclerError> {
        if self.steps.is_empty() {
            return Err(CyclerError::Config(
                "Program has no steps - add at least one temperature step before starting".into(),
            ));
        }
        if self.max_cycles == 0 {
            return Err(CyclerError::Config(
                "Cycle budget is zero - set max_cycles to 1 or more".into(),
            ));
        }
        let blank_step = self.steps.iter().any(|s| s.message.trim().is_empty());
        if blank_step {
            return Err(CyclerError::Config(
                "Program contains a step with an empty message".into(),
            ));
        }
        Ok(())
    }
}
