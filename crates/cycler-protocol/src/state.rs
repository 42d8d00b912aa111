/// # Cycle Phase State Machine
///
/// This module implements the state machine for a single cycling run.
/// The state machine prevents invalid phase combinations and provides
/// a single source of truth for run status.
///
/// ## Phase Transition Diagram
///
/// ```text
///   ┌──────┐
///   │ Idle │
///   └──┬───┘
///      │ start
///   ┌──▼──────┐
///   │ Startup │──────────────────────┐
///   └──┬──────┘                      │
///      │ startup sent                │ cycle budget spent
///   ┌──▼───────┐                     │ or end armed,
///   │ Stepping │◄────────────┐       │ before first step
///   └──┬───┬───┘             │       │
///      │   │ no wait flag    │       │
/// wait │   └───────────┐     │       │
///      │               │     │ next  │
///   ┌──▼────────────┐  │     │ step  │
///   │ WaitingTarget │  │     │       │
///   └──┬────────────┘  │     │       │
///      │ target hit    │     │       │
///   ┌──▼──────┐        │     │       │
///   │ Holding │◄───────┘─────┘       │
///   └──┬──────┘                      │
///      │ cycle budget spent          │
///      │ or end armed                │
///   ┌──▼────────────┐◄───────────────┘
///   │ TailExtension │
///   └──┬────────────┘
///      │ extension hold done
///   ┌──▼────────────┐
///   │ TailCooldown  │
///   └──┬────────────┘
///      │ cooldown hold done
///   ┌──▼───────┐
///   │Completed │
///   └──────────┘
///
///   Stopped ◄── any non-terminal phase (operator stop / link loss)
/// ```
///
/// ## Phase Invariants
///
/// - **Idle**: No run in progress, ready to start
/// - **Startup**: Instrument preheat messages being queued
/// - **Stepping**: A step message was queued, settle delay running
/// - **WaitingTarget**: Polling the target-reached signal
/// - **Holding**: Hold timer accruing (pause freezes accrual)
/// - **TailExtension**: Final extension message queued, long hold
/// - **TailCooldown**: Cooldown messages queued, cooldown hold
/// - **Completed**: Run finished normally, terminal
/// - **Stopped**: Run halted early, terminal
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    /// No run in progress
    Idle,

    /// Sending instrument preheat messages
    Startup,

    /// Step setpoint queued, settling
    Stepping,

    /// Waiting for the instrument to report target reached
    WaitingTarget,

    /// Holding at the current setpoint
    Holding,

    /// Final extension hold
    TailExtension,

    /// Heaters winding down
    TailCooldown,

    /// Run finished normally
    Completed,

    /// Run halted early
    Stopped,
}

impl CyclePhase {
    /// Has the run reached a terminal phase?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }

    /// Is a run in progress?
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Completed | Self::Stopped)
    }

    /// User-facing status text
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Startup => "Starting up...",
            Self::Stepping => "Setting block temperature...",
            Self::WaitingTarget => "Waiting for target temperature...",
            Self::Holding => "Holding...",
            Self::TailExtension => "Final extension...",
            Self::TailCooldown => "Cooling down...",
            Self::Completed => "Cycling complete",
            Self::Stopped => "Stopped",
        }
    }

    /// Validate if transition to new_phase is allowed from current phase
    /// This provides compile-time safety via exhaustive match and runtime validation
    pub fn can_transition_to(&self, new_phase: CyclePhase) -> bool {
        use CyclePhase::*;

        // Operator stop (or link loss) halts any live run
        if new_phase == Stopped && !self.is_terminal() {
            return true;
        }

        match (self, new_phase) {
            // From Idle
            (Idle, Startup) => true, // Run starts

            // From Startup
            (Startup, Stepping) => true, // Preheat queued, first step
            (Startup, TailExtension) => true, // Budget of zero effective cycles, or end armed early

            // From Stepping
            (Stepping, WaitingTarget) => true, // Step wants target confirmation
            (Stepping, Holding) => true,       // Step holds immediately

            // From WaitingTarget
            (WaitingTarget, Holding) => true, // Instrument reported target

            // From Holding
            (Holding, Stepping) => true, // Next step in the program
            (Holding, TailExtension) => true, // Cycle budget spent or end armed

            // From the tail
            (TailExtension, TailCooldown) => true, // Extension hold done
            (TailCooldown, Completed) => true,     // Cooldown hold done

            // All other transitions are invalid
            _ => false,
        }
    }
}
