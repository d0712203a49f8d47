//! Simulated CamRing firmware.
//!
//! Decodes every report like the ring does and tracks what the LEDs would show, so the tool can
//! be used without hardware attached.

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::report::{Command, Instruction, Mode, Report};
use crate::transport::Transport;
use crate::Color;

/// What the LEDs currently show.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Lighting {
    /// Stored color at stored brightness.
    Normal(Color),
    /// Color wheel animation.
    Rainbow,
    /// Live color set through a control command.
    Overridden(Color),
}

/// Settings persisted by the ring.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct StoredSettings {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub brightness: u8,
    pub mode: Mode,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self { r: 0xff, g: 0xff, b: 0xff, brightness: 0xff, mode: Mode::Normal }
    }
}

/// Firmware state.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct RingState {
    pub settings: StoredSettings,
    pub override_color: Option<Color>,
}

impl RingState {
    pub fn lighting(&self) -> Lighting {
        let StoredSettings { r, g, b, brightness, mode } = self.settings;

        match (self.override_color, mode) {
            (Some(color), _) => Lighting::Overridden(color),
            (None, Mode::Normal) => Lighting::Normal(Color { r, g, b, a: brightness }),
            (None, Mode::Rainbow) => Lighting::Rainbow,
        }
    }

    /// Apply a decoded instruction.
    pub fn apply(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Settings { r, g, b, brightness, mode } => {
                self.settings = StoredSettings { r, g, b, brightness, mode };
            },
            Instruction::Control(Command::AllLeds { color, .. }) => {
                self.override_color = Some(color);
            },
            Instruction::Control(Command::DisableOverride) => self.override_color = None,
            // Mode changes are absolute and end any override.
            Instruction::Mode(mode) => {
                self.settings.mode = mode;
                self.override_color = None;
            },
        }
    }
}

/// Transport feeding reports into a simulated ring.
#[derive(Default)]
pub struct SimulatedRing {
    state: Mutex<RingState>,
}

impl SimulatedRing {
    pub fn state(&self) -> RingState {
        *self.state.lock()
    }
}

impl Transport for SimulatedRing {
    fn write_report(&self, report: &Report) -> Result<(), TransportError> {
        match Instruction::decode(report) {
            Ok(instruction) => {
                let mut state = self.state.lock();
                state.apply(instruction);
                info!(?instruction, lighting = ?state.lighting(), "Simulated ring updated");
            },
            // Unknown instructions are ignored by the firmware.
            Err(err) => warn!(%err, "Simulated ring ignored report"),
        }

        Ok(())
    }
}
