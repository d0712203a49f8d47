//! CamRing HID report format.
//!
//! Every report is 65 bytes long: the HID report ID, an instruction byte and a zero-padded
//! instruction-specific payload. The layout matches the ring firmware bit for bit.

use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::Color;

/// Total report length, including the report ID.
pub const REPORT_LEN: usize = 65;

/// Brightness sent with every stored color.
pub const STORED_BRIGHTNESS: u8 = 255;

/// HID report ID.
const REPORT_ID: u8 = 0x00;

const INSTRUCTION_SETTINGS: u8 = 0x00;
const INSTRUCTION_CONTROL: u8 = 0x01;
const INSTRUCTION_MODE: u8 = 0x02;

const COMMAND_ALL_LEDS: u8 = 0x01;
const COMMAND_DISABLE_OVERRIDE: u8 = 0xff;

/// Display mode.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub enum Mode {
    #[default]
    Normal,
    Rainbow,
}

impl Mode {
    fn byte(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Rainbow => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Rainbow),
            byte => Err(DecodeError::UnknownMode(byte)),
        }
    }
}

/// Live control command.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Command {
    /// Override all LEDs with a single color.
    AllLeds { pattern: u8, color: Color },
    /// Cancel any override and fall back to the stored settings.
    DisableOverride,
}

/// Protocol instruction carried by a report.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Instruction {
    /// Persistent color, brightness and mode.
    Settings { r: u8, g: u8, b: u8, brightness: u8, mode: Mode },
    Control(Command),
    Mode(Mode),
}

impl Instruction {
    /// Build the report for this instruction.
    pub fn encode(&self) -> Report {
        let mut buf = BytesMut::with_capacity(REPORT_LEN);
        buf.put_u8(REPORT_ID);

        match *self {
            Self::Settings { r, g, b, brightness, mode } => {
                buf.put_u8(INSTRUCTION_SETTINGS);
                buf.put_slice(&[r, g, b, brightness, mode.byte()]);
            },
            Self::Control(Command::AllLeds { pattern, color }) => {
                buf.put_u8(INSTRUCTION_CONTROL);
                buf.put_u8(COMMAND_ALL_LEDS);
                buf.put_u8(pattern);
                buf.put_slice(&[color.r, color.g, color.b, color.a]);
            },
            Self::Control(Command::DisableOverride) => {
                buf.put_u8(INSTRUCTION_CONTROL);
                buf.put_u8(COMMAND_DISABLE_OVERRIDE);
            },
            Self::Mode(mode) => {
                buf.put_u8(INSTRUCTION_MODE);
                buf.put_u8(mode.byte());
            },
        }

        // Padding.
        buf.resize(REPORT_LEN, 0);

        Report(buf.freeze())
    }

    /// Parse a report the way the ring firmware does.
    pub fn decode(report: &[u8]) -> Result<Self, DecodeError> {
        if report.len() != REPORT_LEN {
            return Err(DecodeError::BadLength(report.len()));
        }

        if report[0] != REPORT_ID {
            return Err(DecodeError::BadReportId(report[0]));
        }

        let payload = &report[2..];
        match report[1] {
            INSTRUCTION_SETTINGS => Ok(Self::Settings {
                r: payload[0],
                g: payload[1],
                b: payload[2],
                brightness: payload[3],
                mode: Mode::from_byte(payload[4])?,
            }),
            INSTRUCTION_CONTROL => match payload[0] {
                COMMAND_ALL_LEDS => {
                    let color =
                        Color { r: payload[2], g: payload[3], b: payload[4], a: payload[5] };
                    Ok(Self::Control(Command::AllLeds { pattern: payload[1], color }))
                },
                COMMAND_DISABLE_OVERRIDE => Ok(Self::Control(Command::DisableOverride)),
                command => Err(DecodeError::UnknownCommand(command)),
            },
            INSTRUCTION_MODE => Ok(Self::Mode(Mode::from_byte(payload[0])?)),
            instruction => Err(DecodeError::UnknownInstruction(instruction)),
        }
    }
}

/// Fixed-size output report.
///
/// Reports can only be created through [`Instruction::encode`], so the length is always
/// [`REPORT_LEN`].
#[derive(PartialEq, Eq, Debug)]
pub struct Report(Bytes);

impl Deref for Report {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Report {
    /// Hex dump up to the last non-zero byte.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().rposition(|&byte| byte != 0).map_or(2, |i| (i + 1).max(2));

        for (i, byte) in self.0[..end].iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", byte)?;
        }

        if end < REPORT_LEN {
            write!(f, " (+{} zero)", REPORT_LEN - end)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_leds(color: Color) -> Report {
        Instruction::Control(Command::AllLeds { pattern: 0, color }).encode()
    }

    #[test]
    fn all_leds_layout() {
        for &(r, g, b, a) in &[(0, 0, 0, 0), (255, 255, 255, 255), (0x12, 0x34, 0x56, 0x78), (1, 0, 254, 7)]
        {
            let report = all_leds(Color { r, g, b, a });

            assert_eq!(report.len(), REPORT_LEN);
            assert_eq!(&report[..8], &[0x00, 0x01, 0x01, 0x00, r, g, b, a]);
            assert!(report[8..].iter().all(|&byte| byte == 0));
        }
    }

    #[test]
    fn settings_layout() {
        let report = Instruction::Settings {
            r: 10,
            g: 20,
            b: 30,
            brightness: STORED_BRIGHTNESS,
            mode: Mode::Normal,
        }
        .encode();

        assert_eq!(&report[..7], &[0x00, 0x00, 10, 20, 30, 255, 0]);
        assert!(report[7..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn modes_differ_only_in_mode_byte() {
        let normal = Instruction::Mode(Mode::Normal).encode();
        let rainbow = Instruction::Mode(Mode::Rainbow).encode();

        assert_eq!(normal[1], 0x02);
        assert_eq!(normal[2], 0);
        assert_eq!(rainbow[2], 1);
        for i in (0..REPORT_LEN).filter(|&i| i != 2) {
            assert_eq!(normal[i], rainbow[i], "byte {i}");
            if i != 1 {
                assert_eq!(normal[i], 0, "byte {i}");
            }
        }
    }

    #[test]
    fn disable_override_layout() {
        let report = Instruction::Control(Command::DisableOverride).encode();

        assert_eq!(&report[..3], &[0x00, 0x01, 0xff]);
        assert!(report[3..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn decode_matches_encode() {
        let instructions = [
            Instruction::Settings { r: 1, g: 2, b: 3, brightness: 4, mode: Mode::Rainbow },
            Instruction::Control(Command::AllLeds {
                pattern: 0,
                color: Color { r: 9, g: 8, b: 7, a: 6 },
            }),
            Instruction::Control(Command::DisableOverride),
            Instruction::Mode(Mode::Normal),
            Instruction::Mode(Mode::Rainbow),
        ];

        for instruction in &instructions {
            assert_eq!(Instruction::decode(&instruction.encode()), Ok(*instruction));
        }
    }

    #[test]
    fn decode_rejects_malformed() {
        assert_eq!(Instruction::decode(&[0; 64]), Err(DecodeError::BadLength(64)));

        let mut report = [0u8; REPORT_LEN];
        report[0] = 0x05;
        assert_eq!(Instruction::decode(&report), Err(DecodeError::BadReportId(0x05)));

        report[0] = 0x00;
        report[1] = 0x03;
        assert_eq!(Instruction::decode(&report), Err(DecodeError::UnknownInstruction(0x03)));

        report[1] = INSTRUCTION_CONTROL;
        report[2] = 0x00;
        assert_eq!(Instruction::decode(&report), Err(DecodeError::UnknownCommand(0x00)));

        report[1] = INSTRUCTION_MODE;
        report[2] = 2;
        assert_eq!(Instruction::decode(&report), Err(DecodeError::UnknownMode(2)));
    }

    #[test]
    fn display_trims_padding() {
        let report = Instruction::Mode(Mode::Rainbow).encode();
        assert_eq!(report.to_string(), "00 02 01 (+62 zero)");

        let report = Instruction::Mode(Mode::Normal).encode();
        assert_eq!(report.to_string(), "00 02 (+63 zero)");
    }
}
