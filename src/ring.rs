//! CamRing commands.
//!
//! Translates user intents into reports and hands them to the device session. The ring never
//! acknowledges a report, so every mode change is sent as an absolute command.

use crate::report::{Command, Instruction, Mode, Report, STORED_BRIGHTNESS};
use crate::session::DeviceSession;
use crate::Color;

/// Pattern byte of the all LEDs command, unused by the firmware.
const NO_PATTERN: u8 = 0x00;

/// Handle for controlling the ring.
///
/// All methods return immediately, writes complete in the background.
pub struct Ring {
    session: DeviceSession,
}

impl Ring {
    pub fn new(session: DeviceSession) -> Self {
        Self { session }
    }

    /// Override all LEDs with `color`.
    pub fn set_all_pixels(&self, color: Color) {
        self.session.send(all_pixels(color));
    }

    /// Turn all LEDs off.
    pub fn clear_all_pixels(&self) {
        self.set_all_pixels(Color::default());
    }

    /// Persist `color` and switch to normal mode to display it.
    pub fn set_stored_color(&self, color: Color) {
        self.session.send_sequence(stored_color(color));
    }

    pub fn enter_rainbow_mode(&self) {
        self.session.send(mode(Mode::Rainbow));
    }

    pub fn enter_normal_mode(&self) {
        self.session.send(mode(Mode::Normal));
    }

    /// Cancel any override and return to normal mode.
    pub fn reset_and_clear(&self) {
        self.session.send_sequence(reset());
    }

    /// Wait for all dispatched commands to finish.
    pub async fn flush(&self) {
        self.session.flush().await;
    }

    /// Reset the ring and release the device.
    pub async fn reset_and_exit(self) {
        self.session.close().await;
    }
}

/// Report overriding all LEDs.
pub fn all_pixels(color: Color) -> Report {
    Instruction::Control(Command::AllLeds { pattern: NO_PATTERN, color }).encode()
}

/// Reports persisting a color.
///
/// The color's alpha is never transmitted, stored brightness is always [`STORED_BRIGHTNESS`].
/// Normal mode is forced afterwards since an override or rainbow mode would hide the new color.
pub fn stored_color(color: Color) -> Vec<Report> {
    let settings = Instruction::Settings {
        r: color.r,
        g: color.g,
        b: color.b,
        brightness: STORED_BRIGHTNESS,
        mode: Mode::Normal,
    };

    vec![settings.encode(), mode(Mode::Normal)]
}

/// Report selecting a display mode.
pub fn mode(mode: Mode) -> Report {
    Instruction::Mode(mode).encode()
}

/// Reports returning the ring to its stored color.
pub fn reset() -> Vec<Report> {
    vec![Instruction::Control(Command::DisableOverride).encode(), mode(Mode::Normal)]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::report::REPORT_LEN;
    use crate::simulator::{Lighting, SimulatedRing, StoredSettings};
    use crate::transport::testing::RecordingTransport;

    const TEAL: Color = Color { r: 0x00, g: 0x80, b: 0x80, a: 0x10 };

    fn recording_ring() -> (Ring, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        (Ring::new(DeviceSession::bind(transport.clone())), transport)
    }

    #[test]
    fn clear_equals_black_transparent() {
        assert_eq!(all_pixels(Color::default()), all_pixels(Color { r: 0, g: 0, b: 0, a: 0 }));
    }

    #[test]
    fn stored_color_ignores_alpha() {
        let reports = stored_color(TEAL);

        assert_eq!(reports.len(), 2);
        assert_eq!(&reports[0][..7], &[0x00, 0x00, 0x00, 0x80, 0x80, 255, 0]);
        assert!(reports[0][7..].iter().all(|&byte| byte == 0));
        assert_eq!(reports[1], mode(Mode::Normal));
    }

    #[test]
    fn reset_disables_override_then_normal() {
        let reports = reset();

        assert_eq!(reports.len(), 2);
        assert_eq!(&reports[0][..3], &[0x00, 0x01, 0xff]);
        assert_eq!(reports[1], mode(Mode::Normal));
    }

    #[test]
    fn mode_is_repeatable() {
        assert_eq!(mode(Mode::Normal), mode(Mode::Normal));
        assert_eq!(mode(Mode::Normal).len(), REPORT_LEN);
    }

    #[tokio::test]
    async fn intents_reach_transport() {
        let (ring, transport) = recording_ring();

        ring.set_all_pixels(TEAL);
        ring.flush().await;
        ring.set_stored_color(TEAL);
        ring.flush().await;
        ring.enter_rainbow_mode();
        ring.flush().await;
        ring.clear_all_pixels();
        ring.flush().await;
        ring.reset_and_clear();
        ring.flush().await;

        let mut expected = vec![all_pixels(TEAL)];
        expected.extend(stored_color(TEAL));
        expected.push(mode(Mode::Rainbow));
        expected.push(all_pixels(Color::default()));
        expected.extend(reset());

        let expected: Vec<Vec<u8>> = expected.iter().map(|report| report.to_vec()).collect();
        assert_eq!(transport.reports(), expected);
    }

    #[tokio::test]
    async fn reset_and_exit_restores_ring() {
        let (ring, transport) = recording_ring();

        ring.set_all_pixels(TEAL);
        ring.flush().await;
        ring.reset_and_exit().await;

        let reports = transport.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1], reset()[0].to_vec());
        assert_eq!(reports[2], reset()[1].to_vec());
    }

    #[tokio::test]
    async fn unbound_ring_is_inert() {
        let ring = Ring::new(DeviceSession::unbound());

        ring.set_all_pixels(TEAL);
        ring.set_stored_color(TEAL);
        ring.enter_rainbow_mode();
        ring.enter_normal_mode();
        ring.clear_all_pixels();
        ring.reset_and_clear();
        ring.flush().await;
        ring.reset_and_exit().await;
    }

    #[tokio::test]
    async fn stored_color_shows_after_override() {
        let simulated = Arc::new(SimulatedRing::default());
        let ring = Ring::new(DeviceSession::bind(simulated.clone()));

        ring.enter_rainbow_mode();
        ring.flush().await;
        ring.set_all_pixels(TEAL);
        ring.flush().await;
        assert_eq!(simulated.state().lighting(), Lighting::Overridden(TEAL));

        ring.set_stored_color(TEAL);
        ring.flush().await;

        let state = simulated.state();
        assert_eq!(state.lighting(), Lighting::Normal(Color { a: 255, ..TEAL }));
        assert_eq!(state.settings, StoredSettings {
            r: 0x00,
            g: 0x80,
            b: 0x80,
            brightness: 255,
            mode: Mode::Normal
        });
    }

    #[tokio::test]
    async fn reset_leaves_rainbow() {
        let simulated = Arc::new(SimulatedRing::default());
        let ring = Ring::new(DeviceSession::bind(simulated.clone()));

        ring.enter_rainbow_mode();
        ring.flush().await;
        ring.set_all_pixels(TEAL);
        ring.flush().await;
        ring.reset_and_clear();
        ring.flush().await;

        assert!(matches!(simulated.state().lighting(), Lighting::Normal(_)));
    }
}
