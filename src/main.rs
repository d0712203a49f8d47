//! CamRing control tool.
//!
//! The CamRing is a 12 LED ring driven by a SAMD board, exposed as a generic 64 byte in/out HID
//! device. Without a subcommand an interactive session is started, which resets the ring to its
//! stored settings when it ends.

use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::ring::Ring;
use crate::session::DeviceSession;
use crate::simulator::SimulatedRing;
use crate::transport::{DeviceFilter, DryRunTransport};

mod error;
mod report;
mod ring;
mod session;
mod simulator;
mod transport;

/// RGB color with brightness.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl FromStr for Color {
    type Err = ();

    /// Parse `0xRRGGBB` with full brightness, or `0xRRGGBBAA`.
    fn from_str(s: &str) -> Result<Color, ()> {
        let chars = match s.strip_prefix("0x") {
            Some(chars) if chars.len() == 6 || chars.len() == 8 => chars,
            _ => return Err(()),
        };

        let mut color = u32::from_str_radix(chars, 16).map_err(|_| ())?;
        if chars.len() == 6 {
            color = (color << 8) | 0xff;
        }

        let [r, g, b, a] = color.to_be_bytes();
        Ok(Color { r, g, b, a })
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Action requested by the user.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
enum Intent {
    Pixels(Color),
    Set(Color),
    Rainbow,
    Normal,
    Clear,
    Reset,
    Quit,
}

impl Intent {
    fn from_subcommand(name: &str, matches: &ArgMatches) -> Option<Self> {
        let color = || matches.get_one::<Color>("color").copied();

        match name {
            "pixels" => color().map(Intent::Pixels),
            "set" => color().map(Intent::Set),
            "rainbow" => Some(Intent::Rainbow),
            "normal" => Some(Intent::Normal),
            "clear" => Some(Intent::Clear),
            "reset" => Some(Intent::Reset),
            _ => None,
        }
    }

    /// Forward the intent to the ring.
    fn apply(self, ring: &Ring) {
        debug!(intent = ?self, "Applying intent");

        match self {
            Intent::Pixels(color) => ring.set_all_pixels(color),
            Intent::Set(color) => ring.set_stored_color(color),
            Intent::Rainbow => ring.enter_rainbow_mode(),
            Intent::Normal => ring.enter_normal_mode(),
            Intent::Clear => ring.clear_all_pixels(),
            Intent::Reset => ring.reset_and_clear(),
            // Ending the session is up to the caller.
            Intent::Quit => (),
        }
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default();
        let mut color = || {
            let arg = words.next().unwrap_or_default();
            parse_color(arg)
        };

        match command {
            "pixels" => Ok(Intent::Pixels(color()?)),
            "set" => Ok(Intent::Set(color()?)),
            "rainbow" => Ok(Intent::Rainbow),
            "normal" => Ok(Intent::Normal),
            "clear" => Ok(Intent::Clear),
            "reset" => Ok(Intent::Reset),
            "quit" | "exit" => Ok(Intent::Quit),
            command => Err(format!("Unknown command '{}'", command)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli();

    let log_level = matches.get_one::<String>("log-level").map_or("info", String::as_str);
    init_logging(log_level)?;

    let session = if matches.get_flag("simulate") {
        DeviceSession::bind(Arc::new(SimulatedRing::default()))
    } else if matches.get_flag("dry-run") {
        DeviceSession::bind(Arc::new(DryRunTransport))
    } else {
        DeviceSession::open(&DeviceFilter::default())
    };
    let ring = Ring::new(session);

    match matches.subcommand().and_then(|(name, sub)| Intent::from_subcommand(name, sub)) {
        Some(intent) => {
            intent.apply(&ring);
            ring.flush().await;
        },
        None => interactive(ring).await,
    }

    Ok(())
}

/// Read intents from STDIN until the user quits.
async fn interactive(ring: Ring) {
    println!("Commands: pixels <color>, set <color>, rainbow, normal, clear, reset, quit");
    println!("Colors use the format 0xRRGGBB or 0xRRGGBBAA.\n");

    let mut lines = stdin_lines();

    loop {
        print!(" > ");
        let _ = io::stdout().flush();

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => None,
        };

        // Treat EOF, read errors and interrupts like an explicit quit.
        let line = match line {
            Some(line) => line,
            None => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        match Intent::from_str(&line) {
            Ok(Intent::Quit) => break,
            Ok(intent) => intent.apply(&ring),
            Err(err) => eprintln!("\x1b[31m{}, please try again.\x1b[0m", err),
        }
    }

    println!();
    info!("Resetting ring");
    ring.reset_and_exit().await;
}

/// Read STDIN lines on a dedicated thread.
///
/// A blocking read cannot be cancelled, so it must not hold up runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || {
        for line in io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(%err, "Unable to read STDIN");
                    break;
                },
            };

            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// Install the diagnostic log on STDERR.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
    Ok(())
}

/// Parse a CLI color parameter.
fn parse_color(s: &str) -> Result<Color, String> {
    Color::from_str(s)
        .map_err(|_| format!("Color '{}' does not match format 0xRRGGBB or 0xRRGGBBAA", s))
}

/// Get clap CLI parameters.
fn cli() -> ArgMatches {
    let color = Arg::new("color")
        .help("LED color [0xRRGGBB or 0xRRGGBBAA]")
        .required(true)
        .value_parser(parse_color);

    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .subcommand(
            Command::new("pixels").about("Override all LEDs with a color").arg(color.clone()),
        )
        .subcommand(Command::new("set").about("Store a color and display it").arg(color))
        .subcommand(Command::new("rainbow").about("Switch to rainbow mode"))
        .subcommand(Command::new("normal").about("Switch to the stored color"))
        .subcommand(Command::new("clear").about("Turn all LEDs off"))
        .subcommand(Command::new("reset").about("Cancel overrides and show the stored color"))
        .arg(
            Arg::new("log-level")
                .help("Diagnostic log filter, e.g. `debug` or `camring=trace`")
                .long("log-level")
                .short('l')
                .default_value("info"),
        )
        .arg(
            Arg::new("simulate")
                .help("Send commands to a simulated ring")
                .long("simulate")
                .action(ArgAction::SetTrue)
                .conflicts_with("dry-run"),
        )
        .arg(
            Arg::new("dry-run")
                .help("Log commands instead of sending them")
                .long("dry-run")
                .action(ArgAction::SetTrue),
        )
        .get_matches()
}
