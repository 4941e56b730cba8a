//! Text control channel for inspecting and changing the clock.
//!
//! Writes take the form `<cmd> <number>`, e.g. `s 150`:
//!
//! | Command | Field                   | Notes                           |
//! |---------|-------------------------|---------------------------------|
//! | `s`     | speed                   | 100 = real time                 |
//! | `r`     | random mode             | nonzero enables                 |
//! | `b`     | random bound            | must be > 0                     |
//! | `t`     | virtual seconds         | Unix seconds                    |
//! | `u`     | virtual microseconds    | must be < 1_000_000             |
//!
//! Reads produce a [`Report`].

use std::fmt;
use std::num::NonZeroU32;

use chrono::Utc;
use serde::Serialize;

use crate::clock::rate::SCALE;
use crate::clock::SharedClock;
use crate::error::ClockError;
use crate::rtc::CalendarTime;

/// Longest control write accepted, in bytes.
pub const MAX_COMMAND_LEN: usize = 2048;

/// A validated control write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetSpeed(i64),
    SetRandomMode(bool),
    SetRandomBound(NonZeroU32),
    SetSeconds(i64),
    SetMicros(i64),
}

impl Command {
    /// Parses a raw control write.
    ///
    /// The second byte must be a space and the rest a non-negative base-10
    /// integer, optionally followed by one newline. The number is checked
    /// before the command letter.
    pub fn parse(input: &[u8]) -> Result<Self, ClockError> {
        if input.len() > MAX_COMMAND_LEN {
            return Err(ClockError::CommandTooLong);
        }
        let raw = || String::from_utf8_lossy(input).into_owned();
        let (cmd, arg) = match input {
            [cmd, b' ', arg @ ..] => (*cmd, arg),
            _ => return Err(ClockError::InvalidCommand(raw())),
        };

        let arg = arg.strip_suffix(b"\n").unwrap_or(arg);
        let number = std::str::from_utf8(arg)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .filter(|number| *number >= 0)
            .ok_or_else(|| ClockError::InvalidNumber(String::from_utf8_lossy(arg).into_owned()))?;

        match cmd {
            b's' => Ok(Command::SetSpeed(number)),
            b'r' => Ok(Command::SetRandomMode(number != 0)),
            b'b' => {
                let bound = u32::try_from(number)
                    .map_err(|_| ClockError::InvalidNumber(number.to_string()))?;
                NonZeroU32::new(bound)
                    .map(Command::SetRandomBound)
                    .ok_or(ClockError::ZeroRandomBound)
            }
            b't' if CalendarTime::is_representable(number) => Ok(Command::SetSeconds(number)),
            b't' => Err(ClockError::InvalidNumber(number.to_string())),
            b'u' if number < SCALE => Ok(Command::SetMicros(number)),
            b'u' => Err(ClockError::MicrosOutOfRange(number)),
            _ => Err(ClockError::InvalidCommand(raw())),
        }
    }
}

/// Point-in-time view of the engine for humans and tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Real seconds since engine start
    pub uptime: i64,
    /// Real Unix seconds minus virtual seconds
    pub difference: i64,
    pub speed: i64,
    pub random_mode: bool,
    pub random_bound: u32,
    pub virtual_seconds: i64,
    pub virtual_micros: i64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Engine uptime: {}s", self.uptime)?;
        writeln!(f, "Difference between sys clock: {}s", self.difference)?;
        writeln!(f, "Speed: {}", self.speed)?;
        writeln!(f, "Random: {}", self.random_mode as u8)?;
        writeln!(f, "Random bound: {}", self.random_bound)?;
        writeln!(f, "Secs: {}", self.virtual_seconds)?;
        writeln!(f, "Usecs: {}", self.virtual_micros)
    }
}

/// Control channel bound to one engine's clock state.
#[derive(Debug, Clone)]
pub struct ControlInterface {
    clock: SharedClock,
}

impl ControlInterface {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    /// Applies a control write. Returns the number of bytes consumed.
    /// On error the state is left untouched.
    pub fn write(&self, input: &[u8]) -> Result<usize, ClockError> {
        let command = Command::parse(input)?;
        self.apply(command)?;
        Ok(input.len())
    }

    pub fn apply(&self, command: Command) -> Result<(), ClockError> {
        self.clock.update(|state| match command {
            Command::SetSpeed(speed) => {
                state.set_speed(speed);
                Ok(())
            }
            Command::SetRandomMode(enabled) => {
                state.set_random_mode(enabled);
                Ok(())
            }
            Command::SetRandomBound(bound) => {
                state.set_random_bound(bound);
                Ok(())
            }
            Command::SetSeconds(seconds) => state.set_virtual_seconds(seconds),
            Command::SetMicros(micros) => state.set_virtual_micros(micros),
        })
    }

    pub fn report(&self) -> Report {
        self.report_at(Utc::now().timestamp())
    }

    /// Builds the report against a given real time in Unix seconds.
    pub fn report_at(&self, real_now: i64) -> Report {
        let snapshot = self.clock.snapshot();
        Report {
            uptime: real_now - snapshot.engine_start_real_seconds,
            difference: real_now - snapshot.virtual_seconds,
            speed: snapshot.speed,
            random_mode: snapshot.random_mode,
            random_bound: snapshot.random_bound,
            virtual_seconds: snapshot.virtual_seconds,
            virtual_micros: snapshot.virtual_micros,
        }
    }

    /// Handles one line of the server protocol: `?` for the text report,
    /// `?json` for the JSON report, anything else as a write. Write replies
    /// are the byte count or `ERR <code> <message>`.
    pub fn execute_line(&self, line: &str) -> String {
        match line.trim_end() {
            "?" => self.report().to_string(),
            "?json" => serde_json::to_string(&self.report())
                .unwrap_or_else(|err| format!("ERR {} {err}", -crate::error::EINVAL)),
            _ => match self.write(line.as_bytes()) {
                Ok(consumed) => consumed.to_string(),
                Err(err) => format!("ERR {} {err}", err.code()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_command() {
        assert_eq!(Command::parse(b"s 150"), Ok(Command::SetSpeed(150)));
        assert_eq!(Command::parse(b"r 7\n"), Ok(Command::SetRandomMode(true)));
        assert_eq!(Command::parse(b"r 0"), Ok(Command::SetRandomMode(false)));
        assert_eq!(
            Command::parse(b"b 42"),
            Ok(Command::SetRandomBound(NonZeroU32::new(42).unwrap()))
        );
        assert_eq!(Command::parse(b"t +0"), Ok(Command::SetSeconds(0)));
        assert_eq!(Command::parse(b"u 999999"), Ok(Command::SetMicros(999_999)));
    }

    #[test]
    fn rejects_malformed_prefix() {
        let inputs: [&[u8]; 5] = [b"", b"s", b"s-5", b"s5", b"ss 5"];
        for input in inputs {
            assert!(
                matches!(Command::parse(input), Err(ClockError::InvalidCommand(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn rejects_bad_numbers() {
        let inputs: [&[u8]; 6] = [
            b"s -5",
            b"s abc",
            b"s ",
            b"s 1 2",
            b"s 5\n\n",
            b"s 99999999999999999999",
        ];
        for input in inputs {
            assert!(
                matches!(Command::parse(input), Err(ClockError::InvalidNumber(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn number_is_checked_before_command() {
        assert!(matches!(Command::parse(b"x 5"), Err(ClockError::InvalidCommand(_))));
        assert!(matches!(Command::parse(b"x abc"), Err(ClockError::InvalidNumber(_))));
    }

    #[test]
    fn field_specific_limits() {
        assert_eq!(Command::parse(b"b 0"), Err(ClockError::ZeroRandomBound));
        assert!(matches!(Command::parse(b"b 4294967296"), Err(ClockError::InvalidNumber(_))));
        assert_eq!(Command::parse(b"u 5000000"), Err(ClockError::MicrosOutOfRange(5_000_000)));
        assert!(matches!(
            Command::parse(b"t 9223372036854775807"),
            Err(ClockError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_overlong_input() {
        let mut input = b"s ".to_vec();
        input.resize(MAX_COMMAND_LEN + 1, b'1');
        assert_eq!(
            Command::parse(&input),
            Err(ClockError::CommandTooLong)
        );
    }

    #[test]
    fn report_renders_all_fields() {
        let report = Report {
            uptime: 12,
            difference: -30,
            speed: 250,
            random_mode: true,
            random_bound: 300,
            virtual_seconds: 1_000,
            virtual_micros: 500_000,
        };
        assert_eq!(
            report.to_string(),
            "Engine uptime: 12s\n\
             Difference between sys clock: -30s\n\
             Speed: 250\n\
             Random: 1\n\
             Random bound: 300\n\
             Secs: 1000\n\
             Usecs: 500000\n"
        );
    }
}
