//! Named severity levels.
//!
//! Severities are plain numbers in the range `0..=255`; a numerically larger
//! value is *less* severe. The named levels below are the conventional
//! anchors used by configuration files and the CLI.

use std::fmt;

/// A named severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    /// Disables the threshold entirely.
    Off = 0,
    Fatal = 32,
    Error = 64,
    Warn = 96,
    Info = 128,
    Debug = 160,
    Trace = 192,
}

impl Severity {
    /// Every named level, most severe first.
    pub const ALL: [Severity; 7] = [
        Severity::Off,
        Severity::Fatal,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::Debug,
        Severity::Trace,
    ];

    /// Numeric value of this level.
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Lower-case name of this level.
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Trace => "trace",
        }
    }

    /// Parse a level name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(name))
    }

    /// The named level with exactly this numeric value, if any.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.value() == value)
    }
}

impl From<Severity> for u8 {
    fn from(level: Severity) -> Self {
        level.value()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
