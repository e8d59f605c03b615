//! Nicely formatted output for spherical-harmonic rotation runs.

use std::fmt;

use log;

const SHROT_BANNER_LENGTH: usize = 80;

/// Logs a warning to the `shrot-output` logger.
macro_rules! shrot_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::warn!($fmt, $($($arg)*)?);
        log::warn!(target: "shrot-output", $fmt, $($($arg)*)?);
    }
}

/// Logs a main output line to the `shrot-output` logger.
macro_rules! shrot_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "shrot-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {shrot_output, shrot_warn};

/// Writes a nicely formatted section title.
pub(crate) fn write_title(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let length = title.chars().count().max(SHROT_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    writeln!(f, "┌──{bar}──┐")?;
    writeln!(f, "│§ {title:^length$} §│")?;
    writeln!(f, "└──{bar}──┘")?;
    Ok(())
}

/// Logs a nicely formatted section title to the `shrot-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(SHROT_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    shrot_output!("┌──{bar}──┐");
    shrot_output!("│§ {title:^length$} §│");
    shrot_output!("└──{bar}──┘");
}

/// Writes a nicely formatted subtitle.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    let bar = "═".repeat(subtitle.chars().count());
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{bar}")?;
    Ok(())
}

/// Logs a nicely formatted subtitle to the `shrot-output` logger.
pub(crate) fn log_subtitle(subtitle: &str) {
    let bar = "═".repeat(subtitle.chars().count());
    shrot_output!("{}", subtitle);
    shrot_output!("{}", bar);
}

/// Turns a boolean into a string of `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// A trait for logging outputs nicely, line by line.
pub(crate) trait ShRotOutput: fmt::Debug + fmt::Display {
    /// Logs display output nicely.
    fn log_output_display(&self) {
        let lines = self.to_string();
        lines.lines().for_each(|line| {
            shrot_output!("{line}");
        })
    }
}

// Blanket implementation
impl<T> ShRotOutput for T where T: fmt::Debug + fmt::Display {}
