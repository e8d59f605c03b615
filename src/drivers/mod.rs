//! Drivers to carry out batch rotations of real spherical harmonics.

use anyhow;

pub mod sh_rotation;

// =================
// Trait definitions
// =================

/// Trait defining behaviours of `shrot` drivers.
pub trait ShRotDriver {
    /// The type of the parameter structure controlling the driver.
    type Params;

    /// The type of the successful outcome when executing the driver.
    type Outcome;

    /// Executes the driver and stores the result internally.
    fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Returns the result of the driver execution.
    fn result(&self) -> Result<&Self::Outcome, anyhow::Error>;
}
