//! Driver for batch construction of real spherical harmonic rotation matrices.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::angmom::angmom_label;
use crate::angmom::sh_rotation_3d::{
    check_rlmats, orthogonality_deviation, sh_rotation_matrices_with_denominator, ShRotationError,
};
use crate::drivers::ShRotDriver;
use crate::io::format::{
    log_subtitle, log_title, nice_bool, shrot_output, shrot_warn, write_subtitle, write_title,
    ShRotOutput,
};

#[cfg(test)]
#[path = "sh_rotation_tests.rs"]
mod sh_rotation_tests;

// ================
// Enum definitions
// ================

/// Enumerated type for the treatment of numerically unreliable rotation matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstabilityPolicy {
    /// Variant keeping the raw matrices and only warning about them.
    #[default]
    Raw,

    /// Variant failing the whole run on the first unreliable set of matrices.
    Reject,
}

impl fmt::Display for InstabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstabilityPolicy::Raw => write!(f, "keep raw values"),
            InstabilityPolicy::Reject => write!(f, "reject"),
        }
    }
}

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

fn default_lmax() -> u32 {
    2
}
fn default_denominator_threshold() -> f64 {
    1e-8
}
fn default_orthogonality_threshold() -> f64 {
    1e-9
}

/// Structure containing control parameters for batch rotations of real spherical harmonics.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct ShRotationParams {
    /// The highest degree $`L`$ for which rotation matrices are constructed.
    #[builder(default = "2")]
    #[serde(default = "default_lmax")]
    pub lmax: u32,

    /// The treatment of rotation matrices met with a vanishing recursion denominator or containing
    /// non-finite elements.
    #[builder(default = "InstabilityPolicy::Raw")]
    #[serde(default)]
    pub instability_policy: InstabilityPolicy,

    /// Boundary denominators of magnitude below this are considered vanishing.
    #[builder(default = "1e-8")]
    #[serde(default = "default_denominator_threshold")]
    pub denominator_threshold: f64,

    /// Rotation matrices with $`\max |\mathbf{R}\mathbf{R}^{\mathsf{T}} - \mathbf{I}|`$ above this
    /// are reported as non-orthogonal.
    #[builder(default = "1e-9")]
    #[serde(default = "default_orthogonality_threshold")]
    pub orthogonality_threshold: f64,

    /// Boolean indicating if the rotation matrices are printed out with the result.
    #[builder(default = "false")]
    #[serde(default)]
    pub write_matrices: bool,
}

impl ShRotationParams {
    /// Returns a builder to construct a [`ShRotationParams`] structure.
    pub fn builder() -> ShRotationParamsBuilder {
        ShRotationParamsBuilder::default()
    }
}

impl Default for ShRotationParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("Unable to construct a default `ShRotationParams`.")
    }
}

impl fmt::Display for ShRotationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Maximum degree: {}", self.lmax)?;
        writeln!(f, "Treatment of unstable results: {}", self.instability_policy)?;
        writeln!(
            f,
            "Boundary denominator threshold: {:.3e}",
            self.denominator_threshold
        )?;
        writeln!(
            f,
            "Orthogonality threshold: {:.3e}",
            self.orthogonality_threshold
        )?;
        writeln!(f, "Write rotation matrices: {}", nice_bool(self.write_matrices))?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// Structure containing the rotation matrices for a single set of Euler angles.
#[derive(Clone, Debug)]
pub struct ShRotationEntry {
    /// The Euler angles $`(\alpha, \beta, \gamma)`$ in radians.
    pub euler_angles: (f64, f64, f64),

    /// The raw rotation matrices $`\mathbf{R}^0, \ldots, \mathbf{R}^L`$.
    pub rlmats: Vec<Array2<f64>>,

    /// The deviations from orthogonality of the matrices in [`Self::rlmats`].
    pub orthogonality_deviations: Vec<f64>,

    /// The smallest second-row boundary denominator met, if any.
    pub smallest_denominator: Option<f64>,

    /// The instability detected for this set of Euler angles, if any.
    pub instability: Option<ShRotationError>,
}

impl ShRotationEntry {
    /// Returns `true` if every matrix deviates from orthogonality by at most `threshold`.
    pub fn is_orthogonal(&self, threshold: f64) -> bool {
        self.orthogonality_deviations
            .iter()
            .all(|dev| *dev <= threshold)
    }
}

/// Structure to contain batch rotation results.
#[derive(Clone, Builder, Debug)]
pub struct ShRotationResult<'a> {
    /// The control parameters used to obtain this set of results.
    parameters: &'a ShRotationParams,

    /// The rotation matrices, in the order of the supplied Euler angles.
    pub entries: Vec<ShRotationEntry>,
}

impl<'a> ShRotationResult<'a> {
    fn builder() -> ShRotationResultBuilder<'a> {
        ShRotationResultBuilder::default()
    }

    /// Returns the control parameters used to obtain this set of results.
    pub fn parameters(&self) -> &ShRotationParams {
        self.parameters
    }

    /// Returns the number of entries with a detected instability.
    pub fn n_unstable(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.instability.is_some())
            .count()
    }
}

impl<'a> fmt::Display for ShRotationResult<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_title(f, "Rotation Summary")?;
        writeln!(f)?;
        let threshold = self.parameters.orthogonality_threshold;
        self.entries.iter().enumerate().try_for_each(|(i, entry)| {
            let (alpha, beta, gamma) = entry.euler_angles;
            write_subtitle(
                f,
                &format!("Rotation {i}: (α, β, γ) = ({alpha:+.7}, {beta:+.7}, {gamma:+.7})"),
            )?;
            writeln!(
                f,
                "Smallest boundary denominator: {}",
                entry
                    .smallest_denominator
                    .map(|den| format!("{den:.3e}"))
                    .unwrap_or_else(|| "--".to_string())
            )?;
            writeln!(
                f,
                "Unstable: {}",
                entry
                    .instability
                    .as_ref()
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| nice_bool(false))
            )?;
            writeln!(f, "{}", "┈".repeat(40))?;
            writeln!(
                f,
                "{:>3} {:>5} {:>5} {:>12} {:>11}",
                "l", "Label", "Dim", "|RRᵀ - I|", "Orthogonal"
            )?;
            writeln!(f, "{}", "┈".repeat(40))?;
            entry
                .orthogonality_deviations
                .iter()
                .enumerate()
                .try_for_each(|(l, dev)| {
                    let label = u32::try_from(l)
                        .map(angmom_label)
                        .unwrap_or_else(|_| "?".to_string());
                    writeln!(
                        f,
                        "{l:>3} {label:>5} {:>5} {dev:>12.3e} {:>11}",
                        2 * l + 1,
                        nice_bool(*dev <= threshold)
                    )
                })?;
            writeln!(f, "{}", "┈".repeat(40))?;
            if self.parameters.write_matrices {
                entry.rlmats.iter().enumerate().try_for_each(|(l, rl)| {
                    writeln!(f, "R^{l}:")?;
                    writeln!(f, "{rl:+.7}")
                })?;
            }
            writeln!(f)?;
            Ok::<(), fmt::Error>(())
        })?;
        Ok(())
    }
}

// ------
// Driver
// ------

/// Driver for the construction of real spherical harmonic rotation matrices for many sets of
/// Euler angles.
///
/// The sets of Euler angles are independent and are handled in parallel. Within one set, the
/// degrees are built in sequence by the Wigner small-d recursion.
#[derive(Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ShRotationDriver<'a> {
    /// The control parameters for the batch rotation.
    parameters: &'a ShRotationParams,

    /// The Euler angles $`(\alpha, \beta, \gamma)`$ in radians.
    euler_angles: &'a [(f64, f64, f64)],

    /// The result of the batch rotation.
    #[builder(setter(skip), default = "None")]
    result: Option<ShRotationResult<'a>>,
}

impl<'a> ShRotationDriverBuilder<'a> {
    fn validate(&self) -> Result<(), String> {
        let params = self
            .parameters
            .ok_or("No spherical harmonic rotation parameters found.".to_string())?;
        let euler_angles = self
            .euler_angles
            .ok_or("No Euler angles found.".to_string())?;
        if euler_angles.is_empty() {
            Err("At least one set of Euler angles must be supplied.".to_string())
        } else if !(params.denominator_threshold >= 0.0) {
            Err(format!(
                "The boundary denominator threshold must be non-negative, but {} was given.",
                params.denominator_threshold
            ))
        } else if !(params.orthogonality_threshold >= 0.0) {
            Err(format!(
                "The orthogonality threshold must be non-negative, but {} was given.",
                params.orthogonality_threshold
            ))
        } else {
            Ok(())
        }
    }
}

impl<'a> ShRotationDriver<'a> {
    /// Returns a builder to construct a [`ShRotationDriver`] structure.
    pub fn builder() -> ShRotationDriverBuilder<'a> {
        ShRotationDriverBuilder::default()
    }

    /// Constructs the rotation matrices for every set of Euler angles.
    fn rotate(&mut self) -> Result<(), anyhow::Error> {
        log_title("Real Spherical Harmonic Rotation");
        shrot_output!("");
        shrot_output!(
            "Ref.: Blanco, M. A., Flórez, M. & Bermejo, M. *Journal of Molecular Structure: THEOCHEM* **419**, 19–27 (1997)."
        );
        shrot_output!("");
        let params = self.parameters;
        params.log_output_display();

        log_subtitle("Rotation matrix construction");
        shrot_output!("");
        shrot_output!(
            "Constructing R^0, ..., R^{} for {} set{} of Euler angles.",
            params.lmax,
            self.euler_angles.len(),
            if self.euler_angles.len() == 1 { "" } else { "s" }
        );
        shrot_output!("");

        let entries = self
            .euler_angles
            .par_iter()
            .map(|&euler_angles| {
                let (rlmats, smallest_denominator) =
                    sh_rotation_matrices_with_denominator(params.lmax, euler_angles);
                let orthogonality_deviations =
                    rlmats.iter().map(orthogonality_deviation).collect::<Vec<_>>();
                let instability =
                    check_rlmats(&rlmats, smallest_denominator, params.denominator_threshold)
                        .err();
                ShRotationEntry {
                    euler_angles,
                    rlmats,
                    orthogonality_deviations,
                    smallest_denominator,
                    instability,
                }
            })
            .collect::<Vec<_>>();

        for (i, entry) in entries.iter().enumerate() {
            let (alpha, beta, gamma) = entry.euler_angles;
            if let Some(err) = entry.instability.as_ref() {
                if params.instability_policy == InstabilityPolicy::Reject {
                    return Err(anyhow::Error::new(err.clone()).context(format!(
                        "Rotation {i} with (α, β, γ) = ({alpha:+.7}, {beta:+.7}, {gamma:+.7}) rejected."
                    )));
                }
                shrot_warn!(
                    "Rotation {i} with (α, β, γ) = ({alpha:+.7}, {beta:+.7}, {gamma:+.7}): {err}"
                );
            }
            entry
                .orthogonality_deviations
                .iter()
                .enumerate()
                .filter(|(_, dev)| !(**dev <= params.orthogonality_threshold))
                .for_each(|(l, dev)| {
                    shrot_warn!(
                        "Rotation {i}: R^{l} deviates from orthogonality by {dev:.3e}, above the threshold of {:.3e}.",
                        params.orthogonality_threshold
                    );
                });
        }

        self.result = Some(
            ShRotationResult::builder()
                .parameters(params)
                .entries(entries)
                .build()
                .map_err(|err| format_err!(err))?,
        );
        self.result()?.log_output_display();
        Ok(())
    }
}

impl<'a> ShRotDriver for ShRotationDriver<'a> {
    type Params = ShRotationParams;

    type Outcome = ShRotationResult<'a>;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No spherical harmonic rotation results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.rotate()
    }
}
