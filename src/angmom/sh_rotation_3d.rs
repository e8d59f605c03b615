//! Rotation matrices in the basis of real spherical harmonics.
//!
//! For a rotation parametrised by the Euler angles $`(\alpha, \beta, \gamma)`$, the matrices
//! $`\mathbf{R}^l`$ produced here are the representation matrices of
//! $`R_z(\alpha) R_y(\beta) R_z(\gamma)`$ in the basis of the real spherical harmonics $`Y_{lm}`$
//! ordered by increasing $`m`$. In particular, $`\mathbf{R}^1`$ is the Cartesian rotation matrix
//! in the basis of coordinate *functions* $`(y, z, x)`$ (see [`coordinate_rmat`]), and
//!
//! ```math
//! \mathbf{R}^l(g_1)\, \mathbf{R}^l(g_2) = \mathbf{R}^l(g_1 g_2).
//! ```
//!
//! The matrices are obtained from the Wigner small-d matrices of [`crate::angmom::wigner_d`] and
//! inherit their numerical limitations: they are reliable up to about $`l = 4`$ and degrade when
//! $`l \cos\beta`$ is close to an integer. Use [`sh_rotation_matrices_checked`] to have the latter
//! reported.

use std::error::Error;
use std::fmt;

use itertools::Itertools;
use nalgebra::{Rotation3, Vector3};
use ndarray::{Array2, Axis};

use crate::angmom::wigner_d::{WignerSmallD, WignerSmallDRecursion};

#[cfg(test)]
#[path = "sh_rotation_3d_tests.rs"]
mod sh_rotation_3d_tests;

// ================
// Enum definitions
// ================

/// Enumerated type for errors arising from the construction of real spherical harmonic rotation
/// matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum ShRotationError {
    /// The caller supplied arguments that violate a precondition, such as under-sized output
    /// matrices.
    InvalidArgument(String),

    /// The computation met a vanishing denominator or produced non-finite values.
    ComputationalInstability(String),
}

impl fmt::Display for ShRotationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::ComputationalInstability(msg) => write!(f, "Computational instability: {msg}"),
        }
    }
}

impl Error for ShRotationError {}

// =========
// Functions
// =========

/// Returns $`+1`$ if $`m \ge 0`$ and $`-1`$ otherwise.
fn sign(m: i64) -> f64 {
    if m >= 0 {
        1.0
    } else {
        -1.0
    }
}

/// Returns the azimuthal phase function
///
/// ```math
/// \Phi_m(\phi) = \begin{cases}
///     \sqrt{2} \cos(m\phi) & m > 0, \\
///     1 & m = 0, \\
///     \sqrt{2} \sin(|m|\phi) & m < 0.
/// \end{cases}
/// ```
fn phi(m: i64, angle: f64) -> f64 {
    let mf = m as f64;
    match m.cmp(&0) {
        std::cmp::Ordering::Greater => 2.0f64.sqrt() * (mf * angle).cos(),
        std::cmp::Ordering::Less => 2.0f64.sqrt() * (-mf * angle).sin(),
        std::cmp::Ordering::Equal => 1.0,
    }
}

/// Writes the real spherical harmonic rotation matrix $`\mathbf{R}^l`$ obtained from a complete
/// Wigner small-d matrix into `rl`.
///
/// For every $`(m, m')`$,
///
/// ```math
/// R^l_{mm'} = \operatorname{sgn}(m')\, \Phi_m(\alpha)\, \Phi_{m'}(\gamma)
///     \frac{d^l_{|m'||m|} + w_m\, d^l_{|m|,-|m'|}}{2}
///     - \operatorname{sgn}(m)\, \Phi_{-m}(\alpha)\, \Phi_{-m'}(\gamma)
///     \frac{d^l_{|m'||m|} - w_m\, d^l_{|m|,-|m'|}}{2},
/// ```
///
/// where $`w_0 = 1`$ and $`w_m = (-1)^m`$ otherwise.
///
/// # Arguments
///
/// * `dmat` - The complete Wigner small-d matrix $`\mathbf{d}^l(\beta)`$.
/// * `alpha` - The first Euler angle $`\alpha`$ in radians.
/// * `gamma` - The third Euler angle $`\gamma`$ in radians.
/// * `rl` - The output matrix of shape $`(2l+1) \times (2l+1)`$, rows and columns ordered by
/// increasing $`m`$.
///
/// # Panics
///
/// Panics if `rl` does not have the shape of `dmat`.
pub fn write_rlmat(dmat: &WignerSmallD, alpha: f64, gamma: f64, rl: &mut Array2<f64>) {
    let dim = dmat.dim();
    assert_eq!(rl.shape(), &[dim, dim], "`rl` must be a {dim} × {dim} matrix.");
    let li64 = i64::from(dmat.l());
    for ((mi, m), (mdashi, mdash)) in (-li64..=li64)
        .enumerate()
        .cartesian_product((-li64..=li64).enumerate())
    {
        let c1 = dmat[(mdash.abs(), m.abs())];
        let c2 = dmat[(m.abs(), -mdash.abs())];
        let w = if m % 2 == 0 { 1.0 } else { -1.0 };
        rl[(mi, mdashi)] =
            sign(mdash) * phi(m, alpha) * phi(mdash, gamma) * ((c1 + w * c2) * 0.5)
                - sign(m) * phi(-m, alpha) * phi(-mdash, gamma) * ((c1 - w * c2) * 0.5);
    }
}

/// Returns the real spherical harmonic rotation matrix $`\mathbf{R}^l`$ obtained from a complete
/// Wigner small-d matrix. See [`write_rlmat`] for details.
#[must_use]
pub fn rlmat_from_dmat(dmat: &WignerSmallD, alpha: f64, gamma: f64) -> Array2<f64> {
    let dim = dmat.dim();
    let mut rl = Array2::<f64>::zeros((dim, dim));
    write_rlmat(dmat, alpha, gamma, &mut rl);
    rl
}

/// Runs the Wigner small-d recursion up to `lmax` and writes $`\mathbf{R}^l`$ into `out[l]`.
///
/// # Returns
///
/// The smallest second-row boundary denominator met, if any.
fn fill_rlmats(out: &mut [Array2<f64>], lmax: u32, euler_angles: (f64, f64, f64)) -> Option<f64> {
    let (alpha, beta, gamma) = euler_angles;
    let mut recursion = WignerSmallDRecursion::new(lmax, beta);
    while let Some(dmat) = recursion.next_degree() {
        let l = dmat.l() as usize;
        write_rlmat(dmat, alpha, gamma, &mut out[l]);
    }
    let smallest_denominator = recursion.smallest_boundary_denominator();
    log::debug!(
        "Real spherical harmonic rotation matrices for l = 0..={lmax} constructed for (α, β, γ) = ({alpha:+.7}, {beta:+.7}, {gamma:+.7})."
    );
    smallest_denominator
}

fn zero_rlmats(lmax: u32) -> Vec<Array2<f64>> {
    (0..=lmax)
        .map(|l| {
            let dim = 2 * l as usize + 1;
            Array2::<f64>::zeros((dim, dim))
        })
        .collect()
}

/// Constructs the real spherical harmonic rotation matrices for all degrees up to `lmax`, together
/// with the smallest second-row boundary denominator met during the recursion.
pub(crate) fn sh_rotation_matrices_with_denominator(
    lmax: u32,
    euler_angles: (f64, f64, f64),
) -> (Vec<Array2<f64>>, Option<f64>) {
    let mut rlmats = zero_rlmats(lmax);
    let smallest_denominator = fill_rlmats(&mut rlmats, lmax, euler_angles);
    (rlmats, smallest_denominator)
}

/// Writes the real spherical harmonic rotation matrices $`\mathbf{R}^0, \ldots, \mathbf{R}^L`$ for
/// the rotation $`R_z(\alpha) R_y(\beta) R_z(\gamma)`$ into caller-owned matrices.
///
/// The written values are always the raw results, even when the recursion meets a vanishing
/// denominator. For $`L = 0`$ only `out[0]` is set to $`(1)`$.
///
/// # Arguments
///
/// * `out` - The output matrices. `out[l]` must have shape $`(2l+1) \times (2l+1)`$ for every
/// $`0 \le l \le L`$. Any further entries are left untouched.
/// * `lmax` - The highest degree $`L`$.
/// * `alpha` - The Euler angle $`\alpha`$ in radians.
/// * `beta` - The Euler angle $`\beta`$ in radians.
/// * `gamma` - The Euler angle $`\gamma`$ in radians.
///
/// # Errors
///
/// Errors with [`ShRotationError::InvalidArgument`] if `out` has fewer than $`L + 1`$ matrices or
/// if any of the first $`L + 1`$ matrices has the wrong shape. Nothing is written in that case.
pub fn rotate_sh_basis(
    out: &mut [Array2<f64>],
    lmax: u32,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Result<(), ShRotationError> {
    let n_required = lmax as usize + 1;
    if out.len() < n_required {
        return Err(ShRotationError::InvalidArgument(format!(
            "{} output matrices supplied, but {n_required} are required for l = 0..={lmax}.",
            out.len()
        )));
    }
    if let Some((l, rl)) = out
        .iter()
        .take(n_required)
        .enumerate()
        .find(|(l, rl)| rl.shape() != [2 * l + 1, 2 * l + 1])
    {
        return Err(ShRotationError::InvalidArgument(format!(
            "The output matrix for l = {l} has shape {:?}, but ({}, {}) is required.",
            rl.shape(),
            2 * l + 1,
            2 * l + 1
        )));
    }
    fill_rlmats(out, lmax, (alpha, beta, gamma));
    Ok(())
}

/// Returns the real spherical harmonic rotation matrices $`\mathbf{R}^0, \ldots, \mathbf{R}^L`$
/// for the rotation $`R_z(\alpha) R_y(\beta) R_z(\gamma)`$.
///
/// # Arguments
///
/// * `lmax` - The highest degree $`L`$.
/// * `euler_angles` - The Euler angles $`(\alpha, \beta, \gamma)`$ in radians.
///
/// # Returns
///
/// A vector whose $`l`$-th element is the $`(2l+1) \times (2l+1)`$ matrix $`\mathbf{R}^l`$. The
/// values are the raw results of the recursion.
#[must_use]
pub fn sh_rotation_matrices(lmax: u32, euler_angles: (f64, f64, f64)) -> Vec<Array2<f64>> {
    sh_rotation_matrices_with_denominator(lmax, euler_angles).0
}

/// Same as [`sh_rotation_matrices`], but reports numerically unreliable results.
///
/// # Arguments
///
/// * `lmax` - The highest degree $`L`$.
/// * `euler_angles` - The Euler angles $`(\alpha, \beta, \gamma)`$ in radians.
/// * `denominator_threshold` - Second-row boundary denominators $`|l\cos\beta - m' - 1|`$ below
/// this are considered vanishing.
///
/// # Errors
///
/// Errors with [`ShRotationError::ComputationalInstability`] if a vanishing denominator was met or
/// if any matrix element is not finite.
pub fn sh_rotation_matrices_checked(
    lmax: u32,
    euler_angles: (f64, f64, f64),
    denominator_threshold: f64,
) -> Result<Vec<Array2<f64>>, ShRotationError> {
    let (rlmats, smallest_denominator) =
        sh_rotation_matrices_with_denominator(lmax, euler_angles);
    check_rlmats(&rlmats, smallest_denominator, denominator_threshold)?;
    Ok(rlmats)
}

/// Checks a set of rotation matrices for non-finite elements and the recursion that produced
/// them for a vanishing boundary denominator.
pub(crate) fn check_rlmats(
    rlmats: &[Array2<f64>],
    smallest_denominator: Option<f64>,
    denominator_threshold: f64,
) -> Result<(), ShRotationError> {
    if let Some(den) = smallest_denominator.filter(|den| *den < denominator_threshold) {
        return Err(ShRotationError::ComputationalInstability(format!(
            "a boundary denominator of magnitude {den:.3e} lies below the threshold {denominator_threshold:.3e}."
        )));
    }
    if let Some(l) = rlmats
        .iter()
        .position(|rl| rl.iter().any(|x| !x.is_finite()))
    {
        return Err(ShRotationError::ComputationalInstability(format!(
            "non-finite elements found in the rotation matrix for l = {l}."
        )));
    }
    Ok(())
}

/// Returns $`\max_{ij} |(\mathbf{R}\mathbf{R}^{\mathsf{T}} - \mathbf{I})_{ij}|`$, the deviation of a
/// square matrix from orthogonality.
#[must_use]
pub fn orthogonality_deviation(rl: &Array2<f64>) -> f64 {
    let dim = rl.nrows();
    (rl.dot(&rl.t()) - Array2::<f64>::eye(dim))
        .iter()
        .fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// Returns the representation matrix of $`R_z(\alpha) R_y(\beta) R_z(\gamma)`$ in the basis of the
/// coordinate *functions* $`(y, z, x)`$, which are isosymmetric to the real spherical harmonics
/// $`(Y_{1,-1}, Y_{1,0}, Y_{1,1})`$.
///
/// This coincides with $`\mathbf{R}^1`$ from [`sh_rotation_matrices`].
///
/// # Arguments
///
/// * `euler_angles` - The Euler angles $`(\alpha, \beta, \gamma)`$ in radians.
///
/// # Returns
///
/// The $`3 \times 3`$ representation matrix.
#[must_use]
pub fn coordinate_rmat(euler_angles: (f64, f64, f64)) -> Array2<f64> {
    let (alpha, beta, gamma) = euler_angles;
    let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), alpha)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), beta)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), gamma);
    let xyz = Array2::from_shape_fn((3, 3), |(i, j)| rot.matrix()[(i, j)]);
    xyz.select(Axis(0), &[1, 2, 0]).select(Axis(1), &[1, 2, 0])
}

/// Recovers Euler angles $`(\alpha, \beta, \gamma)`$ with $`0 \le \beta \le \pi`$ from a rotation
/// matrix in the basis of coordinate functions $`(y, z, x)`$.
///
/// When $`\sin\beta`$ vanishes only $`\alpha \pm \gamma`$ is determined and $`\gamma`$ is set to
/// zero.
///
/// # Errors
///
/// Errors with [`ShRotationError::InvalidArgument`] if `rmat` is not $`3 \times 3`$.
pub fn euler_angles_from_coordinate_rmat(
    rmat: &Array2<f64>,
) -> Result<(f64, f64, f64), ShRotationError> {
    if rmat.shape() != [3, 3] {
        return Err(ShRotationError::InvalidArgument(format!(
            "a 3 × 3 matrix is required, but one of shape {:?} was supplied.",
            rmat.shape()
        )));
    }
    // Indices 0, 1, 2 are y, z, x.
    let cos_beta = rmat[(1, 1)].clamp(-1.0, 1.0);
    let beta = cos_beta.acos();
    if beta.sin() > 1e-12 {
        let alpha = rmat[(0, 1)].atan2(rmat[(2, 1)]);
        let gamma = rmat[(1, 0)].atan2(-rmat[(1, 2)]);
        Ok((alpha, beta, gamma))
    } else if cos_beta > 0.0 {
        Ok((rmat[(0, 2)].atan2(rmat[(0, 0)]), beta, 0.0))
    } else {
        Ok(((-rmat[(0, 2)]).atan2(rmat[(0, 0)]), beta, 0.0))
    }
}
