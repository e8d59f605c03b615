//! # shrot: Rotations of Real Spherical Harmonics
//!
//! `shrot` constructs the matrices $`\mathbf{R}^l`$ that rotate real spherical harmonics
//! $`Y_{lm}`$ of degrees $`0 \le l \le L`$ under a rotation given by the Euler angles
//! $`(\alpha, \beta, \gamma)`$ in the $`zyz`$ convention. The construction proceeds in two
//! stages:
//! - the Wigner small-d matrices $`\mathbf{d}^l(\beta)`$ are built degree by degree from those of
//!   degrees $`l - 1`$ and $`l - 2`$ (see [`angmom::wigner_d`]), and
//! - each $`\mathbf{d}^l(\beta)`$ is combined with the azimuthal phases of $`\alpha`$ and
//!   $`\gamma`$ into $`\mathbf{R}^l`$ (see [`angmom::sh_rotation_3d`]).
//!
//! Rotations for many sets of Euler angles can be carried out in parallel by the driver in
//! [`drivers::sh_rotation`], whose control parameters can be read from YAML files via [`io`].
//!
//! ## Numerical limitations
//!
//! The boundary fill of the recursion divides by $`l\cos\beta - m' - 1`$. The resulting matrices
//! are therefore reliable up to about $`l = 4`$ and lose accuracy whenever $`l\cos\beta`$ is close
//! to an integer, most notably at $`\beta = \pi/2`$ for $`l \ge 2`$. The raw values are always
//! returned; [`angmom::sh_rotation_3d::sh_rotation_matrices_checked`] and
//! [`drivers::sh_rotation::InstabilityPolicy::Reject`] report such cases instead.
//!
//! ## Examples and usage
//!
//! For most items (structs, enums, functions, and traits), their usages are illustrated in test
//! functions.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod angmom;
pub mod drivers;
pub mod io;
