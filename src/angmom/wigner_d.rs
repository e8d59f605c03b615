//! Wigner small-d matrices for integral $`l`$ built degree by degree.
//!
//! The matrices are constructed following Blanco, M. A., Flórez, M. & Bermejo, M. Evaluation of
//! the rotation matrices in the basis of real spherical harmonics. *Journal of Molecular
//! Structure: THEOCHEM* **419**, 19–27 (1997),
//! [DOI](https://doi.org/10.1016/S0166-1280(97)00185-1). The interior of $`\mathbf{d}^{l}`$ is
//! obtained from $`\mathbf{d}^{l-1}`$ and $`\mathbf{d}^{l-2}`$ by a three-term recurrence and the two
//! top rows by closed-form boundary rules. The rest follows by reflection.
//!
//! The scheme is not numerically stable for large $`l`$. Results are reliable up to about
//! $`l = 4`$. The second-row boundary rule divides by $`l \cos\beta - (m' + 1)`$, which vanishes
//! whenever $`l \cos\beta`$ is an integer in range (*e.g.* $`\beta = \pi/2`$ for every
//! $`l \ge 2`$); the smallest such denominator is tracked by [`WignerSmallDRecursion`] so that
//! callers can detect it.

use std::fmt;
use std::ops::{Index, IndexMut};

use itertools::Itertools;
use ndarray::Array2;
use num_traits::ToPrimitive;

#[cfg(test)]
#[path = "wigner_d_tests.rs"]
mod wigner_d_tests;

fn to_f64(x: i64) -> f64 {
    x.to_f64()
        .unwrap_or_else(|| panic!("Unable to convert `{x}` to `f64`."))
}

/// Maps the subscript $`(m, m')`$ of a degree-$`l`$ matrix onto a linear offset into a flat
/// row-major $`(2l+1) \times (2l+1)`$ buffer.
///
/// The mapping is
///
/// ```math
/// f(m, m') = (m + l)(2l + 1) + (m' + l).
/// ```
///
/// # Arguments
///
/// * `l` - The degree $`l`$.
/// * `m` - The row index $`m`$ satisfying $`-l \le m \le l`$.
/// * `mdash` - The column index $`m'`$ satisfying $`-l \le m' \le l`$.
///
/// # Returns
///
/// The offset $`f(m, m')`$ in $`[0, (2l+1)^2)`$.
///
/// # Panics
///
/// Panics when either index lies outside $`[-l, l]`$. This is a programming error.
#[must_use]
pub fn map_index(l: u32, m: i64, mdash: i64) -> usize {
    let li64 = i64::from(l);
    assert!(
        m.abs() <= li64 && mdash.abs() <= li64,
        "Index pair ({m}, {mdash}) lies outside [-{l}, {l}]²."
    );
    usize::try_from((m + li64) * (2 * li64 + 1) + (mdash + li64))
        .unwrap_or_else(|_| panic!("Unable to convert the offset of ({m}, {mdash}) to `usize`."))
}

/// A Wigner small-d matrix $`\mathbf{d}^{l}(\beta)`$ stored as a flat row-major buffer.
///
/// Elements are addressed by signed pairs `(m, mdash)` with $`-l \le m, m' \le l`$.
#[derive(Clone, PartialEq)]
pub struct WignerSmallD {
    /// The degree $`l`$.
    l: u32,

    /// The polar angle $`\beta`$ in radians.
    beta: f64,

    /// The $`(2l+1)^2`$ elements laid out according to [`map_index`].
    elements: Vec<f64>,
}

impl WignerSmallD {
    fn zeros(l: u32, beta: f64) -> Self {
        let dim = 2 * l as usize + 1;
        Self {
            l,
            beta,
            elements: vec![0.0; dim * dim],
        }
    }

    /// The degree $`l`$ of this matrix.
    pub fn l(&self) -> u32 {
        self.l
    }

    /// The polar angle $`\beta`$ this matrix was built for.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// The dimension $`2l + 1`$.
    pub fn dim(&self) -> usize {
        2 * self.l as usize + 1
    }

    /// The flat element buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.elements
    }

    /// Copies the elements into a two-dimensional array whose rows and columns are ordered by
    /// increasing $`m`$ and $`m'`$.
    pub fn to_array(&self) -> Array2<f64> {
        let dim = self.dim();
        Array2::from_shape_fn((dim, dim), |(i, j)| self.elements[i * dim + j])
    }

    // ------------
    // Seed degrees
    // ------------

    /// Constructs $`\mathbf{d}^{0}(\beta) = (1)`$.
    pub(crate) fn degree_zero(beta: f64) -> Self {
        let mut d0 = Self::zeros(0, beta);
        d0[(0, 0)] = 1.0;
        d0
    }

    /// Constructs $`\mathbf{d}^{1}(\beta)`$ from its closed form.
    ///
    /// Only the entries
    ///
    /// ```math
    /// d^1_{00} = \cos\beta,\quad
    /// d^1_{1,-1} = \sin^2\tfrac{\beta}{2},\quad
    /// d^1_{10} = -\tfrac{1}{\sqrt{2}}\sin\beta,\quad
    /// d^1_{11} = \cos^2\tfrac{\beta}{2},\quad
    /// d^1_{0,-1} = d^1_{10},\quad
    /// d^1_{01} = -d^1_{10}
    /// ```
    ///
    /// are set directly. The remaining row is obtained by reflection.
    pub(crate) fn degree_one(beta: f64) -> Self {
        let mut d1 = Self::zeros(1, beta);
        let (sin_half, cos_half) = (0.5 * beta).sin_cos();
        d1[(0, 0)] = beta.cos();
        d1[(1, -1)] = sin_half * sin_half;
        d1[(1, 0)] = -beta.sin() / 2.0f64.sqrt();
        d1[(1, 1)] = cos_half * cos_half;
        d1[(0, -1)] = d1[(1, 0)];
        d1[(0, 1)] = -d1[(1, 0)];
        d1.complete_by_symmetry();
        d1
    }

    // ----------
    // Recurrence
    // ----------

    /// Constructs $`\mathbf{d}^{l}(\beta)`$ for $`l \ge 2`$ from the two preceding degrees.
    ///
    /// # Arguments
    ///
    /// * `l` - The degree $`l \ge 2`$.
    /// * `d1_00` - The element $`d^1_{00} = \cos\beta`$.
    /// * `d1_11` - The element $`d^1_{11} = \cos^2\tfrac{\beta}{2}`$.
    /// * `dlm1` - The matrix $`\mathbf{d}^{l-1}(\beta)`$.
    /// * `dlm2` - The matrix $`\mathbf{d}^{l-2}(\beta)`$.
    ///
    /// # Returns
    ///
    /// The completed matrix $`\mathbf{d}^{l}(\beta)`$ together with the smallest magnitude of the
    /// denominators met in the second-row boundary fill.
    pub(crate) fn from_recurrence(
        l: u32,
        d1_00: f64,
        d1_11: f64,
        dlm1: &Self,
        dlm2: &Self,
    ) -> (Self, f64) {
        assert!(l >= 2, "`l` must be at least 2.");
        assert_eq!(dlm1.l + 1, l, "`dlm1` must be of degree {}.", l - 1);
        assert_eq!(dlm2.l + 2, l, "`dlm2` must be of degree {}.", l - 2);

        let mut dl = Self::zeros(l, dlm1.beta);
        dl.fill_interior(d1_00, dlm1, dlm2);
        dl.fill_corner(d1_11, dlm1);
        dl.fill_near_corner(d1_00, dlm1);
        dl.fill_top_row();
        let smallest_denominator = dl.fill_second_row();
        dl.complete_by_symmetry();
        (dl, smallest_denominator)
    }

    /// Fills $`d^l_{mm'}`$ for $`0 \le m \le l - 2`$ and $`|m'| \le m`$ using
    ///
    /// ```math
    /// d^l_{mm'} = c_1 \left( c_2\, d^{l-1}_{mm'} - c_3\, d^{l-2}_{mm'} \right)
    /// ```
    ///
    /// with
    ///
    /// ```math
    /// c_1 = \frac{l(2l-1)}{\sqrt{(l^2-m^2)(l^2-m'^2)}},\quad
    /// c_2 = d^1_{00} - \frac{mm'}{l(l-1)},\quad
    /// c_3 = \frac{\sqrt{((l-1)^2-m^2)((l-1)^2-m'^2)}}{(l-1)(2l-1)}.
    /// ```
    fn fill_interior(&mut self, d1_00: f64, dlm1: &Self, dlm2: &Self) {
        let li64 = i64::from(self.l);
        let lm1 = li64 - 1;
        for m in 0..=(li64 - 2) {
            for mdash in -m..=m {
                let c1 = to_f64(li64 * (2 * li64 - 1))
                    / to_f64((li64 * li64 - m * m) * (li64 * li64 - mdash * mdash)).sqrt();
                let c2 = d1_00 - to_f64(m * mdash) / to_f64(li64 * lm1);
                let c3 = to_f64((lm1 * lm1 - m * m) * (lm1 * lm1 - mdash * mdash)).sqrt()
                    / to_f64(lm1 * (2 * li64 - 1));
                self[(m, mdash)] = c1 * (c2 * dlm1[(m, mdash)] - c3 * dlm2[(m, mdash)]);
            }
        }
    }

    /// Sets $`d^l_{ll} = d^1_{11}\, d^{l-1}_{l-1,l-1}`$.
    fn fill_corner(&mut self, d1_11: f64, dlm1: &Self) {
        let li64 = i64::from(self.l);
        self[(li64, li64)] = d1_11 * dlm1[(li64 - 1, li64 - 1)];
    }

    /// Sets $`d^l_{l-1,l-1} = (l\, d^1_{00} - l + 1)\, d^{l-1}_{l-1,l-1}`$.
    fn fill_near_corner(&mut self, d1_00: f64, dlm1: &Self) {
        let li64 = i64::from(self.l);
        let lf = f64::from(self.l);
        self[(li64 - 1, li64 - 1)] = (lf * d1_00 - lf + 1.0) * dlm1[(li64 - 1, li64 - 1)];
    }

    /// Fills the row $`m = l`$ for $`m' = l-1, \ldots, -l`$ in this order, each step using
    ///
    /// ```math
    /// d^l_{l,m'} = -\sqrt{\frac{l + m' + 1}{l - m'}}\ \tan\tfrac{\beta}{2}\ d^l_{l,m'+1}.
    /// ```
    ///
    /// The corner $`d^l_{ll}`$ must already be set.
    fn fill_top_row(&mut self) {
        let li64 = i64::from(self.l);
        let tan_half = (0.5 * self.beta).tan();
        for mdash in (-li64..li64).rev() {
            let c = -(to_f64(li64 + mdash + 1) / to_f64(li64 - mdash)).sqrt();
            self[(li64, mdash)] = c * tan_half * self[(li64, mdash + 1)];
        }
    }

    /// Fills the row $`m = l - 1`$ for $`m' = l-2, \ldots, 1-l`$ in this order, each step using
    ///
    /// ```math
    /// d^l_{l-1,m'} = -\frac{l\cos\beta - m'}{l\cos\beta - m' - 1}
    ///     \sqrt{\frac{l + m' + 1}{l - m'}}\ \tan\tfrac{\beta}{2}\ d^l_{l-1,m'+1}.
    /// ```
    ///
    /// The near-corner $`d^l_{l-1,l-1}`$ must already be set.
    ///
    /// # Returns
    ///
    /// The smallest $`|l\cos\beta - m' - 1|`$ encountered.
    fn fill_second_row(&mut self) -> f64 {
        let li64 = i64::from(self.l);
        let l_cos_beta = f64::from(self.l) * self.beta.cos();
        let tan_half = (0.5 * self.beta).tan();
        let mut smallest_denominator = f64::INFINITY;
        for mdash in ((1 - li64)..=(li64 - 2)).rev() {
            let den = l_cos_beta - to_f64(mdash + 1);
            smallest_denominator = smallest_denominator.min(den.abs());
            let c = -(l_cos_beta - to_f64(mdash)) / den
                * (to_f64(li64 + mdash + 1) / to_f64(li64 - mdash)).sqrt();
            self[(li64 - 1, mdash)] = c * tan_half * self[(li64 - 1, mdash + 1)];
        }
        smallest_denominator
    }

    // --------
    // Symmetry
    // --------

    /// Completes the matrix from its non-negative-row part using the reflections
    ///
    /// ```math
    /// d^l_{ji} = d^l_{-i,-j} \quad\textrm{and}\quad d^l_{ji} = (-1)^{i+j} d^l_{ij}.
    /// ```
    ///
    /// The left triangle of the non-negative rows ($`i < -j`$) is filled first, then the right
    /// triangle ($`i > j \ge 0`$), and finally the negative rows through the composite relation
    /// $`d^l_{ji} = (-1)^{i+j} d^l_{-j,-i}`$.
    pub(crate) fn complete_by_symmetry(&mut self) {
        let li64 = i64::from(self.l);

        for j in 0..li64 {
            for i in -li64..-j {
                self[(j, i)] = self[(-i, -j)];
            }
        }

        for j in 0..li64 {
            for i in (j + 1)..=li64 {
                self[(j, i)] = parity(i + j) * self[(i, j)];
            }
        }

        for (j, i) in (-li64..0).cartesian_product(-li64..=li64) {
            self[(j, i)] = parity(i + j) * self[(-j, -i)];
        }
    }
}

/// Returns $`(-1)^n`$.
fn parity(n: i64) -> f64 {
    if n % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

impl Index<(i64, i64)> for WignerSmallD {
    type Output = f64;

    fn index(&self, (m, mdash): (i64, i64)) -> &f64 {
        &self.elements[map_index(self.l, m, mdash)]
    }
}

impl IndexMut<(i64, i64)> for WignerSmallD {
    fn index_mut(&mut self, (m, mdash): (i64, i64)) -> &mut f64 {
        &mut self.elements[map_index(self.l, m, mdash)]
    }
}

impl fmt::Debug for WignerSmallD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "d^{}(β = {:+.7})", self.l, self.beta)?;
        writeln!(f, "{:+.7}", self.to_array())
    }
}

// =========
// Recursion
// =========

/// Walks the Wigner small-d matrices $`\mathbf{d}^{0}(\beta), \ldots, \mathbf{d}^{l_{\max}}(\beta)`$
/// in increasing degree.
///
/// Only $`\mathbf{d}^{l-1}`$ and $`\mathbf{d}^{l-2}`$ are kept alive while $`\mathbf{d}^{l}`$ is
/// being built. The two degree-one elements needed at every step are cached once the degree-one
/// matrix has been seeded. Once every degree has been yielded, the next call to
/// [`Self::next_degree`] releases the retained matrices.
pub struct WignerSmallDRecursion {
    /// The highest degree to construct.
    lmax: u32,

    /// The polar angle $`\beta`$ in radians.
    beta: f64,

    /// The degree to be constructed next, or `None` once all degrees have been yielded.
    next_l: Option<u32>,

    /// Cached $`d^1_{00}`$.
    d1_00: f64,

    /// Cached $`d^1_{11}`$.
    d1_11: f64,

    /// The most recently constructed matrix.
    dlm1: Option<WignerSmallD>,

    /// The matrix constructed before [`Self::dlm1`].
    dlm2: Option<WignerSmallD>,

    /// The smallest second-row boundary denominator seen so far, if any degree $`\ge 2`$ has been
    /// constructed.
    smallest_boundary_denominator: Option<f64>,
}

impl WignerSmallDRecursion {
    /// Starts a recursion up to and including degree `lmax` for the polar angle `beta`.
    #[must_use]
    pub fn new(lmax: u32, beta: f64) -> Self {
        Self {
            lmax,
            beta,
            next_l: Some(0),
            d1_00: 0.0,
            d1_11: 0.0,
            dlm1: None,
            dlm2: None,
            smallest_boundary_denominator: None,
        }
    }

    /// The highest degree this recursion constructs.
    pub fn lmax(&self) -> u32 {
        self.lmax
    }

    /// The smallest $`|l\cos\beta - m' - 1|`$ met in the second-row boundary fills so far.
    ///
    /// `None` if no degree $`l \ge 2`$ has been constructed.
    pub fn smallest_boundary_denominator(&self) -> Option<f64> {
        self.smallest_boundary_denominator
    }

    /// Constructs the next degree and returns a reference to it.
    ///
    /// # Returns
    ///
    /// The matrix $`\mathbf{d}^{l}(\beta)`$ for the next $`l`$, or `None` once $`l_{\max}`$ has
    /// been passed.
    pub fn next_degree(&mut self) -> Option<&WignerSmallD> {
        let Some(l) = self.next_l else {
            self.dlm1 = None;
            self.dlm2 = None;
            return None;
        };

        let dl = match l {
            0 => WignerSmallD::degree_zero(self.beta),
            1 => {
                let d1 = WignerSmallD::degree_one(self.beta);
                self.d1_00 = d1[(0, 0)];
                self.d1_11 = d1[(1, 1)];
                d1
            }
            _ => {
                let (Some(dlm1), Some(dlm2)) = (self.dlm1.as_ref(), self.dlm2.as_ref()) else {
                    log::error!(
                        "Wigner small-d matrices for l = {} and l = {} are missing.",
                        l - 1,
                        l - 2
                    );
                    self.next_l = None;
                    return None;
                };
                let (dl, smallest_denominator) =
                    WignerSmallD::from_recurrence(l, self.d1_00, self.d1_11, dlm1, dlm2);
                self.smallest_boundary_denominator = Some(
                    self.smallest_boundary_denominator
                        .map_or(smallest_denominator, |den| den.min(smallest_denominator)),
                );
                dl
            }
        };
        log::trace!("Wigner small-d matrix for l = {l} constructed.");

        // The old `dlm2` is dropped here.
        self.dlm2 = self.dlm1.replace(dl);
        self.next_l = if l < self.lmax { Some(l + 1) } else { None };
        self.dlm1.as_ref()
    }
}
