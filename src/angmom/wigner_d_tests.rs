use approx;
use factorial::Factorial;
use itertools::Itertools;
use proptest::prelude::*;

use crate::angmom::wigner_d::{map_index, WignerSmallD, WignerSmallDRecursion};

fn fact(n: i64) -> f64 {
    u64::try_from(n)
        .unwrap()
        .checked_factorial()
        .unwrap() as f64
}

/// Closed-form Wigner small-d element $`d^j_{mm'}(\beta)`$ from the explicit sum over $`k`$.
fn dmat_closed_form(j: i64, m: i64, mdash: i64, beta: f64) -> f64 {
    let (sin_half, cos_half) = (0.5 * beta).sin_cos();
    let prefactor = (fact(j + m) * fact(j - m) * fact(j + mdash) * fact(j - mdash)).sqrt();
    let sum = (0..=2 * j)
        .filter(|&k| j + mdash - k >= 0 && k + m - mdash >= 0 && j - m - k >= 0)
        .map(|k| {
            let sgn = if (k - mdash + m) % 2 == 0 { 1.0 } else { -1.0 };
            let cos_pow = i32::try_from(2 * j + mdash - m - 2 * k).unwrap();
            let sin_pow = i32::try_from(2 * k - mdash + m).unwrap();
            sgn * cos_half.powi(cos_pow) * sin_half.powi(sin_pow)
                / (fact(j + mdash - k) * fact(k) * fact(j - k - m) * fact(k - mdash + m))
        })
        .sum::<f64>();
    prefactor * sum
}

fn collect_dmats(lmax: u32, beta: f64) -> Vec<WignerSmallD> {
    let mut recursion = WignerSmallDRecursion::new(lmax, beta);
    let mut dmats = vec![];
    while let Some(dmat) = recursion.next_degree() {
        dmats.push(dmat.clone());
    }
    dmats
}

#[test]
fn test_wigner_d_map_index() {
    assert_eq!(map_index(0, 0, 0), 0);
    assert_eq!(map_index(1, 0, 0), 4);
    assert_eq!(map_index(1, 1, -1), 6);
    assert_eq!(map_index(2, -2, -2), 0);
    assert_eq!(map_index(2, 2, 2), 24);
    assert_eq!(map_index(3, 1, -2), 29);

    // Bijective onto [0, (2l + 1)²).
    for l in 0..6u32 {
        let li64 = i64::from(l);
        let offsets = (-li64..=li64)
            .cartesian_product(-li64..=li64)
            .map(|(m, mdash)| map_index(l, m, mdash))
            .collect::<Vec<_>>();
        let n = (2 * l as usize + 1).pow(2);
        assert_eq!(offsets, (0..n).collect::<Vec<_>>());
    }
}

#[test]
#[should_panic]
fn test_wigner_d_map_index_out_of_range() {
    let _ = map_index(2, 3, 0);
}

#[test]
fn test_wigner_d_seeds() {
    let d0 = WignerSmallD::degree_zero(0.37);
    assert_eq!(d0.as_slice(), &[1.0]);

    let beta = 0.8;
    let d1 = WignerSmallD::degree_one(beta);
    assert_eq!(d1.l(), 1);
    assert_eq!(d1.dim(), 3);
    approx::assert_relative_eq!(d1[(0, 0)], beta.cos(), epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(1, -1)], (0.5 * beta).sin().powi(2), epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(1, 0)], -beta.sin() / 2.0f64.sqrt(), epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(1, 1)], (0.5 * beta).cos().powi(2), epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(0, -1)], d1[(1, 0)], epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(0, 1)], -d1[(1, 0)], epsilon = 1e-15);

    // Negative row from reflection.
    approx::assert_relative_eq!(d1[(-1, -1)], d1[(1, 1)], epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(-1, 1)], d1[(1, -1)], epsilon = 1e-15);
    approx::assert_relative_eq!(d1[(-1, 0)], -d1[(1, 0)], epsilon = 1e-15);
}

#[test]
fn test_wigner_d_closed_form() {
    for beta in [0.1, 0.9, 1.7, 2.6, -0.7] {
        let dmats = collect_dmats(4, beta);
        assert_eq!(dmats.len(), 5);
        for dmat in dmats.iter() {
            let li64 = i64::from(dmat.l());
            for (m, mdash) in (-li64..=li64).cartesian_product(-li64..=li64) {
                approx::assert_relative_eq!(
                    dmat[(m, mdash)],
                    dmat_closed_form(li64, m, mdash, beta),
                    epsilon = 1e-10,
                    max_relative = 1e-10
                );
            }
        }
    }
}

#[test]
fn test_wigner_d_zero_beta_is_identity() {
    for dmat in collect_dmats(6, 0.0).iter() {
        let dim = dmat.dim();
        let id = ndarray::Array2::<f64>::eye(dim);
        approx::assert_relative_eq!(
            (dmat.to_array() - id).map(|x| x * x).sum().sqrt(),
            0.0,
            epsilon = 1e-14
        );
    }
}

#[test]
fn test_wigner_d_recursion_order_and_exhaustion() {
    let mut recursion = WignerSmallDRecursion::new(3, 0.4);
    assert_eq!(recursion.lmax(), 3);
    assert!(recursion.smallest_boundary_denominator().is_none());
    for l in 0..=3 {
        let dmat = recursion.next_degree().expect("Degree missing.");
        assert_eq!(dmat.l(), l);
        assert_eq!(dmat.as_slice().len(), (2 * l as usize + 1).pow(2));
        approx::assert_relative_eq!(dmat.beta(), 0.4);
    }
    assert!(recursion.next_degree().is_none());
    assert!(recursion.next_degree().is_none());
    assert!(recursion.smallest_boundary_denominator().is_some());

    let mut recursion = WignerSmallDRecursion::new(0, 0.4);
    assert_eq!(recursion.next_degree().map(|d| d.l()), Some(0));
    assert!(recursion.next_degree().is_none());
    assert!(recursion.smallest_boundary_denominator().is_none());
}

#[test]
fn test_wigner_d_smallest_boundary_denominator() {
    // 2 cos(π/3) - 1 = 0.
    let mut recursion = WignerSmallDRecursion::new(2, std::f64::consts::FRAC_PI_3);
    while recursion.next_degree().is_some() {}
    let den = recursion.smallest_boundary_denominator().unwrap();
    assert!(den < 1e-12);

    // 2 cos(π/2) - 0 = 0.
    let mut recursion = WignerSmallDRecursion::new(4, std::f64::consts::FRAC_PI_2);
    while recursion.next_degree().is_some() {}
    assert!(recursion.smallest_boundary_denominator().unwrap() < 1e-12);

    // For l = 2 the denominators are 2 cos β - 1 and 2 cos β.
    let beta = 0.3f64;
    let mut recursion = WignerSmallDRecursion::new(2, beta);
    while recursion.next_degree().is_some() {}
    approx::assert_relative_eq!(
        recursion.smallest_boundary_denominator().unwrap(),
        2.0 * beta.cos() - 1.0,
        epsilon = 1e-14
    );
}

proptest! {
    #[test]
    fn test_wigner_d_reflection_symmetries(beta in -3.1f64..3.1) {
        for dmat in collect_dmats(5, beta).iter() {
            let li64 = i64::from(dmat.l());
            for (j, i) in (-li64..=li64).cartesian_product(-li64..=li64) {
                let sgn = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                prop_assert!(approx::relative_eq!(dmat[(j, i)], dmat[(-i, -j)], epsilon = 1e-12));
                prop_assert!(approx::relative_eq!(dmat[(j, i)], sgn * dmat[(i, j)], epsilon = 1e-12));
            }
        }
    }
}
