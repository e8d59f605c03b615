use std::f64::consts::FRAC_PI_2;

use env_logger;

use crate::angmom::sh_rotation_3d::{sh_rotation_matrices, ShRotationError};
use crate::drivers::sh_rotation::{
    InstabilityPolicy, ShRotationDriver, ShRotationParams, ShRotationParamsBuilder,
};
use crate::drivers::ShRotDriver;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_drivers_sh_rotation_params_default() {
    let params = ShRotationParams::default();
    assert_eq!(params.lmax, 2);
    assert_eq!(params.instability_policy, InstabilityPolicy::Raw);
    approx::assert_relative_eq!(params.denominator_threshold, 1e-8);
    approx::assert_relative_eq!(params.orthogonality_threshold, 1e-9);
    assert!(!params.write_matrices);

    let params = ShRotationParamsBuilder::default()
        .lmax(4)
        .instability_policy(InstabilityPolicy::Reject)
        .build()
        .unwrap();
    assert_eq!(params.lmax, 4);
    assert!(params.to_string().contains("Maximum degree: 4"));
    assert!(params.to_string().contains("reject"));
}

#[test]
fn test_drivers_sh_rotation_validation() {
    let params = ShRotationParams::default();
    let no_angles: Vec<(f64, f64, f64)> = vec![];
    assert!(ShRotationDriver::builder()
        .parameters(&params)
        .euler_angles(&no_angles)
        .build()
        .is_err());
    assert!(ShRotationDriver::builder()
        .euler_angles(&[(0.1, 0.2, 0.3)])
        .build()
        .is_err());

    let bad_params = ShRotationParams::builder()
        .orthogonality_threshold(f64::NAN)
        .build()
        .unwrap();
    assert!(ShRotationDriver::builder()
        .parameters(&bad_params)
        .euler_angles(&[(0.1, 0.2, 0.3)])
        .build()
        .is_err());
}

#[test]
fn test_drivers_sh_rotation_run() {
    init_logger();
    let params = ShRotationParams::builder()
        .lmax(4)
        .write_matrices(true)
        .build()
        .unwrap();
    let euler_angles = vec![(0.3, 0.7, 1.1), (1.2, -0.4, 2.5), (-2.0, 2.9, 0.5)];
    let mut driver = ShRotationDriver::builder()
        .parameters(&params)
        .euler_angles(&euler_angles)
        .build()
        .unwrap();
    assert!(driver.result().is_err());
    assert!(driver.run().is_ok());

    let res = driver.result().unwrap();
    assert_eq!(res.entries.len(), 3);
    assert_eq!(res.n_unstable(), 0);
    for (entry, ea) in res.entries.iter().zip(euler_angles.iter()) {
        assert_eq!(entry.euler_angles, *ea);
        assert_eq!(entry.rlmats, sh_rotation_matrices(4, *ea));
        assert_eq!(entry.orthogonality_deviations.len(), 5);
        assert!(entry.is_orthogonal(1e-9));
        assert!(entry.instability.is_none());
    }
    let summary = res.to_string();
    assert!(summary.contains("Rotation 2"));
    assert!(summary.contains("R^4:"));
}

#[test]
fn test_drivers_sh_rotation_raw_policy_keeps_unstable() {
    init_logger();
    let params = ShRotationParams::builder().lmax(3).build().unwrap();
    let euler_angles = [(0.3, 0.7, 1.1), (0.0, FRAC_PI_2, 0.0)];
    let mut driver = ShRotationDriver::builder()
        .parameters(&params)
        .euler_angles(&euler_angles)
        .build()
        .unwrap();
    assert!(driver.run().is_ok());

    let res = driver.result().unwrap();
    assert_eq!(res.n_unstable(), 1);
    assert!(res.entries[0].instability.is_none());
    assert!(matches!(
        res.entries[1].instability,
        Some(ShRotationError::ComputationalInstability(_))
    ));
    assert_eq!(res.entries[1].rlmats, sh_rotation_matrices(3, (0.0, FRAC_PI_2, 0.0)));
}

#[test]
fn test_drivers_sh_rotation_reject_policy() {
    init_logger();
    let params = ShRotationParams::builder()
        .lmax(2)
        .instability_policy(InstabilityPolicy::Reject)
        .build()
        .unwrap();
    let euler_angles = [(0.3, 0.7, 1.1), (0.0, FRAC_PI_2, 0.0)];
    let mut driver = ShRotationDriver::builder()
        .parameters(&params)
        .euler_angles(&euler_angles)
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShRotationError>(),
        Some(ShRotationError::ComputationalInstability(_))
    ));
    assert!(driver.result().is_err());

    // A stable batch is unaffected by the policy.
    let mut driver = ShRotationDriver::builder()
        .parameters(&params)
        .euler_angles(&euler_angles[..1])
        .build()
        .unwrap();
    assert!(driver.run().is_ok());
    assert_eq!(driver.result().unwrap().entries.len(), 1);
}
