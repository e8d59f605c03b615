//! Wigner small-d matrices and rotations of real spherical harmonics.

pub mod sh_rotation_3d;
pub mod wigner_d;

/// Alphabetical labels of angular momenta.
pub static ANGMOM_LABELS: [&str; 7] = ["S", "P", "D", "F", "G", "H", "I"];

/// Returns the alphabetical label of degree `l`, or `l` itself if no label exists.
pub fn angmom_label(l: u32) -> String {
    usize::try_from(l)
        .ok()
        .and_then(|li| ANGMOM_LABELS.get(li))
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| l.to_string())
}
