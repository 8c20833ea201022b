//! Light interaction at a planar boundary between two semi-infinite media.
//!
//! The incoming medium has a purely real index `n_i`, the outgoing medium a
//! possibly complex index `m` (negative imaginary part for absorbing media).
//! Incidence angles are measured from the surface normal, in radians. Field
//! amplitudes are decomposed relative to the plane of incidence: parallel (p)
//! and perpendicular (s).

use num_complex::Complex64;

/// Brewster's angle for the interface, from the normal.
#[inline]
pub fn brewster(m: f64, n_i: f64) -> f64 {
    m.atan2(n_i)
}

/// Critical angle for total internal reflection, from the normal.
#[inline]
pub fn critical(m: f64, n_i: f64) -> f64 {
    (m / n_i).asin()
}

/// `m * cos(theta_t)` via Snell's law. For a dielectric the naive complex root
/// lies on the wrong branch; conjugating picks the physical (non-absorbing)
/// solution.
#[inline]
fn m_cos_theta_t(m: Complex64, m2: Complex64, theta_i: f64) -> Complex64 {
    let s = theta_i.sin();
    let d = (m2 - s * s).sqrt();

    if m.im == 0.0 { d.conj() } else { d }
}

/// Reflected amplitude of the parallel-polarized (p, TM) field.
pub fn r_par_amplitude(m: Complex64, theta_i: f64, n_i: f64) -> Complex64 {
    let m2 = (m / n_i) * (m / n_i);
    let c = m2 * theta_i.cos();
    let d = m_cos_theta_t(m, m2, theta_i);

    (c - d) / (c + d)
}

/// Reflected amplitude of the perpendicular-polarized (s, TE) field.
pub fn r_per_amplitude(m: Complex64, theta_i: f64, n_i: f64) -> Complex64 {
    let m2 = (m / n_i) * (m / n_i);
    let c = Complex64::from(theta_i.cos());
    let d = m_cos_theta_t(m, m2, theta_i);

    (c - d) / (c + d)
}

/// Transmitted amplitude of the parallel-polarized (p, TM) field.
pub fn t_par_amplitude(m: Complex64, theta_i: f64, n_i: f64) -> Complex64 {
    let m_rel = m / n_i;
    let m2 = m_rel * m_rel;
    let c = Complex64::from(theta_i.cos());
    let d = m_cos_theta_t(m, m2, theta_i);

    c * m_rel * 2.0 / (m2 * c + d)
}

/// Transmitted amplitude of the perpendicular-polarized (s, TE) field.
pub fn t_per_amplitude(m: Complex64, theta_i: f64, n_i: f64) -> Complex64 {
    let m2 = (m / n_i) * (m / n_i);
    let c = Complex64::from(theta_i.cos());
    let d = m_cos_theta_t(m, m2, theta_i);

    c * 2.0 / (c + d)
}

/// Reflected fraction of parallel-polarized power.
pub fn r_par(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    r_par_amplitude(m, theta_i, n_i).norm_sqr()
}

/// Reflected fraction of perpendicular-polarized power.
pub fn r_per(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    r_per_amplitude(m, theta_i, n_i).norm_sqr()
}

/// Transmitted fraction of parallel-polarized power. The squared amplitude is
/// scaled by the cosine ratio of the refracted and incident angles so that
/// reflected and transmitted power sum to the incident power.
pub fn t_par(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    let m_rel = m / n_i;
    let m2 = m_rel * m_rel;
    let c = Complex64::from(theta_i.cos());
    let s = theta_i.sin();
    let d = (m2 - s * s).sqrt();
    let tp = c * m_rel * 2.0 / (m2 * c + d);

    (d / c * tp.norm_sqr()).norm()
}

/// Transmitted fraction of perpendicular-polarized power, with the same
/// cosine-ratio correction as [`t_par`].
pub fn t_per(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    let m2 = (m / n_i) * (m / n_i);
    let c = Complex64::from(theta_i.cos());
    let s = theta_i.sin();
    let d = (m2 - s * s).sqrt();
    let ts = c * 2.0 / (c + d);

    (d / c * ts.norm_sqr()).norm()
}

/// Reflected fraction of unpolarized power.
pub fn r_unpolarized(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    (r_par(m, theta_i, n_i) + r_per(m, theta_i, n_i)) / 2.0
}

/// Transmitted fraction of unpolarized power.
pub fn t_unpolarized(m: Complex64, theta_i: f64, n_i: f64) -> f64 {
    (t_par(m, theta_i, n_i) + t_per(m, theta_i, n_i)) / 2.0
}
