use std::f64::consts::PI;

// four-momenta are [E, px, py, pz]

pub(crate) fn pt(p: &[f64; 4]) -> f64 {
    p[1].hypot(p[2])
}

pub(crate) fn phi(p: &[f64; 4]) -> f64 {
    p[2].atan2(p[1])
}

pub(crate) fn eta(p: &[f64; 4]) -> f64 {
    let pt = pt(p);
    if pt == 0. {
        return if p[3] == 0. { 0. } else { p[3].signum() * f64::INFINITY };
    }
    (p[3] / pt).asinh()
}

pub(crate) fn mass(p: &[f64; 4]) -> f64 {
    let m2 = p[0] * p[0] - p[1] * p[1] - p[2] * p[2] - p[3] * p[3];
    m2.max(0.).sqrt()
}

pub(crate) fn add(p: &[f64; 4], q: &[f64; 4]) -> [f64; 4] {
    [p[0] + q[0], p[1] + q[1], p[2] + q[2], p[3] + q[3]]
}

/// Azimuthal separation in [0, π]
pub(crate) fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let dphi = (phi1 - phi2).abs() % (2. * PI);
    if dphi > PI {
        2. * PI - dphi
    } else {
        dphi
    }
}

pub(crate) fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    (eta1 - eta2).hypot(delta_phi(phi1, phi2))
}

pub(crate) fn transverse_mass(pt1: f64, phi1: f64, pt2: f64, phi2: f64) -> f64 {
    let mt2 = 2. * pt1 * pt2 * (1. - delta_phi(phi1, phi2).cos());
    mt2.max(0.).sqrt()
}
