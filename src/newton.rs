// Newton's method on a complex polynomial and classification of where it
// ends up.

use std::cmp::Ordering;
use std::f64::consts::PI;

use log::debug;
use num::complex::Complex64;

use crate::complex::ComplexExt;
use crate::error::{FractalError, Result};
use crate::polynomial::Polynomial;

/// Apply exactly `iterations` newton updates with no guard against a
/// vanishing derivative, so NaN and infinity propagate.
pub fn newton(polynomial : &Polynomial, guess : Complex64, iterations : usize) -> Complex64 {
    let derivative = polynomial.derivative();
    (0..iterations).fold(guess, |z, _| z - polynomial.at(z) / derivative.at(z))
}

/// As `newton` but fails on the first update where the derivative is zero.
pub fn newton_checked(
    polynomial : &Polynomial,
    guess : Complex64,
    iterations : usize
) -> Result<Complex64> {
    let derivative = polynomial.derivative();
    (0..iterations).try_fold(guess, |z, _| -> Result<Complex64> {
        Ok(z - polynomial.at(z).checked_div(derivative.at(z))?)
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence {
    pub point : Complex64,
    pub iterations : usize,
    pub converged : bool,
    /// The derivative got too small to take another step.
    pub stalled : bool
}

/// Iterate until |p(z)| drops below the tolerance or `max_iterations` is
/// reached. Gives up early when the derivative gets as small as the
/// tolerance.
pub fn converge(
    polynomial : &Polynomial,
    initial : Complex64,
    max_iterations : usize,
    tolerance : f64
) -> Convergence {
    let eps = tolerance * tolerance;
    let derivative = polynomial.derivative();
    let mut z = initial;
    for i in 0..max_iterations {
        let eval = polynomial.at(z);
        if eval.norm2() < eps {
            return Convergence { point: z, iterations: i, converged: true, stalled: false };
        }
        let diff = derivative.at(z);
        if diff.norm2() < eps {
            return Convergence { point: z, iterations: max_iterations, converged: false, stalled: true };
        }
        z = z - (eval / diff);
    }
    Convergence { point: z, iterations: max_iterations, converged: false, stalled: false }
}

/// Index of the zero nearest to `point`. Ties go to the lowest index.
pub fn closest_zero(point : Complex64, zeros : &[Complex64]) -> Result<usize> {
    let (first, rest) = zeros.split_first().ok_or_else(
        || FractalError::invalid_argument("no zeros to classify against")
    )?;
    let (closest, _) = rest.iter().enumerate().fold(
        (0, (point - *first).norm2()),
        |(best, best_d2), (i, z)| {
            let d2 = (point - *z).norm2();
            if d2 < best_d2 { (i + 1, d2) } else { (best, best_d2) }
        }
    );
    Ok(closest)
}

fn root_angle(principle : &Complex64, root : &Complex64) -> f64 {
    let ang = root.arg() - principle.arg();
    if ang.abs() < 1.0e-8 {
        0.0
    } else if ang < 0.0 {
        ang + (2.0 * PI)
    } else {
        ang
    }
}

fn root_compare(principle : &Complex64, root1 : &Complex64, root2 : &Complex64) -> Ordering {
    root_angle(principle, root1).total_cmp(&root_angle(principle, root2))
}

// Roots of a polynomial only known by its coefficients, found numerically
// before rendering so every pixel can be classified against a fixed list.
pub struct RootSet {
    tol_sqr : f64,
    roots : Vec<Complex64>
}

impl RootSet {
    pub fn new(eps : f64) -> RootSet {
        RootSet { tol_sqr: eps * eps, roots: Vec::new() }
    }

    pub fn add_root(&mut self, root : &Complex64) -> usize {
        for (i, z) in self.roots.iter().enumerate() {
            if (*root - *z).norm2() < self.tol_sqr {
                return i;
            }
        };
        self.roots.push(*root);
        self.roots.len() - 1
    }

    pub fn roots(&self) -> &[Complex64] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Complex64> {
        self.roots
    }

    fn principle_root(&self) -> Option<Complex64> {
        self.roots.iter().copied().max_by(|root1, root2| root1.im.total_cmp(&root2.im))
    }

    /// Order roots anticlockwise starting from the one with the largest
    /// imaginary part so colours don't depend on discovery order.
    pub fn sort_by_angle(&mut self) {
        if let Some(p_root) = self.principle_root() {
            self.roots.sort_by(|a, b| root_compare(&p_root, a, b));
        }
    }

    /// Run newton from seeds spread around a circle enclosing every root.
    pub fn discover(
        polynomial : &Polynomial,
        max_iterations : usize,
        tolerance : f64
    ) -> Result<RootSet> {
        let coefficients = polynomial.coefficients();
        let degree = coefficients.iter().rposition(|c| c.norm2() > 0.0).unwrap_or(0);
        if degree == 0 {
            return Err(FractalError::invalid_config("polynomial has no roots to colour by"));
        }
        let leading = coefficients[degree];
        // Cauchy's bound
        let radius = 1.0 + coefficients[..degree].iter().map(
            |c| (*c / leading).norm()
        ).fold(0.0, f64::max);
        let seed_count = 8 * degree;
        let mut roots = RootSet::new(tolerance * 4.0);
        for k in 0..seed_count {
            let theta = 2.0 * PI * (k as f64 + 0.25) / seed_count as f64;
            let seed = Complex64::from_polar(radius, theta);
            let result = converge(polynomial, seed, max_iterations, tolerance);
            if result.converged {
                roots.add_root(&result.point);
            }
        }
        if roots.roots.is_empty() {
            return Err(FractalError::invalid_config("newton's method found no roots"));
        }
        if roots.roots.len() < degree {
            debug!("Found {} distinct roots for a degree {} polynomial", roots.roots.len(), degree);
        }
        roots.sort_by_angle();
        Ok(roots)
    }
}
