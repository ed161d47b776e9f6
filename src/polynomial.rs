// Complex polynomials held as coefficients and, when built from its roots,
// also in factored form.
//
// The coefficient list is indexed by power of x and an empty list is the
// zero polynomial. Evaluation prefers the factored form when it is known
// since the product of differences avoids cancellation between
// coefficients.

use std::fmt;
use std::ops::Mul;
use std::sync::OnceLock;

use json::JsonValue;
use num::complex::Complex64;
use num::{One, Zero};

use crate::complex::complex_list_from_json;
use crate::error::{FractalError, Result};

#[derive(Clone, Debug, Default)]
pub struct Polynomial {
    coefficients : Vec<Complex64>,
    zeros : Option<Vec<Complex64>>,
    derivative : OnceLock<Box<Polynomial>>
}

impl Polynomial {
    pub fn from_coefficients(coefficients : Vec<Complex64>) -> Polynomial {
        Polynomial { coefficients, zeros: None, derivative: OnceLock::new() }
    }

    /// Expand the product of (x - z) over the zeros, keeping the zeros for
    /// evaluation. No zeros gives the zero polynomial.
    pub fn from_zeros(zeros : Vec<Complex64>) -> Polynomial {
        if zeros.is_empty() {
            return Polynomial::default();
        }
        let monomial = |z : &Complex64| Polynomial::from_coefficients(vec![-*z, Complex64::one()]);
        let mut expanded = zeros[1..].iter().fold(
            monomial(&zeros[0]),
            |acc, z| acc.multiply(&monomial(z))
        );
        expanded.zeros = Some(zeros);
        expanded
    }

    /// Read a polynomial from a job description, either from "zeros" or
    /// from "coefficients" listed highest power first.
    pub fn from_json(input : &JsonValue) -> Result<Polynomial> {
        if !input["zeros"].is_null() {
            let zeros = complex_list_from_json(&input["zeros"])?;
            if zeros.is_empty() {
                return Err(FractalError::invalid_config("zeros must not be empty"));
            }
            return Ok(Polynomial::from_zeros(zeros));
        }
        if !input["coefficients"].is_null() {
            let mut coefficients = complex_list_from_json(&input["coefficients"])?;
            coefficients.reverse();
            return Ok(Polynomial::from_coefficients(coefficients));
        }
        Err(FractalError::invalid_config("missing zeros or coefficients"))
    }

    pub fn coefficients(&self) -> &[Complex64] {
        &self.coefficients
    }

    pub fn zeros(&self) -> Option<&[Complex64]> {
        self.zeros.as_deref()
    }

    /// None for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coefficients.len().checked_sub(1)
    }

    /// Convolve the coefficient lists. The product never carries zeros.
    pub fn multiply(&self, other : &Polynomial) -> Polynomial {
        let a = &self.coefficients;
        let b = &other.coefficients;
        if a.is_empty() || b.is_empty() {
            return Polynomial::default();
        }
        let mut result = vec![Complex64::zero(); a.len() + b.len() - 1];
        for (i, a_i) in a.iter().enumerate() {
            for (j, b_j) in b.iter().enumerate() {
                result[i + j] += *a_i * *b_j;
            }
        }
        Polynomial::from_coefficients(result)
    }

    /// Computed on first use then shared by every later caller.
    pub fn derivative(&self) -> &Polynomial {
        self.derivative.get_or_init(|| {
            Box::new(Polynomial::from_coefficients(
                self.coefficients.iter().enumerate().skip(1).map(
                    |(i, c)| *c * (i as f64)
                ).collect()
            ))
        })
    }

    pub fn at(&self, x : Complex64) -> Complex64 {
        if let Some(zeros) = &self.zeros {
            return zeros[1..].iter().fold(
                x - zeros[0],
                |acc, z| acc * (x - *z)
            );
        }
        let Some((first, rest)) = self.coefficients.split_first() else {
            return Complex64::zero();
        };
        let (acc, _) = rest.iter().fold(
            (*first, x),
            |(acc, x_pow), c| (acc + *c * x_pow, x_pow * x)
        );
        acc
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs : &Polynomial) -> Polynomial {
        self.multiply(rhs)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficients.is_empty() {
            return write!(f, "0");
        }
        for (i, c) in self.coefficients.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "({}{:+}i)", c.re, c.im)?;
            if i > 0 {
                write!(f, "x^{}", i)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn c(re : f64, im : f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn roots_of_unity() -> Vec<Complex64> {
        vec![c(1.0, 0.0), c(-0.5, 0.8660254), c(-0.5, -0.8660254)]
    }

    fn assert_same_coefficients(a : &Polynomial, b : &Polynomial) {
        assert_eq!(a.coefficients().len(), b.coefficients().len());
        for (x, y) in a.coefficients().iter().zip(b.coefficients()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zeros_evaluate_to_zero() {
        let p = Polynomial::from_zeros(roots_of_unity());
        for z in roots_of_unity() {
            let v = p.at(z);
            assert_abs_diff_eq!(v.re, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_expansion_matches_factored_form() {
        let p = Polynomial::from_zeros(roots_of_unity());
        // x^3 - 1 up to the precision of the zeros
        assert_eq!(p.degree(), Some(3));
        assert_abs_diff_eq!(p.coefficients()[0].re, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.coefficients()[1].norm(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.coefficients()[2].norm(), 0.0, epsilon = 1e-12);
        assert_eq!(p.coefficients()[3], c(1.0, 0.0));

        let expanded = Polynomial::from_coefficients(p.coefficients().to_vec());
        for x in [c(0.3, -1.2), c(2.0, 2.0), c(-1.5, 0.25)] {
            let a = p.at(x);
            let b = expanded.at(x);
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_coefficient_evaluation() {
        // 1 + 2x + 3x^2
        let p = Polynomial::from_coefficients(vec![c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)]);
        assert_eq!(p.at(c(2.0, 0.0)), c(17.0, 0.0));
        assert_eq!(p.at(c(0.0, 1.0)), c(-2.0, 2.0));
        let constant = Polynomial::from_coefficients(vec![c(4.0, -1.0)]);
        assert_eq!(constant.at(c(9.0, 9.0)), c(4.0, -1.0));
    }

    #[test]
    fn test_empty_polynomial() {
        let empty = Polynomial::default();
        assert_eq!(empty.at(c(3.0, 1.0)), c(0.0, 0.0));
        assert_eq!(empty.degree(), None);
        assert!(empty.derivative().coefficients().is_empty());
        assert!(Polynomial::from_zeros(vec![]).coefficients().is_empty());
        assert!(Polynomial::from_zeros(vec![]).zeros().is_none());
    }

    #[test]
    fn test_multiply_by_empty() {
        let p = Polynomial::from_coefficients(vec![c(1.0, 0.0), c(2.0, 1.0)]);
        assert!(p.multiply(&Polynomial::default()).coefficients().is_empty());
        assert!((&Polynomial::default() * &p).coefficients().is_empty());
    }

    #[test]
    fn test_multiply_commutative_and_associative() {
        let a = Polynomial::from_coefficients(vec![c(1.0, 2.0), c(-3.0, 0.5)]);
        let b = Polynomial::from_coefficients(vec![c(0.0, 1.0), c(2.0, 0.0), c(1.5, -1.0)]);
        let d = Polynomial::from_coefficients(vec![c(4.0, 0.0), c(0.0, 0.0), c(-1.0, 1.0), c(0.5, 0.5)]);
        assert_same_coefficients(&(&a * &b), &(&b * &a));
        assert_same_coefficients(&(&(&a * &b) * &d), &(&a * &(&b * &d)));
        assert_eq!((&a * &b).coefficients().len(), 4);
    }

    #[test]
    fn test_product_has_no_zeros() {
        let a = Polynomial::from_zeros(vec![c(1.0, 0.0)]);
        let b = Polynomial::from_zeros(vec![c(2.0, 0.0)]);
        let product = &a * &b;
        assert!(product.zeros().is_none());
        // (x - 1)(x - 2) = 2 - 3x + x^2
        assert_eq!(product.coefficients(), &[c(2.0, 0.0), c(-3.0, 0.0), c(1.0, 0.0)]);
    }

    #[test]
    fn test_derivative_of_cubic() {
        let p = Polynomial::from_coefficients(vec![c(5.0, 1.0), c(1.0, -1.0), c(2.0, 0.5), c(-3.0, 2.0)]);
        assert_eq!(
            p.derivative().coefficients(),
            &[c(1.0, -1.0), c(4.0, 1.0), c(-9.0, 6.0)]
        );
        assert!(Polynomial::from_coefficients(vec![c(7.0, 0.0)]).derivative().coefficients().is_empty());
    }

    #[test]
    fn test_derivative_is_cached() {
        let p = Polynomial::from_zeros(roots_of_unity());
        let first = p.derivative() as *const Polynomial;
        let second = p.derivative() as *const Polynomial;
        assert_eq!(first, second);
        assert!(p.derivative().zeros().is_none());
    }

    #[test]
    fn test_display() {
        let p = Polynomial::from_coefficients(vec![c(1.0, 0.0), c(0.0, -2.0), c(3.5, 1.0)]);
        assert_eq!(p.to_string(), "(1+0i) + (0-2i)x^1 + (3.5+1i)x^2");
        assert_eq!(Polynomial::default().to_string(), "0");
    }

    #[test]
    fn test_from_json() {
        let zeros = json::parse(r#"{"zeros": [[1, 0], [-1, 0]]}"#).unwrap();
        let p = Polynomial::from_json(&zeros).unwrap();
        assert_eq!(p.zeros().map(|z| z.len()), Some(2));

        // x^2 + 1 given highest power first
        let coefficients = json::parse(r#"{"coefficients": [1, 0, 1]}"#).unwrap();
        let q = Polynomial::from_json(&coefficients).unwrap();
        assert!(q.zeros().is_none());
        assert_eq!(q.at(c(0.0, 1.0)), c(0.0, 0.0));
        assert_eq!(q.at(c(2.0, 0.0)), c(5.0, 0.0));

        assert!(Polynomial::from_json(&json::parse("{}").unwrap()).is_err());
        assert!(Polynomial::from_json(&json::parse(r#"{"zeros": []}"#).unwrap()).is_err());
    }
}
