// Complex arithmetic used by the polynomial and newton modules
//
// Values are num's Complex64 so add, sub, mul, neg and div come from its
// operator impls. The extras the fractal needs live on ComplexExt.

use json::JsonValue;
use num::complex::Complex64;
use num::One;

use crate::error::{FractalError, Result};

pub trait ComplexExt : Sized {
    /// Integer power by repeated multiplication, pow(a, 0) is 1+0i.
    fn ipow(self, n : u32) -> Self;

    /// Squared magnitude.
    fn norm2(self) -> f64;

    /// Division which fails instead of producing NaN or infinity.
    fn checked_div(self, rhs : Self) -> Result<Self>;
}

impl ComplexExt for Complex64 {
    fn ipow(self, n : u32) -> Complex64 {
        (0..n).fold(Complex64::one(), |acc, _| acc * self)
    }

    fn norm2(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    fn checked_div(self, rhs : Complex64) -> Result<Complex64> {
        if rhs.norm2() == 0.0 {
            return Err(FractalError::DivisionByZero);
        }
        Ok(self / rhs)
    }
}

fn finite(input : &JsonValue, what : &str) -> Result<f64> {
    input.as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FractalError::invalid_config(format!("{} must be a finite number", what)))
}

// Either a bare real number or a [re, im] pair
pub fn complex_from_json(input : &JsonValue) -> Result<Complex64> {
    if input.is_number() {
        return Ok(Complex64::new(finite(input, "real part")?, 0.0));
    }
    if !input.is_array() || input.len() != 2 {
        return Err(FractalError::invalid_config(
            format!("expected a number or [re, im] pair, found {}", input.dump())
        ));
    }
    Ok(Complex64::new(
        finite(&input[0], "real part")?,
        finite(&input[1], "imaginary part")?
    ))
}

pub fn complex_list_from_json(input : &JsonValue) -> Result<Vec<Complex64>> {
    if !input.is_array() {
        return Err(FractalError::invalid_config("expected a list of complex numbers"));
    }
    input.members().map(complex_from_json).collect()
}
