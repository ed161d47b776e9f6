// Make an image out of newton's method for a complex polynomial
//
// Each pixel is mapped into a window of the complex plane, iterated towards
// a root and coloured by the root it lands nearest to. Optionally the number
// of iterations taken to converge scales the intensity.

use json::JsonValue;
use num::complex::Complex64;
use image::{Rgb, RgbImage};
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::error::{FractalError, Result};
use crate::newton::{closest_zero, converge, newton, newton_checked, RootSet};
use crate::polynomial::Polynomial;

const DEFAULT_ITERATIONS : usize = 100;
const DEFAULT_RANGE : f64 = 5.0;
const DISCOVERY_ITERATIONS : usize = 255;
const DISCOVERY_TOLERANCE : f64 = 1e-10;
const MAX_PIXELS : u64 = 1 << 28;
// Lowest intensity of a shaded pixel, keeps it apart from a black sentinel
const SHADE_FLOOR : usize = 32;

/// Receives finished pixels. Called exactly once per pixel of its
/// dimensions.
pub trait PixelSink {
    fn dimensions(&self) -> (u32, u32);
    fn set_pixel(&mut self, x : u32, y : u32, colour : Rgb<u8>);
}

impl PixelSink for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn set_pixel(&mut self, x : u32, y : u32, colour : Rgb<u8>) {
        self.put_pixel(x, y, colour);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width : u32,
    pub height : u32,
    pub r_min : f64,
    pub r_max : f64,
    pub i_min : f64,
    pub i_max : f64
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Window {
    Centred { origin : Complex64, r_range : f64 },
    Bounds { r_min : f64, r_max : f64, i_min : f64, i_max : f64 }
}

fn check_dimensions(width : u32, height : u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(FractalError::invalid_config(
            format!("grid dimensions must be positive, got {}x{}", width, height)
        ));
    }
    Ok(())
}

impl Viewport {
    /// Window of width `r_range` around `origin`, the imaginary extent
    /// following the aspect ratio of the grid.
    pub fn centred(width : u32, height : u32, origin : Complex64, r_range : f64) -> Result<Viewport> {
        check_dimensions(width, height)?;
        if !r_range.is_finite() || r_range <= 0.0 {
            return Err(FractalError::invalid_config("range must be positive and finite"));
        }
        let i_range = r_range / width as f64 * height as f64;
        Ok(Viewport {
            width,
            height,
            r_min: origin.re - r_range / 2.0,
            r_max: origin.re + r_range / 2.0,
            i_min: origin.im - i_range / 2.0,
            i_max: origin.im + i_range / 2.0
        })
    }

    pub fn bounds(
        width : u32,
        height : u32,
        (r_min, r_max) : (f64, f64),
        (i_min, i_max) : (f64, f64)
    ) -> Result<Viewport> {
        check_dimensions(width, height)?;
        let ordered = |lo : f64, hi : f64| lo.is_finite() && hi.is_finite() && lo < hi;
        if !ordered(r_min, r_max) || !ordered(i_min, i_max) {
            return Err(FractalError::invalid_config("viewport bounds must be finite with min < max"));
        }
        Ok(Viewport { width, height, r_min, r_max, i_min, i_max })
    }

    pub fn sample(&self, x : u32, y : u32) -> Complex64 {
        Complex64::new(
            x as f64 / self.width as f64 * (self.r_max - self.r_min) + self.r_min,
            y as f64 / self.height as f64 * (self.i_max - self.i_min) + self.i_min
        )
    }
}

impl Window {
    fn from_json(input : &JsonValue) -> Result<Window> {
        let keys = ["r_min", "r_max", "i_min", "i_max"];
        if keys.iter().any(|k| !input[*k].is_null()) {
            let mut bounds = [0.0; 4];
            for (bound, key) in bounds.iter_mut().zip(keys) {
                *bound = input[key].as_f64().ok_or_else(
                    || FractalError::invalid_config(format!("{} must be a number", key))
                )?;
            }
            return Ok(Window::Bounds {
                r_min: bounds[0], r_max: bounds[1], i_min: bounds[2], i_max: bounds[3]
            });
        }
        let origin_r = input["origin_r"].as_f64().unwrap_or(0.0);
        let origin_i = input["origin_i"].as_f64().unwrap_or(0.0);
        let r_range = if input["range"].is_null() {
            DEFAULT_RANGE
        } else {
            input["range"].as_f64().ok_or_else(
                || FractalError::invalid_config("range must be a number")
            )?
        };
        Ok(Window::Centred { origin: Complex64::new(origin_r, origin_i), r_range })
    }

    fn viewport(&self, width : u32, height : u32) -> Result<Viewport> {
        match *self {
            Window::Centred { origin, r_range } => Viewport::centred(width, height, origin, r_range),
            Window::Bounds { r_min, r_max, i_min, i_max } =>
                Viewport::bounds(width, height, (r_min, r_max), (i_min, i_max))
        }
    }
}

fn mod2(val : f64) -> f64 {
    (val / 2.0).fract() * 2.0
}

fn make_base_rgb(hue : f64) -> Rgb<u8> {
    let x_val : f64 = 1.0 - (mod2(hue / 60.0) - 1.0).abs();
    let x = (255.0 * x_val) as u8;
    if hue < 60.0 {
        Rgb([255, x, 0])
    } else if hue < 120.0 {
        Rgb([x, 255, 0])
    }else if hue < 180.0 {
        Rgb([0, 255, x])
    }else if hue < 240.0 {
        Rgb([0, x, 255])
    }else if hue < 300.0 {
        Rgb([x, 0, 255])
    } else {
        Rgb([255, 0, x])
    }
}

fn scale_colour(val : u8, colour : &Rgb<u8>) -> Rgb<u8> {
    let r = (colour.0[0] as u16 * val as u16) / 255;
    let g = (colour.0[1] as u16 * val as u16) / 255;
    let b = (colour.0[2] as u16 * val as u16) / 255;
    Rgb([r as u8, g as u8, b as u8])
}

fn colour_from_json(input : &JsonValue) -> Result<Rgb<u8>> {
    let channel = |v : &JsonValue| v.as_u8().ok_or_else(
        || FractalError::invalid_config(format!("colour channels must be 0-255, found {}", v.dump()))
    );
    if !input.is_array() || input.len() != 3 {
        return Err(FractalError::invalid_config("colours are [r, g, b] lists"));
    }
    Ok(Rgb([channel(&input[0])?, channel(&input[1])?, channel(&input[2])?]))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colours : Vec<Rgb<u8>>,
    sentinel : Rgb<u8>
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            colours: vec![Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255])],
            sentinel: Rgb([0, 0, 0])
        }
    }
}

impl Palette {
    fn from_json(input : &JsonValue) -> Result<Palette> {
        let mut palette = Palette::default();
        if !input["colours"].is_null() {
            if !input["colours"].is_array() {
                return Err(FractalError::invalid_config("colours must be a list"));
            }
            palette.colours = input["colours"].members().map(colour_from_json).collect::<Result<_>>()?;
        }
        if !input["sentinel_colour"].is_null() {
            palette.sentinel = colour_from_json(&input["sentinel_colour"])?;
        }
        Ok(palette)
    }

    /// Colour for a zero. Zeros past the end of the palette get evenly
    /// spaced hues.
    pub fn colour(&self, index : usize, zero_count : usize) -> Rgb<u8> {
        match self.colours.get(index) {
            Some(colour) => *colour,
            None => make_base_rgb(360.0 * index as f64 / zero_count.max(1) as f64)
        }
    }

    pub fn sentinel(&self) -> Rgb<u8> {
        self.sentinel
    }
}

/// What a pixel does when the newton update divides by zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivisionPolicy {
    /// Carry NaN through and classify whatever comes out.
    Propagate,
    /// Colour the pixel with the palette's sentinel.
    Sentinel
}

impl DivisionPolicy {
    fn from_json(input : &JsonValue) -> Result<DivisionPolicy> {
        match input.as_str().unwrap_or("propagate") {
            "propagate" => Ok(DivisionPolicy::Propagate),
            "sentinel" => Ok(DivisionPolicy::Sentinel),
            other => Err(FractalError::invalid_config(format!("unknown division policy {}", other)))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classified {
    pub zero_index : usize,
    pub iterations : usize
}

fn positive_usize(input : &JsonValue, key : &str, default : usize) -> Result<usize> {
    if input[key].is_null() {
        return Ok(default);
    }
    input[key].as_usize().filter(|v| *v > 0).ok_or_else(
        || FractalError::invalid_config(format!("{} must be a positive integer", key))
    )
}

fn dimension(input : &JsonValue, key : &str) -> Result<u32> {
    let value = positive_usize(input, key, 1024)?;
    u32::try_from(value).map_err(
        |_| FractalError::invalid_config(format!("{} is too large", key))
    )
}

pub struct NewtonFractal {
    polynomial : Polynomial,
    zeros : Vec<Complex64>,
    resolution : (u32, u32),
    window : Window,
    iterations : usize,
    convergence : Option<f64>,
    palette : Palette,
    policy : DivisionPolicy,
    parallel : bool
}

impl NewtonFractal {
    pub fn from_json(input : &JsonValue) -> Result<NewtonFractal> {
        let polynomial = Polynomial::from_json(input)?;
        let resolution = (dimension(input, "resolution_x")?, dimension(input, "resolution_y")?);
        if resolution.0 as u64 * resolution.1 as u64 > MAX_PIXELS {
            return Err(FractalError::invalid_config(format!(
                "{}x{} is more than {} pixels", resolution.0, resolution.1, MAX_PIXELS
            )));
        }
        let window = Window::from_json(input)?;
        // Fail on a bad window before any work is done
        window.viewport(resolution.0, resolution.1)?;
        let iterations = positive_usize(input, "iterations", DEFAULT_ITERATIONS)?;
        let convergence = match input["convergence"].as_f64() {
            Some(tol) if tol.is_finite() && tol > 0.0 => Some(tol),
            Some(_) => return Err(FractalError::invalid_config("convergence must be positive")),
            None => None
        };
        let zeros = match polynomial.zeros() {
            Some(zeros) => zeros.to_vec(),
            None => {
                let roots = RootSet::discover(
                    &polynomial,
                    DISCOVERY_ITERATIONS,
                    convergence.unwrap_or(DISCOVERY_TOLERANCE)
                )?;
                debug!("Discovered roots {:?}", roots.roots());
                roots.into_roots()
            }
        };
        Ok(NewtonFractal {
            polynomial,
            zeros,
            resolution,
            window,
            iterations,
            convergence,
            palette: Palette::from_json(input)?,
            policy: DivisionPolicy::from_json(&input["division_policy"])?,
            parallel: input["parallel"].as_bool().unwrap_or(true)
        })
    }

    pub fn polynomial(&self) -> &Polynomial {
        &self.polynomial
    }

    pub fn zeros(&self) -> &[Complex64] {
        &self.zeros
    }

    fn solve(&self, sample : Complex64) -> Result<(Complex64, usize)> {
        if let Some(tolerance) = self.convergence {
            let result = converge(&self.polynomial, sample, self.iterations, tolerance);
            if self.policy == DivisionPolicy::Sentinel && result.stalled {
                return Err(FractalError::DivisionByZero);
            }
            return Ok((result.point, result.iterations));
        }
        let point = match self.policy {
            DivisionPolicy::Propagate => newton(&self.polynomial, sample, self.iterations),
            DivisionPolicy::Sentinel => newton_checked(&self.polynomial, sample, self.iterations)?
        };
        Ok((point, self.iterations))
    }

    pub fn classify(&self, sample : Complex64) -> Result<Classified> {
        let (point, iterations) = self.solve(sample)?;
        if self.policy == DivisionPolicy::Sentinel && !point.is_finite() {
            return Err(FractalError::DivisionByZero);
        }
        Ok(Classified { zero_index: closest_zero(point, &self.zeros)?, iterations })
    }

    fn row(&self, viewport : &Viewport, y : u32) -> Vec<Option<Classified>> {
        (0..viewport.width).map(|x| {
            match self.classify(viewport.sample(x, y)) {
                Ok(classified) => Some(classified),
                Err(e) => {
                    trace!("Pixel ({}, {}) failed: {}", x, y, e);
                    None
                }
            }
        }).collect()
    }

    /// Classify every pixel of the viewport, rows indexed by y. Failed
    /// pixels are None.
    pub fn classify_grid(&self, viewport : &Viewport) -> Vec<Vec<Option<Classified>>> {
        // Fill the derivative cache before any worker reads it
        self.polynomial.derivative();
        if self.parallel {
            (0..viewport.height).into_par_iter().map(|y| self.row(viewport, y)).collect()
        } else {
            (0..viewport.height).map(|y| self.row(viewport, y)).collect()
        }
    }

    fn pixel_colour(&self, pixel : &Option<Classified>, max_iter : usize) -> Rgb<u8> {
        let Some(classified) = pixel else {
            return self.palette.sentinel();
        };
        let colour = self.palette.colour(classified.zero_index, self.zeros.len());
        if self.convergence.is_some() && max_iter > 0 {
            let val = SHADE_FLOOR + (classified.iterations * (255 - SHADE_FLOOR)) / max_iter;
            scale_colour(val as u8, &colour)
        } else {
            colour
        }
    }

    /// Render to a sink sized however the caller likes; the window is
    /// fitted to the sink's dimensions.
    pub fn render<S : PixelSink>(&self, sink : &mut S) -> Result<()> {
        let (width, height) = sink.dimensions();
        let viewport = self.window.viewport(width, height)?;
        debug!("Rendering {}x{} over {:?}", width, height, viewport);
        let grid = self.classify_grid(&viewport);
        let max_iter = grid.iter().flatten().flatten().map(|c| c.iterations).max().unwrap_or(0);
        let failed = grid.iter().flatten().filter(|p| p.is_none()).count();
        if failed > 0 {
            debug!("{} pixels failed and were given the sentinel colour", failed);
        }
        for (y, row) in grid.iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                sink.set_pixel(x as u32, y as u32, self.pixel_colour(pixel, max_iter));
            }
        }
        Ok(())
    }

    pub fn make_image(&self) -> Result<RgbImage> {
        let mut img = RgbImage::new(self.resolution.0, self.resolution.1);
        self.render(&mut img)?;
        Ok(img)
    }
}

pub fn generate(input : &JsonValue) -> Result<RgbImage> {
    info!("Generating newton fractal image");
    let fractal = NewtonFractal::from_json(input)?;
    let polynomial = fractal.polynomial();
    info!("Polynomial: {}", polynomial);
    debug!("Degree {:?} with {} zeros to colour by", polynomial.degree(), fractal.zeros().len());
    fractal.make_image()
}
