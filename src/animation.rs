// Expand an animation job into one fractal job per frame
//
// Each modification sets a parameter of the base job to a polynomial in
// time, with time running over [0, 1) across the frames. This is how pans
// and zooms are made: animate origin_r/origin_i and range.

use json::JsonValue;
use num::complex::Complex64;

use crate::error::{FractalError, Result};
use crate::polynomial::Polynomial;

// A modification which sets the parameter at the given path to
// the result of evaluating polynomial with given coefficients at the
// given time
struct ModificationPoly {
    param_path : Vec<String>,
    polynomial : Polynomial,
    to_int : bool
}

fn set_json_param(
    root : &mut JsonValue,
    path : &[String],
    val : JsonValue
) {
    let name = &path[0];
    let child = if root.is_array() {
        let id = name.parse::<usize>().unwrap_or(0);
        &mut root[id]
    } else {
        &mut root[name.as_str()]
    };
    if path.len() == 1 {
        *child = val;
    } else {
        set_json_param(child, &path[1..], val);
    }
}

impl ModificationPoly {
    fn from_json(input : &JsonValue) -> Result<ModificationPoly> {
        let path_s = input["param"].as_str().filter(|s| !s.is_empty()).ok_or_else(
            || FractalError::invalid_config("modification is missing param")
        )?;
        let param_path = path_s.split('/').map(
            |str| str.to_string()
        ).collect();
        if !input["coeff"].is_array() {
            return Err(FractalError::invalid_config(format!("modification of {} is missing coeff", path_s)));
        }
        let coefficients = input["coeff"].members().rev().map(|i| {
            i.as_f64().map(|c| Complex64::new(c, 0.0)).ok_or_else(
                || FractalError::invalid_config(format!("coefficients of {} must be numbers", path_s))
            )
        }).collect::<Result<Vec<_>>>()?;
        Ok(ModificationPoly {
            param_path,
            polynomial: Polynomial::from_coefficients(coefficients),
            to_int: input["integral"].as_bool().unwrap_or(false)
        })
    }

    fn modify(&self, input : &mut JsonValue, time : f64) {
        set_json_param(
            input,
            &self.param_path,
            self.evaluate(time)
        )
    }

    fn evaluate(&self, time : f64) -> JsonValue {
        let acc = self.polynomial.at(Complex64::new(time, 0.0)).re;
        if self.to_int {
            JsonValue::from(acc.round() as i64)
        } else {
            JsonValue::from(acc)
        }
    }
}

pub fn make_frames(input : &JsonValue) -> Result<Vec<JsonValue>> {
    let base = &input["base"];
    if !base.is_object() {
        return Err(FractalError::invalid_config("animation is missing its base job"));
    }
    let frame_count = input["frames_count"].as_usize().unwrap_or(60);
    let per_frame = 1.0 / (frame_count as f64);
    if !input["mods"].is_array() {
        return Err(FractalError::invalid_config("Missing modifications"));
    }
    let mods = input["mods"].members().map(ModificationPoly::from_json).collect::<Result<Vec<_>>>()?;
    let frames = (0..frame_count).map(
        |i| {
            let mut frame = base.clone();
            let time = i as f64 * per_frame;
            for modification in mods.iter() {
                modification.modify(&mut frame, time);
            }
            frame
        }
    ).collect();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_zoom_frames() {
        let input = json::parse(r#"{
            "algorithm": "animation",
            "frames_count": 4,
            "base": {"algorithm": "newton-fractal", "range": 5, "zeros": [[1, 0], [-1, 0]]},
            "mods": [
                {"param": "range", "coeff": [-4, 5]},
                {"param": "iterations", "coeff": [40, 10], "integral": true}
            ]
        }"#).unwrap();
        let frames = make_frames(&input).unwrap();
        assert_eq!(frames.len(), 4);
        // range = 5 - 4t
        assert_abs_diff_eq!(frames[0]["range"].as_f64().unwrap(), 5.0);
        assert_abs_diff_eq!(frames[2]["range"].as_f64().unwrap(), 3.0);
        assert_eq!(frames[3]["iterations"].as_i64(), Some(40));
        assert_eq!(frames[1]["algorithm"].as_str(), Some("newton-fractal"));
        assert!(frames[1]["zeros"].is_array());
    }

    #[test]
    fn test_nested_path() {
        let input = json::parse(r#"{
            "frames_count": 2,
            "base": {"zeros": [[1, 0], [-1, 0]]},
            "mods": [{"param": "zeros/1/0", "coeff": [2, -1]}]
        }"#).unwrap();
        let frames = make_frames(&input).unwrap();
        assert_abs_diff_eq!(frames[0]["zeros"][1][0].as_f64().unwrap(), -1.0);
        assert_abs_diff_eq!(frames[1]["zeros"][1][0].as_f64().unwrap(), 0.0);
        assert_abs_diff_eq!(frames[1]["zeros"][0][0].as_f64().unwrap(), 1.0);
    }

    #[test]
    fn test_bad_animation() {
        let missing_base = json::parse(r#"{"mods": []}"#).unwrap();
        assert!(make_frames(&missing_base).is_err());
        let bad_mod = json::parse(r#"{"base": {}, "mods": [{"param": "range"}]}"#).unwrap();
        assert!(make_frames(&bad_mod).is_err());
        let bad_coeff = json::parse(r#"{"base": {}, "mods": [{"param": "range", "coeff": ["a"]}]}"#).unwrap();
        assert!(make_frames(&bad_coeff).is_err());
    }
}
