// Load a json file that specifies which newton fractal we are going to make
// and set's it's parameters

use std::fs::{self, create_dir_all};
use std::env;
use std::path::Path;

use image::RgbImage;
use json::JsonValue;
use log::info;

mod animation;
mod complex;
mod error;
mod fractal;
mod newton;
mod polynomial;

use error::{FractalError, Result};

fn make_directory_for_image(path_str : &str) -> Result<()> {
    let path = Path::new(path_str);
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    Ok(())
}

fn make_image(input : &JsonValue) -> Result<RgbImage> {
    let algorithm = input["algorithm"].as_str().unwrap_or("newton-fractal");
    match algorithm {
        "newton-fractal" => fractal::generate(input),
        _ => Err(FractalError::invalid_config(format!("Unknown algorithm {}", algorithm)))
    }
}

fn save_image(image : &RgbImage, path : &str) -> Result<()> {
    make_directory_for_image(path)?;
    image.save(path)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    // Get file to use else default
    let in_filename = env::args().nth(1).unwrap_or("input.json".to_string());
    let out_filename = env::args().nth(2).unwrap_or("output.png".to_string());
    info!("Loading input file: {}", in_filename);
    let contents = fs::read_to_string(&in_filename)?;
    info!("Parsing input file");
    let input = json::parse(&contents)?;
    let algorithm = input["algorithm"].as_str().unwrap_or("newton-fractal");
    let out_filename_base = out_filename.strip_suffix(".png").unwrap_or(&out_filename);
    if algorithm == "animation" {
        let frames = animation::make_frames(&input)?;
        for (i, frame) in frames.iter().enumerate() {
            info!("Frame {} of {}", i + 1, frames.len());
            let image = make_image(frame)?;
            save_image(&image, &format!("{}/{}.png", out_filename_base, i))?;
        }
    } else {
        let image = make_image(&input)?;
        info!("Writing output to {}", out_filename);
        save_image(&image, &out_filename)?;
    };
    Ok(())
}
