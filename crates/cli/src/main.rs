use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use object_detector_core::backend::infrastructure::hog_svm_backend::HogSvmBackend;
use object_detector_core::config::option_bag::OptionBag;
use object_detector_core::lifecycle::model_factory::ModelFactory;
use object_detector_core::shared::constants::IMAGE_EXTENSIONS;
use object_detector_core::shared::point::LandmarkPoint;
use object_detector_core::shared::rect::Rect;

/// Train and run sliding-window object detectors and landmark shape predictors.
#[derive(Parser)]
#[command(name = "object-detector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a detector from an imglab XML dataset and save it.
    TrainDetector {
        /// Dataset descriptor (imglab XML).
        dataset: PathBuf,

        /// Where to write the trained model.
        output: PathBuf,

        #[command(flatten)]
        training: TrainingOptions,

        /// Worker threads for feature extraction.
        #[arg(long)]
        threads: Option<u32>,

        /// Also render the learned template to this image file.
        #[arg(long)]
        visualize: Option<PathBuf>,
    },

    /// Detect objects in an image.
    Detect {
        /// Input image file.
        image: PathBuf,

        /// Trained detector; the default detector is used when omitted.
        #[arg(long)]
        model: Option<PathBuf>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Render a detector's feature template to an image file.
    Visualize {
        /// Output image file (.png, .jpg, ...).
        output: PathBuf,

        /// Trained detector; the default detector is rendered when omitted.
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Train a shape predictor from an imglab XML dataset and save it.
    TrainPredictor {
        /// Dataset descriptor (imglab XML) with part annotations.
        dataset: PathBuf,

        /// Where to write the trained model.
        output: PathBuf,

        #[command(flatten)]
        training: TrainingOptions,
    },

    /// Predict landmarks inside a region of an image.
    Predict {
        /// Trained shape predictor.
        model: PathBuf,

        /// Input image file.
        image: PathBuf,

        #[arg(long, allow_negative_numbers = true, required_unless_present = "region")]
        left: Option<i32>,

        #[arg(long, allow_negative_numbers = true, required_unless_present = "region")]
        top: Option<i32>,

        #[arg(long, allow_negative_numbers = true, required_unless_present = "region")]
        width: Option<i32>,

        #[arg(long, allow_negative_numbers = true, required_unless_present = "region")]
        height: Option<i32>,

        /// Region as a JSON object, e.g. '{"left":10,"top":10,"width":50,"height":50}'.
        #[arg(long, conflicts_with_all = ["left", "top", "width", "height"])]
        region: Option<String>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct TrainingOptions {
    /// Training options as a JSON object, e.g. '{"cascadeDepth":12}'.
    #[arg(long)]
    options: Option<String>,

    /// Read training options from a JSON file. Inline --options win.
    #[arg(long)]
    options_file: Option<PathBuf>,

    /// Do not log training progress.
    #[arg(long)]
    quiet: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let factory = ModelFactory::with_reference_backend();

    match cli.command {
        Command::TrainDetector {
            dataset,
            output,
            training,
            threads,
            visualize,
        } => {
            require_file(&dataset, "Dataset")?;
            if let Some(path) = &visualize {
                require_image_extension(path)?;
            }
            let mut bag = training.to_bag()?;
            if let Some(threads) = threads {
                bag.set("threadCount", threads);
            }
            run_train_detector(&factory, &dataset, &output, &bag, visualize.as_deref())
        }
        Command::Detect { image, model, json } => {
            require_file(&image, "Image")?;
            if let Some(model) = &model {
                require_file(model, "Model")?;
            }
            run_detect(&factory, &image, model.as_deref(), json)
        }
        Command::Visualize { output, model } => {
            require_image_extension(&output)?;
            if let Some(model) = &model {
                require_file(model, "Model")?;
            }
            let detector = factory.create_detector(model.as_deref())?;
            detector.save_visualization(&output)?;
            log::info!("Template written to {}", output.display());
            Ok(())
        }
        Command::TrainPredictor {
            dataset,
            output,
            training,
        } => {
            require_file(&dataset, "Dataset")?;
            let bag = training.to_bag()?;
            let predictor = factory.train_predictor(&dataset, Some(&bag))?;
            predictor.save(&output)?;
            log::info!("Shape predictor written to {}", output.display());
            Ok(())
        }
        Command::Predict {
            model,
            image,
            left,
            top,
            width,
            height,
            region,
            json,
        } => {
            require_file(&model, "Model")?;
            require_file(&image, "Image")?;
            let region = parse_region(region.as_deref(), [left, top, width, height])?;
            let predictor = factory.create_predictor(Some(&model))?;
            let points = predictor.predict_shape(&image, &region)?;
            print_points(&points, json)
        }
    }
}

fn run_train_detector(
    factory: &ModelFactory<HogSvmBackend>,
    dataset: &Path,
    output: &Path,
    options: &OptionBag,
    visualize: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = factory.train_detector(dataset, Some(options))?;
    detector.save(output)?;
    log::info!("Detector written to {}", output.display());

    if let Some(path) = visualize {
        detector.save_visualization(path)?;
        log::info!("Template written to {}", path.display());
    }
    Ok(())
}

fn run_detect(
    factory: &ModelFactory<HogSvmBackend>,
    image: &Path,
    model: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = factory.create_detector(model)?;
    let rects = detector.detect(image)?;
    if json {
        println!("{}", serde_json::to_string(&rects)?);
    } else {
        for r in &rects {
            println!("{} {} {} {}", r.left, r.top, r.width, r.height);
        }
    }
    log::info!("Found {} objects in {}", rects.len(), image.display());
    Ok(())
}

fn print_points(points: &[LandmarkPoint], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(points)?);
    } else {
        for p in points {
            println!("{} {} {:.6} {:.6}", p.x, p.y, p.x_scaled, p.y_scaled);
        }
    }
    Ok(())
}

/// Reads the region from `--region` JSON, or from the four edge flags.
fn parse_region(
    json: Option<&str>,
    edges: [Option<i32>; 4],
) -> Result<Rect, Box<dyn std::error::Error>> {
    if let Some(text) = json {
        let value: serde_json::Value = serde_json::from_str(text)?;
        return Ok(Rect::from_json(&value)?);
    }
    match edges {
        [Some(left), Some(top), Some(width), Some(height)] => {
            Ok(Rect::new(left, top, width, height))
        }
        _ => Err("Region requires --left, --top, --width and --height, or --region".into()),
    }
}

impl TrainingOptions {
    /// File options first, inline options on top, then `--quiet`.
    fn to_bag(&self) -> Result<OptionBag, Box<dyn std::error::Error>> {
        let mut bag = OptionBag::new();
        if let Some(path) = &self.options_file {
            require_file(path, "Options file")?;
            let text = std::fs::read_to_string(path)?;
            bag.merge(OptionBag::from_json_str(&text)?);
        }
        if let Some(inline) = &self.options {
            bag.merge(OptionBag::from_json_str(inline)?);
        }
        if self.quiet {
            bag.set("verbose", false);
        }
        Ok(bag)
    }
}

fn require_file(path: &Path, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("{what} not found: {}", path.display()).into());
    }
    Ok(())
}

fn require_image_extension(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !is_image(path) {
        return Err(format!(
            "Output must be an image file ({}), got {}",
            IMAGE_EXTENSIONS.join(", "),
            path.display()
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
