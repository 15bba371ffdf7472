//! Conditional GAN for handwritten digits
//!
//! Main entry point providing CLI interface for:
//! - Training the conditional GAN on MNIST
//! - Generating digit grids from a trained generator
//! - Writing the default configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mnist_cgan::{
    conditioning::ConditioningBatch,
    data::{DataLoader, MnistDataset},
    model::ConditionalGan,
    training::Trainer,
    utils::{
        ensure_config_exists, load_checkpoint_meta, render_grid, visualization::save_png, Config,
        FileCheckpointWriter, PngSampleWriter, GENERATOR_FILE,
    },
};

/// Conditional GAN for handwritten digits
#[derive(Parser)]
#[command(name = "mnist_cgan")]
#[command(version = "0.1.0")]
#[command(about = "Train a label-conditioned GAN on MNIST and generate digits")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the conditional GAN
    Train {
        /// Directory with the MNIST IDX files
        #[arg(short, long)]
        data: Option<String>,

        /// Number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Directory for sample grids
        #[arg(long)]
        images: Option<String>,

        /// Directory for checkpoints
        #[arg(long)]
        checkpoints: Option<String>,

        /// Use only the first N training images
        #[arg(long)]
        limit: Option<usize>,

        /// Use GPU if available
        #[arg(long)]
        gpu: bool,
    },

    /// Generate a grid of digits from a trained generator
    Generate {
        /// Checkpoint directory holding generator.pt
        #[arg(short, long, default_value = "checkpoints")]
        model: String,

        /// Number of digits in the grid
        #[arg(short, long, default_value = "32")]
        num_samples: usize,

        /// Generate only this digit instead of cycling through all classes
        #[arg(short, long)]
        digit: Option<i64>,

        /// Random seed for the noise
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Output PNG file
        #[arg(short, long, default_value = "samples.png")]
        output: String,
    },

    /// Initialize default configuration file
    InitConfig {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data,
            epochs,
            seed,
            images,
            checkpoints,
            limit,
            gpu,
        } => {
            let mut config = ensure_config_exists(&cli.config)?;
            if let Some(data) = data {
                config.data.data_dir = data;
            }
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(seed) = seed {
                config.training.seed = seed;
            }
            if let Some(images) = images {
                config.training.image_output_path = images;
            }
            if let Some(checkpoints) = checkpoints {
                config.training.checkpoint_dir = checkpoints;
            }
            if limit.is_some() {
                config.data.train_limit = limit;
            }
            if gpu {
                config.training.device = "cuda".to_string();
            }
            train_model(&config)?;
        }
        Commands::Generate {
            model,
            num_samples,
            digit,
            seed,
            output,
        } => {
            let config = ensure_config_exists(&cli.config)?;
            generate_samples(&config, &model, num_samples, digit, seed, &output)?;
        }
        Commands::InitConfig { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

/// Train the conditional GAN
fn train_model(config: &Config) -> Result<()> {
    config.validate()?;

    let device = config.get_device();
    info!("Using device: {:?}", device);

    tch::manual_seed(config.training.seed as i64);

    info!("Loading MNIST from {}", config.data.data_dir);
    let mut dataset = MnistDataset::load_train(&config.data.data_dir)?;
    if let Some(limit) = config.data.train_limit {
        dataset = dataset.truncate(limit);
    }
    info!(
        "Loaded {} images of {}x{}",
        dataset.len(),
        dataset.height(),
        dataset.width()
    );

    let mut data_loader =
        DataLoader::from_dataset(&dataset, config.training.batch_size, config.training.seed);

    let mut model = ConditionalGan::new(config.model_config(), device)?;
    let mut samples = PngSampleWriter::new(&config.training.image_output_path);
    let mut checkpoints = FileCheckpointWriter::new(&config.training.checkpoint_dir);

    let mut trainer = Trainer::new(config.training_config());
    let metrics = trainer.train(&mut model, &mut data_loader, &mut samples, &mut checkpoints)?;

    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0)
    );

    let metrics_path = config.metrics_path();
    metrics.save_csv(&metrics_path.to_string_lossy())?;
    info!("Saved metrics to {}", metrics_path.display());

    Ok(())
}

/// Generate a grid of digits from a trained generator
fn generate_samples(
    config: &Config,
    model_dir: &str,
    num_samples: usize,
    digit: Option<i64>,
    seed: u64,
    output_path: &str,
) -> Result<()> {
    let device = config.get_device();
    tch::manual_seed(seed as i64);

    let mut model = ConditionalGan::new(config.model_config(), device)?;

    match load_checkpoint_meta(model_dir) {
        Ok(meta) => {
            info!("Checkpoint from epoch {} ({})", meta.epoch, meta.timestamp);
            if (meta.z_dim, meta.class_num) != (model.z_dim(), model.class_num()) {
                warn!(
                    "Checkpoint was trained with z_dim={} class_num={}, config has z_dim={} class_num={}",
                    meta.z_dim,
                    meta.class_num,
                    model.z_dim(),
                    model.class_num()
                );
            }
        }
        Err(e) => warn!("No checkpoint metadata: {}", e),
    }

    let gen_path = Path::new(model_dir).join(GENERATOR_FILE);
    model.load_generator(&gen_path.to_string_lossy())?;
    info!("Loaded generator from {}", gen_path.display());

    let mut rng = StdRng::seed_from_u64(seed);
    let inputs = match digit {
        Some(digit) => {
            let noise = model.sampler().sample_noise(&mut rng, num_samples);
            ConditioningBatch::new(&noise, vec![digit; num_samples], model.encoder(), device)?
        }
        None => ConditioningBatch::cycling(model.sampler(), model.encoder(), &mut rng, num_samples, device)?,
    };

    info!("Generating {} digits", num_samples);
    let images = model.generate(&inputs);
    let grid = render_grid(&images)?;

    if let Some(parent) = Path::new(output_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    save_png(&grid, output_path)?;
    info!("Saved digit grid to {}", output_path);

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();

    if output_path.ends_with(".toml") {
        config.save_toml(output_path)?;
    } else {
        config.save_json(output_path)?;
    }

    info!("Created default configuration at {}", output_path);
    Ok(())
}
