//! techno - generate, list and inspect procedural techno tracks

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use techno::analysis::analyze;
use techno::gen::{ModelGenerator, SynthGenerator};
use techno::mix::Subgenre;
use techno::phrase::Element;
use techno::preset;
use techno::presets::Primitive;
use techno::reader::read_wav;
use techno::render::write_wav;
use techno::structure::{TrackComposer, TrackStructure};

#[derive(Parser)]
#[command(name = "techno")]
#[command(about = "Procedural techno from synthesized primitives", long_about = None)]
struct Cli {
    /// Number of threads for parallel rendering (default: 4)
    #[arg(short = 't', long, default_value = "4", global = true)]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a track from scratch
    Generate {
        #[arg(short, long, value_enum, default_value = "minimal")]
        subgenre: Subgenre,

        /// Override the preset tempo
        #[arg(short, long)]
        bpm: Option<u32>,

        /// Output WAV file path
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,

        /// Seed for the noise sources, for repeatable renders
        #[arg(long)]
        seed: Option<u64>,

        /// JSON track structure used instead of the subgenre template
        #[arg(long)]
        structure: Option<PathBuf>,
    },

    /// Render kick, bass and hat stems, from the model program when available
    Stems {
        #[arg(short, long, value_enum, default_value = "minimal")]
        subgenre: Subgenre,

        /// Stem length in bars
        #[arg(long, default_value = "8")]
        bars: u32,

        /// Directory the stems are written to
        #[arg(short, long, default_value = "stems")]
        output_dir: PathBuf,

        /// Model size passed to the model program
        #[arg(long, default_value = "small")]
        model: String,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// List available presets
    ListPresets,

    /// Show how the energy of a WAV file spreads over the frequency bands
    Analyze {
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run(cli: Cli) -> techno::Result<()> {
    match cli.command {
        Commands::Generate { subgenre, bpm, output, seed, structure } => {
            let preset = preset::load(subgenre)?.with_bpm(bpm);
            preset.validate()?;
            println!("Generating {} techno track...", subgenre);

            let mixer = subgenre.mixer(Some(preset.bpm as f64), seed)?;
            let track = match structure {
                Some(path) => {
                    let structure = TrackStructure::from_file(&path)?;
                    info!(path = %path.display(), name = %structure.name, "custom structure");
                    let composed = TrackComposer::new(mixer.phrase()).compose(&structure)?;
                    mixer.apply_processing(composed)?
                }
                None => mixer.create_track()?,
            };

            write_wav(&output, &track)?;
            println!("Track saved to {}", output.display());
            println!("   Duration: {:.1}s", track.duration_ms() / 1000.0);
            println!("   BPM: {}", preset.bpm);
        }
        Commands::Stems { subgenre, bars, output_dir, model, seed } => {
            let preset = preset::load(subgenre)?;
            let ctx = Primitive::new(preset.bpm as f64)?.with_seed(seed);
            let synth = SynthGenerator::new(ctx);
            let generator = ModelGenerator { model, ..ModelGenerator::from_env() };
            for element in Element::ALL {
                let prompt = format!("{} techno {} loop, {} bpm", subgenre, element.name(), preset.bpm);
                let stem = generator.stem_or_synth(element, &prompt, bars, &synth, &output_dir)?;
                let path = output_dir.join(format!("{}.wav", element.name()));
                write_wav(&path, &stem)?;
                println!("{:5} -> {} ({:.1}s)", element.name(), path.display(), stem.duration_ms() / 1000.0);
            }
        }
        Commands::ListPresets => {
            println!("\nAvailable presets:\n");
            for (_, p) in preset::list_from(&preset::preset_dir())? {
                println!("  * {}", p.name);
                println!("    {}", p.description);
                println!("    BPM: {}\n", p.bpm);
            }
        }
        Commands::Analyze { file, json } => {
            let report = analyze(&read_wav(&file)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nAnalyzing {}...\n", file.display());
                println!("Frequency distribution:");
                for (band, pct) in report.iter() {
                    let bar = "█".repeat((pct / 2.0) as usize);
                    println!("  {:12} {:40} {:.1}%", band.name, bar, pct);
                }
            }
        }
    }
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global() {
        eprintln!("Failed to initialize thread pool: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
