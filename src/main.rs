use clap::{Parser, Subcommand};
use romtex::codec::{decode, encode};
use romtex::driver::{self, ExtractOptions, InjectOptions};
use romtex::format::FormatTag;
use romtex::image_io::{self, ResizeFilter};
use romtex::relocate;
use romtex::report::BatchReport;
use romtex::script;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "romtex", about = "Extract and re-inject packed textures in ROM images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every texture listed in a placement script to PNG
    Extract {
        #[arg(short, long)]
        script: PathBuf,
        #[arg(short, long)]
        container: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Directory for raw backups, relative to the output directory
        #[arg(long, default_value = driver::DEFAULT_BACKUP_DIR)]
        backup_dir: PathBuf,
        /// Skip writing raw backups
        #[arg(long)]
        no_backup: bool,
        /// Extract even if the output directory already has files
        #[arg(short, long)]
        force: bool,
        /// Write a JSON batch report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Encode edited PNGs and write them back into the container in place
    Inject {
        #[arg(short, long)]
        script: PathBuf,
        #[arg(short, long)]
        container: PathBuf,
        /// Root of the <dir>/<name>.png replacement images
        #[arg(short, long)]
        images: PathBuf,
        /// Filter used when an image does not match the placement size
        #[arg(short, long, value_enum, default_value_t = ResizeFilter::CatmullRom)]
        filter: ResizeFilter,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Decode a single raw block file to PNG
    Decode {
        input: PathBuf,
        #[arg(short, long)]
        format: String,
        /// Texture size as WxH
        #[arg(long, value_parser = parse_size)]
        size: (u32, u32),
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Encode a single image to a raw block file
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        format: String,
        /// Resize to WxH first (default: keep the image size)
        #[arg(long, value_parser = parse_size)]
        size: Option<(u32, u32)>,
        #[arg(long, value_enum, default_value_t = ResizeFilter::CatmullRom)]
        filter: ResizeFilter,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Find backed-up blocks in another container and rewrite the script
    Relocate {
        #[arg(short, long)]
        script: PathBuf,
        /// Directory of *.bin backups from an earlier extraction
        #[arg(short, long)]
        backups: PathBuf,
        #[arg(short, long)]
        container: PathBuf,
        /// Relocated script output
        #[arg(short, long)]
        output: PathBuf,
        /// Write a text scan report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List supported formats
    Formats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Cli::parse().command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { script, container, output_dir, backup_dir, no_backup, force, report } => {
            let records = script::parse_script_file(&script)?;
            let opts = ExtractOptions {
                output_dir,
                backup_dir,
                write_backup: !no_backup,
                overwrite:    force,
            };
            let batch = driver::extract_file(&container, &records, &opts)?;
            finish(&batch, report.as_deref())?;
        }

        // ── Inject ───────────────────────────────────────────────────────────
        Commands::Inject { script, container, images, filter, report } => {
            let records = script::parse_script_file(&script)?;
            let opts = InjectOptions { image_dir: images, filter };
            let batch = driver::inject_file(&container, &records, &opts)?;
            finish(&batch, report.as_deref())?;
        }

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { input, format, size: (w, h), output } => {
            let format = FormatTag::from_name(&format)?;
            let raw = std::fs::read(&input)?;
            let pixels = decode(&raw, w, h, format)?;
            image_io::save_png(&pixels, &output)?;
            println!("{} {}x{} -> {}", format, w, h, output.display());
        }

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode { input, format, size, filter, output } => {
            let format = FormatTag::from_name(&format)?;
            let (w, h) = match size {
                Some(s) => s,
                None => {
                    let px = image_io::load_image(&input)?;
                    (px.width(), px.height())
                }
            };
            let pixels = image_io::load_for_format(&input, format, w, h, filter)?;
            let raw = encode(&pixels, format)?;
            std::fs::write(&output, &raw)?;
            println!(
                "{} {}x{} -> {} ({} bytes, blake3 {})",
                format, w, h, output.display(), raw.len(),
                hex::encode(&blake3::hash(&raw).as_bytes()[..6]),
            );
        }

        // ── Relocate ─────────────────────────────────────────────────────────
        Commands::Relocate { script, backups, container, output, report } => {
            let records = script::parse_script_file(&script)?;
            let scan = relocate::scan_file(&container, &backups)?;
            let relocations = relocate::relocate_records(&records, &scan);
            std::fs::write(&output, relocate::render_relocated(&relocations))?;
            if let Some(path) = report {
                std::fs::write(&path, scan.render_text())?;
                println!("Scan report: {}", path.display());
            }
            let (placed, missing) = relocate::tally(&relocations);
            println!("{}", scan.summary());
            println!("Relocated {placed} record(s), {missing} missing -> {}", output.display());
        }

        // ── Formats ──────────────────────────────────────────────────────────
        Commands::Formats => {
            println!("{:<8} {:>6} {:>9} {:>6}  Alpha", "Format", "Bits", "Bytes/px", "Chans");
            for f in FormatTag::ALL {
                let alpha = match (f.has_alpha(), f.one_bit_alpha()) {
                    (false, _)    => "none",
                    (true, true)  => "1-bit",
                    (true, false) => "full",
                };
                println!("{:<8} {:>6} {:>9} {:>6}  {}",
                    f.name(), f.bits_per_pixel(), f.bytes_per_pixel(), f.channels(), alpha);
            }
            println!("(RGBA3 is accepted as an alias of RGBA16)");
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s.split_once('x').ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w, h))
}

fn finish(batch: &BatchReport, report: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    for r in batch.failures() {
        if let romtex::Outcome::Failed { reason } = &r.outcome {
            eprintln!("  failed  {}/{} @ 0x{:X}: {}", r.directory, r.name, r.address, reason);
        }
    }
    if let Some(path) = report {
        std::fs::write(path, batch.to_bytes()?)?;
        println!("Report: {}", path.display());
    }
    println!("{}", batch.summary());
    Ok(())
}
