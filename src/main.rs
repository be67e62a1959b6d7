use bvh2mimic::diagnostics::{render_plot, ChannelSeries};
use bvh2mimic::error::{Error, Result};
use bvh2mimic::export::DocumentWriter;
use bvh2mimic::parse::load_bvh_from_file;
use bvh2mimic::retarget::{Options, Retargeter};
use bvh2mimic::rig::RigMapping;
use clap::Parser;
use log::{error, info, warn};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Convert .bvh motion capture files into DeepMimic humanoid motion files.
#[derive(Parser)]
#[command(name = "bvh2mimic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory scanned for .bvh files to convert
    #[arg(long, default_value = "./inputBvh")]
    input_dir: PathBuf,

    /// Directory the converted motion files are written to (cleared of files first)
    #[arg(long, default_value = "./OutputMimic")]
    output_dir: PathBuf,

    /// JSON file mapping humanoid joint names to bone names of the source rig
    #[arg(long, default_value = "./Rigs/humanoidRig.json")]
    rig: PathBuf,

    /// Replace the root position and rotation with fixed placeholder values
    #[arg(long)]
    lock_root_pose: bool,

    /// Joint whose raw rotation channels are plotted per converted file
    #[arg(long, default_value = "right hip")]
    plot_joint: String,

    /// Skip writing diagnostic plots
    #[arg(long)]
    no_plots: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let rig = match RigMapping::load(&cli.rig) {
        Ok(rig) => rig,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = clear_output_dir(&cli.output_dir) {
        error!("cannot prepare output directory {}: {e}", cli.output_dir.display());
        return ExitCode::FAILURE;
    }

    let inputs = match list_input_files(&cli.input_dir) {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("cannot list input directory {}: {e}", cli.input_dir.display());
            return ExitCode::FAILURE;
        }
    };
    if inputs.is_empty() {
        warn!("no input files in {}", cli.input_dir.display());
        return ExitCode::SUCCESS;
    }

    let options = Options {
        lock_root_pose: cli.lock_root_pose,
    };

    let mut failed = 0usize;
    for input in &inputs {
        info!("Converting: {:?}", input.display().to_string());
        match convert_file(input, &cli, &rig, options) {
            Ok(frames) => info!("wrote {frames} frames"),
            Err(e) => {
                error!("{}: {e}", input.display());
                failed += 1;
            }
        }
    }

    info!("converted {} of {} file(s)", inputs.len() - failed, inputs.len());
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Remove regular files left over from a previous run. Idempotent.
fn clear_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Regular files of the input directory, sorted for a stable conversion order.
fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Convert one .bvh file, returning the number of frames written.
fn convert_file(input: &Path, cli: &Cli, rig: &RigMapping, options: Options) -> Result<usize> {
    let (metadata, motion) = load_bvh_from_file(input)?;
    let retargeter = Retargeter::new(&metadata, rig, options)?;

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Io(std::io::Error::other("input path has no usable file name")))?;
    let out_path = cli.output_dir.join(format!("{file_name}.txt"));

    let plots_wanted = !cli.no_plots;
    let mut series = ChannelSeries::new(&cli.plot_joint);
    if plots_wanted && retargeter.rotation_columns(&cli.plot_joint).is_none() {
        warn!("plot joint {:?} has no rotation channels bound, skipping plot", cli.plot_joint);
    }

    // The document goes to a temp file first; an aborted conversion leaves
    // no partial output behind.
    let tmp = tempfile::NamedTempFile::new_in(&cli.output_dir)?;
    let mut writer = DocumentWriter::new(BufWriter::new(tmp));
    writer.begin()?;
    for frame in 0..metadata.num_frames {
        if plots_wanted {
            if let Some((x, y, z)) = retargeter.raw_rotation(&motion, frame, &cli.plot_joint) {
                series.push(x, y, z);
            }
        }
        let key_frame = retargeter.convert(&motion, frame)?;
        writer.frame(&key_frame)?;
    }
    let buffered = writer.finish()?;
    let tmp = buffered.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    tmp.persist(&out_path).map_err(|e| Error::Io(e.error))?;

    if plots_wanted && !series.is_empty() {
        let plot_path = cli.output_dir.join(format!("{file_name}.png"));
        if let Err(e) = render_plot(&series, &plot_path) {
            warn!("plot of {:?} for {file_name} failed: {e}", series.joint());
        }
    }
    Ok(metadata.num_frames)
}
