use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use vpcc_atlas::common::context::Context;
use vpcc_atlas::decoder::Decoder;
use vpcc_atlas::syntax::AtlasSyntax;
use vpcc_atlas::trace::TraceMode;
use vpcc_atlas::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Trace {
    Off,
    Log,
    File,
}

/// Rebuilds the patch frames of a V-PCC atlas sequence
#[derive(Parser)]
struct Args {
    /// Input atlas syntax, as JSON
    #[clap(short = 'i', long)]
    syntax_path: PathBuf,

    /// Output reconstructed patch frames, as JSON. Defaults to stdout
    #[clap(short = 'o', long)]
    reconstructed_data_path: Option<PathBuf>,

    /// Number of thread used for parallel processing
    #[clap(long, default_value_t = 1)]
    num_threads: usize,

    #[clap(long, default_value_t = false)]
    keep_intermediate_files: bool,

    /// Patch decoding trace. `file` writes it next to the input
    #[clap(long, value_enum, default_value_t = Trace::Off)]
    trace: Trace,

    /// Pretty print the output
    #[clap(long, default_value_t = false)]
    pretty: bool,
}

impl Args {
    fn params(&self) -> Params {
        let trace = match self.trace {
            Trace::Off => TraceMode::Off,
            Trace::Log => TraceMode::Log,
            Trace::File => TraceMode::File(self.syntax_path.clone()),
        };
        Params::new(self.syntax_path.clone())
            .with_trace(trace)
            .with_num_threads(self.num_threads)
            .with_keep_intermediate_files(self.keep_intermediate_files)
    }
}

fn reconstruct_patch_frames(args: &Args) -> anyhow::Result<()> {
    let syntax = AtlasSyntax::from_file(&args.syntax_path)
        .with_context(|| format!("reading atlas syntax {:?}", args.syntax_path))?;
    let mut context = Context::new(syntax);
    Decoder::new(args.params())
        .create_patch_frames(&mut context)
        .context("reconstructing patch frames")?;
    info!(
        "{} frames, {} patches",
        context.frames().len(),
        context.frames().iter().map(|f| f.patches.len()).sum::<usize>()
    );

    let mut writer: Box<dyn Write> = match &args.reconstructed_data_path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, context.frames())?;
    } else {
        serde_json::to_writer(&mut writer, context.frames())?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Args = Args::parse();
    if args.num_threads == 0 {
        anyhow::bail!("--num-threads must be at least 1");
    }
    reconstruct_patch_frames(&args)
}
