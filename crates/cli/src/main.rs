use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pathcut::commands::{
    blocks_command, callgraph_command, deps_command, dump_command, list_backends_command,
    locate_command, path_command, slice_command, BackendOptions, SliceArgs,
};
use pathcut::init_logging;

/// Whole-program path slicer.
///
/// This CLI is a thin wrapper around `pathcut-core` (exposed in code as `pathcut_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "pathcut",
    version,
    about = "Cut a program down to the call path reaching one source line",
    long_about = None
)]
struct Cli {
    /// Log every stage (debug level) to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct BackendArgs {
    /// Dependence backend to run (see `pathcut backends`).
    #[arg(long)]
    backend: Option<String>,

    /// Edge file exported by an external dependence engine; selects the `recorded` backend.
    #[arg(long)]
    dependencies: Option<String>,
}

impl From<BackendArgs> for BackendOptions {
    fn from(args: BackendArgs) -> Self {
        BackendOptions { backend: args.backend, dependencies: args.dependencies }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Slice a module: keep the path from the source function to the target line,
    /// remove everything else and instrument the target.
    Slice {
        /// Module document (JSON or YAML).
        #[arg(long)]
        module: String,

        /// Slice config file (JSON or YAML). Flags override its values.
        #[arg(long)]
        config: Option<String>,

        /// Source function (default: main).
        #[arg(long)]
        source: Option<String>,

        /// Target source file.
        #[arg(long)]
        file: Option<String>,

        /// Target source line.
        #[arg(long)]
        line: Option<u32>,

        /// Additional function that must never be removed. Repeatable.
        #[arg(long = "protect")]
        protect: Vec<String>,

        #[command(flatten)]
        backend: BackendArgs,

        /// Where to write the sliced module. Printed to stdout when omitted.
        #[arg(long)]
        output: Option<String>,

        /// Write a JSON run report to this path.
        #[arg(long)]
        report: Option<String>,

        /// Keep debug locations and intrinsics.
        #[arg(long, default_value_t = false)]
        no_strip: bool,
    },

    /// Print a module.
    Dump {
        #[arg(long)]
        module: String,

        /// Emit the JSON module document instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print dependency blocks.
    Blocks {
        #[arg(long)]
        module: String,

        /// Only this function.
        #[arg(long)]
        function: Option<String>,

        #[command(flatten)]
        backend: BackendArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print control and data dependencies per instruction.
    Deps {
        #[arg(long)]
        module: String,

        /// Only this function.
        #[arg(long)]
        function: Option<String>,

        #[command(flatten)]
        backend: BackendArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print block -> callee edges.
    Callgraph {
        #[arg(long)]
        module: String,

        #[command(flatten)]
        backend: BackendArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the instructions at a source location.
    Locate {
        #[arg(long)]
        module: String,

        #[arg(long)]
        file: String,

        #[arg(long)]
        line: u32,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the path to a source location without slicing.
    Path {
        #[arg(long)]
        module: String,

        /// Source function (default: main).
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        file: String,

        #[arg(long)]
        line: u32,

        #[command(flatten)]
        backend: BackendArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List available dependence backends.
    Backends {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Slice {
            module,
            config,
            source,
            file,
            line,
            protect,
            backend,
            output,
            report,
            no_strip,
        } => slice_command(&SliceArgs {
            module,
            config,
            source,
            file,
            line,
            protect,
            backend: backend.into(),
            output,
            report,
            no_strip,
            verbose: cli.verbose,
        })?,
        Command::Dump { module, json } => dump_command(&module, json)?,
        Command::Blocks { module, function, backend, json } => {
            blocks_command(&module, function.as_deref(), &backend.into(), json)?
        }
        Command::Deps { module, function, backend, json } => {
            deps_command(&module, function.as_deref(), &backend.into(), json)?
        }
        Command::Callgraph { module, backend, json } => {
            callgraph_command(&module, &backend.into(), json)?
        }
        Command::Locate { module, file, line, json } => {
            locate_command(&module, &file, line, json)?
        }
        Command::Path { module, source, file, line, backend, json } => {
            path_command(&module, source.as_deref(), &file, line, &backend.into(), json)?
        }
        Command::Backends { json } => list_backends_command(json)?,
    }

    Ok(())
}
