// Exliar Compat command line entry point

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exliar_compat::config::{Config, MatchMode, DEFAULT_CONFIG_FILE};
use exliar_compat::core::probe::{HostProbe, SystemProbe};
use exliar_compat::core::readiness::{run_suite, Suite};
use exliar_compat::core::vfio::{
    merge_vfio_conf, modprobe_options_line, passthrough_candidates, unique_ids, vfio_kernel_arg,
};
use exliar_compat::gpu::classify::{classify, classify_text, normalize_manual_model};
use exliar_compat::gpu::detection::detect_gpus;
use exliar_compat::gpu::table::CompatibilityTable;
use exliar_compat::ui::{self, report::{self, ReportStyle}};
use exliar_compat::usb::{apply_to_script, locate_boot_script, parse_lsusb, UsbSelection};

/// macOS GPU compatibility and KVM/VFIO passthrough readiness
#[derive(Parser, Debug)]
#[command(name = "exliar-compat", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Print reports without colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify the host's GPUs against the compatibility table
    Gpu(GpuArgs),
    /// Run a readiness check suite
    Check {
        #[arg(value_enum)]
        suite: SuiteArg,
    },
    /// List USB devices and write passthrough flags into a boot script
    Usb(UsbArgs),
    /// Show the vfio-pci ids of display and audio functions
    VfioIds {
        /// Also print /etc/modprobe.d/vfio.conf with the ids merged in
        #[arg(long)]
        conf: bool,
    },
    /// Write the effective configuration to the config file
    InitConfig,
    /// Open the interactive dashboard (default)
    Tui,
}

#[derive(Args, Debug)]
struct GpuArgs {
    /// Look up a model by name instead of detecting ("RX 580", "GTX 1080")
    #[arg(long, value_name = "MODEL", conflicts_with = "force")]
    model: Option<String>,

    /// Use this exact string as the detected device text
    #[arg(long, value_name = "TEXT")]
    force: Option<String>,

    /// Compatibility table to use instead of the configured one
    #[arg(long, value_name = "FILE")]
    table: Option<PathBuf>,

    /// Match each detected device separately
    #[arg(long)]
    per_device: bool,

    /// Also match records by exact vendor:device id
    #[arg(long)]
    strict_ids: bool,
}

#[derive(Args, Debug)]
struct UsbArgs {
    /// Toggle devices by list number; may be repeated
    #[arg(long = "select", value_name = "N")]
    select: Vec<usize>,

    /// Boot script to write the flags into
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Write the flags into the configured AutoPilot boot script
    #[arg(long, conflicts_with = "script")]
    write: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SuiteArg {
    Kvm,
    Vfio,
    Usb,
}

impl From<SuiteArg> for Suite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Kvm => Suite::Kvm,
            SuiteArg::Vfio => Suite::Vfio,
            SuiteArg::Usb => Suite::Usb,
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `--debug` wins over `RUST_LOG`; the default only shows warnings.
/// Logs go to stderr so reports on stdout stay clean.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("exliar_compat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("exliar_compat=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!("exliar-compat {} starting with args: {:?}", exliar_compat::VERSION, cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let style = if cli.no_color || !std::io::stdout().is_terminal() {
        ReportStyle::plain()
    } else {
        ReportStyle::colored()
    };

    match cli.command {
        None | Some(Commands::Tui) => ui::run_tui(config).context("running the dashboard"),
        Some(Commands::Gpu(args)) => run_gpu(args, config, &style),
        Some(Commands::Check { suite }) => {
            let report = run_suite(suite.into(), &config, &HostProbe);
            print!("{}", report::render_readiness(&report, &style));
            Ok(())
        }
        Some(Commands::Usb(args)) => run_usb(args, &config, &style),
        Some(Commands::VfioIds { conf }) => run_vfio_ids(conf, &HostProbe),
        Some(Commands::InitConfig) => {
            config
                .save(&config_path)
                .with_context(|| format!("writing configuration to {}", config_path.display()))?;
            println!("Wrote {}", config_path.display());
            Ok(())
        }
    }
}

fn run_gpu(args: GpuArgs, mut config: Config, style: &ReportStyle) -> anyhow::Result<()> {
    if let Some(table) = args.table {
        config.gpu_table = Some(table);
    }
    if args.per_device {
        config.match_mode = MatchMode::PerDevice;
    }
    config.strict_ids |= args.strict_ids;

    let table = CompatibilityTable::load(&config).context("loading the GPU compatibility table")?;

    let reports = if let Some(forced) = args.force {
        classify_text(&forced, &table, &config)
    } else if let Some(model) = args.model {
        classify_text(&normalize_manual_model(&model), &table, &config)
    } else {
        classify(&detect_gpus(&HostProbe), &table, &config)
    };

    print!("{}", report::render_compatibility_list(&reports, style));
    Ok(())
}

fn run_usb(args: UsbArgs, config: &Config, style: &ReportStyle) -> anyhow::Result<()> {
    let output = HostProbe.run("lsusb", &[]).context("listing USB devices")?;
    let mut selection = UsbSelection::new(parse_lsusb(&output.stdout));
    for number in &args.select {
        selection.toggle(*number)?;
    }
    print!("{}", report::render_usb_selection(&selection, style));

    let target = match (args.script, args.write) {
        (Some(script), _) => Some(script),
        (None, true) => Some(
            locate_boot_script(&config.repo_root)
                .ok_or_else(|| anyhow!("no AutoPilot boot script configured under {}", config.repo_root.display()))?,
        ),
        (None, false) => None,
    };

    if let Some(script) = target {
        let flags = selection.qemu_flags();
        if flags.is_empty() {
            return Err(anyhow!("no USB devices selected; use --select N"));
        }
        let backup = apply_to_script(&script, &flags)?;
        println!("\nWrote {} flag(s) to {} (backup {})", flags.len(), script.display(), backup.display());
    }
    Ok(())
}

fn run_vfio_ids(conf: bool, probe: &dyn SystemProbe) -> anyhow::Result<()> {
    let output = probe.run("lspci", &["-nn"]).context("listing PCI devices")?;
    let candidates = passthrough_candidates(&output.stdout);
    if candidates.is_empty() {
        println!("No display or audio functions found.");
        return Ok(());
    }

    for candidate in &candidates {
        println!("{}  [{}]  {}", candidate.bdf, candidate.id, candidate.description);
    }
    let ids = unique_ids(&candidates);
    println!("\nKernel parameter: {}", vfio_kernel_arg(&ids));

    if conf {
        let current = probe
            .read_file(Path::new("/etc/modprobe.d/vfio.conf"))
            .unwrap_or_default();
        println!("\n/etc/modprobe.d/vfio.conf:\n{}", merge_vfio_conf(&current, &ids));
    } else {
        println!("Modprobe option:  {}", modprobe_options_line(&ids));
    }
    Ok(())
}
