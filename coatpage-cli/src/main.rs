use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coatpage_core::{
    ConfigManager, ConsoleInput, InputProvider, JsonSourceReader, MemoryWorkbook, PresetInput,
    ReportProcessor, RunConfig, RunMode, RunReport,
};

#[derive(Parser)]
#[command(name = "coatpage")]
#[command(about = "Distribute coating-thickness inspection records onto paginated report sheets")]
struct Args {
    /// Path to the source rows (JSON row array or table object)
    #[arg(short, long)]
    input: Option<String>,

    /// Path to a run config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Run mode: date_buckets, floor_breaks, single_day or floor_date_plan (or 1-4)
    #[arg(short, long)]
    mode: Option<String>,

    /// Built-in preset to start from (see --show-configs)
    #[arg(long)]
    preset: Option<String>,

    /// Report output path (stdout if not specified)
    #[arg(short, long)]
    output: Option<String>,

    /// Also write the filled in-memory workbook to this path
    #[arg(long)]
    workbook: Option<String>,

    /// Ask every question on the terminal instead of reading it from the config
    #[arg(long)]
    interactive: bool,

    /// Enable per-step timings
    #[arg(long)]
    profile: bool,

    /// Show the built-in presets and exit
    #[arg(long)]
    show_configs: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.show_configs {
        return show_configs();
    }

    let Some(input_path) = args.input.as_deref() else {
        anyhow::bail!("--input is required (use --show-configs to list presets)");
    };
    if !Path::new(input_path).exists() {
        anyhow::bail!("Input rows not found at: {input_path}");
    }
    if !JsonSourceReader::supports_file_type(Path::new(input_path)) {
        warn!("⚠️  {} does not look like a JSON file, trying anyway", input_path);
    }

    let mut config = load_config(&args)?;
    if let Some(mode) = &args.mode {
        config.mode = mode.parse::<RunMode>()?;
    }
    info!("📋 Mode: {}", config.mode);

    let mut workbook = build_workbook(&config);
    let mut processor = ReportProcessor::new(Box::new(JsonSourceReader::new(input_path)));
    let mode = config.mode;

    let report = if args.interactive {
        let stdin = io::stdin();
        let mut console = ConsoleInput::new(stdin.lock(), io::stdout());
        run(&mut processor, mode, &mut console, &mut workbook, args.profile)?
    } else {
        let mut preset = PresetInput::new(config);
        run(&mut processor, mode, &mut preset, &mut workbook, args.profile)?
    };

    print_summary(&report);
    save_json(&report, args.output.as_deref())?;
    if let Some(path) = &args.workbook {
        save_json(&workbook, Some(path))?;
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<RunConfig> {
    if let Some(name) = &args.preset {
        let manager = ConfigManager::new();
        let config = manager
            .get_config(name)
            .cloned()
            .with_context(|| format!("Unknown preset '{name}'"))?;
        info!("📋 Using preset: {}", name);
        return Ok(config);
    }
    match &args.config {
        Some(path) => {
            let config = RunConfig::load_from_file(path)?;
            info!("📋 Loaded config from: {}", path);
            Ok(config)
        }
        None => {
            info!("📋 Using default config");
            Ok(RunConfig::default())
        }
    }
}

fn build_workbook(config: &RunConfig) -> MemoryWorkbook {
    if config.templates.is_empty() {
        return MemoryWorkbook::standard_template();
    }
    let mut workbook = MemoryWorkbook::new();
    for title in &config.templates {
        workbook.add_page(title);
    }
    workbook
}

fn run(
    processor: &mut ReportProcessor,
    mode: RunMode,
    input: &mut dyn InputProvider,
    workbook: &mut MemoryWorkbook,
    profile: bool,
) -> Result<RunReport> {
    processor
        .run(mode, input, workbook, profile)
        .context("Run failed")
}

fn print_summary(report: &RunReport) {
    info!("✅ Run complete");
    info!("📊 Report metrics:");
    info!("   - Components: {}", report.entity_count);
    info!("   - Buckets: {}", report.buckets.len());
    info!("   - Pages written: {}", report.pages.len());
    info!("   - Pages deleted: {}", report.deleted_pages.len());
    info!(
        "   - Validation: {} issues, quality {:.2}",
        report.validation.issues.len(),
        report.validation.quality_score
    );
    for warning in &report.warnings {
        warn!("⚠️  {}", warning);
    }
}

fn save_json<T: serde::Serialize>(value: &T, path: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
            info!("💾 Saved to: {}", path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn show_configs() -> Result<()> {
    let manager = ConfigManager::new();
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "📋 Built-in presets (use --preset <name>):")?;
    for name in manager.names() {
        if let Some(config) = manager.get_config(name) {
            writeln!(stdout, "\n## {name}")?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(config)?)?;
        }
    }
    writeln!(stdout, "\n📝 Usage examples:")?;
    writeln!(stdout, "  coatpage -i rows.json --mode single_day")?;
    writeln!(stdout, "  coatpage -i rows.json -c run.yaml -o report.json")?;
    writeln!(stdout, "  coatpage -i rows.json --interactive --mode 2")?;
    Ok(())
}
