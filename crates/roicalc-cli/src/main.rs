use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use roicalc_engine::{
    AssumptionField, CalculationResult, Category, EngineConfig, InitialState, InputField,
    RoiAssumptions, RoiEngine, RoiInputs, WorkbookSource,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roicalc", version, about = "Evaluate the ROI spreadsheet model")]
struct Cli {
    /// Workbook URL (http, https, file) or local path.
    #[arg(
        long,
        global = true,
        env = "ROICALC_WORKBOOK",
        default_value = "roi_model.xlsx"
    )]
    workbook: String,

    /// Additional field schema (YAML). May be repeated.
    #[arg(long = "schema", global = true, value_name = "FILE")]
    schemas: Vec<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// HTTP timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Print machine-readable JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the inputs and assumptions authored in the workbook.
    Init,
    /// Run a calculation, starting from the workbook defaults.
    Calc(CalcArgs),
    /// List registered workbook layouts.
    Schemas,
}

#[derive(Parser, Debug)]
struct CalcArgs {
    /// Input override, e.g. `developers=120` or `pctTicketsMigrated=40`.
    #[arg(long = "input", value_name = "KEY=VALUE")]
    inputs: Vec<String>,

    /// Assumption override, e.g. `licenseCost=90000`.
    #[arg(long = "assume", value_name = "KEY=VALUE")]
    assumptions: Vec<String>,

    /// JSON file with `inputs` and/or `assumptions` objects; flags win over file values.
    #[arg(long)]
    inputs_file: Option<PathBuf>,

    /// Skip range checks before calculating.
    #[arg(long)]
    no_validate: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct OverrideFile {
    inputs: BTreeMap<String, f64>,
    assumptions: BTreeMap<String, f64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = build_config(&cli)?;
    match &cli.command {
        Command::Schemas => {
            print_schemas(&config);
            Ok(())
        }
        Command::Init => {
            let engine = open(&cli, config).await?;
            let initial = engine.initial_state()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&initial)?);
            } else {
                print_initial(&engine, &initial);
            }
            Ok(())
        }
        Command::Calc(args) => {
            let mut engine = open(&cli, config).await?;
            let initial = engine.initial_state()?;
            let (inputs, assumptions) = apply_overrides(initial, args).await?;

            // Let the runtime flush pending work before the synchronous recalculation.
            tokio::task::yield_now().await;
            let result = if args.no_validate {
                engine.calculate(&inputs, &assumptions)?
            } else {
                engine.calculate_checked(&inputs, &assumptions)?
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::default().with_timeout(Duration::from_secs(cli.timeout));
    for path in &cli.schemas {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        config = config
            .with_schema_yaml(&yaml)
            .with_context(|| format!("invalid schema {}", path.display()))?;
    }
    Ok(config)
}

async fn open(cli: &Cli, config: EngineConfig) -> Result<RoiEngine> {
    let source = WorkbookSource::parse(&cli.workbook);
    RoiEngine::open_with(config, source)
        .await
        .with_context(|| format!("failed to load workbook {}", cli.workbook))
}

async fn apply_overrides(
    initial: InitialState,
    args: &CalcArgs,
) -> Result<(RoiInputs, RoiAssumptions)> {
    let InitialState {
        mut inputs,
        mut assumptions,
    } = initial;

    if let Some(path) = &args.inputs_file {
        let file = read_override_file(path).await?;
        for (key, value) in &file.inputs {
            inputs.set(input_field(key)?, *value);
        }
        for (key, value) in &file.assumptions {
            assumptions.set(assumption_field(key)?, *value);
        }
    }
    for pair in &args.inputs {
        let (key, value) = parse_assignment(pair)?;
        inputs.set(input_field(key)?, value);
    }
    for pair in &args.assumptions {
        let (key, value) = parse_assignment(pair)?;
        assumptions.set(assumption_field(key)?, value);
    }
    Ok((inputs, assumptions))
}

async fn read_override_file(path: &Path) -> Result<OverrideFile> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid inputs file {}", path.display()))
}

fn parse_assignment(pair: &str) -> Result<(&str, f64)> {
    let Some((key, value)) = pair.split_once('=') else {
        bail!("expected KEY=VALUE, got `{pair}`");
    };
    let value = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("`{key}` needs a numeric value, got `{value}`"))?;
    Ok((key.trim(), value))
}

fn input_field(key: &str) -> Result<InputField> {
    match InputField::from_key(key) {
        Some(field) => Ok(field),
        None => bail!(
            "unknown input `{key}` (expected one of: {})",
            InputField::ALL.map(InputField::key).join(", ")
        ),
    }
}

fn assumption_field(key: &str) -> Result<AssumptionField> {
    match AssumptionField::from_key(key) {
        Some(field) => Ok(field),
        None => bail!(
            "unknown assumption `{key}` (expected one of: {})",
            AssumptionField::ALL.map(AssumptionField::key).join(", ")
        ),
    }
}

fn print_schemas(config: &EngineConfig) {
    for schema in config.registry.iter() {
        println!(
            "{} (v{}): {}",
            schema.id,
            schema.version,
            schema.marker.describe()
        );
        if let Some(description) = &schema.description {
            println!("    {description}");
        }
    }
}

fn print_initial(engine: &RoiEngine, initial: &InitialState) {
    if let Some(schema) = engine.schema() {
        println!("Layout: {} (v{})", schema.id, schema.version);
    }
    println!("Inputs:");
    for field in InputField::ALL {
        println!(
            "  {:<34} {:>14}   {}",
            field.key(),
            format_number(initial.inputs.get(field)),
            field.label()
        );
    }
    println!("Assumptions:");
    for field in AssumptionField::ALL {
        println!(
            "  {:<34} {:>14}   {}",
            field.key(),
            format_number(initial.assumptions.get(field)),
            field.label()
        );
    }
    if let Some(report) = engine.calibration() {
        for field in report.ambiguous() {
            println!("note: percent storage for `{field}` was guessed (default is 0)");
        }
    }
}

fn print_result(result: &CalculationResult) {
    println!(
        "Total time saved:   {} hours / year",
        format_hours(result.totals.hours_saved)
    );
    println!(
        "Total savings:      {} / year",
        format_currency(result.totals.dollars_saved)
    );
    match result.payback_month() {
        Some(month) => println!("Payback:            month {}", format_number(month)),
        None => println!("Payback:            not within 36 months"),
    }
    println!();
    for category in Category::ALL {
        let r = result.category(category);
        println!(
            "  {:<36} {:>12} h {:>14}",
            category.title(),
            format_hours(r.hours_saved),
            format_currency(r.dollars_saved)
        );
    }
    println!();
    println!("Cumulative return:");
    for point in &result.monthly {
        println!(
            "  month {:>3} {:>16}",
            format_number(point.month),
            format_currency(point.roi)
        );
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `decimals` places, trailing zeros trimmed, thousands grouped.
fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let text = format!("{:.*}", decimals, value.abs());
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    let sign = if value < 0.0 && text.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{}", group_thousands(int))
    } else {
        format!("{sign}{}.{frac}", group_thousands(int))
    }
}

fn format_number(value: f64) -> String {
    format_fixed(value, 2)
}

fn format_hours(value: f64) -> String {
    format_fixed(value, 1)
}

fn format_currency(value: f64) -> String {
    let text = format_fixed(value, 0);
    match text.strip_prefix('-') {
        Some(abs) => format!("-${abs}"),
        None if text == "n/a" => text,
        None => format!("${text}"),
    }
}
