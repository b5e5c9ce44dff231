// Command-line front end.
//
// `analyze`, `roi` and `benchmark` are one-shot commands; `interactive` keeps
// an upload in memory across menu choices until the session idles out.
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use lead_intel::benchmark::{BenchmarkStore, FileStorage};
use lead_intel::config::{QuoteMode, Settings};
use lead_intel::roi::{self, compute_roi, RoiInputs};
use lead_intel::session::Session;
use lead_intel::types::{BenchmarkMetrics, DealerMap, DealerMetrics};
use lead_intel::{output, pipeline, report, util};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "lead_intel",
    version,
    about = "Dealer lead performance metrics and ROI projections"
)]
struct Cli {
    /// TOML settings file (layout offsets, aliases, limits)
    #[arg(long, global = true, env = "LEAD_INTEL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the benchmark store
    #[arg(long, global = true, env = "LEAD_INTEL_STORE")]
    store_dir: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute per-dealer metrics from a lead export
    Analyze(AnalyzeArgs),
    /// Project revenue from a conversion-rate change
    Roi(RoiArgs),
    /// Manage benchmark sets
    Benchmark {
        #[command(subcommand)]
        action: BenchmarkCmd,
    },
    /// Menu-driven session
    Interactive,
}

#[derive(Args)]
struct AnalyzeArgs {
    file: PathBuf,
    /// Show the detailed analysis for this dealer
    #[arg(long)]
    dealer: Option<String>,
    /// Parse quoted fields properly instead of splitting on every comma
    #[arg(long)]
    quoted: bool,
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    json: Option<PathBuf>,
    /// Write the dealer's executive summary (requires --dealer)
    #[arg(long)]
    html: Option<PathBuf>,
}

#[derive(Args)]
struct RoiArgs {
    /// Lead export to seed the projection from
    #[arg(long)]
    dealer_file: Option<PathBuf>,
    #[arg(long)]
    dealer: Option<String>,
    #[arg(long)]
    monthly_leads: Option<String>,
    #[arg(long)]
    current: Option<String>,
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    deal_value: Option<String>,
    /// Set target to current + this many points
    #[arg(long)]
    improve: Option<f64>,
    /// Set target to the active network conversion rate
    #[arg(long)]
    network_target: bool,
}

#[derive(Subcommand)]
enum BenchmarkCmd {
    List,
    Show { name: Option<String> },
    /// New set copied from the active one
    Create { name: String },
    /// Update a set's values (missing flags keep current values)
    Save {
        name: String,
        #[command(flatten)]
        metrics: MetricArgs,
    },
    Activate { name: String },
    Delete { name: String },
    Export {
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args)]
struct MetricArgs {
    #[arg(long)]
    total_leads: Option<u64>,
    #[arg(long)]
    conversion_rate: Option<f64>,
    #[arg(long)]
    response_rate: Option<f64>,
    #[arg(long)]
    no_response_rate: Option<f64>,
    #[arg(long)]
    fifteen_min_response: Option<f64>,
    #[arg(long)]
    avg_response_time: Option<f64>,
    #[arg(long)]
    median_response_time: Option<f64>,
}

impl MetricArgs {
    fn apply(&self, base: &mut BenchmarkMetrics) {
        if let Some(v) = self.total_leads {
            base.total_leads = v;
        }
        if let Some(v) = self.conversion_rate {
            base.conversion_rate = v;
        }
        if let Some(v) = self.response_rate {
            base.response_rate = v;
        }
        if let Some(v) = self.no_response_rate {
            base.no_response_rate = v;
        }
        if let Some(v) = self.fifteen_min_response {
            base.fifteen_min_response = v;
        }
        if let Some(v) = self.avg_response_time {
            base.avg_response_time = v;
        }
        if let Some(v) = self.median_response_time {
            base.median_response_time = v;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn open_store(settings: &Settings) -> Result<BenchmarkStore<FileStorage>> {
    let dir = settings.resolved_store_dir();
    BenchmarkStore::open_dir(&dir)
        .with_context(|| format!("Failed to open benchmark store in {}", dir.display()))
}

fn load_dealers(path: &Path, settings: &Settings) -> Result<DealerMap> {
    pipeline::process_file(path, settings)
        .with_context(|| format!("Error processing file {}", path.display()))
}

fn pick_dealer<'a>(dealers: &'a DealerMap, name: Option<&str>) -> Result<&'a DealerMetrics> {
    let names = || dealers.keys().cloned().collect::<Vec<_>>().join(", ");
    match name {
        Some(n) => dealers
            .get(n)
            .with_context(|| format!("Dealer '{}' not found. Available: {}", n, names())),
        None if dealers.len() == 1 => dealers.values().next().context("no dealers in file"),
        None => bail!("File has {} dealers, pick one with --dealer: {}", dealers.len(), names()),
    }
}

fn cmd_analyze(mut settings: Settings, args: AnalyzeArgs) -> Result<()> {
    if args.quoted {
        settings.layout.quoting = QuoteMode::Rfc4180;
    }
    if args.html.is_some() && args.dealer.is_none() {
        bail!("--html requires --dealer");
    }
    let dealers = load_dealers(&args.file, &settings)?;
    let rows = report::dealer_summary_rows(&dealers);
    let leads: u64 = dealers.values().map(|m| m.total_leads).sum();
    println!(
        "Found {} dealer(s), {} form leads\n",
        util::format_int(dealers.len() as u64),
        util::format_int(leads)
    );
    output::preview_table_rows(&rows, rows.len());

    if let Some(path) = &args.csv {
        output::write_csv(path, &rows)?;
        println!("(Full table exported to {})", path.display());
    }
    if let Some(path) = &args.json {
        output::write_json(path, &dealers)?;
        println!("(Metrics exported to {})", path.display());
    }

    if let Some(name) = args.dealer.as_deref() {
        let metrics = pick_dealer(&dealers, Some(name))?;
        let (_, bench) = open_store(&settings)?.get_active()?;
        println!("{}", report::dealer_report(metrics, &bench));
        if let Some(path) = &args.html {
            let stamp = Local::now().format("%Y-%m-%d %H:%M").to_string();
            let html =
                report::executive_summary_html(metrics, &bench, settings.avg_deal_value, &stamp);
            std::fs::write(path, html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("(Executive summary written to {})", path.display());
        }
    }
    Ok(())
}

fn cmd_roi(settings: Settings, args: RoiArgs) -> Result<()> {
    let (_, bench) = open_store(&settings)?.get_active()?;
    let deal = args
        .deal_value
        .as_deref()
        .map(roi::coerce)
        .unwrap_or(settings.avg_deal_value);

    let (dealer_name, mut inputs) = match &args.dealer_file {
        Some(file) => {
            let dealers = load_dealers(file, &settings)?;
            let m = pick_dealer(&dealers, args.dealer.as_deref())?;
            (Some(m.dealer_name.clone()), RoiInputs::for_dealer(m, deal))
        }
        None if args.dealer.is_some() => bail!("--dealer requires --dealer-file"),
        None => (None, RoiInputs::for_network(&bench, deal)),
    };
    if let Some(v) = &args.monthly_leads {
        inputs.monthly_leads = roi::coerce(v);
    }
    if let Some(v) = &args.current {
        inputs.current_conversion = roi::coerce(v);
        inputs.target_conversion = inputs.current_conversion;
    }
    if let Some(v) = &args.target {
        inputs.target_conversion = roi::coerce(v);
    }
    if let Some(points) = args.improve {
        inputs = inputs.with_improvement(points);
    }
    if args.network_target {
        inputs = inputs.with_network_target(&bench);
    }
    let projection = compute_roi(&inputs);
    print!("{}", report::roi_report(dealer_name.as_deref(), &inputs, &projection, &bench));
    Ok(())
}

fn cmd_benchmark(settings: Settings, action: BenchmarkCmd) -> Result<()> {
    let mut store = open_store(&settings)?;
    match action {
        BenchmarkCmd::List => output::preview_table_rows(&store.rows()?, usize::MAX),
        BenchmarkCmd::Show { name } => {
            let name = match name {
                Some(n) => n,
                None => store.active_name()?,
            };
            print!("{}", report::network_report(&name, &store.get(&name)?));
        }
        BenchmarkCmd::Create { name } => {
            let (_, seed) = store.get_active()?;
            store.create(&name, seed)?;
            println!("New benchmark set '{}' created and activated.", name.trim());
        }
        BenchmarkCmd::Save { name, metrics } => {
            let mut base = match store.get(&name) {
                Ok(m) => m,
                Err(_) => store.get_active()?.1,
            };
            metrics.apply(&mut base);
            store.save(&name, base)?;
            println!("Benchmarks saved successfully.");
        }
        BenchmarkCmd::Activate { name } => {
            store.activate(&name)?;
            println!("Benchmark set '{}' is now active.", name);
        }
        BenchmarkCmd::Delete { name } => {
            store.delete(&name)?;
            println!("Benchmark set '{}' deleted. Active set: {}", name, store.active_name()?);
        }
        BenchmarkCmd::Export { name, out } => {
            let json = store.export_json(&name)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("(Benchmark set exported to {})", path.display());
                }
                None => println!("{}", json),
            }
        }
        BenchmarkCmd::Import { file, name } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let stored = store.import_json(&text, name.as_deref())?;
            println!("Benchmarks imported as '{}' and activated.", stored);
        }
    }
    Ok(())
}

/// Read one trimmed line after printing `label`. `None` on end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn handle_load(session: &mut Session, settings: &Settings) {
    let Some(path) = prompt("Path to lead file: ") else { return };
    match pipeline::process_file(Path::new(&path), settings) {
        Ok(dealers) => {
            let rows = report::dealer_summary_rows(&dealers);
            println!("Data uploaded successfully. Found {} dealer(s).\n", dealers.len());
            output::preview_table_rows(&rows, rows.len());
            session.load_upload(dealers);
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

fn handle_select(session: &mut Session, bench: &BenchmarkMetrics) {
    let names: Vec<String> = session.dealer_names().iter().map(|s| s.to_string()).collect();
    if names.is_empty() {
        println!("Error: No data loaded. Please load a lead file first (option 1).\n");
        return;
    }
    for (idx, name) in names.iter().enumerate() {
        println!("[{}] {}", idx + 1, name);
    }
    let Some(choice) = prompt("Enter choice: ") else { return };
    let picked = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| names.get(i));
    let Some(name) = picked else {
        println!("Invalid choice.\n");
        return;
    };
    if let Some(metrics) = session.select(name) {
        println!("\n{}", report::dealer_report(metrics, bench));
    }
}

fn handle_roi(session: &Session, settings: &Settings, bench: &BenchmarkMetrics) {
    let selected = session.selected_metrics();
    let mut inputs = match selected {
        Some(m) => RoiInputs::for_dealer(m, settings.avg_deal_value),
        None => RoiInputs::for_network(bench, settings.avg_deal_value),
    };
    println!(
        "Current conversion {}%. Improvement in points (blank for none, 'n' for network average):",
        inputs.current_conversion
    );
    match prompt("Enter choice: ").as_deref() {
        Some("n") | Some("N") => inputs = inputs.with_network_target(bench),
        Some("") | None => {}
        Some(points) => inputs = inputs.with_improvement(roi::coerce(points)),
    }
    let projection = compute_roi(&inputs);
    let dealer = selected.map(|m| m.dealer_name.as_str());
    println!("\n{}", report::roi_report(dealer, &inputs, &projection, bench));
}

fn run_interactive(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let mut session = Session::new(settings.session_timeout());
    loop {
        println!("Lead Performance Intelligence");
        println!("[1] Load lead file");
        println!("[2] Select dealer");
        println!("[3] ROI projection");
        println!("[4] Network report");
        println!("[0] Exit\n");
        let Some(choice) = prompt("Enter choice: ") else { break };
        let now = Instant::now();
        if session.expire_if_idle(now) {
            println!("Session expired for security. Please re-load your data.\n");
        }
        session.touch(now);
        let (set_name, bench) = store.get_active()?;
        match choice.as_str() {
            "1" => handle_load(&mut session, &settings),
            "2" => handle_select(&mut session, &bench),
            "3" => handle_roi(&session, &settings, &bench),
            "4" => println!("\n{}", report::network_report(&set_name, &bench)),
            "0" => break,
            _ => println!("Invalid choice. Please enter 0-4.\n"),
        }
    }
    println!("Exiting the program.");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(dir) = cli.store_dir {
        settings.store_dir = Some(dir);
    }
    match cli.command {
        Command::Analyze(args) => cmd_analyze(settings, args),
        Command::Roi(args) => cmd_roi(settings, args),
        Command::Benchmark { action } => cmd_benchmark(settings, action),
        Command::Interactive => run_interactive(settings),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_flags_override_only_what_was_given() {
        let args = MetricArgs {
            total_leads: Some(30000),
            conversion_rate: Some(17.5),
            response_rate: None,
            no_response_rate: None,
            fifteen_min_response: None,
            avg_response_time: None,
            median_response_time: Some(9.0),
        };
        let mut base = BenchmarkMetrics::default();
        args.apply(&mut base);
        assert_eq!(base.total_leads, 30000);
        assert_eq!(base.conversion_rate, 17.5);
        assert_eq!(base.median_response_time, 9.0);
        assert_eq!(base.response_rate, BenchmarkMetrics::default().response_rate);
    }
}
