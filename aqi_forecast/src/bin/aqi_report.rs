//! # aqi_report
//!
//! Runs the full AQI analysis on a CSV file and prints charts and statistics.
//!
//! ```text
//! aqi_report data/aqi_daily.csv --horizon 30
//! aqi_report --demo --seasonal 7
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use aqi_forecast::config::PipelineConfig;
use aqi_forecast::data::GapPolicy;
use aqi_forecast::models::SearchStrategy;
use aqi_forecast::pipeline::{AnalysisPipeline, AnalysisReport};
use aqi_forecast::stationarity::{StationarityResult, Verdict};
use aqi_forecast::synthetic::SyntheticSeries;
use aqi_forecast::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Daily AQI decomposition, stationarity test and ARIMA forecast")]
struct Cli {
    /// Input CSV file with date and AQI columns
    #[arg(required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seasonal period for the decomposition
    #[arg(long)]
    period: Option<usize>,

    /// Rolling-mean window for detrending
    #[arg(long)]
    window: Option<usize>,

    /// Days to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Largest AR order to search
    #[arg(long)]
    max_p: Option<usize>,

    /// Largest MA order to search
    #[arg(long)]
    max_q: Option<usize>,

    /// Try every order instead of the stepwise search
    #[arg(long)]
    exhaustive: bool,

    /// Consider seasonal differencing at this period
    #[arg(long, value_name = "M")]
    seasonal: Option<usize>,

    /// Only keep rows from this monitoring site
    #[arg(long)]
    site_id: Option<String>,

    /// How to handle missing days
    #[arg(long, value_enum)]
    gap_policy: Option<GapPolicyArg>,

    /// Skip the charts
    #[arg(long)]
    no_plots: bool,

    /// Chart width in characters
    #[arg(long)]
    width: Option<usize>,

    /// Chart height in lines
    #[arg(long)]
    height: Option<usize>,

    /// Analyse a generated two-year series instead of a file
    #[arg(long, conflicts_with = "input")]
    demo: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GapPolicyArg {
    ForwardFill,
    Reject,
}

impl From<GapPolicyArg> for GapPolicy {
    fn from(arg: GapPolicyArg) -> Self {
        match arg {
            GapPolicyArg::ForwardFill => GapPolicy::ForwardFill,
            GapPolicyArg::Reject => GapPolicy::Reject,
        }
    }
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if self.demo && self.period.is_none() {
            // The demo series has a weekly cycle
            config.decomposition.period = 7;
        }
        if let Some(period) = self.period {
            config.decomposition.period = period;
        }
        if let Some(window) = self.window {
            config.detrend.window = window;
        }
        if let Some(horizon) = self.horizon {
            config.forecast.horizon = horizon;
        }
        if let Some(max_p) = self.max_p {
            config.forecast.search.max_p = max_p;
        }
        if let Some(max_q) = self.max_q {
            config.forecast.search.max_q = max_q;
        }
        if self.exhaustive {
            config.forecast.search.strategy = SearchStrategy::Exhaustive;
        }
        if let Some(m) = self.seasonal {
            config.forecast.search.seasonal = true;
            config.forecast.search.seasonal_period = m;
        }
        if let Some(site_id) = &self.site_id {
            config.loader.site_id = Some(site_id.clone());
        }
        if let Some(policy) = self.gap_policy {
            config.indexer.gaps = policy.into();
        }
        if self.no_plots {
            config.plot.enabled = false;
        }
        if let Some(width) = self.width {
            config.plot.width = width;
        }
        if let Some(height) = self.height {
            config.plot.height = height;
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.pipeline_config()?;
    let pipeline = AnalysisPipeline::new(&config)?;

    let report = match &cli.input {
        Some(path) if !cli.demo => {
            tracing::info!(path = %path.display(), "analysing file");
            pipeline.run(path)?
        }
        _ => pipeline.run_series(SyntheticSeries::default().generate()?)?,
    };

    print_report(&report, &config)
}

fn print_report(report: &AnalysisReport, config: &PipelineConfig) -> Result<()> {
    let series = &report.series;

    println!("{}", "=".repeat(60).blue());
    println!("{}", "AQI Analysis".bold().blue());
    println!("{}", "=".repeat(60).blue());

    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        println!("{} {} to {}", "Period:".cyan(), first, last);
    }
    println!(
        "{} {} ({} filled)",
        "Days:".cyan(),
        series.len(),
        series.imputed_count()
    );
    println!(
        "{} mean {:.1}, std {:.1}\n",
        "AQI:".cyan(),
        series.mean()?,
        series.std_dev()?
    );

    if config.plot.enabled {
        for chart in report.charts(&config.plot)? {
            println!("{}", chart);
        }
    }

    match report.decomposition.trend_slope() {
        Ok(slope) => println!("{} {:+.4} AQI/day\n", "Trend slope:".cyan(), slope),
        Err(err) => println!("{} {}\n", "Trend slope:".cyan(), err),
    }

    println!("{}", "Stationarity (ADF)".bold());
    println!("{}", "-".repeat(40));
    print_stationarity("AQI", &report.stationarity);
    print_stationarity("First differences", &report.differenced_stationarity);

    println!("{}", "Forecast model".bold());
    println!("{}", "-".repeat(40));
    println!("{}\n", report.model);

    println!(
        "{:<12} {:>10} {:>10} {:>10}",
        "Date",
        "Forecast",
        format!("Low {:.0}%", report.model.confidence_level * 100.0),
        "High"
    );
    for ((date, point), (low, high)) in report
        .model
        .forecast_dates
        .iter()
        .zip(&report.model.forecast)
        .zip(&report.model.confidence_interval)
    {
        println!("{:<12} {:>10.1} {:>10.1} {:>10.1}", date, point, low, high);
    }

    println!("\n{}", "Detrended monthly profile".bold());
    println!("{}", "-".repeat(40));
    for (month, mean) in report.detrend.monthly_profile() {
        println!("  {:>2}: {:+.2}", month, mean);
    }

    println!("\n{}", "Done!".green().bold());
    Ok(())
}

fn print_stationarity(label: &str, result: &StationarityResult) {
    let verdict = match result.verdict {
        Verdict::Stationary => format!("✓ {}", result.verdict).green(),
        Verdict::NonStationary => format!("✗ {}", result.verdict).red(),
    };
    println!("{}", label.cyan());
    println!(
        "  ADF statistic {:.4}, p-value {:.4}, lags {}, n {}",
        result.statistic, result.p_value, result.used_lag, result.n_obs
    );
    println!(
        "  critical values 1%: {:.3}  5%: {:.3}  10%: {:.3}",
        result.critical_values.one_percent,
        result.critical_values.five_percent,
        result.critical_values.ten_percent
    );
    println!("  {}\n", verdict);
}
