use aqi_forecast::data::AqiSeries;
use aqi_forecast::decomposition::{Decomposer, DecompositionConfig, DecompositionModel};
use aqi_forecast::detrend::{DetrendConfig, Detrender};
use aqi_forecast::models::{ForecastConfig, Forecaster};
use aqi_forecast::stationarity::StationarityTester;
use aqi_forecast::synthetic::SyntheticSeries;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("AQI Forecast: Basic Analysis Example");
    println!("====================================\n");

    // Two years of daily data with a weekly cycle and a rising trend
    println!("Generating sample data...");
    let series: AqiSeries = SyntheticSeries::default().generate()?;
    println!(
        "Sample data created: {} days from {:?} to {:?}\n",
        series.len(),
        series.first_date(),
        series.last_date()
    );

    // Weekly decomposition
    let decomposer = Decomposer::new(DecompositionConfig {
        period: 7,
        model: DecompositionModel::Additive,
    })?;
    let decomposition = decomposer.decompose(&series)?;
    println!("Trend slope: {:.4} AQI/day", decomposition.trend_slope()?);
    println!(
        "Weekly seasonal offsets: {:?}\n",
        decomposition.seasonal[..7]
            .iter()
            .map(|s| (s * 100.0).round() / 100.0)
            .collect::<Vec<_>>()
    );

    // Stationarity before and after differencing
    let tester = StationarityTester::default();
    let raw = tester.test(&series)?;
    let differenced = tester.test_differenced(&series, 1)?;
    println!("Raw series:        {} (p = {:.4})", raw.verdict, raw.p_value);
    println!(
        "First differences: {} (p = {:.4})\n",
        differenced.verdict, differenced.p_value
    );

    // Two-week forecast
    let forecaster = Forecaster::new(ForecastConfig {
        horizon: 14,
        ..ForecastConfig::default()
    })?;
    let fit = forecaster.run(&series)?;
    println!("{}\n", fit);
    for ((date, point), (low, high)) in fit
        .forecast_dates
        .iter()
        .zip(&fit.forecast)
        .zip(&fit.confidence_interval)
    {
        println!("{}  {:6.1}  [{:6.1}, {:6.1}]", date, point, low, high);
    }

    // Rolling-mean detrending
    let detrend = Detrender::new(DetrendConfig::default())?.detrend(&series)?;
    println!("\nDetrended monthly profile:");
    for (month, mean) in detrend.monthly_profile() {
        println!("  {:>2}: {:+.2}", month, mean);
    }

    Ok(())
}
