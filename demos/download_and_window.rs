use chrono::NaiveDate;
use std::path::Path;
use weather_windows::{StationRegistry, WeatherData, WeatherWindowsError};

#[tokio::main]
async fn main() -> Result<(), WeatherWindowsError> {
    // Set RUST_LOG=info (or debug) to see downloads and gap filling.
    env_logger::init();

    let registry = StationRegistry::load(Path::new("config/station_ids.json")).await?;
    let client = WeatherData::new(registry).await?;

    let start = NaiveDate::from_ymd_opt(2021, 10, 15).unwrap();
    let end = NaiveDate::from_ymd_opt(2021, 10, 18).unwrap();

    let report = client
        .download()
        .start_date(start)
        .end_date(end)
        .call()
        .await?;
    println!(
        "Downloaded {} days into {}",
        report.written.len(),
        client.store().data_dir().display()
    );
    if !report.is_complete() {
        eprintln!("Could not download: {:?}", report.failed);
    }

    let assembler = client
        .training_data()
        .start_date(start)
        .end_date(end)
        .training_window(25)
        .forecast(24)
        .call()?;
    println!(
        "Expecting {} examples for {} stations",
        assembler.config().example_count(),
        client.registry().len()
    );

    for example in assembler.examples().take(3) {
        let example = example?;
        let total: f64 = example.target().iter().sum();
        println!(
            "{}: features {:?}, total forecast rainfall {:.1} mm",
            example.start(),
            example.shape(),
            total
        );
    }
    Ok(())
}
