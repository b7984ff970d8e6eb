//! obra weather command implementation.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;
use crate::weather::{favorable_for_construction, fetch_current, WeatherReport};

pub struct WeatherOptions {
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct WeatherOutput {
    report: WeatherReport,
    favorable: bool,
}

pub fn run(options: WeatherOptions) -> Result<()> {
    let storage = Storage::discover(options.site.as_deref())?;
    let config = Config::load_from_site(&storage.site_root().to_path_buf());

    let report = fetch_current(
        &config.weather,
        config.site.latitude,
        config.site.longitude,
    )?;
    let favorable = favorable_for_construction(&report, &config.weather);
    let output = WeatherOutput { report, favorable };

    let mut human = HumanOutput::new(if favorable {
        "Conditions are workable"
    } else {
        "Conditions are not workable"
    });
    human.push_summary(
        "Temperature",
        format!("{:.1} C", output.report.temperature_c),
    );
    human.push_summary("Wind", format!("{:.1} km/h", output.report.wind_kmh));
    human.push_summary("Humidity", format!("{:.0}%", output.report.humidity));
    human.push_summary("Condition", output.report.condition.clone());
    if !favorable {
        human.push_warning("hold outdoor work until conditions improve");
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "weather",
        &output,
        Some(&human),
    )
}
