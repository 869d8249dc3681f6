mod run;
mod scrape;
mod settings;
mod structs;

use env_logger::Env;
use log::info;
use scrape::Fetcher;
use settings::Settings;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use structs::CourseEntry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::load()?;
    let entries: Vec<CourseEntry> =
        serde_json::from_reader(BufReader::new(File::open(&settings.courses_path)?))?;
    info!(
        "{} courses listed in {}",
        entries.len(),
        settings.courses_path.display()
    );

    let fetcher = Fetcher::new(
        &settings.server_url,
        &settings.cacert_path,
        &settings.charset,
    )?;
    let fetcher = &fetcher;
    let year = settings.year.as_str();
    let fetch = move |id: String| async move { fetcher.course_page(year, &id).await };

    let written = match &settings.output_path {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            let written = run::run(
                &entries,
                year,
                settings.limit,
                settings.output,
                fetch,
                &mut out,
            )
            .await?;
            out.flush()?;
            written
        }
        None => {
            let mut out = std::io::stdout().lock();
            run::run(
                &entries,
                year,
                settings.limit,
                settings.output,
                fetch,
                &mut out,
            )
            .await?
        }
    };
    info!("{written} courses written");

    Ok(())
}
