use crate::scrape::{self, ScrapeError};
use crate::structs::*;

use log::info;
use std::error::Error;
use std::future::Future;
use std::io::Write;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Fetches and extracts the listed courses one after another, writing each
/// record to `sink`. Returns how many records were written.
pub async fn run<F, Fut, W>(
    entries: &[CourseEntry],
    year: &str,
    limit: Option<usize>,
    format: OutputFormat,
    mut fetch: F,
    sink: &mut W,
) -> Result<usize>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<String, ScrapeError>>,
    W: Write,
{
    let take = limit.unwrap_or(entries.len());
    let mut written = 0;

    for entry in entries.iter().take(take) {
        info!("fetching course {}", entry.id);
        let page = fetch(entry.id.clone()).await?;
        let course = scrape::parse_course(&page, year)?;

        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *sink, &course)?;
                writeln!(sink)?;
            }
            OutputFormat::Debug => writeln!(sink, "{course:#?}")?,
        }
        written += 1;
    }

    if take < entries.len() {
        info!("stopped after {take} of {} courses", entries.len());
    }

    Ok(written)
}
