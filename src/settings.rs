use crate::structs::OutputFormat;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub charset: String,
    pub year: String,
    pub courses_path: PathBuf,
    pub cacert_path: PathBuf,
    /// Stop after this many courses. Unset means the whole list.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub output: OutputFormat,
    /// Write records here instead of stdout.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server_url", "https://shnaton.huji.ac.il/index.php")?
        .set_default("charset", "windows-1255")?
        .set_default("year", "2020")?
        .set_default("courses_path", "./courses_2020.json")?
        .set_default("cacert_path", "./cacert.pem")
}

impl Settings {
    /// Defaults, then `shnaton.{toml,json,yaml}` if present, then `SHNATON_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name("shnaton").required(false))
            .add_source(Environment::with_prefix("SHNATON"))
            .build()?
            .try_deserialize()
    }
}
