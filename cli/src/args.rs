use clap::{Parser, Subcommand, ValueEnum};
use mssql_sqlfile::{RowValues, SqlParams, SubstitutionMode};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run parameterized SQL files against SQL Server")]
pub(crate) struct Args {
    /// Settings file with DB_* entries (defaults to ./.env when present)
    #[arg(long)]
    pub(crate) env_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "table")]
    pub(crate) format: OutputFormat,
    /// Use a connection pool of this size instead of one connection per call
    #[arg(long)]
    pub(crate) pool: Option<usize>,
    /// Paste parameter values into the SQL text instead of binding them
    #[arg(long)]
    pub(crate) literal: bool,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Execute DIR/NAME after substituting `{name}` placeholders
    File {
        directory: PathBuf,
        name: PathBuf,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, RowValues)>,
    },
    /// Execute SQL text as written
    Query { sql: String },
}

impl Args {
    pub(crate) fn substitution(&self) -> SubstitutionMode {
        if self.literal {
            SubstitutionMode::Literal
        } else {
            SubstitutionMode::Bind
        }
    }
}

pub(crate) fn collect_params(pairs: &[(String, RowValues)]) -> SqlParams {
    pairs.iter().cloned().collect()
}

fn parse_param(raw: &str) -> Result<(String, RowValues), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((key.to_string(), RowValues::parse_loose(value)))
}
