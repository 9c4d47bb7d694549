mod args;
mod logging;

use std::error::Error;

use clap::Parser;
use mssql_sqlfile::{ConnectionSource, Database, SqlFileError, Table};
use tracing::Level;

use crate::args::{Args, Command, OutputFormat, collect_params};
use crate::logging::LogWriter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let writer = LogWriter::new(args.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut builder = Database::builder()
        .substitution(args.substitution())
        .application_name("sqlfile");
    if let Some(path) = &args.env_file {
        builder = builder.settings_file(path);
    }

    let table = match args.pool {
        Some(max_size) => run(&builder.build_pooled(max_size)?, &args.command).await?,
        None => run(&builder.build()?, &args.command).await?,
    };

    match args.format {
        OutputFormat::Table => println!("{table}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    Ok(())
}

async fn run<S: ConnectionSource>(db: &Database<S>, command: &Command) -> Result<Table, SqlFileError> {
    match command {
        Command::File {
            directory,
            name,
            params,
        } => {
            db.load_data_from_sql_file(directory, name, &collect_params(params))
                .await
        }
        Command::Query { sql } => db.load_data_from_query(sql).await,
    }
}
