use clap::Parser;
use qcond::config::column_table;
use qcond::{
    classify, CollectSink, GroupFilterSet, LogSink, QueryParams, QueryParser, TypeTableCache,
};
use tracing_subscriber::EnvFilter;

mod cli;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = cli::Args::parse();

    match args.command {
        #[cfg(feature = "markdown-docs")]
        cli::Command::MarkdownDocs {} => {
            clap_markdown::print_help_markdown::<cli::Args>();
            Ok(())
        }

        cli::Command::Parse {
            query,
            config,
            record,
            explain,
        } => {
            let table = column_table(config.as_deref(), record, TypeTableCache::global())?;
            let sink = CollectSink::new();
            let parsed = QueryParser::new(table)
                .with_sink(&sink)
                .parse_query_string(&query);

            println!("{}", serde_json::to_string_pretty(&parsed)?);

            if explain {
                println!();
                println!("condition: {}", parsed.condition);
                for diagnostic in sink.snapshot() {
                    println!("ignored: {diagnostic}");
                }
            } else if !sink.is_empty() {
                log::info!(
                    "{} filter(s) ignored, rerun with --explain for details",
                    sink.snapshot().len()
                );
            }
            Ok(())
        }

        cli::Command::Tokens { query } => {
            let params = QueryParams::from_query_string(&query);
            let classified = classify(&params);
            let tokens = GroupFilterSet::from_raw(classified.filters.iter().copied(), &LogSink);

            println!("{}", serde_json::to_string_pretty(&tokens)?);
            Ok(())
        }
    }
}
