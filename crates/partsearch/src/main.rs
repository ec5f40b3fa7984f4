//! Partsearch - fuzzy part number lookup
//!
//! Loads a spreadsheet CSV export once and looks up records by approximate
//! part number.
//!
//! Usage:
//!     partsearch --source parts.csv wx100 hb-7
//!     partsearch --source parts.csv                  (one query per stdin line)
//!     curl -sL "$EXPORT_URL" | partsearch --source - wx100
//!     partsearch --source parts.csv --browse widget
//!
//! Engine defaults come from `PARTSEARCH_*` environment variables (see
//! `EngineConfig::from_env`); flags override them.

mod logging;
mod output;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use partsearch_core::{CsvSource, EngineConfig, Lookup, LookupSession, SimilarityMetric};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "partsearch")]
#[command(about = "Fuzzy part number lookup over a spreadsheet export")]
#[command(version)]
struct Args {
    /// CSV export to load ("-" reads stdin)
    #[arg(short, long)]
    source: String,

    /// Part numbers to look up; without any, queries are read from stdin
    queries: Vec<String>,

    /// Number of ranked candidates per query
    #[arg(short, long, default_value = "1")]
    limit: usize,

    /// Approximate-match threshold (0.0-1.0)
    #[arg(long)]
    min_similarity: Option<f64>,

    /// Similarity measure for approximate matches
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Also match against the description column
    #[arg(long)]
    match_label: bool,

    /// Treat punctuation in part numbers as significant
    #[arg(long)]
    keep_punctuation: bool,

    /// List records whose part number, description or status contains TERM
    #[arg(long, value_name = "TERM")]
    browse: Option<String>,

    /// Print JSON instead of tab-separated text
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetricArg {
    Levenshtein,
    JaroWinkler,
}

impl From<MetricArg> for SimilarityMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Levenshtein => SimilarityMetric::Levenshtein,
            MetricArg::JaroWinkler => SimilarityMetric::JaroWinkler,
        }
    }
}

fn build_config(args: &Args) -> partsearch_core::Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;

    if let Some(min_similarity) = args.min_similarity {
        config.min_similarity = min_similarity;
    }
    if let Some(metric) = args.metric {
        config.metric = metric.into();
    }
    if args.match_label {
        config.match_label = true;
    }
    if args.keep_punctuation {
        config.normalization.strip_punctuation = false;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.log_level.as_deref());

    let config = build_config(&args)?;
    debug!(?config, "engine configuration");

    let from_stdin = args.source == "-";
    let source = if from_stdin {
        CsvSource::from_reader("stdin", io::stdin().lock())
    } else {
        Ok(CsvSource::from_path(&args.source))
    };

    let mut session = LookupSession::new(config);
    if let Err(e) = source.and_then(|source| session.reload(&source)) {
        eprintln!("data unavailable: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(term) = &args.browse {
        let records = session.browse(term);
        info!(term = %term, records = records.len(), "browse");
        writeln!(out, "{}", output::render_records(&records, args.json)?)?;
        return Ok(ExitCode::SUCCESS);
    }

    if !args.queries.is_empty() {
        let mut found_all = true;
        for query in &args.queries {
            found_all &= run_query(&mut session, query, &args, &mut out)?;
        }
        return Ok(if found_all {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(2)
        });
    }

    if from_stdin {
        eprintln!("interactive lookups need --source to name a file when the export is piped on stdin");
        return Ok(ExitCode::FAILURE);
    }

    info!(records = session.store().len(), "reading queries from stdin");
    for line in io::stdin().lock().lines() {
        let line = line?;
        run_query(&mut session, &line, &args, &mut out)?;
        out.flush()?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Run one query and print the outcome. Returns false when a query found
/// nothing; a blank query is only a prompt and never counts as a miss.
fn run_query(
    session: &mut LookupSession,
    query: &str,
    args: &Args,
    out: &mut impl Write,
) -> Result<bool, Box<dyn std::error::Error>> {
    if args.limit <= 1 || query.trim().is_empty() {
        let lookup = session.lookup(query);
        writeln!(out, "{}", output::render_lookup(query, &lookup, args.json)?)?;
        return Ok(matches!(lookup, Lookup::Found(_) | Lookup::Prompt));
    }

    let matches = session.search(query, args.limit);
    writeln!(out, "{}", output::render_matches(query, &matches, args.json)?)?;
    Ok(!matches.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "partsearch",
            "--source",
            "parts.csv",
            "--limit",
            "5",
            "--metric",
            "jaro-winkler",
            "--keep-punctuation",
            "wx100",
        ])
        .unwrap();
        assert_eq!(args.source, "parts.csv");
        assert_eq!(args.limit, 5);
        assert_eq!(args.queries, vec!["wx100"]);

        let config = build_config(&args).unwrap();
        assert_eq!(config.metric, SimilarityMetric::JaroWinkler);
        assert!(!config.normalization.strip_punctuation);
    }

    #[test]
    fn test_blank_query_is_not_a_miss() {
        use partsearch_core::loader::StaticSource;
        use partsearch_core::Record;

        let mut session = LookupSession::default();
        session
            .reload(&StaticSource::new(vec![Record::new(
                "1", "WX-100", "Widget", "Make",
            )]))
            .unwrap();

        for limit in ["1", "5"] {
            let args =
                Args::try_parse_from(["partsearch", "-s", "parts.csv", "-l", limit]).unwrap();
            let mut out = Vec::new();

            assert!(run_query(&mut session, "  ", &args, &mut out).unwrap());
            assert!(run_query(&mut session, "wx100", &args, &mut out).unwrap());
            assert!(!run_query(&mut session, "zzzzzz", &args, &mut out).unwrap());

            let text = String::from_utf8(out).unwrap();
            assert!(text.starts_with("enter a part number to look up\n"));
            assert!(text.ends_with("zzzzzz: no match\n"));
        }
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let args =
            Args::try_parse_from(["partsearch", "-s", "parts.csv", "--min-similarity", "2"])
                .unwrap();
        assert!(build_config(&args).is_err());
    }
}
