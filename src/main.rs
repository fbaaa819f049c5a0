use std::fs::File;
use std::hash::BuildHasher;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use memmap2::Mmap;
use tracing::{debug, error, info};

use freqrank::{BuildSdbmHasher, FrequencyIndex, IndexConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HasherKind {
    /// sdbm over the key bytes
    Sdbm,
    /// randomly seeded aHash
    Ahash,
}

/// Count words and print the most frequent ones.
#[derive(Parser, Debug)]
#[command(name = "freqrank")]
struct Args {
    /// Input file, memory-mapped; reads stdin when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Number of top words to print
    #[arg(short = 'k', long, default_value_t = 10)]
    top: usize,

    /// Print the count of this word after the top list (repeatable)
    #[arg(short, long = "query", value_name = "WORD")]
    queries: Vec<String>,

    /// Requested slot count of the hash table
    #[arg(long, default_value_t = IndexConfig::default().table_capacity)]
    table_capacity: usize,

    /// Initial length of the ranking array
    #[arg(long, default_value_t = IndexConfig::default().ranking_capacity)]
    ranking_capacity: usize,

    /// Hash function for the count table
    #[arg(long, value_enum, default_value_t = HasherKind::Sdbm)]
    hasher: HasherKind,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let config = IndexConfig {
        table_capacity: args.table_capacity,
        ranking_capacity: args.ranking_capacity,
    };

    let result = match args.hasher {
        HasherKind::Sdbm => run(&args, config, BuildSdbmHasher),
        HasherKind::Ahash => run(&args, config, ahash::RandomState::new()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run<S: BuildHasher>(
    args: &Args,
    config: IndexConfig,
    hasher: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut index = FrequencyIndex::with_config_and_hasher(config, hasher)?;

    match &args.file {
        Some(path) => {
            let file = File::open(path)?;
            // SAFETY: the mapping is only read, and only for the duration of
            // this call.
            let mmap = unsafe { Mmap::map(&file)? };
            debug!(path = %path.display(), bytes = mmap.len(), "mapped input");
            let text = String::from_utf8_lossy(&mmap);
            record_words(&mut index, &text)?;
        }
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                record_words(&mut index, &line?)?;
            }
        }
    }

    info!(distinct = index.len(), "finished counting");

    for (word, count) in index.top(args.top) {
        println!("{} {}", word, count);
    }
    for word in &args.queries {
        println!("{} {}", word, index.count(word));
    }
    Ok(())
}

fn record_words<S: BuildHasher>(index: &mut FrequencyIndex<S>, text: &str) -> freqrank::Result<()> {
    for word in text.split_whitespace() {
        index.record(word, 1)?;
    }
    Ok(())
}
