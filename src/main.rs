use std::path::Path;
use std::process;

use bytesize::ByteSize;
use clap::ValueEnum;
use env_logger;
use log;

use ext_merge_sort::{ExternalSorterBuilder, Record, SortError, SortSummary};

const CONFIG_ERROR_EXIT_CODE: i32 = 3;

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let record_type: RecordType = arg_parser.value_of_t_or_exit("record");
    let block_size: ByteSize = arg_parser.value_of_t_or_exit("block_size");
    let branching_degree: usize = arg_parser.value_of_t_or_exit("degree");
    let threads: Option<usize> = arg_parser
        .is_present("threads")
        .then(|| arg_parser.value_of_t_or_exit("threads"));

    let args = SortArgs {
        input: Path::new(arg_parser.value_of("input").expect("value is required")),
        output: Path::new(arg_parser.value_of("output").expect("value is required")),
        tmp_dir: arg_parser.value_of("tmp_dir").map(Path::new),
        block_size: block_size.as_u64(),
        branching_degree,
        threads,
        parallel_chunks: arg_parser.is_present("parallel_chunks"),
    };

    let result = match record_type {
        RecordType::U32 => sort::<u32>(&args),
        RecordType::U64 => sort::<u64>(&args),
    };

    match result {
        Ok(summary) => log::info!(
            "{} records written to {} ({} leaf runs)",
            summary.records,
            args.output.display(),
            summary.leaf_runs
        ),
        Err(SortError::Config(err)) => {
            log::error!("configuration error: {}", err);
            process::exit(CONFIG_ERROR_EXIT_CODE);
        }
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    }
}

struct SortArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    tmp_dir: Option<&'a Path>,
    block_size: u64,
    branching_degree: usize,
    threads: Option<usize>,
    parallel_chunks: bool,
}

fn sort<R: Record>(args: &SortArgs) -> Result<SortSummary, SortError> {
    let mut sorter_builder = ExternalSorterBuilder::<R>::new()
        .with_block_size(args.block_size)
        .with_branching_degree(args.branching_degree)
        .with_parallel_chunks(args.parallel_chunks);

    if let Some(threads) = args.threads {
        sorter_builder = sorter_builder.with_threads_number(threads);
    }

    if let Some(tmp_dir) = args.tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(tmp_dir);
    }

    let sorter = sorter_builder.build()?;

    return sorter.sort_file(args.input, args.output);
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ValueEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum RecordType {
    U32,
    U64,
}

impl RecordType {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        RecordType::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <RecordType as clap::ValueEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::Command::new("ext-merge-sort")
        .about("external merge sort of binary integer files")
        .arg(
            clap::Arg::new("input")
                .help("file to be sorted")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("output")
                .help("result file")
                .required(true)
                .index(2),
        )
        .arg(
            clap::Arg::new("block_size")
                .short('b')
                .long("block-size")
                .help("memory budget of one in-memory sort, a multiple of the record width")
                .takes_value(true)
                .default_value("1GiB")
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Block size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("degree")
                .short('d')
                .long("degree")
                .help("maximum number of runs merged at once")
                .takes_value(true)
                .default_value("8"),
        )
        .arg(
            clap::Arg::new("record")
                .short('r')
                .long("record")
                .help("record type")
                .takes_value(true)
                .default_value("u64")
                .possible_values(RecordType::possible_values()),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("number of threads to use for parallel sorting")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("parallel_chunks")
                .short('p')
                .long("parallel-chunks")
                .help("sort sibling chunks in parallel (multiplies the memory budget by the number of threads)"),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
