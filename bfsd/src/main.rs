//! # BFS Host Daemon
//!
//! Command-line entry point for the scheduling experiment.

use bfsd::{HostRuntime, HostRuntimeConfig};
use core_types::Nice;
use log::LevelFilter;
use services_logger::ConsoleLogger;
use std::env;
use std::path::Path;
use std::process;

struct Options {
    config: HostRuntimeConfig,
    verbosity: u8,
    json: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("bfsd");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    let level = match options.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = ConsoleLogger::init(level) {
        eprintln!("Failed to install logger: {}", e);
    }

    let mut runtime = HostRuntime::new(options.config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let report = runtime.run().unwrap_or_else(|e| {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    });

    if options.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", report.render());
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        config: HostRuntimeConfig::default(),
        verbosity: 0,
        json: false,
    };
    // Applied after --config so the flag wins whatever the order.
    let mut seed = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--ticks" | "-t" => {
                let value = value_of(args, &mut i, "--ticks")?;
                options.config.ticks = value
                    .parse()
                    .map_err(|_| format!("Invalid ticks value: {}", value))?;
            }
            "--nice" | "-n" => {
                let value = value_of(args, &mut i, "--nice")?;
                options.config.nices = parse_nices(value)?;
            }
            "--schedlog" => {
                let value = value_of(args, &mut i, "--schedlog")?;
                options.config.schedlog = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid schedlog window: {}", value))?,
                );
            }
            "--seed" => {
                let value = value_of(args, &mut i, "--seed")?;
                seed = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| format!("Invalid seed: {}", value))?,
                );
            }
            "--config" | "-c" => {
                let value = value_of(args, &mut i, "--config")?;
                options.config.kernel = HostRuntimeConfig::load_kernel_config(Path::new(value))
                    .map_err(|e| e.to_string())?;
            }
            "--dump" => options.config.dump = true,
            "--json" => options.json = true,
            "--verbose" | "-v" => options.verbosity = options.verbosity.saturating_add(1),
            "-vv" => options.verbosity = 2,
            "--help" | "-h" => {
                print_usage(args.first().map(String::as_str).unwrap_or("bfsd"));
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    if let Some(seed) = seed {
        options.config.kernel.skiplist.seed = seed;
    }
    Ok(options)
}

fn value_of<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn parse_nices(list: &str) -> Result<Vec<Nice>, String> {
    list.split(',')
        .map(|item| {
            let value: i32 = item
                .trim()
                .parse()
                .map_err(|_| format!("Invalid niceness: {}", item))?;
            Nice::new(value).map_err(|e| e.to_string())
        })
        .collect()
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --ticks <N>          Ticks to simulate (default 1000)");
    eprintln!("  -n, --nice <LIST>        Comma-separated niceness of each child (default -5,0,5)");
    eprintln!("  --schedlog <N>           Print a process table snapshot at every dispatch for N ticks");
    eprintln!("  --seed <S>               Seed of the tower-height generator");
    eprintln!("  -c, --config <FILE>      JSON kernel configuration");
    eprintln!("  --dump                   Print the final ready queue");
    eprintln!("  --json                   Print the report as JSON");
    eprintln!("  -v, --verbose            More log output (repeat for trace)");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --ticks 2000 --nice -5,0,5 --schedlog 50", program);
    eprintln!("  {} --config kernel.json --dump", program);
}
