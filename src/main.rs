//! Ratesheet - cost quotes from a spreadsheet rule table

mod config;
mod error;

use anyhow::{Context, Result};
use ratesheet_core::{QuoteService, RateTable, Selection};
use std::collections::HashMap;
use std::env;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::UsageError;

fn print_usage() {
    eprintln!("Usage: ratesheet [OPTIONS] [FILE] <COMMAND>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Rule-table workbook (.grd or .csv)");
    eprintln!("                            Defaults to default_workbook from the config");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  routes                    List route nodes");
    eprintln!("  fields <NODE> [JSON]      Field descriptors for a node, given current selections");
    eprintln!("  calculate <JSON|->        Price a JSON array of selections (- reads stdin)");
    eprintln!("  check                     Report formula cycles in the sheet");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <FILE>           Read configuration from FILE");
    eprintln!("  --values <FILE>           CSV of cached values for the formula cells of a CSV workbook");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Logging goes to stderr; set RATESHEET_LOG (e.g. RATESHEET_LOG=debug) to adjust.");
}

#[derive(Debug, PartialEq)]
enum Command {
    Routes,
    Fields { node: String, current: Option<String> },
    Calculate { request: String },
    Check,
}

#[derive(Debug, PartialEq)]
struct Cli {
    config: Option<PathBuf>,
    values: Option<PathBuf>,
    file: Option<PathBuf>,
    command: Command,
}

const COMMANDS: [&str; 4] = ["routes", "fields", "calculate", "check"];

/// Parse the arguments after the program name. `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> std::result::Result<Option<Cli>, UsageError> {
    let mut config: Option<PathBuf> = None;
    let mut values: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                i += 1;
                let path = args.get(i).ok_or(UsageError::MissingValue("--config"))?;
                config = Some(PathBuf::from(path));
            }
            "--values" => {
                i += 1;
                let path = args.get(i).ok_or(UsageError::MissingValue("--values"))?;
                values = Some(PathBuf::from(path));
            }
            "-" => positional.push(args[i].clone()),
            arg if arg.starts_with('-') => return Err(UsageError::UnknownOption(arg.to_string())),
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    let mut rest = positional.into_iter();
    let mut first = rest.next().ok_or(UsageError::MissingCommand)?;
    let mut file = None;
    if !COMMANDS.contains(&first.as_str()) {
        file = Some(PathBuf::from(first));
        first = rest.next().ok_or(UsageError::MissingCommand)?;
    }

    let command = match first.as_str() {
        "routes" => Command::Routes,
        "check" => Command::Check,
        "fields" => {
            let node = rest.next().ok_or(UsageError::MissingValue("fields"))?;
            Command::Fields {
                node,
                current: rest.next(),
            }
        }
        "calculate" => Command::Calculate {
            request: rest.next().ok_or(UsageError::MissingValue("calculate"))?,
        },
        other => return Err(UsageError::UnknownCommand(other.to_string())),
    };

    if let Some(extra) = rest.next() {
        return Err(UsageError::UnexpectedArgument(extra));
    }

    Ok(Some(Cli {
        config,
        values,
        file,
        command,
    }))
}

fn init_logging(config: &Config) {
    let fallback = config.log_filter.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_env("RATESHEET_LOG")
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_service(cli: &Cli, config: &Config) -> Result<QuoteService> {
    let layout = config.layout();
    debug!(file = ?cli.file, sheet = %layout.sheet_name, "loading rule table");
    let service = QuoteService::new(RateTable::empty(layout.clone()));
    match cli.file.as_ref() {
        Some(path) => {
            let table = RateTable::load(path, cli.values.as_deref(), layout)
                .with_context(|| format!("loading {}", path.display()))?
                .with_max_depth(config.max_depth());
            service.reload(table);
        }
        None => {
            if cli.values.is_some() {
                eprintln!("Warning: --values is ignored without a FILE argument");
            }
            service
                .load_builtin(config.default_workbook.as_deref(), layout, config.max_depth())
                .context("loading the default workbook")?;
        }
    }
    Ok(service)
}

fn read_request(request: &str) -> Result<String> {
    if request != "-" {
        return Ok(request.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading request from stdin")?;
    Ok(buf)
}

/// Run one command and return the process exit code.
fn run(cli: &Cli, config: &Config) -> Result<i32> {
    let service = load_service(cli, config)?;

    match &cli.command {
        Command::Routes => {
            println!("{}", serde_json::to_string_pretty(&service.list_routes())?);
            Ok(0)
        }
        Command::Fields { node, current } => {
            let inputs = match current {
                Some(raw) => serde_json::from_str::<serde_json::Value>(&read_request(raw)?)
                    .context("parsing current selections")?,
                None => serde_json::Value::Object(Default::default()),
            };
            let selection: Selection =
                serde_json::from_value(serde_json::json!({ "node": node, "inputs": inputs }))
                    .context("current selections must be a JSON object")?;
            let current: HashMap<String, String> = selection.inputs.into_iter().collect();
            println!("{}", serde_json::to_string_pretty(&service.get_fields(node, &current))?);
            Ok(0)
        }
        Command::Calculate { request } => {
            let selections: Vec<Selection> = serde_json::from_str(&read_request(request)?)
                .context("calculate expects a JSON array of {\"node\", \"inputs\"} objects")?;
            let report = service.calculate(&selections);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.is_complete() { 0 } else { 1 })
        }
        Command::Check => {
            let cycles: Vec<Vec<String>> = service
                .snapshot()
                .find_cycles()
                .into_iter()
                .map(|path| path.iter().map(|c| c.to_string()).collect())
                .collect();
            println!("{}", serde_json::to_string_pretty(&cycles)?);
            Ok(if cycles.is_empty() { 0 } else { 1 })
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let (config, warnings) = config::load_config(cli.config.as_deref());
    init_logging(&config);
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    match run(&cli, &config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_file_is_optional() {
        let cli = parse_args(&args(&["routes"])).unwrap().unwrap();
        assert_eq!(cli.file, None);
        assert_eq!(cli.command, Command::Routes);

        let cli = parse_args(&args(&["rates.grd", "--config", "c.toml", "check"]))
            .unwrap()
            .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("rates.grd")));
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert_eq!(cli.command, Command::Check);
    }

    #[test]
    fn test_command_arguments() {
        let cli = parse_args(&args(&["rates.grd", "fields", "A", "{}"])).unwrap().unwrap();
        assert_eq!(
            cli.command,
            Command::Fields {
                node: "A".into(),
                current: Some("{}".into())
            }
        );

        let cli = parse_args(&args(&["calculate", "-"])).unwrap().unwrap();
        assert_eq!(cli.command, Command::Calculate { request: "-".into() });
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(parse_args(&args(&[])), Err(UsageError::MissingCommand));
        assert_eq!(parse_args(&args(&["rates.grd"])), Err(UsageError::MissingCommand));
        assert_eq!(
            parse_args(&args(&["rates.grd", "price"])),
            Err(UsageError::UnknownCommand("price".into()))
        );
        assert_eq!(
            parse_args(&args(&["--verbose", "routes"])),
            Err(UsageError::UnknownOption("--verbose".into()))
        );
        assert_eq!(
            parse_args(&args(&["routes", "extra"])),
            Err(UsageError::UnexpectedArgument("extra".into()))
        );
        assert_eq!(parse_args(&args(&["--help", "routes"])), Ok(None));
    }
}
