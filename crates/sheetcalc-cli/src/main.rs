//! sheetcalc CLI - run cell scripts through the formula engine
//!
//! A script is one write per line, `ADDR input`, applied in order:
//!
//! ```text
//! # inputs
//! A1 10
//! A2 =A1+5
//! A3 =A2*2
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheetcalc::prelude::*;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about = "Evaluate spreadsheet cell scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a script and print cell values
    Run {
        /// Script file (`-` for stdin)
        script: PathBuf,

        /// Only print these cells (repeatable)
        #[arg(short, long = "get", value_name = "ADDR")]
        get: Vec<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Apply a script and print one cell's snapshot as JSON
    Snapshot {
        /// Script file (`-` for stdin)
        script: PathBuf,

        /// Cell to snapshot
        address: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Apply a script and summarize the resulting sheet
    Info {
        /// Script file (`-` for stdin)
        script: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Result of AVERAGE over no numbers
    #[arg(long, value_enum, default_value_t = EmptyAverage::Zero)]
    empty_average: EmptyAverage,

    /// Longest formula accepted, in bytes
    #[arg(long, default_value_t = sheetcalc::DEFAULT_MAX_FORMULA_LEN)]
    max_formula_len: usize,

    /// Most cells one formula may reference
    #[arg(long, default_value_t = sheetcalc::DEFAULT_MAX_REFERENCED_CELLS)]
    max_referenced_cells: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmptyAverage {
    /// Return 0
    Zero,
    /// Return #DIV/0!
    Div0,
}

impl EngineArgs {
    fn options(&self) -> EngineOptions {
        EngineOptions {
            empty_average: match self.empty_average {
                EmptyAverage::Zero => EmptyAggregate::Zero,
                EmptyAverage::Div0 => EmptyAggregate::DivZero,
            },
            max_formula_len: self.max_formula_len,
            max_referenced_cells: self.max_referenced_cells,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            get,
            engine,
        } => run(&script, &get, &engine),
        Commands::Snapshot {
            script,
            address,
            engine,
        } => snapshot(&script, &address, &engine),
        Commands::Info { script, engine } => show_info(&script, &engine),
    }
}

fn run(script: &Path, get: &[String], engine: &EngineArgs) -> Result<()> {
    let sheet = load(script, engine)?;

    let addresses = if get.is_empty() {
        sheet.used_addresses()
    } else {
        get.iter()
            .map(|a| CellAddress::parse(a).with_context(|| format!("Invalid address '{}'", a)))
            .collect::<Result<Vec<_>>>()?
    };

    let mut out = io::stdout().lock();
    for addr in addresses {
        writeln!(out, "{}\t{}", addr, sheet.get_cell_value(addr))
            .context("Failed to write to stdout")?;
    }

    Ok(())
}

fn snapshot(script: &Path, address: &str, engine: &EngineArgs) -> Result<()> {
    let sheet = load(script, engine)?;
    let address =
        CellAddress::parse(address).with_context(|| format!("Invalid address '{}'", address))?;

    let json = serde_json::to_string_pretty(&sheet.snapshot(address))
        .context("Failed to serialize snapshot")?;
    println!("{}", json);

    Ok(())
}

fn show_info(script: &Path, engine: &EngineArgs) -> Result<()> {
    let sheet = load(script, engine)?;
    let used = sheet.used_addresses();

    let errors: Vec<(CellAddress, CellError)> = used
        .iter()
        .filter_map(|&addr| sheet.get_cell_value(addr).as_error().map(|e| (addr, e)))
        .collect();

    println!("Script: {}", script.display());
    println!("Cells: {}", used.len());
    println!("Formulas: {}", sheet.formula_cells().len());
    println!("Errors: {}", errors.len());
    for (addr, error) in errors {
        println!("  {}\t{}", addr, error);
    }

    Ok(())
}

/// Read a script and apply it to a fresh sheet
fn load(script: &Path, engine: &EngineArgs) -> Result<Spreadsheet> {
    let text = read_script(script)?;
    let writes = parse_script(&text)
        .with_context(|| format!("Failed to parse script '{}'", script.display()))?;

    let sheet = Spreadsheet::with_options(engine.options());
    for (addr, input) in writes {
        sheet.set_cell(addr, input);
    }

    eprintln!(
        "Applied {} cells ({} formulas)",
        sheet.len(),
        sheet.formula_cells().len()
    );
    Ok(sheet)
}

fn read_script(script: &Path) -> Result<String> {
    if script.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read script from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read '{}'", script.display()))
}

/// Split a script into `(address, input)` writes
///
/// Blank lines and lines starting with `#` are skipped. An address with no
/// input clears the cell.
fn parse_script(text: &str) -> Result<Vec<(CellAddress, CellInput)>> {
    let mut writes = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (addr, input) = match line.split_once(char::is_whitespace) {
            Some((addr, input)) => (addr, input.trim()),
            None => (line, ""),
        };
        let Ok(addr) = CellAddress::parse(addr) else {
            bail!("line {}: invalid cell address '{}'", i + 1, addr);
        };

        writes.push((addr, CellInput::parse(input)));
    }

    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_parse_script() {
        let script = "\
# comment
A1 10

A2   =A1 + 5
B1 hello world
C1
";
        let writes = parse_script(script).unwrap();
        assert_eq!(
            writes,
            vec![
                (a("A1"), CellInput::Value(Value::Number(10.0))),
                (a("A2"), CellInput::Formula("=A1 + 5".into())),
                (a("B1"), CellInput::Value(Value::text("hello world"))),
                (a("C1"), CellInput::Empty),
            ]
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("A1 1\nnope 2\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_engine_args() {
        let cli = Cli::parse_from([
            "sheetcalc",
            "run",
            "script.txt",
            "--get",
            "A1",
            "--get",
            "B2",
            "--empty-average",
            "div0",
        ]);
        let Commands::Run { get, engine, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(get, vec!["A1", "B2"]);
        assert_eq!(engine.options().empty_average, EmptyAggregate::DivZero);
        assert_eq!(engine.options().max_formula_len, 8192);
    }
}
