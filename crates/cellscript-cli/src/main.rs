//! cellscript CLI - evaluate and inspect cell formulas

use anyhow::{bail, Context, Result};
use cellscript_formula::{
    evaluate, parse_with, render_with, resolve_hint, Ast, CellReport, EvaluateOptions,
    EvaluationContext, FormulaError, FormulaResult, FunctionCatalog, Hint, ParseOptions,
    RenderOptions, Value,
};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellscript")]
#[command(author, version, about = "Evaluate and inspect spreadsheet cell formulas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate cell input and print the value
    Eval {
        /// Cell input, e.g. "=add(A1, 2)" ("-" reads stdin)
        formula: String,

        /// Referenced cell as NAME=INPUT; INPUT is evaluated on its own
        #[arg(short, long = "ref", value_name = "NAME=INPUT", value_parser = parse_reference)]
        references: Vec<(String, String)>,

        /// Decimal places to round numeric results to
        #[arg(long, default_value = "5", conflicts_with = "no_rounding")]
        decimal_places: u32,

        /// Print numeric results unrounded
        #[arg(long)]
        no_rounding: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the canonical text of cell input
    Render {
        /// Cell input ("-" reads stdin)
        formula: String,

        /// Also print the offset table
        #[arg(short, long)]
        segments: bool,

        /// Leave markup characters in strings unescaped
        #[arg(long)]
        plain: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the hint for a caret position
    Hint {
        /// Cell input ("-" reads stdin)
        formula: String,

        /// Caret position in chars (the hint is for the char before it)
        caret: usize,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the built-in functions
    Functions {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Maximum nesting of calls and brackets
    #[arg(long, default_value = "64")]
    max_depth: usize,
}

impl CommonArgs {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            formula,
            references,
            decimal_places,
            no_rounding,
            common,
        } => {
            let options = EvaluateOptions {
                decimal_places: (!no_rounding).then_some(decimal_places),
            };
            eval(&read_formula(formula)?, &references, options, &common)
        }
        Commands::Render {
            formula,
            segments,
            plain,
            common,
        } => {
            let options = RenderOptions {
                escape_markup: !plain,
            };
            render(&read_formula(formula)?, segments, &options, &common)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Hint {
            formula,
            caret,
            common,
        } => {
            hint(&read_formula(formula)?, caret, &common)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Functions { json } => {
            list_functions(json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `-` means the formula comes from stdin
fn read_formula(formula: String) -> Result<String> {
    if formula != "-" {
        return Ok(formula);
    }

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read formula from stdin")?;
    Ok(input.trim_end_matches(['\n', '\r']).to_string())
}

/// `NAME=INPUT` with NAME a cell reference such as `A1`
fn parse_reference(arg: &str) -> std::result::Result<(String, String), String> {
    let (name, input) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=INPUT, got '{}'", arg))?;

    let row = name.trim_start_matches(|c: char| c.is_ascii_uppercase());
    let valid =
        row.len() < name.len() && !row.is_empty() && row.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(format!("'{}' is not a cell reference like A1", name));
    }

    Ok((name.to_string(), input.to_string()))
}

fn parse_input(formula: &str, options: &ParseOptions) -> Result<Ast> {
    match parse_with(formula, options) {
        Ok(ast) => Ok(ast),
        Err(FormulaError::Syntax { offset, reason }) => {
            bail!("Syntax error at char {}: {}", offset, reason)
        }
        Err(e) => Err(e).context("Failed to parse formula"),
    }
}

fn eval(
    formula: &str,
    references: &[(String, String)],
    options: EvaluateOptions,
    common: &CommonArgs,
) -> Result<ExitCode> {
    let parse_options = common.parse_options();

    // Each reference is evaluated alone, so a bad input is stored as a failure
    let standalone = EvaluationContext::simple().with_options(options.clone());
    let snapshot: HashMap<String, FormulaResult<Value>> = references
        .iter()
        .map(|(name, input)| {
            let result =
                parse_with(input, &parse_options).and_then(|ast| evaluate(&ast, &standalone));
            tracing::debug!(name = %name, ok = result.is_ok(), "stored reference");
            (name.clone(), result)
        })
        .collect();

    let ctx = EvaluationContext::new(&snapshot).with_options(options);
    let result = parse_with(formula, &parse_options).and_then(|ast| evaluate(&ast, &ctx));

    if common.json {
        let report = CellReport::from(&result);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize result")?
        );
    } else {
        match &result {
            Ok(value) => println!("{}", value),
            Err(e) => println!("error: {}", e),
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render(
    formula: &str,
    segments: bool,
    options: &RenderOptions,
    common: &CommonArgs,
) -> Result<()> {
    let ast = parse_input(formula, &common.parse_options())?;
    let rendered = render_with(&ast, options);
    if rendered.failed {
        bail!("Failed to render formula");
    }

    if common.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rendered).context("Failed to serialize rendering")?
        );
        return Ok(());
    }

    println!("{}", rendered.text);
    if segments {
        for segment in &rendered.segments {
            println!(
                "{}..{}\t{}\t{}\t{:?}\t{}",
                segment.range.start,
                segment.range.end,
                segment.kind,
                format!("{:?}", segment.part).to_lowercase(),
                segment.path,
                rendered.slice(segment)
            );
        }
    }

    Ok(())
}

fn hint(formula: &str, caret: usize, common: &CommonArgs) -> Result<()> {
    let ast = parse_input(formula, &common.parse_options())?;
    // Hints map carets through unescaped text
    let rendered = render_with(
        &ast,
        &RenderOptions {
            escape_markup: false,
        },
    );
    let hint = resolve_hint(&ast, &rendered, caret);

    if common.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&hint).context("Failed to serialize hint")?
        );
        return Ok(());
    }

    match hint {
        None => println!("No hint"),
        Some(Hint::Function {
            name,
            description,
            overview,
        }) => {
            println!("{}: {}", name, description);
            println!("{}", overview);
        }
        Some(Hint::Argument {
            number,
            descriptor,
            overview,
        }) => {
            match descriptor {
                Some(d) => match d.type_label {
                    Some(label) => println!("Argument {}: {} ({})", number, d.name, label),
                    None => println!("Argument {}: {}", number, d.name),
                },
                None => println!("Argument {}", number),
            }
            println!("{}", overview);
        }
        Some(Hint::Overview { overview }) => println!("{}", overview),
    }

    Ok(())
}

fn list_functions(json: bool) -> Result<()> {
    let catalog = FunctionCatalog::builtin();

    if json {
        let entries: Vec<_> = catalog
            .names()
            .into_iter()
            .filter_map(|name| catalog.get(name))
            .map(|def| {
                serde_json::json!({
                    "name": def.name,
                    "overview": def.overview(),
                    "description": def.description,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize functions")?
        );
        return Ok(());
    }

    for name in catalog.names() {
        if let Some(def) = catalog.get(name) {
            println!("{}\t{}", def.overview(), def.description);
        }
    }

    Ok(())
}
