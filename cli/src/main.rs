//! fieldrule CLI — driving adapter for the fieldrule engine.
//!
//! Subcommands:
//! - `eval <rule> <entity> [--trace]` — evaluate a stored rule against an entity
//! - `resolve <rule> <catalog> [--choose level=value] [--value line...]` — run one configuration round
//! - `check <rule>` — validate a stored rule
//! - `info` — print cascade levels and compare methods
//!
//! Files are JSON when their extension is `.json`, YAML otherwise.
//! Logging goes to stderr; set `RUST_LOG=fieldrule=debug` to see discarded
//! selections.

use std::path::Path;
use std::process;

use fieldrule::{
    Choice, CompareMethod, Condition, ConfigurationSession, EntityFieldSnapshot, Level,
    RuleConfiguration, ValueWidget,
};
use fieldrule_test::{StaticCatalog, TextWidget};
use serde::de::DeserializeOwned;

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "eval" => cmd_eval(&args[2..]),
        "resolve" => cmd_resolve(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "info" => cmd_info(),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_eval(args: &[String]) -> Result<(), String> {
    let [rule_path, entity_path, rest @ ..] = args else {
        return Err("eval requires a rule file and an entity file".into());
    };
    let trace = match rest {
        [] => false,
        [flag] if flag == "--trace" => true,
        [other, ..] => return Err(format!("unexpected argument \"{other}\"")),
    };

    let condition = load_condition(rule_path)?;
    let entity: EntityFieldSnapshot = load_document(entity_path)?;
    tracing::debug!(rule = %condition.summary(), "evaluating");

    let (matched, eval_trace) = condition.evaluate_with_trace(&entity);
    println!("{}", if matched { "match" } else { "no match" });

    if trace {
        let yaml = serde_yaml::to_string(&eval_trace)
            .map_err(|e| format!("failed to print trace: {e}"))?;
        print!("{yaml}");
    }

    Ok(())
}

fn cmd_resolve(args: &[String]) -> Result<(), String> {
    let [rule_path, catalog_path, rest @ ..] = args else {
        return Err("resolve requires a rule file and a catalog file".into());
    };
    let options = parse_resolve_options(rest)?;

    let config: RuleConfiguration = load_document(rule_path)?;
    let catalog: StaticCatalog = load_document(catalog_path)?;
    tracing::debug!(
        catalog = %catalog_path,
        entity_types = catalog.entity_types.len(),
        "loaded catalog"
    );
    let session = ConfigurationSession::new(&catalog);

    let mut round = session
        .round(&config, options.choice)
        .map_err(|e| e.to_string())?;

    if !options.values.is_empty() {
        let field = round
            .field
            .as_ref()
            .ok_or("--value given but no field is resolved")?;
        let prefill = round.prefill.clone().unwrap_or_default();
        let spec = TextWidget.render(field, &prefill);
        let values = TextWidget
            .parse_submission(&spec, &options.values.join("\n"))
            .map_err(|e| e.to_string())?;
        round = session
            .round(&round.config, Some(Choice::Values(values)))
            .map_err(|e| e.to_string())?;
    }

    for level in round.stale_levels() {
        eprintln!("warning: stored {level} is no longer valid and was discarded");
    }

    let yaml = serde_yaml::to_string(&round).map_err(|e| format!("failed to print round: {e}"))?;
    print!("{yaml}");
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    let [rule_path] = args else {
        return Err("check requires a rule file".into());
    };

    let condition = load_condition(rule_path)?;

    println!("Rule valid");
    println!("  {}", condition.summary());
    println!("  state: {:?}", condition.config().state());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Uniform return type for all commands
fn cmd_info() -> Result<(), String> {
    println!("Cascade levels:");
    for level in Level::ALL {
        let multiple = if level.is_multiple() { " (multiple)" } else { "" };
        println!("  {:<14} {}{multiple}", level.as_str(), level.label());
    }

    println!("\nCompare methods:");
    for method in CompareMethod::ALL {
        println!("  {:<18} {}", method.as_str(), method.label());
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Document loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_condition(path: &str) -> Result<Condition, String> {
    let config: RuleConfiguration = load_document(path)?;
    Condition::new(config).map_err(|e| format!("rule invalid: {e}"))
}

fn load_document<T: DeserializeOwned>(path: &str) -> Result<T, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error in \"{path}\": {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error in \"{path}\": {e}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct ResolveOptions {
    choice: Option<Choice>,
    values: Vec<String>,
}

fn parse_resolve_options(args: &[String]) -> Result<ResolveOptions, String> {
    let mut options = ResolveOptions::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--choose" => {
                let raw = args.get(i + 1).ok_or("--choose requires level=value")?;
                if options.choice.is_some() {
                    return Err("only one --choose per round".into());
                }
                options.choice = Some(raw.parse().map_err(|e: fieldrule::RuleError| e.to_string())?);
                i += 2;
            }
            "--value" => {
                let raw = args.get(i + 1).ok_or("--value requires a line")?;
                options.values.push(raw.clone());
                i += 2;
            }
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
    }

    Ok(options)
}

fn print_usage() {
    eprintln!(
        "Usage: fieldrule <command> [options]

Commands:
  eval <rule> <entity> [--trace]              Evaluate rule against entity
  resolve <rule> <catalog> [--choose level=value] [--value line...]
                                              Run one configuration round
  check <rule>                                Validate rule
  info                                        Print levels and compare methods
  help                                        Show this help"
    );
}
