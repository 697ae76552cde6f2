//! Command-line interface for xmlmatch

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use serde::Serialize;

#[cfg(feature = "cli")]
use xmlmatch::{locator, Document, MatchOutcome, NamespaceMap, NodeRef, Pattern, Shape, Value};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlmatch")]
#[command(
    author,
    version,
    about = "Structural pattern matching over XML documents",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Match a pattern against every node a location path selects
    Match {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Location path selecting the nodes to match
        #[arg(short, long, default_value = "/")]
        path: String,

        /// Pattern to match
        #[arg(short = 'P', long)]
        pattern: String,

        /// Prefix mapping for the location path, as prefix=uri
        #[arg(long = "ns", value_name = "PREFIX=URI", value_parser = parse_namespace)]
        namespaces: Vec<(String, String)>,

        /// Fail on the first node that does not match
        #[arg(short, long)]
        require: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Compile a pattern and list the names it binds
    Check {
        /// Pattern to compile
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Target shape: any, document, element, attribute, text, namespace, node
        #[arg(short, long, default_value = "any")]
        shape: String,
    },
}

#[cfg(feature = "cli")]
#[derive(Serialize, Debug)]
struct MatchReport {
    index: usize,
    node: String,
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bindings: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match {
            file,
            path,
            pattern,
            namespaces,
            require,
            json,
        } => cmd_match(file, path, pattern, namespaces, require, json),
        Commands::Check { pattern, shape } => cmd_check(pattern, shape),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn parse_namespace(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((prefix, uri)) if !prefix.is_empty() && !uri.is_empty() => {
            Ok((prefix.to_string(), uri.to_string()))
        }
        _ => Err(format!("expected PREFIX=URI, got '{}'", s)),
    }
}

#[cfg(feature = "cli")]
fn cmd_match(
    file: PathBuf,
    path: String,
    pattern: String,
    namespaces: Vec<(String, String)>,
    require: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = Pattern::compile(&pattern)?;
    let doc = Document::from_file(&file)?;
    let namespaces: NamespaceMap = namespaces.into_iter().collect();

    let nodes = locator::find_all(NodeRef::Document(&doc), &path, &namespaces)?;
    if nodes.is_empty() {
        return Err(format!("location path '{}' selected no nodes", path).into());
    }

    let mut reports = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.into_iter().enumerate() {
        let value = Value::from(node);
        if require {
            pattern.must_match(value.clone())?;
        }
        let report = match pattern.try_match(value.clone()) {
            MatchOutcome::Matched(bindings) => MatchReport {
                index,
                node: value.describe(),
                matched: true,
                bindings: Some(bindings.to_json()),
                reason: None,
                path: None,
            },
            MatchOutcome::NoMatch(failure) => MatchReport {
                index,
                node: value.describe(),
                matched: false,
                bindings: None,
                reason: Some(failure.reason),
                path: Some(failure.path),
            },
        };
        reports.push(report);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        if report.matched {
            println!("✓ [{}] {}", report.index, report.node);
            if let Some(serde_json::Value::Object(bindings)) = &report.bindings {
                for (name, value) in bindings {
                    println!("    {} = {}", name, value);
                }
            }
        } else {
            println!(
                "✗ [{}] {}: {} at {}",
                report.index,
                report.node,
                report.reason.as_deref().unwrap_or_default(),
                report.path.as_deref().unwrap_or("$")
            );
        }
    }

    let matched = reports.iter().filter(|r| r.matched).count();
    println!();
    println!("{} of {} node(s) matched", matched, reports.len());

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_check(pattern: String, shape: String) -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::parse(&shape).ok_or_else(|| {
        format!(
            "Unknown shape: {}. Use: any, document, element, attribute, text, namespace, node",
            shape
        )
    })?;

    let pattern = Pattern::compile_for(&pattern, shape)?;

    println!("✓ Pattern is valid for {}", pattern.shape());
    println!("  {}", pattern);
    if !pattern.captures().is_empty() {
        println!("  captures: {}", pattern.captures().join(", "));
    }
    if !pattern.pins().is_empty() {
        println!("  pins: {}", pattern.pins().join(", "));
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
