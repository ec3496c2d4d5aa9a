/// CLI tool for the wildcard engine
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wildcard_engine::{resolve_with_seed, FolderStorage, ValueSetStore, WildcardResolver};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  wildcard <wildcards-dir> <text> [seed]   Resolve wildcards in text");
    eprintln!("  wildcard <wildcards-dir> -               Read text from stdin");
    eprintln!("  wildcard --help                          Show this help message");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  <wildcards-dir>   Directory containing <name>.json value-set files");
    eprintln!("  <text>            Text containing {{name}} and [name] tokens");
    eprintln!("  [seed]            Optional seed for deterministic output (default: random)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  wildcard ./wildcards 'a [colors] car'");
    eprintln!("  wildcard ./wildcards 'by [1:artists] and [1:artists]' 42");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    if args.len() < 3 {
        print_usage();
        process::exit(1);
    }

    let text = if args[2] == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).unwrap_or_else(|e| {
            eprintln!("Error reading from stdin: {}", e);
            process::exit(1);
        });
        buffer
    } else {
        args[2].clone()
    };

    let storage = FolderStorage::new(PathBuf::from(&args[1]));
    let store = Arc::new(ValueSetStore::new(Arc::new(storage)));

    let resolution = if args.len() > 3 {
        let seed = args[3].parse::<u64>().unwrap_or_else(|e| {
            eprintln!("Error parsing seed '{}': {}", args[3], e);
            process::exit(1);
        });
        resolve_with_seed(store, &text, seed).await
    } else {
        WildcardResolver::new(store).resolve(&text).await
    };

    println!("{}", resolution.resolved_text);

    if !resolution.resolved_by_name.is_empty() {
        let mut names: Vec<&String> = resolution.resolved_by_name.keys().collect();
        names.sort();
        for name in names {
            eprintln!("{}: {}", name, resolution.resolved_by_name[name].join(", "));
        }
    }
}
