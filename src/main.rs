use kumiki::prelude::*;
use std::env;
use std::fs;

use itertools::Itertools;

fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: cargo run -- <path/to/workflow_config.json>");
        std::process::exit(1);
    }

    let config_path = &args[1];
    println!("Loading workflow config from: {}", config_path);

    let config_json = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read config file '{}': {}", config_path, e);
            std::process::exit(1);
        }
    };

    let config: WorkflowConfig = match serde_json::from_str(&config_json) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse config file '{}': {}", config_path, e);
            std::process::exit(1);
        }
    };

    println!("\nBuilding workflow graph...");

    let built = match WorkflowBuilder::new(config).build() {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Build failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("Built {} nodes", built.prompt.nodes.len());
    println!("Output nodes: {}", built.prompt.outputs.iter().join(", "));

    match serde_json::to_string_pretty(&built.prompt) {
        Ok(json) => println!("\n{}", json),
        Err(e) => {
            eprintln!("Failed to serialize wire prompt: {}", e);
            std::process::exit(1);
        }
    }
}
