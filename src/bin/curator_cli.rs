use gene_curator::shell::{
    execute_shell_command, parse_shell_tokens, shell_help_text, ShellCommand,
};
use gene_curator::store::CurationState;
use gene_curator::transaction::{AllowAll, CurationService};
use serde::Serialize;
use std::env;

const DEFAULT_STORE_PATH: &str = ".curator_state.json";

fn usage() {
    eprintln!(
        "Usage:\n  \
  curator_cli [--store PATH] summary\n  \
  curator_cli [--store PATH] show ENTITY_ID\n  \
  curator_cli [--store PATH] history ENTITY_ID\n  \
  curator_cli [--store PATH] version ENTITY_ID STEPS_BACK\n  \
  curator_cli [--store PATH] edit ENTITY_ID BASE_SEQ '<attributes-json>' [--author NAME]\n  \
  curator_cli [--store PATH] revert ENTITY_ID STEPS_BACK [--author NAME]\n  \
  curator_cli [--store PATH] import-annotation '<annotation-json>'\n  \
  curator_cli [--store PATH] suggest-keys\n  \
  curator_cli [--store PATH] export-store PATH\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_state(path: &str) -> Result<CurationState, String> {
    if std::path::Path::new(path).exists() {
        CurationState::load_from_path(path).map_err(|e| e.to_string())
    } else {
        Ok(CurationState::default())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_global_store_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--store" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_STORE_PATH.to_string(), 1)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        println!("\n{}", shell_help_text());
        return Ok(());
    }

    let (store_path, cmd_idx) = parse_global_store_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }

    // `export-store` writes elsewhere; everything else maps onto one shell
    // command executed against the store file.
    if args[cmd_idx] == "export-store" {
        let target = args
            .get(cmd_idx + 1)
            .ok_or_else(|| "Missing path for export-store".to_string())?;
        let state = load_state(&store_path)?;
        state.save_to_path(target).map_err(|e| e.to_string())?;
        println!("Saved store from '{store_path}' to '{target}'");
        return Ok(());
    }

    let command = parse_shell_tokens(&args[cmd_idx..])?;
    run_command(&store_path, &command)
}

fn run_command(store_path: &str, command: &ShellCommand) -> Result<(), String> {
    let mut service = CurationService::new(load_state(store_path)?, AllowAll);
    let result = execute_shell_command(&mut service, command)?;
    if result.state_changed {
        service
            .state()
            .save_to_path(store_path)
            .map_err(|e| e.to_string())?;
    }
    print_json(&result.output)
}
