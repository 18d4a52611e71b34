use std::{env, env::VarError};

/// There's no real CLI for the service, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "EPS_DATABASE_URL",
        "EPS_YLT_BASE_URL",
        "EPS_YLT_TIMEOUT_SECS",
        "EPS_RECONCILE_INTERVAL_SECS",
        "EPS_SESSION_REFRESH_INTERVAL_SECS",
        "EPS_PAYMENT_TIMEOUT_MINS",
        "EPS_DISPATCH_STAGGER_MS",
        "EPS_MAX_IN_FLIGHT_CHECKS",
        "EPS_SESSION_TTL_MINS",
        "EPS_RUN_REPAIR_PASS",
        "EPS_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
