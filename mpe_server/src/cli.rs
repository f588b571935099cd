use std::{env, env::VarError};

/// There's no real CLI for the daemon, so just do quick 'n dirty
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
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "MPE_DATABASE_URL",
        "MPE_CURRENCY_PRECISION",
        "MPE_REFERENCE_CURRENCY",
        "MPE_MONITORED_CURRENCIES",
        "MPE_VOLATILITY_ENABLED",
        "MPE_VOLATILITY_DOWNSIDE_THRESHOLD_PCT",
        "MPE_VOLATILITY_WINDOW_SECONDS",
        "MPE_VOLATILITY_COOLDOWN_SECONDS",
        "MPE_VOLATILITY_STALE_THRESHOLD_SECONDS",
        "MPE_VOLATILITY_TICK_SECONDS",
        "MPE_CHAINS",
        "MPE_PURCHASE_WEBHOOK_URL",
    ];
    const CHAIN_ENVS: [&str; 6] =
        ["RPC_URL", "RPC_USER", "MIN_CONFIRMATIONS", "POLL_SECONDS", "RPC_TIMEOUT_SECONDS", "MAX_CONCURRENT_ADDRESSES"];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| print_env(name));
    let chains = env::var("MPE_CHAINS").unwrap_or_else(|_| mpe_common::YEC.to_string());
    for code in mpe_common::helpers::parse_currency_list(&chains) {
        CHAIN_ENVS.iter().for_each(|suffix| print_env(&format!("MPE_{code}_{suffix}")));
    }
}

fn print_env(name: &str) {
    let val = match env::var(name) {
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    };
    println!("  {name:<40} {val:<15}");
}
