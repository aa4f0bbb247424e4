use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
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
    // Secrets (PESA_JWT_SECRET, PESA_CONSUMER_KEY, PESA_CONSUMER_SECRET, PESA_PASSKEY) are deliberately left out
    const DISPLAY_ENVS: [&str; 19] = [
        "RUST_LOG",
        "PESA_HOST",
        "PESA_PORT",
        "PESA_DATABASE_URL",
        "PESA_SHIPPING_FEE",
        "PESA_MAX_AMOUNT",
        "PESA_DUPLICATE_WINDOW_SECS",
        "PESA_STATUS_GRACE_SECS",
        "PESA_SWEEP_INTERVAL_SECS",
        "PESA_STALE_PAYMENT_SECS",
        "PESA_RECONCILE_INTERVAL_HOURS",
        "PESA_USE_X_FORWARDED_FOR",
        "PESA_USE_FORWARDED",
        "PESA_CALLBACK_IP_WHITELIST",
        "PESA_GATEWAY_URL",
        "PESA_SHORTCODE",
        "PESA_CALLBACK_URL",
        "PESA_TRANSACTION_TYPE",
        "PESA_GATEWAY_TIMEOUT_SECS",
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
