//! CLI wrapper: poll the engine and print the result as JSON.
//!
//! Dashboards embed the library directly; this binary exists for scripting
//! and for eyeballing the engine's output.
//!
//! Usage: `agent-radar [--watch <seconds>]`

use std::time::Duration;

use agent_radar::{Engine, SysinfoProvider};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let watch_interval = match parse_args() {
        Ok(interval) => interval,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: agent-radar [--watch <seconds>]");
            std::process::exit(2);
        }
    };

    let engine = Engine::new(SysinfoProvider::new());

    loop {
        match engine.poll() {
            Ok(response) => match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(error) => {
                    eprintln!("failed to serialize response: {error}");
                    std::process::exit(1);
                }
            },
            Err(error) => {
                eprintln!("poll failed: {error}");
                std::process::exit(1);
            }
        }

        match watch_interval {
            Some(interval) => std::thread::sleep(interval),
            None => break,
        }
    }
}

fn parse_args() -> Result<Option<Duration>, String> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(None),
        Some("--watch") => {
            let seconds: u64 = args
                .next()
                .ok_or_else(|| "--watch requires a seconds argument".to_string())?
                .parse()
                .map_err(|_| "--watch requires an integer seconds argument".to_string())?;
            Ok(Some(Duration::from_secs(seconds.max(1))))
        }
        Some(other) => Err(format!("unknown argument: {other}")),
    }
}
