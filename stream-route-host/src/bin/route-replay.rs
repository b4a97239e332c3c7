//! Replays a JSON event script through the routing policy and prints one
//! JSON line per event. Set `RUST_LOG=debug` to see engine decisions.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use stream_route_core::PolicyConfig;
use stream_route_host::{stream_map, HostError, Replay, Script};

/// Command-line arguments for route-replay
#[derive(Parser, Debug)]
#[command(name = "route-replay")]
#[command(about = "Replay a policy event script against in-memory devices")]
#[command(version)]
struct Args {
    /// Stream map to load instead of the built-in one
    #[arg(long, env = "ROUTE_STREAM_MAP")]
    stream_map: Option<PathBuf>,

    /// Event script (JSON)
    script: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("route-replay: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), HostError> {
    let roles = stream_map::load_or_default(args.stream_map.as_deref())?;
    let script = Script::load(&args.script)?;
    log::info!("replaying {} event(s) from {}", script.events.len(), args.script.display());

    let mut replay = Replay::new(roles, PolicyConfig::default(), script.devices)?;
    for event in script.events {
        let step = replay.step(event);
        let line = serde_json::to_string(&step).map_err(|e| HostError::Script(e.to_string()))?;
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn script_is_required_and_map_optional() {
        let args = Args::try_parse_from(["route-replay", "--stream-map", "map.json", "run.json"]).unwrap();
        assert_eq!(args.stream_map, Some(PathBuf::from("map.json")));
        assert_eq!(args.script, PathBuf::from("run.json"));

        assert!(Args::try_parse_from(["route-replay"]).is_err());
    }
}
