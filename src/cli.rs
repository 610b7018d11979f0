use anyhow::{Result, anyhow};
use log::{info, warn};
use pico_args::Arguments;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    env, fs,
    io::{self, BufRead, BufReader},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use handspell::{
    actions::SpellSink,
    config::ConfigState,
    debug::{DebugSurface, DebugToggles},
    landmarks::Keypoint,
    pipeline::Pipeline,
    trail::TrailPoint,
};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("run") => {
            let input: Option<String> = pargs.opt_value_from_str("--input")?;
            let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;
            let trace = pargs.contains("--trace");
            run_stream(input, profile_name, trace)
        }

        Some("score") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handspell score <points.json>"))?;
            score_file(&path)
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { '*' } else { ' ' };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handspell use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            print_response(&cfg.doctor_report());
            Ok(())
        }

        Some("debug") => {
            let action: Option<String> = pargs.free_from_str().ok();
            let key: Option<String> = pargs.free_from_str().ok();
            debug_cmd(action.as_deref(), key.as_deref())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn run_stream(input: Option<String>, profile_name: Option<String>, trace: bool) -> Result<()> {
    let cfg = ConfigState::load_or_install_default()?;
    let profile = match profile_name.as_deref() {
        Some(name) => cfg.profile_named(name)?,
        None => cfg.profile.clone(),
    };
    info!(
        "profile '{}'",
        profile_name.as_deref().unwrap_or(&cfg.active_name)
    );

    let stop = Arc::new(AtomicBool::new(false));
    install_stop_handler(Arc::clone(&stop))?;

    let mut pipeline = Pipeline::new(profile, SpellSink::stdout())?.with_trace(trace);
    let reader: Box<dyn BufRead + Send> = match input.as_deref() {
        Some("-") | None => Box::new(BufReader::new(io::stdin())),
        Some(path) => {
            let f = fs::File::open(path).map_err(|e| anyhow!("failed to open {path}: {e}"))?;
            Box::new(BufReader::new(f))
        }
    };
    let summary = pipeline.run(reader, stop)?;
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn install_stop_handler(stop: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("handspell-signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                warn!("received signal {sig}; stopping");
                stop.store(true, Ordering::Relaxed);
            }
        })?;
    Ok(())
}

fn score_file(path: &str) -> Result<()> {
    let txt = fs::read_to_string(path).map_err(|e| anyhow!("failed to read {path}: {e}"))?;
    let points: Vec<Keypoint> =
        serde_json::from_str(&txt).map_err(|e| anyhow!("failed to parse {path}: {e}"))?;
    let trail: Vec<TrailPoint> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .enumerate()
        .map(|(i, p)| TrailPoint {
            x: p.x,
            y: p.y,
            sample_index: i as u64,
        })
        .collect();

    let cfg = ConfigState::load_or_install_default()?;
    let recognizer = cfg.profile.recognizer()?;
    let classifier = recognizer.classifier();
    print_response(&serde_json::json!({
        "points": trail.len(),
        "min_trail_points": classifier.min_trail_points(),
        "scores": classifier.scores(&trail),
        "selected": classifier.classify_dynamic(&trail),
    }));
    Ok(())
}

fn debug_cmd(action: Option<&str>, key: Option<&str>) -> Result<()> {
    let cfg = ConfigState::load_or_install_default()?;
    let mut surface = DebugSurface::new(DebugToggles::default(), cfg.debug_store());
    match action.unwrap_or("show") {
        "show" => {}
        "toggle" => {
            let key = key
                .and_then(|k| k.chars().next())
                .ok_or_else(|| anyhow!("usage: handspell debug toggle <S|P|T|K|L|H>"))?;
            if !surface.handle_key(key)? {
                eprintln!("unknown toggle key: {key}");
            }
        }
        "reset" => surface.reset()?,
        "on" => surface.set_enabled(true)?,
        "off" => surface.set_enabled(false)?,
        other => return Err(anyhow!("unknown debug action: {other}")),
    }
    print_response(&serde_json::json!({
        "toggles": surface.toggles(),
        "layers": surface.visible_layers(),
    }));
    Ok(())
}

fn print_help() {
    println!(
        r#"handspell - hand-gesture trajectory recognizer

USAGE:
  handspell help [command]              Show general or command-specific help
  handspell run [--input PATH]          Recognize gestures from a JSON Lines stream
               [--profile NAME] [--trace]
  handspell score <points.json>         Score a recorded trail with every shape scorer
  handspell list                        List profiles
  handspell use <name>                  Switch active profile
  handspell doctor                      Show configuration diagnostics
  handspell debug [show|toggle <KEY>|reset|on|off]
                                        Inspect or change debug overlay toggles

TIPS:
  - Profiles: ~/.config/handspell/profiles
  - Active profile pointer: ~/.config/handspell/active
  - Spells are printed to stdout as JSON lines; logs go to stderr (RUST_LOG)
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: handspell run [--input PATH] [--profile NAME] [--trace]\n\
             Reads one JSON sample per line (stdin by default), either an array of\n\
             detections or {{\"hands\": [...]}}, and prints cast spells as JSON lines.\n\
             --trace logs each hand's scores after every sample."
        ),
        "score" => println!(
            "usage: handspell score <points.json>\n\
             Scores a JSON array of {{\"x\":..,\"y\":..}} points with the active profile."
        ),
        "list" => {
            println!("usage: handspell list\nLists available profiles; marks active with '*'.")
        }
        "use" => {
            println!("usage: handspell use <name>\nSwitches active profile to <name>.")
        }
        "doctor" => println!(
            "usage: handspell doctor\nPrints paths, the active profile and its effective settings."
        ),
        "debug" => println!(
            "usage: handspell debug [show|toggle <KEY>|reset|on|off]\n\
             Keys: S skeleton, P palm center, T trail, K keypoints, L labels, H panel.\n\
             'on'/'off' switch every layer except the panel."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
