//! Entry point for erlytop. Parses args, resolves the connection profile and
//! polls the node's process table.

use std::collections::HashSet;
use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use erlytop::aggregate::{aggregate_metric, ProcMetric, ThresholdFraction};
use erlytop::poller::{ControllerEvent, PollingState, ProcController};
use erlytop::profiles::{
    load_profiles, resolve_interval, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
};
use erlytop::report::{format_chart, format_table};
use erlytop::sort::SortSpec;
use erlytop::ws::WsNode;

const USAGE_FLAGS: &str = "[--profile NAME|-P NAME] [--save] [--interval-ms MS|-i MS] \
[--sort COL[:asc|desc]|-s COL[:asc|desc]] [--chart reduc|heap|stack|totalheap|-c METRIC] \
[--once] [--dry-run] [ws://HOST:PORT/ws]";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    profile: Option<String>,
    save: bool,
    interval_ms: Option<u64>,
    sort: Option<SortSpec>,
    chart: Option<ProcMetric>,
    once: bool,
    dry_run: bool,
}

enum ArgsOutcome {
    Run(ParsedArgs),
    Help(String),
    Invalid(String),
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> ArgsOutcome {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "erlytop".into());
    let usage = format!("Usage: {prog} {USAGE_FLAGS}");
    let mut parsed = ParsedArgs::default();

    // accepts both "--flag VALUE" and "--flag=VALUE"
    let value_of = |flag: &str, inline: Option<String>, it: &mut I::IntoIter| {
        inline
            .or_else(|| it.next())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("{flag} needs a value. {usage}"))
    };
    let switch = |flag: &str, inline: &Option<String>| match inline {
        Some(v) => Err(format!("{flag} takes no value (got '{v}'). {usage}")),
        None => Ok(()),
    };

    while let Some(arg) = it.next() {
        let (name, inline) = match arg.split_once('=') {
            Some((n, v)) if n.starts_with("--") => (n.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let res: Result<(), String> = match name.as_str() {
            "-h" | "--help" => return ArgsOutcome::Help(usage.clone()),
            "--profile" | "-P" => value_of("--profile", inline, &mut it).map(|v| {
                parsed.profile = Some(v);
            }),
            "--interval-ms" | "-i" => value_of("--interval-ms", inline, &mut it).and_then(|v| {
                let ms = v
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or_else(|| format!("invalid interval '{v}'"))?;
                parsed.interval_ms = Some(ms);
                Ok(())
            }),
            "--sort" | "-s" => value_of("--sort", inline, &mut it).and_then(|v| {
                parsed.sort = Some(v.parse()?);
                Ok(())
            }),
            "--chart" | "-c" => value_of("--chart", inline, &mut it).and_then(|v| {
                parsed.chart = Some(v.parse()?);
                Ok(())
            }),
            "--save" => switch("--save", &inline).map(|()| parsed.save = true),
            "--once" => switch("--once", &inline).map(|()| parsed.once = true),
            "--dry-run" => switch("--dry-run", &inline).map(|()| parsed.dry_run = true),
            _ if parsed.url.is_none() && !arg.starts_with('-') => {
                parsed.url = Some(arg);
                Ok(())
            }
            _ => Err(format!("Unexpected argument '{arg}'. {usage}")),
        };
        if let Err(msg) = res {
            return ArgsOutcome::Invalid(msg);
        }
    }
    ArgsOutcome::Run(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let parsed = match parse_args(env::args()) {
        ArgsOutcome::Run(v) => v,
        ArgsOutcome::Help(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
        ArgsOutcome::Invalid(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let Some(entry) = resolve_connection(&parsed)? else {
        return Ok(());
    };

    if parsed.dry_run {
        println!("{}", entry.url);
        return Ok(());
    }

    let interval = resolve_interval(parsed.interval_ms, entry.interval_ms);
    let node = WsNode::connect(&entry.url)
        .await
        .with_context(|| format!("connecting to {}", entry.url))?;
    let mut ctl = ProcController::with_interval(Arc::new(node), interval);
    ctl.set_proc_sort(parsed.sort);

    if parsed.once {
        run_once(&mut ctl, parsed.chart).await
    } else {
        run_polling(&mut ctl, parsed.chart).await
    }
}

/// Resolve URL + interval from the command line and saved profiles, saving
/// new or changed profiles the same way the interactive flow does.
fn resolve_connection(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        interval_ms: parsed.interval_ms,
    };
    let mut profiles_mut = profiles_file.clone();

    let entry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                match profiles_mut.profiles.get(name) {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(name.clone(), entry.clone());
                        save_profiles(&profiles_mut).context("saving profiles")?;
                    }
                    Some(existing) if *existing != entry => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ));
                        if overwrite {
                            profiles_mut.profiles.insert(name.clone(), entry.clone());
                            save_profiles(&profiles_mut).context("saving profiles")?;
                        }
                    }
                    Some(_) => {}
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| (1..=names.len()).contains(idx))
                .and_then(|idx| profiles_mut.profiles.get(&names[idx - 1]));
            match picked {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (ws://HOST:PORT/ws or wss://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                interval_ms: parsed.interval_ms,
            };
            profiles_mut.profiles.insert(name, entry.clone());
            save_profiles(&profiles_mut).context("saving profiles")?;
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

async fn run_once(ctl: &mut ProcController, chart: Option<ProcMetric>) -> anyhow::Result<()> {
    ctl.refresh_once();
    loop {
        match ctl.next_event().await {
            ControllerEvent::Applied { .. } => break,
            ControllerEvent::Rejected(e) => return Err(e.into()),
            ControllerEvent::Failed(e) => return Err(e.into()),
            ControllerEvent::TickIssued | ControllerEvent::TickSkipped => {}
        }
    }
    let snap = ctl.store().snapshot();
    print!("{}", format_table(&snap.procs, ctl.proc_sort().as_ref()));
    println!("{}", snap.count_line());
    print_chart(ctl, chart);
    Ok(())
}

async fn run_polling(ctl: &mut ProcController, chart: Option<ProcMetric>) -> anyhow::Result<()> {
    ctl.toggle_polling();
    loop {
        tokio::select! {
            ev = ctl.next_event() => match ev {
                ControllerEvent::Applied { .. } => {
                    println!("{}", ctl.store().snapshot().count_line());
                    print_chart(ctl, chart);
                }
                ControllerEvent::Failed(e) if ctl.polling() == PollingState::Stopped => {
                    return Err(e).context("polling stopped");
                }
                // already reported on the error channel and logged
                _ => {}
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    if ctl.polling() == PollingState::Polling {
        ctl.toggle_polling();
    }
    Ok(())
}

fn print_chart(ctl: &ProcController, chart: Option<ProcMetric>) {
    if let Some(metric) = chart {
        let procs = ctl.store().selected(&HashSet::new());
        let slices = aggregate_metric(&procs, metric, ThresholdFraction::default());
        print!("{}", format_chart(metric.title(), &slices));
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
