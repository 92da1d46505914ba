use anyhow::{Context, bail};

use gravity_sprites::config::SimulationConfig;
use gravity_sprites::headless::{HeadlessConfig, run_headless};

const USAGE: &str = "usage: gravity-sprites [CONFIG.json] [--headless FRAMES]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config_path: Option<String>,
    headless_frames: Option<u32>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => {
                let frames = args.next().context(USAGE)?;
                let frames = frames
                    .parse()
                    .with_context(|| format!("invalid frame count {frames:?}"))?;
                parsed.headless_frames = Some(frames);
            }
            "-h" | "--help" => bail!(USAGE),
            _ if arg.starts_with('-') => bail!("unknown option {arg:?}\n{USAGE}"),
            _ if parsed.config_path.is_none() => parsed.config_path = Some(arg.clone()),
            _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
        }
    }

    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = match &args.config_path {
        Some(path) => SimulationConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => SimulationConfig::default(),
    };

    match args.headless_frames {
        Some(frames) => {
            let headless = HeadlessConfig {
                frames,
                width: config.window_size[0],
                height: config.window_size[1],
                ..HeadlessConfig::default()
            };
            let report = run_headless(&config, &headless)?;
            println!("initial: {}", report.initial);
            println!("final:   {}", report.summary);
            Ok(())
        }
        None => gravity_sprites::app::run(config),
    }
}
