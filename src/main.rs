//! Binary entrypoint for the slideshow.
//!
//! Parses the command line, loads configuration and wires the library
//! pieces together.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use rust_slideshow::Error;
use rust_slideshow::clock::MonotonicClock;
use rust_slideshow::config::{ConfigFileSource, Configuration, SettingsOverrides};
use rust_slideshow::processing::decode::ImageDecoder;
use rust_slideshow::render::gpu::GpuPresenter;
use rust_slideshow::render::window::KioskWindow;
use rust_slideshow::sequencer::Sequencer;
use rust_slideshow::tasks::scheduler::FadeScheduler;

#[derive(Debug, Parser)]
#[command(
    name = "slideshow",
    version,
    about = "Fullscreen JPEG slideshow with additive cross-fades"
)]
struct Cli {
    /// Path to YAML config, re-read before every image
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory of .jpg files (overrides photo-library-path)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Pick images at random instead of in name order
    #[arg(long)]
    random: bool,

    /// Walk images in name order even if the config says random
    #[arg(long, conflicts_with = "random")]
    ordered: bool,

    /// Hold time per image, e.g. "5s" or "1m 30s"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    show_duration: Option<Duration>,

    /// Cross-fade length, e.g. "2s" or "500ms"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    fade_duration: Option<Duration>,

    /// Print the next N picks without opening a display
    #[arg(long = "sequence-dry-run", value_name = "COUNT")]
    sequence_dry_run: Option<usize>,

    /// Deterministic RNG seed for random mode
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            photo_dir: self.dir.clone(),
            random: match (self.random, self.ordered) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            show_duration: self.show_duration,
            fade_duration: self.fade_duration,
            random_seed: self.seed,
        }
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rust_slideshow={level}").parse()?)
        .add_directive(format!("slideshow={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let overrides = cli.overrides();
    let (cfg, source) = match &cli.config {
        Some(path) => {
            let (source, cfg) = ConfigFileSource::open(path, overrides)?;
            (cfg, Some(source))
        }
        None => {
            let cfg = overrides
                .apply(Configuration::default())
                .validated()
                .context("invalid command-line settings")?;
            (cfg, None)
        }
    };
    let settings = cfg.settings();
    let sequencer = match cfg.random_seed {
        Some(seed) => Sequencer::with_seed(&settings.photo_dir, seed),
        None => Sequencer::new(&settings.photo_dir),
    };

    if let Some(count) = cli.sequence_dry_run {
        return run_sequence_dry_run(sequencer, &cfg, count);
    }

    info!(
        dir = %settings.photo_dir.display(),
        mode = ?settings.mode,
        show = ?settings.show_duration,
        fade = ?settings.fade_duration,
        "starting slideshow"
    );

    let window = KioskWindow::open().context("failed to open display")?;
    let presenter = GpuPresenter::new(window).context("failed to initialize GPU")?;
    let screen = presenter.screen_geometry();
    info!(width = screen.width, height = screen.height, "screen geometry");

    let mut scheduler = FadeScheduler::new(
        sequencer,
        ImageDecoder::new(screen).with_max_padded_dimension(presenter.max_texture_dimension()),
        presenter,
        MonotonicClock::new(),
        settings,
    );
    if let Some(source) = source {
        scheduler = scheduler.with_settings_source(Box::new(source));
    }

    let Err(err) = scheduler.run();
    match err {
        Error::DisplayClosed => {
            info!("display closed; exiting");
            Ok(())
        }
        other => Err(other).context("slideshow stopped"),
    }
}

fn run_sequence_dry_run(mut sequencer: Sequencer, cfg: &Configuration, count: usize) -> Result<()> {
    let mode = cfg.settings().mode;
    println!(
        "# sequence dry run\n# dir: {}\n# mode: {:?}\n# count: {}\n# seed: {}\n",
        sequencer.dir().display(),
        mode,
        count,
        cfg.random_seed
            .map_or_else(|| "<os>".to_string(), |seed| seed.to_string()),
    );
    let mut current: Option<OsString> = None;
    for index in 0..count {
        let Some(next) = sequencer.next(current.as_deref(), mode) else {
            return Err(Error::NoEligibleFile {
                dir: sequencer.dir().to_path_buf(),
            }
            .into());
        };
        let hold = rust_slideshow::tasks::scheduler::hold_duration(&next, cfg.show_duration);
        println!(
            "{index:>4}  {}  hold={}",
            next.to_string_lossy(),
            humantime::format_duration(hold)
        );
        current = Some(next);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_override(args: &[&str]) -> Option<bool> {
        let argv = std::iter::once("slideshow").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().overrides().random
    }

    #[test]
    fn mode_flags_override_either_way() {
        assert_eq!(random_override(&[]), None);
        assert_eq!(random_override(&["--random"]), Some(true));
        assert_eq!(random_override(&["--ordered"]), Some(false));
    }

    #[test]
    fn ordered_beats_a_random_config() {
        let cfg = Configuration {
            random: true,
            ..Configuration::default()
        };
        let cli = Cli::try_parse_from(["slideshow", "--ordered"]).unwrap();
        assert!(!cli.overrides().apply(cfg).random);
    }

    #[test]
    fn random_and_ordered_conflict() {
        assert!(Cli::try_parse_from(["slideshow", "--random", "--ordered"]).is_err());
    }
}
