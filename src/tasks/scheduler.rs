//! The cross-fade state machine: pick, decode, fade, hold, repeat.

use std::convert::Infallible;
use std::ffi::{OsStr, OsString};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::{SettingsSource, SlideshowSettings};
use crate::error::Error;
use crate::processing::decode::{DecodedImage, ImageDecoder};
use crate::render::presenter::TexturePresenter;
use crate::sequencer::Sequencer;
use crate::slots::{SlotId, SlotPair};

/// Sleep between fade frames.
pub const FADE_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Longest single sleep while holding; the presenter is polled in between.
pub const HOLD_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Advance,
    Fading,
    Holding,
}

/// What one full cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub name: OsString,
    pub slot: SlotId,
    pub decode_failures: usize,
    pub fade_frames: usize,
    pub hold: Duration,
}

/// Hold time encoded in a filename of the shape `<base>.<secs>.jpg`.
///
/// Everything after the first `.` is inspected. When it is literally
/// `jpg`, or its leading digits do not form a positive integer, `default`
/// is returned. The base may hold arbitrary bytes.
#[must_use]
pub fn hold_duration(name: &OsStr, default: Duration) -> Duration {
    let bytes = name.as_encoded_bytes();
    let Some(dot) = bytes.iter().position(|&b| b == b'.') else {
        return default;
    };
    let rest = String::from_utf8_lossy(&bytes[dot + 1..]);
    if rest == "jpg" {
        return default;
    }
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(&*rest, |end| &rest[..end]);
    match digits.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => default,
    }
}

/// Fraction of the fade completed after `elapsed_micros`, clamped to `[0, 1]`.
#[must_use]
pub fn fade_fraction(elapsed_micros: u64, fade: Duration) -> f64 {
    let total = fade.as_micros();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let fraction = elapsed_micros as f64 / total as f64;
    fraction.clamp(0.0, 1.0)
}

pub struct FadeScheduler<P, C> {
    sequencer: Sequencer,
    decoder: ImageDecoder,
    presenter: P,
    clock: C,
    slots: SlotPair,
    stale: SlotId,
    settings: SlideshowSettings,
    source: Option<Box<dyn SettingsSource>>,
    phase: Phase,
}

impl<P: TexturePresenter, C: Clock> FadeScheduler<P, C> {
    /// The sequencer is pointed at `settings.photo_dir`.
    pub fn new(
        mut sequencer: Sequencer,
        decoder: ImageDecoder,
        presenter: P,
        clock: C,
        settings: SlideshowSettings,
    ) -> Self {
        sequencer.set_dir(settings.photo_dir.clone());
        Self {
            sequencer,
            decoder,
            presenter,
            clock,
            slots: SlotPair::default(),
            stale: SlotId::First,
            settings,
            source: None,
            phase: Phase::Idle,
        }
    }

    /// Poll `source` for new settings at the start of every cycle.
    #[must_use]
    pub fn with_settings_source(mut self, source: Box<dyn SettingsSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn slots(&self) -> &SlotPair {
        &self.slots
    }

    pub const fn settings(&self) -> &SlideshowSettings {
        &self.settings
    }

    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Cycle forever. Only returns on a fatal error such as
    /// [`Error::NoEligibleFile`] or [`Error::DisplayClosed`].
    pub fn run(&mut self) -> Result<Infallible, Error> {
        loop {
            self.run_cycle()?;
        }
    }

    /// One ADVANCE, FADING, HOLDING pass.
    pub fn run_cycle(&mut self) -> Result<CycleReport, Error> {
        self.refresh_settings();

        self.phase = Phase::Advance;
        let incoming = self.stale;
        let (name, decode_failures) = self.advance(incoming)?;

        self.phase = Phase::Fading;
        let fade_frames = self.fade(incoming)?;

        self.phase = Phase::Holding;
        let hold = hold_duration(&name, self.settings.show_duration);
        info!(name = %name.to_string_lossy(), slot = %incoming, hold = ?hold, "showing image");
        self.hold(hold)?;

        self.stale = incoming.other();
        Ok(CycleReport {
            name,
            slot: incoming,
            decode_failures,
            fade_frames,
            hold,
        })
    }

    fn refresh_settings(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let Some(settings) = source.refresh() else {
            return;
        };
        if settings.photo_dir != self.settings.photo_dir {
            info!(
                from = %self.settings.photo_dir.display(),
                to = %settings.photo_dir.display(),
                "photo directory changed"
            );
            self.sequencer.set_dir(settings.photo_dir.clone());
        }
        self.settings = settings;
    }

    /// Decode the next file into `target`, skipping files that fail.
    ///
    /// There is no retry limit; a directory of nothing but corrupt files
    /// keeps this looping.
    fn advance(&mut self, target: SlotId) -> Result<(OsString, usize), Error> {
        let mut context = self.slots.get(target.other()).name().map(OsStr::to_owned);
        let mut failures = 0;
        loop {
            let name = self
                .sequencer
                .next(context.as_deref(), self.settings.mode)
                .ok_or_else(|| Error::NoEligibleFile {
                    dir: self.sequencer.dir().to_path_buf(),
                })?;
            let path = self.sequencer.dir().join(&name);
            match self.decoder.decode(&path) {
                Ok(DecodedImage { geometry, pixels }) => {
                    if let Err(err) = self.presenter.upload(target, &geometry, pixels) {
                        warn!(error = %err, name = ?name, "texture upload failed");
                    }
                    self.slots.fill(target, name.clone(), geometry);
                    debug!(name = ?name, slot = %target, failures, "advanced");
                    return Ok((name, failures));
                }
                Err(err) => {
                    warn!(error = %err, "skipping undecodable file");
                    failures += 1;
                    context = Some(name);
                }
            }
        }
    }

    fn fade(&mut self, incoming: SlotId) -> Result<usize, Error> {
        let outgoing = incoming.other();
        let draw_outgoing = self.slots.get(outgoing).is_populated();
        let fade = self.settings.fade_duration;
        let mut frames = 0;

        if !fade.is_zero() {
            let start = self.clock.now();
            loop {
                let elapsed = self.clock.now().micros_since(start);
                let fraction = fade_fraction(elapsed, fade);
                if fraction >= 1.0 {
                    break;
                }
                #[allow(clippy::cast_possible_truncation)]
                let opacity = fraction as f32;
                self.presenter.begin_frame()?;
                if draw_outgoing {
                    self.presenter.draw(outgoing, 1.0 - opacity)?;
                }
                self.presenter.draw(incoming, opacity)?;
                self.presenter.end_frame()?;
                frames += 1;
                trace!(elapsed, fraction, "fade frame");
                self.clock.sleep(FADE_POLL_INTERVAL);
            }
        }

        self.presenter.begin_frame()?;
        self.presenter.draw(incoming, 1.0)?;
        self.presenter.end_frame()?;
        debug!(frames, fade = ?fade, "fade complete");
        Ok(frames)
    }

    fn hold(&mut self, hold: Duration) -> Result<(), Error> {
        let mut remaining = hold;
        while !remaining.is_zero() {
            let step = remaining.min(HOLD_POLL_INTERVAL);
            self.clock.sleep(step);
            remaining -= step;
            self.presenter.poll()?;
        }
        Ok(())
    }
}
