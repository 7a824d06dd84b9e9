//! Picks the next `.jpg` file to show from the photo directory.
//!
//! The directory is re-listed on every call; nothing is cached, so files
//! dropped in or removed while the show runs are picked up on the next
//! cycle.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Extension that makes a regular file eligible. Compared case-sensitively.
pub const ELIGIBLE_EXTENSION: &str = ".jpg";

/// Rank given to the first eligible file in a reservoir pass.
pub const INITIAL_RANK: u32 = 1;

/// How many times random mode redraws when it lands on the current file
/// before accepting the repeat.
const MAX_RANDOM_DRAWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Lexicographic order, wrapping at the end.
    #[default]
    Ordered,
    /// Uniform pick over all eligible files.
    Random,
}

impl SelectionMode {
    #[must_use]
    pub const fn from_random_flag(random: bool) -> Self {
        if random { Self::Random } else { Self::Ordered }
    }
}

/// `true` when the raw bytes of `name` end in the literal `.jpg`. Names
/// need not be valid UTF-8.
#[must_use]
pub fn is_eligible_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().ends_with(ELIGIBLE_EXTENSION.as_bytes())
}

/// One-pass size-1 reservoir sample: the `k`-th item replaces the held
/// candidate with probability `1/k`, counting from `initial_rank`.
pub fn reservoir_pick<T, I, R>(items: I, initial_rank: u32, rng: &mut R) -> Option<T>
where
    I: IntoIterator<Item = T>,
    R: Rng + ?Sized,
{
    let mut rank = initial_rank.max(1);
    let mut held = None;
    for item in items {
        if rng.random_ratio(1, rank) {
            held = Some(item);
        }
        rank = rank.saturating_add(1);
    }
    held
}

/// Smallest name strictly greater than `current`, or the smallest name
/// overall when `current` is absent or nothing is greater. Names compare
/// byte-wise.
pub fn ordered_successor<I, S>(names: I, current: Option<&OsStr>) -> Option<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + AsRef<OsStr>,
{
    let current = current.map(OsStr::as_encoded_bytes);
    let mut smallest: Option<OsString> = None;
    let mut successor: Option<OsString> = None;
    for name in names {
        let candidate = name.as_ref().as_encoded_bytes();
        let below = |held: &OsString| candidate < held.as_encoded_bytes();
        if let Some(cur) = current
            && candidate > cur
            && successor.as_ref().is_none_or(below)
        {
            successor = Some(name.as_ref().to_owned());
        }
        if smallest.as_ref().is_none_or(below) {
            smallest = Some(name.into());
        }
    }
    successor.or(smallest)
}

/// Chooses filenames from a single directory.
#[derive(Debug)]
pub struct Sequencer {
    dir: PathBuf,
    rng: StdRng,
}

impl Sequencer {
    /// Sequencer over `dir` with an OS-seeded random source.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Sequencer with a deterministic random source.
    #[must_use]
    pub fn with_seed(dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            dir: dir.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Point subsequent scans at a different directory.
    pub fn set_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    /// Names of all eligible files in directory enumeration order, or
    /// `None` if the directory cannot be read.
    #[must_use]
    pub fn eligible_files(&self) -> Option<Vec<OsString>> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "photo directory is not readable");
            return None;
        }
        let names = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_eligible_name(entry.file_name()))
            .map(|entry| entry.file_name().to_os_string())
            .collect();
        Some(names)
    }

    /// Next file to show after `current`.
    ///
    /// Returns `None` when the directory cannot be read or holds no
    /// eligible file.
    pub fn next(&mut self, current: Option<&OsStr>, mode: SelectionMode) -> Option<OsString> {
        match mode {
            SelectionMode::Ordered => {
                let next = ordered_successor(self.eligible_files()?, current)?;
                if current == Some(next.as_os_str()) {
                    debug!(name = ?next, "only one eligible file; escalating to random pick");
                    return self.pick_random();
                }
                trace!(current = ?current, next = ?next, "ordered pick");
                Some(next)
            }
            SelectionMode::Random => {
                let mut pick = self.pick_random()?;
                for _ in 1..MAX_RANDOM_DRAWS {
                    if current != Some(pick.as_os_str()) {
                        break;
                    }
                    pick = self.pick_random()?;
                }
                trace!(current = ?current, next = ?pick, "random pick");
                Some(pick)
            }
        }
    }

    fn pick_random(&mut self) -> Option<OsString> {
        let names = self.eligible_files()?;
        reservoir_pick(names, INITIAL_RANK, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Option<&OsStr> {
        Some(OsStr::new(s))
    }

    #[test]
    fn extension_is_case_sensitive() {
        assert!(is_eligible_name(OsStr::new("a.jpg")));
        assert!(is_eligible_name(OsStr::new("beach.10.jpg")));
        assert!(!is_eligible_name(OsStr::new("a.JPG")));
        assert!(!is_eligible_name(OsStr::new("a.jpeg")));
        assert!(!is_eligible_name(OsStr::new("a.jpg.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_eligible_and_ordered_by_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let latin1 = OsStr::from_bytes(b"caf\xe9.jpg");
        assert!(is_eligible_name(latin1));
        assert!(!is_eligible_name(OsStr::from_bytes(b"caf\xe9.JPG")));

        // 0xe9 sorts after every ASCII byte
        let names = [OsStr::new("cafe.jpg"), latin1, OsStr::new("caff.jpg")];
        assert_eq!(ordered_successor(names, name("caff.jpg")).as_deref(), Some(latin1));
        assert_eq!(ordered_successor(names, Some(latin1)).as_deref(), name("cafe.jpg"));
    }

    #[test]
    fn successor_is_independent_of_enumeration_order() {
        let names = ["c.jpg", "a.jpg", "b.jpg"];
        assert_eq!(ordered_successor(names, None).as_deref(), name("a.jpg"));
        assert_eq!(ordered_successor(names, name("a.jpg")).as_deref(), name("b.jpg"));
        assert_eq!(ordered_successor(names, name("b.jpg")).as_deref(), name("c.jpg"));
        assert_eq!(ordered_successor(names, name("c.jpg")).as_deref(), name("a.jpg"));
    }

    #[test]
    fn successor_of_vanished_file_is_next_greater() {
        let names = ["a.jpg", "c.jpg"];
        assert_eq!(ordered_successor(names, name("b.jpg")).as_deref(), name("c.jpg"));
    }

    #[test]
    fn successor_of_nothing_is_nothing() {
        assert_eq!(ordered_successor(Vec::<OsString>::new(), name("a.jpg")), None);
    }

    #[test]
    fn reservoir_first_item_always_held() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(reservoir_pick(["only"], INITIAL_RANK, &mut rng), Some("only"));
        assert_eq!(reservoir_pick(Vec::<u8>::new(), INITIAL_RANK, &mut rng), None);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let mut seq = Sequencer::with_seed("/no/such/photo/dir", 7);
        assert_eq!(seq.eligible_files(), None);
        assert_eq!(seq.next(None, SelectionMode::Ordered), None);
        assert_eq!(seq.next(None, SelectionMode::Random), None);
    }
}
