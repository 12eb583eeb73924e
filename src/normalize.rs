//! Line normalizer: turns noisy tracklist text into "Artist - Title" candidates.
//!
//! Used by every source adapter and by both download pipelines. Each cleanup
//! step is a single regex pass; the order of the passes matters.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::models::{
    CanonicalKey, Discard, DiscardReason, NormalizeReport, Separator, TrackCandidate, TrackList,
};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Timestamps with optional bracket/paren wrapping: "00:00", "[1:02:33]", "(12:05)"
pub static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[?\(?\d{1,2}:\d{2}(?::\d{2})?\)?\]?").unwrap());

/// Leading ordinal: "1. ", "12) ", "03 "
pub static ORDINAL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]?\s*").unwrap());

/// One leading bullet glyph: "- ", "* ", "• "
pub static BULLET_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*•]\s*").unwrap());

/// En-dash, em-dash, horizontal bar
pub static ALT_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[–—―]").unwrap());

/// Bracketed and parenthetical spans, non-greedy. Also eats "(Remix)" and friends.
pub static ANNOTATIONS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]|\(.*?\)").unwrap());

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Title denylist for DJ mix comment tracklists.
pub const MIX_BLACKLIST: &[&str] = &["intro", "outro", "mixout", "timestamp", "setlist"];

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-pipeline normalizer settings. One separator mode per instance.
#[derive(Clone, Debug)]
pub struct NormalizerConfig {
    pub separator: Separator,
    /// Lowercased substrings; a title containing any of them is discarded.
    pub blacklist: Vec<String>,
}

impl NormalizerConfig {
    pub fn new(separator: Separator) -> Self {
        Self {
            separator,
            blacklist: Vec::new(),
        }
    }

    pub fn with_blacklist<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blacklist = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Bare hyphen, no denylist. Comment tracklists fed to Soulseek.
    pub fn comment_tracklist() -> Self {
        Self::new(Separator::Hyphen)
    }

    /// Spaced hyphen plus [`MIX_BLACKLIST`]. Comment tracklists fed to YouTube search.
    pub fn mix_tracklist() -> Self {
        Self::new(Separator::SpacedHyphen).with_blacklist(MIX_BLACKLIST)
    }

    /// Spaced hyphen, no denylist. Tracklist page entries.
    pub fn page_tracklist() -> Self {
        Self::new(Separator::SpacedHyphen)
    }
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// A line the normalizer refused, with the text as it stood at rejection time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected {
    pub reason: DiscardReason,
    pub cleaned: String,
}

impl Rejected {
    fn new(reason: DiscardReason, cleaned: impl Into<String>) -> Self {
        Self {
            reason,
            cleaned: cleaned.into(),
        }
    }
}

/// Strip timestamps, ordinals, bullets, alternate dashes and annotations from a trimmed line.
pub fn strip_noise(line: &str) -> String {
    let mut result = TIMESTAMP.replace_all(line, "").to_string();
    result = ORDINAL_PREFIX.replace(&result, "").to_string();
    result = BULLET_PREFIX.replace(&result, "").to_string();
    result = ALT_DASHES.replace_all(&result, "-").to_string();
    result = ANNOTATIONS.replace_all(&result, "").to_string();
    MULTI_SPACE.replace_all(&result, " ").trim().to_string()
}

fn has_letter(s: &str) -> bool {
    s.chars().any(char::is_alphabetic)
}

/// Stateless line cleaner plus a batch entry point with per-call deduplication.
#[derive(Clone, Debug)]
pub struct LineNormalizer {
    config: NormalizerConfig,
}

impl LineNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Clean one line without deduplication.
    pub fn clean_line(&self, line: &str) -> Result<TrackCandidate, Rejected> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(Rejected::new(DiscardReason::Empty, ""));
        }

        let cleaned = strip_noise(trimmed);

        let separator = self.config.separator.as_str();
        let Some((artist, title)) = cleaned.split_once(separator) else {
            return Err(Rejected::new(DiscardReason::NoSeparator, cleaned));
        };
        let artist = artist.trim();
        let title = title.trim();

        if artist.chars().count() < 2 || title.chars().count() < 2 {
            return Err(Rejected::new(DiscardReason::TooShort, cleaned));
        }
        if !has_letter(artist) || !has_letter(title) {
            return Err(Rejected::new(DiscardReason::NoLetters, cleaned));
        }

        let title_lower = title.to_lowercase();
        if self
            .config
            .blacklist
            .iter()
            .any(|term| title_lower.contains(term.as_str()))
        {
            return Err(Rejected::new(DiscardReason::Blacklisted, cleaned));
        }

        Ok(TrackCandidate {
            artist: artist.to_string(),
            title: title.to_string(),
        })
    }

    /// Normalize a batch of lines. The seen-key set lives only for this call.
    pub fn normalize_lines<I, S>(&self, lines: I) -> NormalizeReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: FxHashSet<CanonicalKey> = FxHashSet::default();
        let mut tracks = TrackList::default();
        let mut discards = Vec::new();

        for line in lines {
            let line = line.as_ref();
            let rejected = match self.clean_line(line) {
                Ok(candidate) => {
                    if seen.insert(candidate.canonical_key(self.config.separator)) {
                        tracks.push(candidate);
                        continue;
                    }
                    Rejected::new(DiscardReason::Duplicate, candidate.display())
                }
                Err(rejected) => rejected,
            };

            tracing::debug!(
                reason = %rejected.reason,
                line = %line,
                cleaned = %rejected.cleaned,
                "discarded line"
            );
            discards.push(Discard {
                line: line.to_string(),
                cleaned: rejected.cleaned,
                reason: rejected.reason,
            });
        }

        NormalizeReport { tracks, discards }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> LineNormalizer {
        LineNormalizer::new(NormalizerConfig::comment_tracklist())
    }

    fn spaced() -> LineNormalizer {
        LineNormalizer::new(NormalizerConfig::page_tracklist())
    }

    fn mix() -> LineNormalizer {
        LineNormalizer::new(NormalizerConfig::mix_tracklist())
    }

    fn candidate(artist: &str, title: &str) -> TrackCandidate {
        TrackCandidate {
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_strip_noise() {
        assert_eq!(strip_noise("[00:00] Artist - Song"), "Artist - Song");
        assert_eq!(strip_noise("(1:02:33) Artist - Song"), "Artist - Song");
        assert_eq!(strip_noise("12. Artist - Song"), "Artist - Song");
        assert_eq!(strip_noise("3) Artist - Song"), "Artist - Song");
        assert_eq!(strip_noise("• Artist - Song"), "Artist - Song");
        assert_eq!(strip_noise("Artist – Song"), "Artist - Song");
        assert_eq!(strip_noise("Artist — Song [LABEL] (Extended Mix)"), "Artist - Song");
        assert_eq!(strip_noise("Artist   -   Song"), "Artist - Song");
    }

    #[test]
    fn test_clean_line_timestamp_and_numbering() {
        assert_eq!(
            bare().clean_line("04. 12:45 Bicep - Glue (Original Mix)"),
            Ok(candidate("Bicep", "Glue"))
        );
        assert_eq!(
            spaced().clean_line("  [01:02:03] Four Tet — Baby  "),
            Ok(candidate("Four Tet", "Baby"))
        );
    }

    #[test]
    fn test_clean_line_separator_modes() {
        // Bare hyphen splits on the first hyphen wherever it is
        assert_eq!(
            bare().clean_line("Fred again..-Delilah"),
            Ok(candidate("Fred again..", "Delilah"))
        );
        // Spaced mode keeps hyphenated names intact
        assert_eq!(
            spaced().clean_line("Jay-Z - Encore"),
            Ok(candidate("Jay-Z", "Encore"))
        );
        assert_eq!(
            spaced().clean_line("Fred again..-Delilah").unwrap_err().reason,
            DiscardReason::NoSeparator
        );
    }

    #[test]
    fn test_clean_line_rejections() {
        let n = bare();
        assert_eq!(n.clean_line("   ").unwrap_err().reason, DiscardReason::Empty);
        assert_eq!(
            n.clean_line("bad line no dash").unwrap_err(),
            Rejected::new(DiscardReason::NoSeparator, "bad line no dash")
        );
        assert_eq!(n.clean_line("A - B").unwrap_err().reason, DiscardReason::TooShort);
        assert_eq!(n.clean_line("?? - !!").unwrap_err().reason, DiscardReason::NoLetters);
        assert_eq!(n.clean_line("Artist - 1999").unwrap_err().reason, DiscardReason::NoLetters);
    }

    #[test]
    fn test_clean_line_letters_are_unicode() {
        assert_eq!(
            bare().clean_line("Björk - Jóga"),
            Ok(candidate("Björk", "Jóga"))
        );
    }

    #[test]
    fn test_blacklist_is_case_insensitive_substring() {
        let n = mix();
        assert_eq!(n.clean_line("DJ - Mix Intro").unwrap_err().reason, DiscardReason::Blacklisted);
        assert_eq!(n.clean_line("DJ - OUTRO edit").unwrap_err().reason, DiscardReason::Blacklisted);
        assert_eq!(n.clean_line("DJ - Introspection").unwrap_err().reason, DiscardReason::Blacklisted);
        // Annotations are stripped before the denylist check
        assert_eq!(n.clean_line("DJ - Opening (Intro)"), Ok(candidate("DJ", "Opening")));
        // Only the title is checked
        assert_eq!(n.clean_line("Intro Crew - Song"), Ok(candidate("Intro Crew", "Song")));
    }

    #[test]
    fn test_custom_blacklist_trims_and_lowercases() {
        let config = NormalizerConfig::new(Separator::Hyphen).with_blacklist([" ID ", ""]);
        assert_eq!(config.blacklist, vec!["id".to_string()]);
        let n = LineNormalizer::new(config);
        assert_eq!(n.clean_line("Unknown - ID").unwrap_err().reason, DiscardReason::Blacklisted);
    }

    #[test]
    fn test_normalize_lines_scenario() {
        let lines = [
            "1. DJ Nonsense - Opening (Intro)",
            "DJ Nonsense - Opening (Intro)",
            "bad line no dash",
            "A - B",
            "Another Artist - Closing Track",
        ];
        let report = bare().normalize_lines(lines);

        assert_eq!(
            report.tracks.queries(),
            vec!["DJ Nonsense Opening", "Another Artist Closing Track"]
        );
        let reasons: Vec<_> = report.discards.iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![DiscardReason::Duplicate, DiscardReason::NoSeparator, DiscardReason::TooShort]
        );
        assert_eq!(report.discards[0].line, "DJ Nonsense - Opening (Intro)");
        assert_eq!(report.discard_count(DiscardReason::TooShort), 1);

        // The title is "Opening" once the parenthetical is gone, so the mix denylist lets it through
        let report = mix().normalize_lines(lines);
        assert_eq!(report.tracks.displays()[0], "DJ Nonsense - Opening");
    }

    #[test]
    fn test_dedup_ignores_case_and_keeps_first_spelling() {
        let report = bare().normalize_lines([
            "Daft Punk - One More Time",
            "DAFT PUNK - one more time",
            "Daft  Punk -   One More Time",
            "Daft Punk - Aerodynamic",
        ]);
        assert_eq!(
            report.tracks.queries(),
            vec!["Daft Punk One More Time", "Daft Punk Aerodynamic"]
        );
        assert_eq!(report.discard_count(DiscardReason::Duplicate), 2);
    }

    #[test]
    fn test_seen_keys_reset_between_batches() {
        let n = bare();
        let first = n.normalize_lines(["Artist - Song"]);
        let second = n.normalize_lines(["Artist - Song"]);
        assert_eq!(first.tracks.len(), 1);
        assert_eq!(second.tracks.len(), 1);
        assert!(second.discards.is_empty());
    }

    #[test]
    fn test_clean_line_idempotent_on_output() {
        let inputs = [
            "07. [23:10] Charlotte de Witte – Doppler (Original Mix)",
            "• Amelie Lens - Higher [SECOND STATE]",
            "(5:55) Peggy Gou - Starry Night",
            "Solomun-Customer Is King",
        ];
        for (normalizer, sep) in [(bare(), "-"), (spaced(), " - ")] {
            for input in inputs {
                let Ok(first) = normalizer.clean_line(input) else {
                    continue;
                };
                let rejoined = format!("{}{}{}", first.artist, sep, first.title);
                assert_eq!(normalizer.clean_line(&rejoined), Ok(first.clone()), "{input}");
            }
        }
    }

    #[test]
    fn test_no_shared_keys_in_output() {
        let report = spaced().normalize_lines([
            "A1 - T1", "a1 - t1", "Ab - Cd", "AB - CD", "ab - cd (live)", "Xy - Zw",
        ]);
        let mut keys = FxHashSet::default();
        for track in &report.tracks {
            assert!(keys.insert(track.canonical_key(Separator::SpacedHyphen)));
        }
        assert_eq!(report.tracks.len(), 3);
    }
}
