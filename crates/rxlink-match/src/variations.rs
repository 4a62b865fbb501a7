//! Search-term variations for noisy medicine names.
//!
//! OCR output carries dosage forms, strengths, release suffixes, stray
//! punctuation, and character confusions. [`NameVariationGenerator`] turns one
//! raw name into an ordered set of lookup terms, most specific first.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rxlink_model::StrengthQuery;
use serde::{Deserialize, Serialize};

use crate::error::ParseOcrConfusionError;

/// Variants shorter than this (in characters) are never generated.
pub const MIN_VARIANT_LEN: usize = 3;

/// Words of a multi-word name must be longer than this to become variants.
const MIN_WORD_LEN: usize = 3;

static DOSAGE_FORM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:tablet|tab|capsule|cap|syrup|injection|inj|suspension|drop|cream|ointment|gel|powder|sachet)s?\.?$",
    )
    .expect("dosage form pattern")
});

// A strength glued to a word must not start with a bare zero ("Paracetam0l").
static STRENGTH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\s*\b\d+(?:\.\d+)?|[1-9]\d*(?:\.\d+)?|0\.\d+)\s*(?:mcg|mg|gm|ml|iu|g|l|%)$",
    )
    .expect("strength pattern")
});

static STRENGTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mcg|mg|gm|ml|iu|g|l|%)").expect("strength token pattern")
});

static BARE_NUMBER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d+(?:\.\d+)?$").expect("number pattern"));

static ABBREVIATION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[A-Z]+$").expect("abbreviation pattern"));

static RELEASE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:MR|SR|XR|ER|CR|LA|XL|DS)$").expect("release suffix pattern")
});

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("punctuation pattern"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").expect("bracket pattern"));

/// One direction of a common OCR character confusion.
///
/// Matching is case-sensitive: `O:0` rewrites `O` but leaves `o` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OcrConfusion {
    /// Character as the OCR engine produced it.
    pub misread: char,
    /// Character it most likely stood for.
    pub replacement: char,
}

impl OcrConfusion {
    pub const ZERO_TO_O: Self = Self::new('0', 'O');
    pub const O_TO_ZERO: Self = Self::new('O', '0');
    pub const ONE_TO_I: Self = Self::new('1', 'I');
    pub const I_TO_ONE: Self = Self::new('I', '1');
    pub const FIVE_TO_S: Self = Self::new('5', 'S');
    pub const S_TO_FIVE: Self = Self::new('S', '5');

    /// Every supported direction.
    pub const ALL: [Self; 6] = [
        Self::ZERO_TO_O,
        Self::O_TO_ZERO,
        Self::ONE_TO_I,
        Self::I_TO_ONE,
        Self::FIVE_TO_S,
        Self::S_TO_FIVE,
    ];

    const fn new(misread: char, replacement: char) -> Self {
        Self {
            misread,
            replacement,
        }
    }

    /// Replace every misread character.
    pub fn apply(&self, value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if c == self.misread {
                    self.replacement
                } else {
                    c
                }
            })
            .collect()
    }
}

impl Default for OcrConfusion {
    fn default() -> Self {
        Self::ZERO_TO_O
    }
}

impl fmt::Display for OcrConfusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.misread, self.replacement)
    }
}

impl FromStr for OcrConfusion {
    type Err = ParseOcrConfusionError;

    /// Parses `"0:O"` (misread, then replacement).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseOcrConfusionError {
            input: s.to_string(),
        };
        let (left, right) = s.trim().split_once(':').ok_or_else(invalid)?;
        let mut left_chars = left.trim().chars();
        let mut right_chars = right.trim().chars();
        let (Some(misread), None, Some(replacement), None) = (
            left_chars.next(),
            left_chars.next(),
            right_chars.next(),
            right_chars.next(),
        ) else {
            return Err(invalid());
        };
        Self::ALL
            .into_iter()
            .find(|c| {
                c.misread.eq_ignore_ascii_case(&misread)
                    && c.replacement.eq_ignore_ascii_case(&replacement)
            })
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for OcrConfusion {
    type Error = ParseOcrConfusionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OcrConfusion> for String {
    fn from(value: OcrConfusion) -> Self {
        value.to_string()
    }
}

/// Insertion-ordered set of search terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variations {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl Variations {
    fn insert(&mut self, value: &str) {
        let value = value.trim();
        if value.chars().count() < MIN_VARIANT_LEN || self.seen.contains(value) {
            return;
        }
        self.seen.insert(value.to_string());
        self.ordered.push(value.to_string());
    }

    /// Insert the value and its lowercase form.
    fn add(&mut self, value: &str) {
        self.insert(value);
        self.insert(&value.to_lowercase());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.ordered.first().map(String::as_str)
    }

    /// Order-independent view.
    pub fn to_set(&self) -> BTreeSet<String> {
        self.ordered.iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// A name split into its core and the first strength token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedStrength {
    /// Name with the strength token removed, whitespace collapsed.
    pub core: String,
    pub value: Option<String>,
    /// Lowercase unit.
    pub unit: Option<String>,
}

impl ExtractedStrength {
    pub fn strength(&self) -> Option<StrengthQuery> {
        match (&self.value, &self.unit) {
            (Some(value), Some(unit)) => Some(StrengthQuery::new(value.clone(), unit.clone())),
            _ => None,
        }
    }
}

/// Isolate the first `number + unit` token whose unit is not followed by a letter.
///
/// The number may be glued to the preceding word ("Paracetamol500mg") unless
/// it is a bare zero, which OCR produces for the letter O.
pub fn extract_strength(name: &str) -> ExtractedStrength {
    for caps in STRENGTH_TOKEN.captures_iter(name) {
        let (Some(token), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let followed_by_letter = name[token.end()..]
            .chars()
            .next()
            .is_some_and(char::is_alphabetic);
        let glued = name[..token.start()]
            .chars()
            .next_back()
            .is_some_and(char::is_alphabetic);
        let zero_lookalike = value.as_str().starts_with('0') && !value.as_str().starts_with("0.");
        if followed_by_letter || (glued && zero_lookalike) {
            continue;
        }
        let mut core = String::with_capacity(name.len());
        core.push_str(&name[..token.start()]);
        core.push(' ');
        core.push_str(&name[token.end()..]);
        return ExtractedStrength {
            core: collapse_whitespace(&core),
            value: Some(value.as_str().to_string()),
            unit: caps.get(2).map(|m| m.as_str().to_lowercase()),
        };
    }
    ExtractedStrength {
        core: collapse_whitespace(name),
        value: None,
        unit: None,
    }
}

/// Generates lookup terms for a raw medicine name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameVariationGenerator {
    ocr: OcrConfusion,
}

impl NameVariationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr_confusion(ocr: OcrConfusion) -> Self {
        Self { ocr }
    }

    pub fn ocr_confusion(&self) -> OcrConfusion {
        self.ocr
    }

    /// All variations of `name`, most specific first.
    ///
    /// Deterministic: the same input always yields the same ordered set.
    pub fn generate(&self, name: &str) -> Variations {
        let mut variations = Variations::default();
        let original = name.trim();
        if original.is_empty() {
            return variations;
        }

        variations.add(original);
        for stripped in [
            strip(&DOSAGE_FORM_SUFFIX, original),
            strip(&STRENGTH_SUFFIX, original),
            strip(&BARE_NUMBER_SUFFIX, original),
            strip(&ABBREVIATION_SUFFIX, original),
        ]
        .into_iter()
        .flatten()
        {
            variations.add(&stripped);
        }

        variations.add(&collapse_whitespace(&PUNCTUATION.replace_all(original, " ")));

        if let Some(head) = first_segment(original) {
            variations.add(head);
        }

        variations.add(&collapse_whitespace(&BRACKETED.replace_all(original, " ")));

        // candidates from the structural strategies, before suffix and core handling
        let structural: Vec<String> = variations.iter().map(str::to_string).collect();

        if let Some(stripped) = strip(&RELEASE_SUFFIX, original) {
            variations.add(&stripped);
        }

        let core = stripped_core(original);
        variations.add(&core);

        for candidate in structural.iter().map(String::as_str).chain([core.as_str()]) {
            variations.add(&self.ocr.apply(candidate));
        }

        let words: Vec<&str> = original.split_whitespace().collect();
        if words.len() > 1 {
            let longest = words
                .iter()
                .copied()
                .reduce(|best, w| {
                    if w.chars().count() > best.chars().count() {
                        w
                    } else {
                        best
                    }
                })
                .unwrap_or_default();
            for word in [longest, words[0]] {
                if word.chars().count() > MIN_WORD_LEN {
                    variations.add(word);
                }
            }
        }

        variations
    }
}

/// Trailing dosage form, strength, number, release suffix, and abbreviation
/// stripped repeatedly until nothing changes.
fn stripped_core(name: &str) -> String {
    let mut core = name.trim().to_string();
    loop {
        let mut changed = false;
        for pattern in [
            &*DOSAGE_FORM_SUFFIX,
            &*STRENGTH_SUFFIX,
            &*BARE_NUMBER_SUFFIX,
            &*RELEASE_SUFFIX,
            &*ABBREVIATION_SUFFIX,
        ] {
            if let Some(next) = strip(pattern, &core) {
                core = next;
                changed = true;
            }
        }
        if !changed {
            return core;
        }
    }
}

/// Remove a trailing match, keeping only non-empty changed results.
fn strip(pattern: &Regex, value: &str) -> Option<String> {
    let stripped = pattern.replace(value, "");
    let stripped = stripped.trim();
    (!stripped.is_empty() && stripped != value).then(|| stripped.to_string())
}

fn first_segment(value: &str) -> Option<&str> {
    let (head, _) = value.split_once(['-', '_'])?;
    let head = head.trim();
    (!head.is_empty()).then_some(head)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
