//! Category and word selection with anti-repetition weighting.
//!
//! Category is chosen before word so every eligible category gets equal
//! odds no matter how many words it holds.

use rand::Rng;

use crate::constants::{CURATOR_DUPLICATE_RETRIES, FALLBACK_HINT};
use crate::data::{Lexicon, WordPair};
use crate::state::SessionHistory;

/// A resolved category + word pairing for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconSelection {
    pub category: String,
    pub pair: WordPair,
}

/// Active category pool after applying the setup screen's filter.
///
/// One valid selection: exclusive. Zero or all selected ("omniscient"):
/// everything except the three most recent categories, falling back to the
/// full set if that empties the pool. Otherwise the subset verbatim.
fn category_pool<'a>(
    lexicon: &'a Lexicon,
    selected: &[String],
    history: &SessionHistory,
) -> Vec<&'a str> {
    let all: Vec<&str> = lexicon.category_names();
    let valid: Vec<&str> = all
        .iter()
        .copied()
        .filter(|name| selected.iter().any(|s| s == name))
        .collect();

    if valid.len() == 1 {
        return valid;
    }
    if valid.is_empty() || valid.len() == all.len() {
        let unfatigued: Vec<&str> = all
            .iter()
            .copied()
            .filter(|name| !history.last_categories.iter().any(|c| c == name))
            .collect();
        return if unfatigued.is_empty() { all } else { unfatigued };
    }
    valid
}

/// Pick the round's category and word pair.
///
/// Words revealed within the session's 15-word window are excluded unless
/// that would empty the pool; survivors draw with probability proportional
/// to `1 / (global_usage + 1)`. Returns `None` only for an empty catalog.
#[must_use]
pub fn pick_word<R: Rng>(
    lexicon: &Lexicon,
    selected: &[String],
    history: &SessionHistory,
    rng: &mut R,
) -> Option<LexiconSelection> {
    let pool = category_pool(lexicon, selected, history);
    let mut named: Vec<&str> = pool
        .into_iter()
        .filter(|name| {
            lexicon
                .category(name)
                .is_some_and(|c| !c.words.is_empty())
        })
        .collect();
    if named.is_empty() {
        // A filter that only matched empty categories falls back to the
        // whole catalog rather than failing the round.
        named = lexicon
            .categories
            .iter()
            .filter(|c| !c.words.is_empty())
            .map(|c| c.name.as_str())
            .collect();
    }
    if named.is_empty() {
        return None;
    }

    let category_name = named[rng.gen_range(0..named.len())];
    let category = lexicon.category(category_name)?;

    let fresh: Vec<&WordPair> = category
        .words
        .iter()
        .filter(|pair| !history.last_words.iter().any(|w| w == &pair.civil))
        .collect();
    let pool_to_weight: Vec<&WordPair> = if fresh.is_empty() {
        category.words.iter().collect()
    } else {
        fresh
    };

    let weights: Vec<f64> = pool_to_weight
        .iter()
        .map(|pair| {
            let usage = history.global_word_usage.get(&pair.civil).copied().unwrap_or(0);
            1.0 / f64::from(usage + 1)
        })
        .collect();
    let winner = crate::cascade::choose_weighted(&weights, rng)?;

    Some(LexiconSelection {
        category: category_name.to_string(),
        pair: pool_to_weight[winner].clone(),
    })
}

/// Two distinct proposals for a curated round, ignoring the anti-repeat
/// filters; the second draw re-rolls up to ten times while it duplicates
/// the first civil word.
#[must_use]
pub fn curator_options<R: Rng>(
    lexicon: &Lexicon,
    selected: &[String],
    rng: &mut R,
) -> Option<(LexiconSelection, LexiconSelection)> {
    let all: Vec<&str> = lexicon.category_names();
    let valid: Vec<&str> = all
        .iter()
        .copied()
        .filter(|name| selected.iter().any(|s| s == name))
        .collect();
    let pool: Vec<&str> = if valid.is_empty() { all } else { valid };
    let mut pool: Vec<&str> = pool
        .into_iter()
        .filter(|name| {
            lexicon
                .category(name)
                .is_some_and(|c| !c.words.is_empty())
        })
        .collect();
    if pool.is_empty() {
        pool = lexicon
            .categories
            .iter()
            .filter(|c| !c.words.is_empty())
            .map(|c| c.name.as_str())
            .collect();
    }
    if pool.is_empty() {
        return None;
    }

    let mut draw = |rng: &mut R| -> LexiconSelection {
        let name = pool[rng.gen_range(0..pool.len())];
        let category = lexicon.category(name).expect("pool names come from the catalog");
        let pair = category.words[rng.gen_range(0..category.words.len())].clone();
        LexiconSelection {
            category: name.to_string(),
            pair,
        }
    };

    let first = draw(rng);
    let mut second = draw(rng);
    let mut attempts = 0;
    while second.pair.civil == first.pair.civil && attempts < CURATOR_DUPLICATE_RETRIES {
        second = draw(rng);
        attempts += 1;
    }

    Some((first, second))
}

/// Random hint for an impostor card; a pair with no hint list falls back to
/// a fixed string.
#[must_use]
pub fn smart_hint<R: Rng>(pair: &WordPair, rng: &mut R) -> String {
    if pair.hints.is_empty() {
        FALLBACK_HINT.to_string()
    } else {
        pair.hints[rng.gen_range(0..pair.hints.len())].clone()
    }
}
