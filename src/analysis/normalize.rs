use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Sense numbers appended to homograph headwords, e.g. `εἰμί1`
const SENSE_DIGITS: &[char] = &['1', '2', '3', '4', '5'];

/// Decompose and drop combining marks
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Search form of a headword: accents stripped, trailing sense digit removed
pub fn normalize_lemma(text: &str) -> String {
    let mut unaccented = strip_accents(text);
    if unaccented.ends_with(SENSE_DIGITS) {
        unaccented.pop();
    }
    unaccented
}
