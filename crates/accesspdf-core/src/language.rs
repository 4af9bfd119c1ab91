//! Lightweight document language identification.
//!
//! CJK scripts are recognised by code point ranges. Latin-script languages
//! are scored by the share of words found in a small stopword list; the
//! winner must clear a minimum share and beat the runner-up.

/// Language used when detection is inconclusive.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Minimum number of letters before detection is attempted.
const MIN_LETTERS: usize = 20;
/// Minimum fraction of words that must be stopwords of the winning language.
const MIN_STOPWORD_SHARE: f64 = 0.05;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en-US",
        &[
            "the", "and", "of", "to", "in", "is", "that", "for", "it", "with", "as", "was",
            "on", "are", "be", "this", "by", "from", "or", "which", "an", "have", "not",
        ],
    ),
    (
        "fr-FR",
        &[
            "le", "la", "les", "et", "des", "du", "un", "une", "est", "que", "dans", "pour",
            "qui", "sur", "pas", "au", "avec", "ce", "sont", "nous", "vous", "ils",
        ],
    ),
    (
        "de-DE",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "den", "zu",
            "von", "sich", "auf", "für", "dem", "wir", "auch", "werden", "sind", "ich",
        ],
    ),
    (
        "es-ES",
        &[
            "el", "la", "los", "las", "y", "que", "del", "en", "por", "con", "una", "para",
            "es", "se", "como", "más", "pero", "sus", "fue", "este", "está",
        ],
    ),
    (
        "it-IT",
        &[
            "il", "di", "che", "è", "della", "per", "gli", "non", "con", "una", "sono", "nel",
            "alla", "anche", "come", "questo", "dei", "delle", "più", "lo",
        ],
    ),
    (
        "pt-BR",
        &[
            "o", "os", "as", "de", "que", "não", "uma", "com", "para", "por", "mais", "dos",
            "das", "como", "foi", "ao", "ele", "são", "também", "você", "muito",
        ],
    ),
    (
        "nl-NL",
        &[
            "de", "het", "een", "en", "van", "dat", "niet", "zijn", "op", "te", "voor", "met",
            "wordt", "ook", "aan", "er", "maar", "bij", "nog", "worden", "naar",
        ],
    ),
];

/// Detect the BCP-47 language tag of `text`, or `None` when there is too
/// little text or no language wins clearly.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters < MIN_LETTERS {
        return None;
    }

    if let Some(tag) = detect_cjk(text, letters) {
        return Some(tag);
    }

    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return None;
    }

    let mut scores: Vec<(&'static str, usize)> = STOPWORDS
        .iter()
        .map(|(tag, list)| {
            let hits = words.iter().filter(|w| list.contains(&w.as_str())).count();
            (*tag, hits)
        })
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (best_tag, best) = scores[0];
    let runner_up = scores.get(1).map_or(0, |s| s.1);
    let share = best as f64 / words.len() as f64;
    if best == runner_up || share < MIN_STOPWORD_SHARE {
        return None;
    }
    Some(best_tag)
}

/// Language tag from `text`, falling back to `default` when inconclusive.
pub fn detect_language_or(text: &str, default: &str) -> String {
    detect_language(text).unwrap_or(default).to_string()
}

fn detect_cjk(text: &str, letters: usize) -> Option<&'static str> {
    let (mut kana, mut hangul, mut han) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        match c as u32 {
            0x3040..=0x30FF => kana += 1,
            0xAC00..=0xD7AF | 0x1100..=0x11FF => hangul += 1,
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => han += 1,
            _ => {}
        }
    }
    let cjk = kana + hangul + han;
    if cjk * 2 < letters {
        return None;
    }
    if kana > 0 {
        Some("ja-JP")
    } else if hangul >= han {
        Some("ko-KR")
    } else {
        Some("zh-CN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_inconclusive() {
        assert_eq!(detect_language("Hello"), None);
        assert_eq!(detect_language_or("Hi", DEFAULT_LANGUAGE), "en-US");
    }

    #[test]
    fn detects_english() {
        let text = "The quick brown fox jumps over the lazy dog and this is the end of it.";
        assert_eq!(detect_language(text), Some("en-US"));
    }

    #[test]
    fn detects_french() {
        let text = "Le chat est sur la table et les enfants sont dans le jardin avec nous.";
        assert_eq!(detect_language(text), Some("fr-FR"));
    }

    #[test]
    fn detects_german() {
        let text = "Der Hund ist nicht in dem Haus und die Katze sitzt auf dem Tisch mit uns.";
        assert_eq!(detect_language(text), Some("de-DE"));
    }

    #[test]
    fn detects_japanese_by_script() {
        let text = "これは日本語のテキストです。アクセシビリティのテストをしています。";
        assert_eq!(detect_language(text), Some("ja-JP"));
    }

    #[test]
    fn detects_korean_by_script() {
        let text = "이것은 한국어 텍스트입니다 접근성 테스트를 하고 있습니다 감사합니다";
        assert_eq!(detect_language(text), Some("ko-KR"));
    }

    #[test]
    fn no_stopwords_is_inconclusive() {
        let text = "Zxqv plorb quizzle frumb snargle wibble blorft grunkle";
        assert_eq!(detect_language(text), None);
    }
}
