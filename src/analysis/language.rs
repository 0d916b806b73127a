use std::collections::HashSet;

use tracing::{info, warn};

use crate::analysis::text::tokenize;

/// Texts shorter than this are not worth guessing at
const MIN_DETECT_CHARS: usize = 50;

/// Only the opening of the page is sampled
const DETECT_SAMPLE_CHARS: usize = 1000;

/// A language needs at least this many stop-word hits to be chosen
const MIN_STOPWORD_HITS: usize = 2;

const FALLBACK_LANGUAGE: &str = "en";

/// Frequent function words per language, chosen to overlap as little as possible
const STOP_WORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "of", "to", "is", "for", "with", "you", "your", "our", "that", "this"]),
    ("de", &["der", "die", "und", "das", "ist", "nicht", "mit", "sie", "ein", "eine", "für", "auf"]),
    ("fr", &["le", "les", "et", "des", "est", "une", "pour", "vous", "dans", "qui", "avec", "sur"]),
    ("es", &["el", "los", "las", "y", "es", "por", "para", "una", "con", "del", "que", "su"]),
    ("pt", &["o", "os", "as", "e", "não", "uma", "para", "com", "do", "da", "você", "em"]),
    ("nl", &["de", "het", "een", "en", "van", "niet", "zijn", "voor", "met", "ook", "je", "wij"]),
    ("sv", &["och", "att", "det", "som", "för", "är", "inte", "med", "på", "vi", "du", "av"]),
    ("da", &["og", "at", "det", "er", "ikke", "til", "for", "med", "på", "vi", "du", "af"]),
    ("no", &["og", "ikke", "det", "er", "til", "som", "på", "med", "for", "vi", "du", "av"]),
    ("fi", &["ja", "on", "ei", "se", "että", "kuin", "mutta", "tai", "myös", "sinä", "me", "ovat"]),
    ("pl", &["i", "w", "nie", "się", "na", "jest", "że", "do", "to", "dla", "jak", "od"]),
    ("cs", &["a", "je", "se", "na", "že", "to", "pro", "jako", "nebo", "jsou", "také", "který"]),
    ("sk", &["a", "je", "sa", "na", "že", "to", "pre", "ako", "alebo", "sú", "aj", "ktorý"]),
    ("hu", &["a", "az", "és", "hogy", "nem", "egy", "is", "meg", "van", "csak", "még", "már"]),
    ("ro", &["și", "în", "de", "la", "nu", "cu", "pe", "este", "pentru", "sau", "care", "mai"]),
    ("lt", &["ir", "yra", "kad", "su", "ne", "tai", "bet", "kaip", "jūs", "mes", "į", "iš"]),
    ("lv", &["un", "ir", "ka", "ar", "uz", "no", "par", "bet", "jūs", "mēs", "arī", "tas"]),
];

/// Human-readable name for a language code; unknown codes come back upper-cased
pub fn language_name(code: &str) -> String {
    let name = match code {
        "cs" => "Czech",
        "pl" => "Polish",
        "sk" => "Slovak",
        "hu" => "Hungarian",
        "ro" => "Romanian",
        "de" => "German",
        "es" => "Spanish",
        "fr" => "French",
        "lt" => "Lithuanian",
        "lv" => "Latvian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "sv" => "Swedish",
        "da" => "Danish",
        "fi" => "Finnish",
        "no" => "Norwegian",
        "en" => "English",
        "auto" => "Auto-detect",
        other => return other.to_uppercase(),
    };
    name.to_string()
}

/// Guess the language of `text` among `supported` by counting stop words.
///
/// Short or ambiguous text falls back to English.
pub fn detect_language(text: &str, supported: &[String]) -> String {
    let sample: String = text.trim().chars().take(DETECT_SAMPLE_CHARS).collect();
    if sample.chars().count() < MIN_DETECT_CHARS {
        warn!("Text too short for reliable language detection, using English");
        return FALLBACK_LANGUAGE.to_string();
    }

    let tokens = tokenize(&sample);
    let mut best: Option<(&str, usize)> = None;

    for (code, words) in STOP_WORDS {
        if !supported.iter().any(|s| s == code) {
            continue;
        }
        let words: HashSet<&str> = words.iter().copied().collect();
        let hits = tokens.iter().filter(|t| words.contains(t.as_str())).count();
        if best.map_or(true, |(_, top)| hits > top) {
            best = Some((code, hits));
        }
    }

    match best {
        Some((code, hits)) if hits >= MIN_STOPWORD_HITS => {
            info!("Detected language: {} ({} stop words)", code, hits);
            code.to_string()
        }
        _ => {
            warn!("Language detection inconclusive, using English");
            FALLBACK_LANGUAGE.to_string()
        }
    }
}

/// Turn a requested language code into the one analysis will use.
///
/// `auto` is detected from the text; unsupported codes fall back to English.
pub fn resolve_language(requested: &str, text: &str, supported: &[String]) -> String {
    let requested = requested.trim().to_lowercase();
    let code = if requested.is_empty() || requested == "auto" {
        detect_language(text, supported)
    } else {
        requested
    };

    if supported.iter().any(|s| *s == code) {
        code
    } else {
        warn!("Unsupported language {}, falling back to English", code);
        FALLBACK_LANGUAGE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisConfig;

    fn supported() -> Vec<String> {
        AnalysisConfig::default().supported_languages
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("cs"), "Czech");
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("ja"), "JA");
    }

    #[test]
    fn test_detect_english() {
        let text = "Support the journalism that matters to you. Your subscription funds our \
                    reporting and keeps this newsroom independent for everyone.";
        assert_eq!(detect_language(text, &supported()), "en");
    }

    #[test]
    fn test_detect_german() {
        let text = "Unterstützen Sie unabhängigen Journalismus. Mit einem Abo lesen Sie die \
                    Zeitung und das Magazin auf allen Geräten, für nur einen Euro.";
        assert_eq!(detect_language(text, &supported()), "de");
    }

    #[test]
    fn test_detect_french() {
        let text = "Soutenez le journalisme indépendant. Abonnez-vous pour lire les articles \
                    et les enquêtes de la rédaction, avec une offre pour vous.";
        assert_eq!(detect_language(text, &supported()), "fr");
    }

    #[test]
    fn test_short_text_is_english() {
        assert_eq!(detect_language("Předplatné", &supported()), "en");
    }

    #[test]
    fn test_resolve_explicit_and_unsupported() {
        let text = "irrelevant";
        assert_eq!(resolve_language("CS", text, &supported()), "cs");
        assert_eq!(resolve_language("ja", text, &supported()), "en");
    }
}
