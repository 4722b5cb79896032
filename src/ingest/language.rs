//! Stopword-based language guessing for uploads that ask for auto-detection.

/// Words sampled from the start of a text.
const SAMPLE_WORDS: usize = 5_000;
/// Fewer stopword hits than this is not evidence of anything.
const MIN_HITS: usize = 3;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "es",
        &[
            "el", "la", "de", "que", "y", "en", "los", "se", "del", "las", "por", "un", "una",
            "con", "no", "para", "es", "su", "al", "lo", "como", "más", "pero", "sus", "le", "ya",
            "este", "sí", "porque", "cuando",
        ],
    ),
    (
        "en",
        &[
            "the", "of", "and", "to", "in", "is", "that", "it", "was", "for", "on", "are", "with",
            "as", "his", "they", "be", "at", "have", "this", "from", "or", "had", "by", "not",
            "but", "what", "all", "were", "when",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "de", "des", "et", "un", "une", "du", "en", "est", "que", "qui",
            "dans", "pour", "pas", "sur", "au", "avec", "il", "elle", "ce", "ne", "se", "plus",
            "par", "sont", "mais", "nous", "vous",
        ],
    ),
    (
        "pt",
        &[
            "o", "a", "os", "as", "de", "do", "da", "dos", "das", "e", "que", "em", "um", "uma",
            "para", "com", "não", "por", "se", "mais", "como", "mas", "foi", "ao", "ele", "ela",
            "seu", "sua", "ou", "quando",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "la", "i", "gli", "le", "di", "che", "e", "è", "un", "una", "per", "non",
            "con", "del", "della", "si", "sono", "ma", "come", "anche", "nel", "alla", "questo",
            "più", "ha", "dei", "io", "questa",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "den", "von", "mit",
            "sich", "des", "auf", "für", "im", "dem", "auch", "es", "an", "als", "wie", "wir",
            "ich", "sie", "er", "aber", "oder", "wenn",
        ],
    ),
];

/// Guess the ISO 639-1 code of `text`, or `None` when the evidence is thin or ambiguous.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let words: Vec<String> = text
        .split_whitespace()
        .take(SAMPLE_WORDS)
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut scores: Vec<(&'static str, usize)> = STOPWORDS
        .iter()
        .map(|(code, list)| {
            let hits = words.iter().filter(|w| list.contains(&w.as_str())).count();
            (*code, hits)
        })
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    match scores.as_slice() {
        [(code, best), (_, second), ..] if *best >= MIN_HITS && best > second => Some(*code),
        _ => None,
    }
}
