//! Rule-based singularization for English, French and Spanish tokens.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

/// Singularization could not be applied to the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SingularizeError {
    #[error("no singularization rules for language {0:?}")]
    Unsupported(String),
}

type WordRule = fn(&str) -> String;

static ENGLISH_UNINFLECTED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aircraft", "alias", "always", "atlas", "bias", "bison", "canvas", "chassis", "corps",
        "debris", "deer", "diabetes", "ethics", "fish", "gallows", "headquarters", "herpes",
        "innings", "lens", "measles", "mews", "moose", "mumps", "news", "offspring", "perhaps",
        "pliers", "proceedings", "rabies", "salmon", "scissors", "series", "sheep", "shears",
        "species", "swine", "towards", "trout", "whereas", "sometimes", "afterwards",
        "besides", "nevertheless", "mathematics", "physics", "economics", "politics",
        "statistics", "genetics", "linguistics", "mechanics", "dynamics", "electronics",
        "logistics", "analytics", "diagnostics", "athletics", "aesthetics",
    ]
    .into_iter()
    .collect()
});

static ENGLISH_IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("children", "child"),
        ("people", "person"),
        ("men", "man"),
        ("women", "woman"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("geese", "goose"),
        ("mice", "mouse"),
        ("lice", "louse"),
        ("oxen", "ox"),
        ("dice", "die"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("analyses", "analysis"),
        ("bases", "basis"),
        ("crises", "crisis"),
        ("diagnoses", "diagnosis"),
        ("ellipses", "ellipsis"),
        ("hypotheses", "hypothesis"),
        ("oases", "oasis"),
        ("parentheses", "parenthesis"),
        ("prognoses", "prognosis"),
        ("synopses", "synopsis"),
        ("syntheses", "synthesis"),
        ("theses", "thesis"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("vertices", "vertex"),
        ("appendices", "appendix"),
        ("radii", "radius"),
        ("stimuli", "stimulus"),
        ("fungi", "fungus"),
        ("nuclei", "nucleus"),
        ("cacti", "cactus"),
        ("alumni", "alumnus"),
        ("curricula", "curriculum"),
        ("media", "medium"),
        ("bacteria", "bacterium"),
        ("strata", "stratum"),
        ("errata", "erratum"),
        ("formulae", "formula"),
        ("larvae", "larva"),
        ("antennae", "antenna"),
        ("vertebrae", "vertebra"),
        ("quizzes", "quiz"),
        ("buses", "bus"),
        ("wolves", "wolf"),
        ("halves", "half"),
        ("leaves", "leaf"),
        ("lives", "life"),
        ("knives", "knife"),
        ("wives", "wife"),
        ("shelves", "shelf"),
        ("thieves", "thief"),
        ("calves", "calf"),
        ("loaves", "loaf"),
        ("selves", "self"),
        ("elves", "elf"),
        ("scarves", "scarf"),
        ("hooves", "hoof"),
        ("heroes", "hero"),
        ("potatoes", "potato"),
        ("tomatoes", "tomato"),
        ("echoes", "echo"),
        ("vetoes", "veto"),
        ("torpedoes", "torpedo"),
        ("embargoes", "embargo"),
        ("movies", "movie"),
        ("cookies", "cookie"),
        ("zombies", "zombie"),
        ("calories", "calorie"),
        ("rookies", "rookie"),
        ("caches", "cache"),
        ("niches", "niche"),
        ("aches", "ache"),
        ("headaches", "headache"),
        ("avalanches", "avalanche"),
        ("psyches", "psyche"),
        ("cliches", "cliche"),
    ]
    .into_iter()
    .collect()
});

static FRENCH_UNINFLECTED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "fois", "corps", "temps", "pays", "souris", "repas", "bras", "dos", "gros", "mois",
        "avis", "succès", "procès", "accès", "progrès", "après", "très", "sans", "sous", "alors",
        "depuis", "toujours", "parfois", "jamais", "plusieurs", "moins", "mais", "dans", "puis",
    ]
    .into_iter()
    .collect()
});

static SPANISH_UNINFLECTED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "lunes", "martes", "miércoles", "jueves", "viernes", "además", "después", "antes",
        "entonces", "menos", "más", "apenas", "quizás", "jamás", "atrás", "través",
    ]
    .into_iter()
    .collect()
});

/// Singularize every whitespace-separated token of `text`.
///
/// Tokens that are not purely alphabetic, or mixed-case tokens such as
/// acronyms, pass through untouched.
pub fn singularize_text(text: &str, lang: &str) -> Result<String, SingularizeError> {
    let rule = rule_for(lang)?;
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| apply_cased(word, rule))
        .collect();
    Ok(words.join(" "))
}

/// Singularize a single token.
pub fn singularize_word(word: &str, lang: &str) -> Result<String, SingularizeError> {
    Ok(apply_cased(word, rule_for(lang)?))
}

fn rule_for(lang: &str) -> Result<WordRule, SingularizeError> {
    match lang {
        "en" => Ok(english as WordRule),
        "fr" => Ok(french as WordRule),
        "es" => Ok(spanish as WordRule),
        other => Err(SingularizeError::Unsupported(other.to_string())),
    }
}

fn apply_cased(word: &str, rule: WordRule) -> String {
    if word.is_empty() || !word.chars().all(char::is_alphabetic) {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if lower == word {
        return rule(&lower);
    }
    let mut chars = word.chars();
    let titlecase = chars.next().is_some_and(char::is_uppercase)
        && chars.as_str() == chars.as_str().to_lowercase();
    if titlecase {
        capitalize(&rule(&lower))
    } else {
        word.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn english(word: &str) -> String {
    if ENGLISH_UNINFLECTED.contains(word) {
        return word.to_string();
    }
    if let Some(singular) = ENGLISH_IRREGULAR.get(word) {
        return (*singular).to_string();
    }
    if ["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return word.to_string();
    }

    let candidate = if let Some(stem) = word.strip_suffix("ies") {
        if word.chars().count() > 4 {
            format!("{stem}y")
        } else {
            format!("{stem}ie")
        }
    } else if ["sses", "shes", "ches", "xes", "zzes"]
        .iter()
        .any(|end| word.ends_with(end))
    {
        word[..word.len() - 2].to_string()
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        return word.to_string();
    };

    match ENGLISH_IRREGULAR.get(candidate.as_str()) {
        Some(singular) => (*singular).to_string(),
        None => candidate,
    }
}

fn french(word: &str) -> String {
    if FRENCH_UNINFLECTED.contains(word) || word.ends_with("ss") || word.ends_with("us") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("eaux") {
        return format!("{stem}eau");
    }
    if let Some(stem) = word.strip_suffix("aux") {
        return format!("{stem}al");
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

fn spanish(word: &str) -> String {
    const ES_CONSONANTS: &[char] = &['l', 'r', 'n', 'd', 'j', 'y'];

    if SPANISH_UNINFLECTED.contains(word)
        || ["ss", "is", "us"].iter().any(|end| word.ends_with(end))
    {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("iones") {
        return format!("{stem}ión");
    }
    let Some(stem) = word.strip_suffix("es") else {
        return match word.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => word.to_string(),
        };
    };

    let mut tail = stem.chars().rev();
    let last = tail.next();
    let before_last = tail.next();
    match (before_last, last) {
        (Some(v), Some('c')) if is_vowel(v) => format!("{}z", &stem[..stem.len() - 1]),
        (Some(v), Some(c)) if is_vowel(v) && ES_CONSONANTS.contains(&c) => stem.to_string(),
        _ => format!("{stem}e"),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'á' | 'é' | 'í' | 'ó' | 'ú')
}
