use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Punctuation stripped from titles before comparison. Apostrophes vanish
    // ("ocean's" -> "oceans"), separators become spaces ("spider-man" -> "spider man").
    static ref DROP_PUNCT: Regex = Regex::new(r"['’`\.]").expect("valid regex");
    static ref SPLIT_PUNCT: Regex = Regex::new(r##"[!"#$%&()*+,\-/:;<=>?@\[\\\]^_{|}~¡¿“”«»…–—]"##).expect("valid regex");
    static ref WS: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split a feature document into its tokens. Documents are already
/// normalized by the feature builder, so whitespace is the only separator.
pub fn document_tokens(document: &str) -> impl Iterator<Item = &str> {
    document.split_whitespace()
}

/// Canonical form of a title or query: NFKC, lowercase, punctuation stripped,
/// trimmed, internal whitespace collapsed to single spaces.
pub fn normalize_title(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    let dropped = DROP_PUNCT.replace_all(&lowered, "");
    let spaced = SPLIT_PUNCT.replace_all(&dropped, " ");
    WS.replace_all(spaced.trim(), " ").into_owned()
}

/// Collapse a label such as a genre or a person's name into one token:
/// lowercase with all whitespace removed.
pub fn label_token(label: &str) -> String {
    label
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace())
        .collect()
}
