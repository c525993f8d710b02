//! # Gerador de Candidatos — N-grams sem Stopwords
//!
//! Produz as frases candidatas que o [`KeyBert`](super::keybert::KeyBert)
//! vai ranquear. Segue a tokenização do `CountVectorizer` do scikit-learn,
//! que é o vetorizador padrão do KeyBERT:
//!
//! ```text
//! "Where is my order? I need a refund!"
//!   ├── 1. lowercase           → "where is my order? i need a refund!"
//!   ├── 2. Tokens \b\w\w+\b    → [where, is, my, order, need, refund]
//!   ├── 3. Remove stopwords    → [order, need, refund]
//!   ├── 4. N-grams (1..=2)     → order, need, refund, order need, need refund
//!   └── 5. Únicos, ordenados   → [need, need refund, order, order need, refund]
//! ```
//!
//! As stopwords são removidas **antes** da montagem dos n-grams, então um
//! bigram pode juntar duas palavras que no texto estavam separadas por uma
//! stopword ("order" + "refund" em "order **and** refund").

use std::collections::BTreeSet;

use regex::Regex;

use crate::config::StopWordLanguage;

/// Stopwords em inglês: a lista `ENGLISH_STOP_WORDS` do scikit-learn,
/// usada pelo KeyBERT com `stop_words="english"`.
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
    "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Padrão de token do `CountVectorizer`: palavras Unicode com 2+ caracteres.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Gera frases candidatas a partir de um texto.
///
/// Compila a regex uma única vez; reutilizável entre chamadas.
pub struct CandidateVectorizer {
    token_re: Regex,
}

impl CandidateVectorizer {
    pub fn new() -> Self {
        Self {
            // Padrão constante, validado pelos testes.
            token_re: Regex::new(TOKEN_PATTERN).expect("invalid token pattern"),
        }
    }

    /// Tokens em minúsculas, na ordem do texto, sem stopwords.
    pub fn tokens(&self, text: &str, stop_words: Option<StopWordLanguage>) -> Vec<String> {
        // Sem normalização Unicode, como no CountVectorizer.
        let lowered = text.to_lowercase();
        self.token_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !stop_words.is_some_and(|lang| is_stopword(lang, t)))
            .map(str::to_string)
            .collect()
    }

    /// Frases candidatas únicas, em ordem alfabética.
    ///
    /// `ngram_range` é inclusivo nos dois extremos, como no scikit-learn.
    /// Texto sem tokens válidos → vetor vazio.
    pub fn candidates(
        &self,
        text: &str,
        ngram_range: (usize, usize),
        stop_words: Option<StopWordLanguage>,
    ) -> Vec<String> {
        let tokens = self.tokens(text, stop_words);
        let (min_n, max_n) = ngram_range;
        let mut phrases = BTreeSet::new();

        for n in min_n.max(1)..=max_n {
            if tokens.len() < n {
                break;
            }
            for window in tokens.windows(n) {
                phrases.insert(window.join(" "));
            }
        }

        phrases.into_iter().collect()
    }
}

impl Default for CandidateVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_stopword(lang: StopWordLanguage, word: &str) -> bool {
    match lang {
        // Lista ordenada → busca binária.
        StopWordLanguage::English => ENGLISH_STOPWORDS.binary_search(&word).is_ok(),
    }
}
