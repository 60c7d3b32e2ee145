use crate::Term;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
}

/// Turns raw text into index terms. Implementations run on worker threads
/// during parallel builds, so they must be shareable.
pub trait Tokenizer: Sync {
    fn tokenize(&self, text: &str) -> Vec<Term>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<Term> + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<Term> { self(text) }
}

/// NFKC normalization, lowercase, then word extraction. No stemming and no
/// stopword list; callers needing those supply their own [`Tokenizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Term> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
    }
}
