use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::application::SentenceSplitter;

/// Sentence splitter over the Unicode sentence boundary rules (UAX #29).
///
/// Text is NFC-normalized first. Blank lines separate paragraphs, and a
/// paragraph boundary always ends a sentence, so headings without
/// punctuation stay on their own. Inside a paragraph, line breaks and
/// whitespace runs collapse to single spaces before segmentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeSentenceSplitter;

impl UnicodeSentenceSplitter {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let normalized: String = text.nfc().collect();

        let mut sentences = Vec::new();
        for paragraph in paragraphs(&normalized) {
            sentences.extend(
                paragraph
                    .split_sentence_bounds()
                    .map(str::trim)
                    .filter(|sentence| !sentence.is_empty())
                    .map(str::to_string),
            );
        }
        sentences
    }
}

/// Paragraphs with their whitespace collapsed, blank ones dropped.
fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !words.is_empty() {
                paragraphs.push(words.join(" "));
                words.clear();
            }
        } else {
            words.extend(line.split_whitespace());
        }
    }
    if !words.is_empty() {
        paragraphs.push(words.join(" "));
    }
    paragraphs
}
