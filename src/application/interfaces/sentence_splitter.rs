/// Splits document text into sentences in reading order.
///
/// Implementations are pure: the same input always yields the same output,
/// and empty or whitespace-only text yields an empty list.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}
