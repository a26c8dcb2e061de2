/// Compose the single prompt sent to the model.
///
/// The whole corpus is embedded verbatim: no truncation, no escaping.
pub fn build_prompt(corpus: &str, question: &str) -> String {
    format!("Based on the document: {corpus}\n\nQ: {question}\nA:")
}
