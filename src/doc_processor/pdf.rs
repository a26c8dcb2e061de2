use lopdf::Document;

use crate::error::ExtractError;

/// Page text as ordered fragments, one per non-blank text line.
type Page = Vec<String>;

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes)?;

    let pages: Result<Vec<Page>, lopdf::Error> = doc
        .get_pages()
        .into_keys()
        .map(|page_number| doc.extract_text(&[page_number]).map(|text| fragments(&text)))
        .collect();

    match pages {
        Ok(pages) if pages.iter().any(|page| !page.is_empty()) => Ok(join_pages(&pages)),
        Ok(pages) => {
            // No text layer lopdf can decode; pdf-extract handles more font encodings.
            match pdf_extract::extract_text_from_mem(bytes) {
                Ok(text) if !fragments(&text).is_empty() => Ok(join_pages(&[fragments(&text)])),
                Ok(_) => Ok(join_pages(&pages)),
                Err(e) => {
                    tracing::warn!("pdf-extract fallback failed: {}", e);
                    Ok(join_pages(&pages))
                }
            }
        }
        Err(err) => {
            tracing::warn!("lopdf page extraction failed, trying pdf-extract: {}", err);
            let text =
                pdf_extract::extract_text_from_mem(bytes).map_err(|_| ExtractError::Pdf(err))?;
            Ok(join_pages(&[fragments(&text)]))
        }
    }
}

fn fragments(text: &str) -> Page {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Fragments of a page joined by single spaces, each page followed by one space.
fn join_pages(pages: &[Page]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.join(" "));
        text.push(' ');
    }
    text
}
