use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

use crate::error::ExtractError;

/// Raw text of a word-processing document: every body paragraph followed by a
/// blank line. Tables, images and headers are skipped.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx = read_docx(bytes).map_err(|e| ExtractError::Docx(format!("{:?}", e)))?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            push_paragraph(&mut text, paragraph);
            text.push_str("\n\n");
        }
    }
    Ok(text)
}

fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push('\t'),
                    RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
}
