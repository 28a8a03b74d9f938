use std::fs;
use std::path::Path;

use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use serde_json::Value;

use crate::errors::IngestError;
use crate::model::Metadata;

/// Text of one page (PDF) or of the whole document (Word, plain text).
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" | "doc" => Ok(Self::Word),
            "txt" | "md" => Ok(Self::PlainText),
            _ => Err(IngestError::UnsupportedFormat { extension }),
        }
    }
}

/// Load a document as page-level text. The format is chosen by extension and checked
/// before the file is opened.
pub fn load_document(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let format = DocumentFormat::from_path(path)?;
    let pages = match format {
        DocumentFormat::Pdf => load_pdf(path)?,
        DocumentFormat::Word => vec![load_word(path)?],
        DocumentFormat::PlainText => vec![load_plain(path)?],
    };
    tracing::info!(
        path = %path.display(),
        ?format,
        pages = pages.len(),
        chars = pages.iter().map(|p| p.text.chars().count()).sum::<usize>(),
        "document loaded"
    );
    Ok(pages)
}

fn page_metadata(path: &Path, page: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), Value::from(path.display().to_string()));
    metadata.insert("page".to_string(), Value::from(page));
    metadata
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, IngestError> {
    fs::read(path).map_err(|e| IngestError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn load_pdf(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let bytes = read_bytes(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        IngestError::Extract {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;

    // blank pages are dropped but keep their place in the numbering
    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, text)| PageText {
            text,
            metadata: page_metadata(path, i + 1),
        })
        .collect())
}

fn load_word(path: &Path) -> Result<PageText, IngestError> {
    let bytes = read_bytes(path)?;
    // legacy binary .doc files are not OOXML and fail here
    let docx = read_docx(&bytes).map_err(|e| IngestError::Extract {
        path: path.display().to_string(),
        message: format!("{:?}", e),
    })?;

    let mut blocks = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => blocks.push(paragraph_text(p)),
            DocumentChild::Table(t) => table_text(t, &mut blocks),
            _ => {}
        }
    }
    blocks.retain(|t| !t.trim().is_empty());

    Ok(PageText {
        text: blocks.join("\n"),
        metadata: page_metadata(path, 1),
    })
}

/// One block per cell paragraph, row by row. Nested tables are walked in place.
fn table_text(table: &Table, blocks: &mut Vec<String>) {
    for TableChild::TableRow(row) in &table.rows {
        for TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => blocks.push(paragraph_text(p)),
                    TableCellContent::Table(inner) => table_text(inner, blocks),
                    _ => {}
                }
            }
        }
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    if let RunChild::Text(t) = rc {
                        text.push_str(&t.text);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            _ => {}
        }
    }
}

fn load_plain(path: &Path) -> Result<PageText, IngestError> {
    let text = fs::read_to_string(path).map_err(|e| IngestError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(PageText {
        text,
        metadata: page_metadata(path, 1),
    })
}
