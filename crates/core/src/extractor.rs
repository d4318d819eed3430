use crate::error::IngestError;
use lopdf::Document;

#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// Converts uploaded document bytes into page-segmented plain text.
///
/// Pages with no extractable text are returned with their numbers intact so
/// that citation numbering stays faithful; the chunker skips them.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::Unparseable(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Unparseable(error.to_string()))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        if pages.is_empty() {
            return Err(IngestError::Unparseable("pdf contains no pages".to_string()));
        }

        Ok(pages)
    }
}

/// Plain-text documents, paginated on form-feed (`\u{000C}`).
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|error| IngestError::Unparseable(format!("input is not utf-8: {error}")))?;

        let pages = text
            .split('\u{000C}')
            .enumerate()
            .map(|(index, page)| PageText {
                number: (index + 1) as u32,
                text: page.to_string(),
            })
            .collect::<Vec<_>>();

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(IngestError::Unparseable(
                "document contains no text".to_string(),
            ));
        }

        Ok(pages)
    }
}

/// Routes PDF bytes to [`PdfTextExtractor`] and everything else to
/// [`PlainTextExtractor`], keyed on the `%PDF-` magic.
#[derive(Debug, Default)]
pub struct AutoExtractor {
    pdf: PdfTextExtractor,
    text: PlainTextExtractor,
}

impl TextExtractor for AutoExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        if bytes.starts_with(b"%PDF-") {
            self.pdf.extract(bytes)
        } else {
            self.text.extract(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PdfTextExtractor, PlainTextExtractor, TextExtractor};
    use crate::error::IngestError;

    #[test]
    fn plain_text_splits_pages_on_form_feed() {
        let pages = PlainTextExtractor
            .extract("First page\u{000C}Second page".as_bytes())
            .expect("plain text should extract");

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].text, "First page");
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].text, "Second page");
    }

    #[test]
    fn plain_text_keeps_blank_pages_numbered() {
        let pages = PlainTextExtractor
            .extract("one\u{000C}\u{000C}three".as_bytes())
            .expect("plain text should extract");

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].number, 2);
        assert!(pages[1].text.trim().is_empty());
        assert_eq!(pages[2].number, 3);
    }

    #[test]
    fn plain_text_without_content_is_unparseable() {
        let result = PlainTextExtractor.extract(b"  \n \x0C  ");
        assert!(matches!(result, Err(IngestError::Unparseable(_))));
    }

    #[test]
    fn invalid_utf8_is_unparseable() {
        let result = PlainTextExtractor.extract(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(IngestError::Unparseable(_))));
    }

    #[test]
    fn broken_pdf_bytes_are_unparseable() {
        let result = PdfTextExtractor.extract(b"%PDF-1.4\n%broken");
        assert!(matches!(result, Err(IngestError::Unparseable(_))));
    }
}
