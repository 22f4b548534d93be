//! Root-element classification and order id extraction.

use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::types::{DocumentError, MessageType};

/// Element names that carry the order id.
const ORDER_ID_ELEMENTS: &[&[u8]] = &[b"ID", b"OrderID"];

/// Result of a full pass over a well-formed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentScan {
    /// Local name of the root element.
    pub root: String,
    /// Trimmed text of the first `ID`/`OrderID` descendant, if non-empty.
    pub order_id: Option<String>,
}

/// Walk the whole document, checking well-formedness and collecting the root
/// name and the first order id element.
pub fn scan(bytes: &[u8]) -> Result<DocumentScan, DocumentError> {
    let text = std::str::from_utf8(bytes)?;
    // Text is kept untrimmed: an id split by child elements keeps its inner
    // whitespace and is trimmed once when the element closes.
    let mut reader = Reader::from_str(text);

    let mut depth = 0usize;
    let mut root: Option<String> = None;
    let mut root_closed = false;
    // (depth of the id element, text collected so far)
    let mut capture: Option<(usize, String)> = None;
    let mut first_id: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| DocumentError::Malformed {
            position: reader.buffer_position() as u64,
            reason: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if depth == 0 {
                    if root_closed {
                        return Err(DocumentError::MultipleRoots);
                    }
                    root = Some(String::from_utf8_lossy(name.as_ref()).into_owned());
                } else if first_id.is_none()
                    && capture.is_none()
                    && ORDER_ID_ELEMENTS.contains(&name.as_ref())
                {
                    capture = Some((depth, String::new()));
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let name = e.local_name();
                if depth == 0 {
                    if root_closed {
                        return Err(DocumentError::MultipleRoots);
                    }
                    root = Some(String::from_utf8_lossy(name.as_ref()).into_owned());
                    root_closed = true;
                } else if first_id.is_none()
                    && capture.is_none()
                    && ORDER_ID_ELEMENTS.contains(&name.as_ref())
                {
                    first_id = Some(String::new());
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if capture.as_ref().is_some_and(|(id_depth, _)| *id_depth == depth) {
                    first_id = capture.take().map(|(_, text)| text.trim().to_string());
                }
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Text(t) => {
                let value = t.unescape().map_err(|e| DocumentError::Malformed {
                    position: reader.buffer_position() as u64,
                    reason: e.to_string(),
                })?;
                if depth == 0 {
                    if !value.trim().is_empty() {
                        return Err(DocumentError::Malformed {
                            position: reader.buffer_position() as u64,
                            reason: "text outside the root element".to_string(),
                        });
                    }
                } else if let Some((_, collected)) = capture.as_mut() {
                    collected.push_str(&value);
                }
            }
            Event::CData(c) => {
                if let Some((_, collected)) = capture.as_mut() {
                    collected.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DocumentError::Malformed {
            position: reader.buffer_position() as u64,
            reason: "unexpected end of document".to_string(),
        });
    }

    let root = root.ok_or(DocumentError::NoRoot)?;
    Ok(DocumentScan {
        root,
        order_id: first_id.filter(|id| !id.is_empty()),
    })
}

/// Check that `bytes` is a single well-formed XML document.
pub fn validate_xml(bytes: &[u8]) -> Result<(), DocumentError> {
    scan(bytes).map(|_| ())
}

/// Classify an in-memory document by its root element.
pub fn classify_bytes(bytes: &[u8]) -> Result<MessageType, DocumentError> {
    let scan = scan(bytes)?;
    MessageType::from_root(&scan.root)
}

/// Extract the order id from an in-memory document.
pub fn extract_order_id_bytes(bytes: &[u8]) -> Result<Option<String>, DocumentError> {
    Ok(scan(bytes)?.order_id)
}

/// Classify the document at `path`.
pub async fn classify(path: &Path) -> Result<MessageType, DocumentError> {
    classify_bytes(&read(path).await?)
}

/// Extract the order id from the document at `path`.
pub async fn extract_order_id(path: &Path) -> Result<Option<String>, DocumentError> {
    extract_order_id_bytes(&read(path).await?)
}

async fn read(path: &Path) -> Result<Vec<u8>, DocumentError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// An inbound document, read once and classified.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub message_type: MessageType,
    pub order_id: Option<String>,
    pub body: Vec<u8>,
}

impl Document {
    /// Read and classify the file at `path`.
    pub async fn load(path: &Path) -> Result<Self, DocumentError> {
        let body = read(path).await?;
        let scan = scan(&body)?;
        let message_type = MessageType::from_root(&scan.root)?;

        Ok(Self {
            path: path.to_path_buf(),
            message_type,
            order_id: scan.order_id,
            body,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
