//! Fallback documents for receipts that could not be printed
//!
//! Staff pick these up from `<work_dir>/fallback_receipts/` and print them
//! from any machine.

use super::renderer::ReceiptRenderer;
use super::types::ReceiptData;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PAGE_BREAK: char = '\u{0C}';

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Written document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDocument {
    pub path: PathBuf,
    pub order_ids: Vec<i64>,
    pub payment_ids: Vec<i64>,
    pub pages: usize,
}

/// Durable sink for receipts whose print job was given up
#[async_trait]
pub trait FallbackSink: Send + Sync {
    async fn write_receipt(&self, receipt: &ReceiptData) -> Result<FallbackDocument, FallbackError>;
}

/// Paginated plain text files on disk
#[derive(Debug, Clone)]
pub struct FileFallbackSink {
    dir: PathBuf,
    renderer: ReceiptRenderer,
    lines_per_page: usize,
}

impl FileFallbackSink {
    pub fn new(dir: impl Into<PathBuf>, width: usize) -> Self {
        Self {
            dir: dir.into(),
            renderer: ReceiptRenderer::new(width),
            lines_per_page: 60,
        }
    }

    pub fn with_lines_per_page(mut self, lines: usize) -> Self {
        self.lines_per_page = lines.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Documents written so far, oldest first
    pub async fn list_documents(&self) -> Result<Vec<PathBuf>, FallbackError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                docs.push(path);
            }
        }
        // file names start with a timestamp
        docs.sort();
        Ok(docs)
    }

    fn file_name(receipt: &ReceiptData) -> String {
        let join = |ids: &[i64]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join("-")
        };
        format!(
            "{}_order-{}_payment-{}_{}.txt",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"),
            join(&receipt.order_ids),
            join(&receipt.payment_ids),
            &uuid::Uuid::new_v4().simple().to_string()[..8],
        )
    }

    /// Split rendered text into pages with a header line each
    fn paginate(&self, text: &str) -> (String, usize) {
        let lines: Vec<&str> = text.trim_end_matches('\n').lines().collect();
        let chunks: Vec<&[&str]> = lines.chunks(self.lines_per_page).collect();
        let pages = chunks.len().max(1);

        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                out.push(PAGE_BREAK);
            }
            out.push_str(&format!("--- Page {}/{} ---\n", i + 1, pages));
            for line in *chunk {
                out.push_str(line);
                out.push('\n');
            }
        }
        (out, pages)
    }
}

#[async_trait]
impl FallbackSink for FileFallbackSink {
    async fn write_receipt(&self, receipt: &ReceiptData) -> Result<FallbackDocument, FallbackError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let text = self.renderer.render(receipt).into_text();
        let (content, pages) = self.paginate(&text);
        let path = self.dir.join(Self::file_name(receipt));
        tokio::fs::write(&path, content).await?;

        tracing::info!(
            path = %path.display(),
            order_ids = ?receipt.order_ids,
            payment_ids = ?receipt.payment_ids,
            pages,
            "Fallback receipt written"
        );

        Ok(FallbackDocument {
            path,
            order_ids: receipt.order_ids.clone(),
            payment_ids: receipt.payment_ids.clone(),
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::types::ReceiptLine;
    use rust_decimal::Decimal;
    use shared::models::PaymentMethod;

    fn receipt(lines: usize) -> ReceiptData {
        ReceiptData {
            order_ids: vec![3],
            payment_ids: vec![11],
            table_name: "C3".to_string(),
            lines: (0..lines)
                .map(|i| ReceiptLine {
                    name: format!("Item {i}"),
                    quantity: 1,
                    unit_price: Decimal::ONE,
                    line_total: Decimal::ONE,
                    included_in_buffet: false,
                })
                .collect(),
            subtotal: Decimal::from(lines as i64),
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            service_charge: Decimal::ZERO,
            tip: Decimal::ZERO,
            total: Decimal::from(lines as i64),
            method: PaymentMethod::Cash,
            paid_at: 0,
            reprint: false,
        }
    }

    #[tokio::test]
    async fn test_write_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileFallbackSink::new(dir.path().join("fallback_receipts"), 32);
        assert!(sink.list_documents().await.unwrap().is_empty());

        let doc = sink.write_receipt(&receipt(2)).await.unwrap();
        assert_eq!(doc.order_ids, vec![3]);
        assert_eq!(doc.payment_ids, vec![11]);
        assert_eq!(doc.pages, 1);

        let name = doc.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.contains("order-3_payment-11"));

        let content = tokio::fs::read_to_string(&doc.path).await.unwrap();
        assert!(content.starts_with("--- Page 1/1 ---\n"));
        assert!(content.contains("Order: 3"));
        assert!(content.contains("Payment: 11"));

        assert_eq!(sink.list_documents().await.unwrap(), vec![doc.path]);
    }

    #[tokio::test]
    async fn test_long_receipt_is_paginated() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileFallbackSink::new(dir.path(), 32).with_lines_per_page(10);

        let doc = sink.write_receipt(&receipt(30)).await.unwrap();
        assert!(doc.pages > 1);

        let content = tokio::fs::read_to_string(&doc.path).await.unwrap();
        assert_eq!(content.matches(PAGE_BREAK).count(), doc.pages - 1);
        assert!(content.contains(&format!("--- Page {}/{} ---", doc.pages, doc.pages)));
    }
}
