//! Bank-transfer invoices, rendered on demand and never stored.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::Order;

pub const INVOICE_GRACE_PERIOD_DAYS: i64 = 3;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub valid_until: DateTime<Utc>,
    pub sum: Decimal,
}

impl Invoice {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer_id,
            valid_until: order.order_date + Duration::days(INVOICE_GRACE_PERIOD_DAYS),
            sum: order.sum,
        }
    }

    fn lines(&self, document_id: &str) -> Vec<String> {
        vec![
            "Bank transfer invoice".to_string(),
            format!("Document: {document_id}"),
            format!("Order: {}", self.order_id),
            format!("Customer: {}", self.customer_id),
            format!("Valid until: {}", self.valid_until.format("%Y-%m-%d")),
            format!("Sum: {}", self.sum),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub document_id: String,
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn document_id(issued_at: DateTime<Utc>) -> String {
    format!("INV-{}", issued_at.format("%Y%m%d%H%M%S"))
}

pub fn render(invoice: &Invoice, issued_at: DateTime<Utc>) -> InvoiceDocument {
    let document_id = document_id(issued_at);
    let bytes = render_pdf(&document_id, &invoice.lines(&document_id));
    InvoiceDocument {
        filename: format!("{document_id}.pdf"),
        document_id,
        content_type: PDF_CONTENT_TYPE,
        bytes,
    }
}

/// Single A4 page, Helvetica, uncompressed content stream.
fn render_pdf(title: &str, lines: &[String]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n16 TL\n72 770 Td\n");
    for line in lines {
        let _ = writeln!(content, "({}) Tj T*", escape_pdf(line));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Title ({}) /Producer (storefront-settlement) >>", escape_pdf(title)),
    ];

    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(xref, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1,
        objects.len()
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

fn escape_pdf(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}
