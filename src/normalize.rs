//! Document normalization.
//!
//! Converts raw ingestion input into a uniform sequence of [`TextUnit`]s:
//! one unit per PDF page in automatic mode, or exactly one synthesized
//! narrative block in manual mode. Pure transformation — no side effects,
//! and the staged document bytes are owned by the caller's
//! [`IngestSource`], so they are released on every exit path.

use crate::error::{CoreError, CoreResult};
use crate::models::{IngestSource, ManualPayload, TextUnit};

/// Normalize an ingestion source into the organization's text units.
///
/// # Errors
///
/// - [`CoreError::UnsupportedDocument`] when a PDF cannot be parsed or
///   yields zero extractable text.
/// - [`CoreError::InvalidInput`] when a manual payload is malformed
///   (blank organization name, blank entry names in the lists).
pub fn normalize(org_id: &str, name: &str, source: &IngestSource) -> CoreResult<Vec<TextUnit>> {
    match source {
        IngestSource::Automatic { bytes, .. } => normalize_pdf(org_id, bytes),
        IngestSource::Manual(payload) => synthesize_manual(org_id, name, payload),
    }
}

/// Extract one text unit per PDF page, skipping pages with no visible text.
fn normalize_pdf(org_id: &str, bytes: &[u8]) -> CoreResult<Vec<TextUnit>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| CoreError::UnsupportedDocument(format!("PDF extraction failed: {}", e)))?;

    let units: Vec<TextUnit> = pages
        .iter()
        .filter(|page| !page.trim().is_empty())
        .enumerate()
        .map(|(position, page)| TextUnit {
            org_id: org_id.to_string(),
            position,
            text: page.trim().to_string(),
        })
        .collect();

    if units.is_empty() {
        return Err(CoreError::UnsupportedDocument(
            "document contains no extractable text".to_string(),
        ));
    }

    Ok(units)
}

/// Synthesize exactly one narrative text unit from a manual payload.
///
/// Fixed line order: organization name, website, industry, about text,
/// then every employee, product, and service entry, one per line. Missing
/// optional fields render as empty strings rather than omitted lines, so
/// the unit shape is stable across payloads.
fn synthesize_manual(org_id: &str, name: &str, payload: &ManualPayload) -> CoreResult<Vec<TextUnit>> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "organization name is required".to_string(),
        ));
    }

    for employee in &payload.employees {
        if employee.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "employee entries require a name".to_string(),
            ));
        }
    }
    for product in &payload.products {
        if product.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "product entries require a name".to_string(),
            ));
        }
    }
    for service in &payload.services {
        if service.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "service entries require a name".to_string(),
            ));
        }
    }

    let mut lines = vec![
        format!("Organization: {}", name.trim()),
        format!("Website: {}", payload.website),
        format!("Industry: {}", payload.industry),
        format!("About: {}", payload.about),
    ];
    for employee in &payload.employees {
        lines.push(format!("Employee: {}: {}", employee.name, employee.role));
    }
    for product in &payload.products {
        lines.push(format!("Product: {}: {}", product.name, product.details));
    }
    for service in &payload.services {
        lines.push(format!("Service: {}: {}", service.name, service.details));
    }

    Ok(vec![TextUnit {
        org_id: org_id.to_string(),
        position: 0,
        text: lines.join("\n"),
    }])
}
