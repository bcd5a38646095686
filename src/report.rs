//! PDF inspection report built from the stored inspection.

use crate::constants::DAMAGE_SECTIONS;
use crate::domain::{DamageDetail, Inspection, Property};
use crate::error::{InspectionError, Result};
use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const WRAP_COLUMNS: usize = 90;

/// Everything the report, review page and emails need about one inspection.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub inspection: Inspection,
    pub property: Option<Property>,
    pub damages: Vec<DamageDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
}

impl LineStyle {
    fn font_size(self) -> f32 {
        match self {
            LineStyle::Title => 16.0,
            LineStyle::Heading => 12.0,
            LineStyle::Body => 10.0,
        }
    }

    fn advance_mm(self) -> f32 {
        match self {
            LineStyle::Title => 10.0,
            LineStyle::Heading => 8.0,
            LineStyle::Body => 5.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
}

impl ReportLine {
    fn title(text: impl Into<String>) -> Self {
        Self { style: LineStyle::Title, text: text.into() }
    }

    fn heading(text: impl Into<String>) -> Self {
        Self { style: LineStyle::Heading, text: text.into() }
    }

    fn body(text: impl Into<String>) -> Self {
        Self { style: LineStyle::Body, text: text.into() }
    }
}

/// `inspection_golfcart_<cart>_<YYYYMMDD>.pdf`, using the inspection date.
pub fn report_filename(inspection: &Inspection) -> String {
    let cart: String = inspection
        .cart_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let cart = if cart.is_empty() {
        inspection.id.map(|id| id.to_string()).unwrap_or_default()
    } else {
        cart
    };
    format!(
        "inspection_golfcart_{}_{}.pdf",
        cart,
        inspection.inspection_date.format("%Y%m%d")
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split_at = word
                    .char_indices()
                    .nth(columns)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                let rest = word.split_off(split_at);
                lines.push(word);
                word = rest;
            }
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if needed > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// The report content, line by line, before layout.
pub fn report_lines(report: &InspectionReport, generated_on: NaiveDate) -> Vec<ReportLine> {
    let inspection = &report.inspection;
    let mut lines = vec![
        ReportLine::title("Golf Cart Inspection Report"),
        ReportLine::body(format!("Generated: {}", generated_on.format("%d/%m/%Y"))),
        ReportLine::heading("Inspection details"),
        ReportLine::body(format!("Cart number: {}", inspection.cart_number)),
    ];

    let property = match &report.property {
        Some(p) if !p.location.trim().is_empty() => format!("{} ({})", p.name, p.location),
        Some(p) => p.name.clone(),
        None => "-".to_string(),
    };
    lines.push(ReportLine::body(format!("Property: {property}")));
    lines.push(ReportLine::body(format!(
        "Inspection date: {}",
        inspection.inspection_date.format("%d/%m/%Y")
    )));
    lines.push(ReportLine::body(format!(
        "Inspector: {}",
        or_dash(&inspection.inspector_name)
    )));
    lines.push(ReportLine::body(format!("Status: {}", inspection.status)));

    lines.push(ReportLine::heading("Guest"));
    lines.push(ReportLine::body(format!("Name: {}", inspection.guest_name)));
    lines.push(ReportLine::body(format!("Email: {}", inspection.guest_email)));
    lines.push(ReportLine::body(format!("Phone: {}", or_dash(&inspection.guest_phone))));
    lines.push(ReportLine::body(format!("Room: {}", or_dash(&inspection.guest_room))));

    lines.push(ReportLine::heading("Damage by section"));
    let mut any_section = false;
    for section in DAMAGE_SECTIONS {
        let text = inspection.section_damage(section).trim();
        if text.is_empty() {
            continue;
        }
        any_section = true;
        let label = crate::constants::section_part_name(section);
        lines.extend(
            wrap_text(&format!("{label}: {text}"), WRAP_COLUMNS)
                .into_iter()
                .map(ReportLine::body),
        );
    }
    if !any_section {
        lines.push(ReportLine::body("No damage reported by section."));
    }

    lines.push(ReportLine::heading("Damage records"));
    if report.damages.is_empty() {
        lines.push(ReportLine::body("No damage records."));
    }
    for damage in &report.damages {
        let mut entry = format!(
            "- {} ({}): {} x{}",
            damage.part, damage.location, damage.damage_type, damage.quantity
        );
        if !damage.description.trim().is_empty() {
            entry.push_str(&format!(" - {}", damage.description.trim()));
        }
        lines.extend(wrap_text(&entry, WRAP_COLUMNS).into_iter().map(ReportLine::body));
        if let Some(url) = &damage.photo_url {
            lines.push(ReportLine::body(format!("  Photo: {url}")));
        }
    }

    if !inspection.additional_notes.trim().is_empty() {
        lines.push(ReportLine::heading("Inspector notes"));
        lines.extend(
            wrap_text(inspection.additional_notes.trim(), WRAP_COLUMNS)
                .into_iter()
                .map(ReportLine::body),
        );
    }

    lines.push(ReportLine::heading("Guest acknowledgement"));
    lines.push(ReportLine::body(format!(
        "Guest confirms damages: {}",
        yes_no(inspection.guest_confirms_damages)
    )));
    lines.push(ReportLine::body(format!(
        "Guest accepts terms: {}",
        yes_no(inspection.guest_accepts_terms)
    )));
    lines.extend(
        wrap_text(
            &format!("Comments: {}", or_dash(inspection.guest_comments.trim())),
            WRAP_COLUMNS,
        )
        .into_iter()
        .map(ReportLine::body),
    );
    let guest_signature = match (&inspection.guest_signature, inspection.signed_at) {
        (Some(_), Some(at)) => format!("Signed on {}", at.format("%d/%m/%Y %H:%M UTC")),
        (Some(_), None) => "Signed".to_string(),
        _ => "Pending".to_string(),
    };
    lines.push(ReportLine::body(format!("Guest signature: {guest_signature}")));
    if let Some(url) = &inspection.guest_signature_url {
        lines.push(ReportLine::body(format!("  Signature image: {url}")));
    }
    let inspector_signature = if inspection.inspector_signature.is_some() {
        "On file"
    } else {
        "Not provided"
    };
    lines.push(ReportLine::body(format!(
        "Inspector signature: {inspector_signature}"
    )));

    lines
}

/// Characters the builtin Helvetica (WinAnsi encoding) has glyphs for beyond Latin-1.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// Replaces characters the builtin fonts cannot draw with `?`, so they are
/// visibly missing instead of silently dropped.
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| {
            if (c as u32) < 0x100 || WIN_ANSI_EXTRAS.contains(c) {
                c
            } else {
                '?'
            }
        })
        .collect()
}

pub fn render_pdf(report: &InspectionReport, generated_on: NaiveDate) -> Result<Vec<u8>> {
    let title = format!("Golf Cart Inspection {}", report.inspection.cart_number);
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let regular: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| InspectionError::Pdf(e.to_string()))?;
    let bold: IndirectFontRef = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| InspectionError::Pdf(e.to_string()))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    for line in report_lines(report, generated_on) {
        if line.style == LineStyle::Heading {
            y -= 3.0;
        }
        if y < MARGIN_MM {
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            current = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        let font = match line.style {
            LineStyle::Body => &regular,
            LineStyle::Title | LineStyle::Heading => &bold,
        };
        current.use_text(
            pdf_safe(&line.text),
            line.style.font_size(),
            Mm(MARGIN_MM),
            Mm(y),
            font,
        );
        y -= line.style.advance_mm();
    }

    drop(current);
    crate::metrics::increment(crate::metrics::MetricName::PdfRendered);
    doc.save_to_bytes()
        .map_err(|e| InspectionError::Pdf(e.to_string()))
}
