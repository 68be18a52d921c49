//! Field cascades for vendor product pages
//!
//! | Field | Order |
//! |---|---|
//! | title | product-title heading, first `h1`, product-title class, `og:title`, `meta[name=title]` |
//! | description | `og:description`, `meta[name=description]`, "About this product" block, description class, keyword paragraph |
//! | brand | brand class, `product:brand`, vendor default |
//! | series_name | series/collection class, breadcrumb tail, `product:category` (then normalized) |
//! | year_released | year element, title, description (range checked) |
//! | sku | "Item number:" label scan, SKU class, `product:retailer_item_id`, `product:product_id` |

use scraper::Html;

use super::text::{self, clean_sku, find_year, normalize_series};
use super::{element_text, first_text, meta_content, next_element_sibling, selector};
use super::{Cascade, ExtractionContext};
use crate::models::ScrapedRecord;

/// Shortest accepted "About this product" block, in characters
pub const MIN_ABOUT_SECTION_CHARS: usize = 20;

/// Run every field cascade over `html`
///
/// Pure: the same HTML and context always produce the same record.
pub fn extract_product(html: &str, ctx: &ExtractionContext) -> ScrapedRecord {
    let document = Html::parse_document(html);
    let doc = &document;

    let title = Cascade::new("title")
        .then("product_title_heading", || product_title_heading(doc))
        .then("first_heading", || first_heading(doc))
        .then("product_title_class", || product_title_class(doc))
        .then("og_title", || og_title(doc))
        .then("meta_title", || meta_title(doc))
        .run();

    let description = Cascade::new("description")
        .then("og_description", || og_description(doc))
        .then("meta_description", || meta_description(doc))
        .then("about_section", || about_section(doc))
        .then("description_class", || description_class(doc))
        .then("keyword_paragraph", || keyword_paragraph(doc))
        .run();

    let brand = Cascade::new("brand")
        .then("brand_class", || brand_class(doc))
        .then("brand_meta", || brand_meta(doc))
        .then("vendor_default", || text::non_empty(&ctx.default_brand))
        .run();

    let series_name = Cascade::new("series_name")
        .then("series_class", || series_class(doc))
        .then("breadcrumb_tail", || breadcrumb_tail(doc))
        .then("category_meta", || category_meta(doc))
        .run()
        .and_then(|raw| normalize_series(&raw));

    let year_released = Cascade::new("year_released")
        .then("year_element", || {
            year_element(doc).and_then(|t| find_year(&t, ctx.current_year))
        })
        .then("title", || {
            title.as_deref().and_then(|t| find_year(t, ctx.current_year))
        })
        .then("description", || {
            description
                .as_deref()
                .and_then(|d| find_year(d, ctx.current_year))
        })
        .run();

    let sku = Cascade::new("sku")
        .then("item_number_label", || item_number_label(doc))
        .then("sku_class", || sku_class(doc))
        .then("retailer_item_id", || retailer_item_id(doc))
        .then("product_id", || product_id(doc))
        .run()
        .map(clean_sku);

    ScrapedRecord {
        title,
        description,
        brand,
        series_name,
        year_released,
        sku,
    }
    .normalized()
}

// ---------------------------------------------------------------------------
// title
// ---------------------------------------------------------------------------

pub fn product_title_heading(doc: &Html) -> Option<String> {
    first_text(
        doc,
        r#"h1[data-testid="product-title"], h1.product-title, h1.product-name"#,
    )
}

pub fn first_heading(doc: &Html) -> Option<String> {
    first_text(doc, "h1")
}

pub fn product_title_class(doc: &Html) -> Option<String> {
    first_text(
        doc,
        r#".product-title, [class*="product-title"], [class*="ProductTitle"], [data-testid="product-title"]"#,
    )
}

pub fn og_title(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="og:title"]"#)
}

pub fn meta_title(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[name="title"]"#)
}

// ---------------------------------------------------------------------------
// description
// ---------------------------------------------------------------------------

pub fn og_description(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="og:description"]"#)
}

pub fn meta_description(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[name="description"]"#)
}

/// Paragraph or div right after a heading mentioning "about" and "product"
pub fn about_section(doc: &Html) -> Option<String> {
    let headings = selector("h2, h3, h4")?;

    doc.select(&headings).find_map(|heading| {
        let label = element_text(&heading).to_lowercase();
        if !(label.contains("about") && label.contains("product")) {
            return None;
        }
        let next = next_element_sibling(&heading)?;
        if !matches!(next.value().name(), "p" | "div") {
            return None;
        }
        let body = text::non_empty(&element_text(&next))?;
        (body.chars().count() >= MIN_ABOUT_SECTION_CHARS).then_some(body)
    })
}

pub fn description_class(doc: &Html) -> Option<String> {
    first_text(
        doc,
        r#"[class*="product-description"], [class*="product-details"], [data-testid="product-description"]"#,
    )
    .or_else(|| first_text(doc, r#".description, [class*="Description"]"#))
}

/// First paragraph that reads like ornament marketing copy
pub fn keyword_paragraph(doc: &Html) -> Option<String> {
    let paragraphs = selector("p")?;
    doc.select(&paragraphs)
        .map(|p| element_text(&p))
        .find(|t| t.contains("Celebrate") || t.contains("ornament"))
        .and_then(|t| text::non_empty(&t))
}

// ---------------------------------------------------------------------------
// brand
// ---------------------------------------------------------------------------

pub fn brand_class(doc: &Html) -> Option<String> {
    first_text(doc, r#".brand, .product-brand, [data-testid="brand"]"#)
}

pub fn brand_meta(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="product:brand"]"#)
}

// ---------------------------------------------------------------------------
// series_name
// ---------------------------------------------------------------------------

pub fn series_class(doc: &Html) -> Option<String> {
    first_text(
        doc,
        r#".series, .collection, .product-series, [data-testid="series"], [class*="series"], [class*="Series"]"#,
    )
}

/// Last `/`-separated segment of the breadcrumb trail
///
/// Text of every breadcrumb-like element is concatenated, so nested matches
/// repeat; [`normalize_series`] removes the echo afterwards. A trail with a
/// single segment names no category and is a miss.
pub fn breadcrumb_tail(doc: &Html) -> Option<String> {
    let crumbs = selector(
        r#"[class*="breadcrumb"], nav[aria-label*="breadcrumb"], .breadcrumbs"#,
    )?;
    let trail: String = doc.select(&crumbs).map(|el| element_text(&el)).collect();

    let parts: Vec<&str> = trail
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() > 1 {
        parts.last().map(|p| p.to_string())
    } else {
        None
    }
}

pub fn category_meta(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="product:category"]"#)
}

// ---------------------------------------------------------------------------
// year_released
// ---------------------------------------------------------------------------

pub fn year_element(doc: &Html) -> Option<String> {
    first_text(doc, ".year, .release-year, .product-year")
}

// ---------------------------------------------------------------------------
// sku
// ---------------------------------------------------------------------------

/// Scan elements in document order for an "Item number:" label
///
/// The value is read from the labelled text itself, or failing that from the
/// label element's next sibling when that sibling is a bare SKU token.
pub fn item_number_label(doc: &Html) -> Option<String> {
    let all = selector("*")?;

    doc.select(&all).find_map(|element| {
        let content = element_text(&element);
        if !text::has_item_number_label(&content) {
            return None;
        }
        text::sku_from_label(&content).or_else(|| {
            let sibling = next_element_sibling(&element)?;
            let value = element_text(&sibling);
            let value = value.trim();
            text::is_sku_token(value).then(|| value.to_string())
        })
    })
}

pub fn sku_class(doc: &Html) -> Option<String> {
    first_text(
        doc,
        r#".sku, .product-sku, [data-testid="sku"], .product-number, [class*="item-number"], [class*="ItemNumber"]"#,
    )
}

pub fn retailer_item_id(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="product:retailer_item_id"]"#)
}

pub fn product_id(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="product:product_id"]"#)
}
