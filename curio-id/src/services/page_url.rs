//! Page-URL disambiguation for image search hits
//!
//! Image search reports several URLs per hit and any of them may point at the
//! image file rather than the product page. The first candidate that does not
//! look like an image resource wins. When all of them do, a SKU-like token is
//! mined from the URLs and turned into a vendor product URL; failing that the
//! first candidate is kept as is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use curio_common::config::VendorConfig;

static IMAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg)(\?|$)").expect("valid extension regex")
});

static PRODUCTS_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)products/([A-Z0-9]+)").expect("valid products regex"));

static SKU_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([A-Z0-9]{8,})/").expect("valid segment regex"));

/// Where the resolved page URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageUrlSource {
    ContextLink,
    ImageLink,
    Link,
    /// Built from a vendor URL template and a mined SKU token
    Synthesized,
    /// Every candidate looked like an image and no SKU token was found
    ImageFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPageUrl {
    pub url: String,
    pub source: PageUrlSource,
}

/// True if `url` looks like an image file or an asset path
pub fn looks_like_image(url: &str) -> bool {
    IMAGE_EXTENSION.is_match(url) || url.contains("/images/") || url.contains("/static/")
}

/// SKU-like token in an asset URL
///
/// `.../products/5QXD7292` and `.../demandware.static/.../5QXD7292/...` both
/// yield `5QXD7292`.
pub fn extract_sku_token(url: &str) -> Option<String> {
    PRODUCTS_SEGMENT
        .captures(url)
        .or_else(|| SKU_SEGMENT.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Choose the product page URL for one search hit
///
/// Returns `None` only when the hit carries no URL at all.
pub fn resolve_page_url(
    context_link: Option<&str>,
    image_link: Option<&str>,
    link: Option<&str>,
    vendors: &VendorConfig,
) -> Option<ResolvedPageUrl> {
    let candidates: Vec<(&str, PageUrlSource)> = [
        (context_link, PageUrlSource::ContextLink),
        (image_link, PageUrlSource::ImageLink),
        (link, PageUrlSource::Link),
    ]
    .into_iter()
    .filter_map(|(url, source)| {
        let url = url?.trim();
        (!url.is_empty()).then_some((url, source))
    })
    .collect();

    let (first, _) = *candidates.first()?;

    if let Some((url, source)) = candidates.iter().find(|(url, _)| !looks_like_image(url)) {
        return Some(ResolvedPageUrl {
            url: url.to_string(),
            source: *source,
        });
    }

    tracing::warn!(url = %first, "Search hit only has image URLs");

    let synthesized = extract_sku_token(first).and_then(|sku| {
        let urls = vendors.product_urls_for(&sku);
        tracing::debug!(sku = %sku, candidates = ?urls, "Synthesizing product URL");
        urls.into_iter().next()
    });

    Some(match synthesized {
        Some(url) => ResolvedPageUrl {
            url,
            source: PageUrlSource::Synthesized,
        },
        None => ResolvedPageUrl {
            url: first.to_string(),
            source: PageUrlSource::ImageFallback,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendors() -> VendorConfig {
        VendorConfig::default()
    }

    #[test]
    fn test_looks_like_image() {
        assert!(looks_like_image("https://x.com/a/owl.JPG"));
        assert!(looks_like_image("https://x.com/a/owl.webp?sw=200"));
        assert!(looks_like_image("https://x.com/images/owl"));
        assert!(looks_like_image("https://x.com/on/demandware.static/-/static/owl"));
        assert!(!looks_like_image("https://x.com/on/demandware.static/owl"));
        assert!(!looks_like_image("https://www.hallmark.com/products/1KOB1234"));
        assert!(!looks_like_image("https://x.com/owl.jpgs"));
    }

    #[test]
    fn test_context_link_preferred() {
        let resolved = resolve_page_url(
            Some("https://www.hallmark.com/ornaments/snowy-owl-1KOB1234.html"),
            Some("https://www.hallmark.com/img/owl.jpg"),
            Some("https://www.hallmark.com/img/owl.jpg"),
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::ContextLink);
        assert_eq!(
            resolved.url,
            "https://www.hallmark.com/ornaments/snowy-owl-1KOB1234.html"
        );
    }

    #[test]
    fn test_skips_image_like_candidates() {
        let resolved = resolve_page_url(
            Some("https://cdn.example.com/static/owl"),
            Some("https://cdn.example.com/owl.png"),
            Some("https://www.ornamentmall.com/item/owl"),
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::Link);
        assert_eq!(resolved.url, "https://www.ornamentmall.com/item/owl");
    }

    #[test]
    fn test_empty_candidates_are_ignored() {
        let resolved = resolve_page_url(
            Some("  "),
            None,
            Some("https://hookedonhallmark.com/owl"),
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::Link);
        assert_eq!(resolve_page_url(None, Some(""), None, &vendors()), None);
    }

    #[test]
    fn test_synthesizes_from_sku_segment() {
        let resolved = resolve_page_url(
            Some("https://www.hallmark.com/on/demandware.static/-/Sites/5QXD7292/owl.jpg"),
            None,
            Some("https://www.hallmark.com/images/owl.jpg"),
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::Synthesized);
        assert_eq!(resolved.url, "https://www.hallmark.com/products/5QXD7292");
    }

    #[test]
    fn test_sku_token_patterns() {
        assert_eq!(
            extract_sku_token("https://x.com/Products/1kob1234/owl.jpg").as_deref(),
            Some("1kob1234")
        );
        assert_eq!(
            extract_sku_token("https://x.com/img/5QXD7292/owl.jpg").as_deref(),
            Some("5QXD7292")
        );
        assert_eq!(extract_sku_token("https://x.com/img/short/owl.jpg"), None);
    }

    #[test]
    fn test_sku_only_read_from_first_candidate() {
        let resolved = resolve_page_url(
            Some("https://cdn.example.com/owl.jpg"),
            None,
            Some("https://www.hallmark.com/images/5QXD7292/owl.jpg"),
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::ImageFallback);
        assert_eq!(resolved.url, "https://cdn.example.com/owl.jpg");
    }

    #[test]
    fn test_image_url_kept_without_sku() {
        let resolved = resolve_page_url(
            Some("https://cdn.example.com/owl.jpg"),
            Some("https://cdn.example.com/owl-large.jpg"),
            None,
            &vendors(),
        )
        .unwrap();
        assert_eq!(resolved.source, PageUrlSource::ImageFallback);
        assert_eq!(resolved.url, "https://cdn.example.com/owl.jpg");
    }
}
