use ego_tree::NodeRef;
use mirror_core::ResourceKind;
use mirror_logging::mirror_debug;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const DEFAULT_MAX_RESOURCES: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    pub url: Url,
    pub kind: ResourceKind,
}

/// Finds the stylesheets and external scripts a page references.
///
/// Results keep document order and are not deduplicated: a stylesheet linked
/// twice is fetched twice, matching the page's own structure.
pub struct ResourceDiscoverer {
    max_resources: usize,
}

impl ResourceDiscoverer {
    pub fn new() -> Self {
        Self::with_max_resources(DEFAULT_MAX_RESOURCES)
    }

    pub fn with_max_resources(max_resources: usize) -> Self {
        Self { max_resources }
    }

    pub fn discover(&self, markup: &str, page_url: &Url) -> Vec<DiscoveredResource> {
        let document = Html::parse_document(markup);
        let mut ctx = DiscoveryContext {
            base: document_base(&document, page_url),
            found: Vec::new(),
            max_resources: self.max_resources,
        };

        for child in document.root_element().children() {
            self.visit_node(child, &mut ctx);
        }

        mirror_debug!(
            "Discovered {} resources on {} (base {})",
            ctx.found.len(),
            page_url,
            ctx.base
        );
        ctx.found
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, ctx: &mut DiscoveryContext) {
        if ctx.is_full() {
            return;
        }
        if let Some(element) = ElementRef::wrap(node) {
            self.visit_element(element, ctx);
        }
        for child in node.children() {
            self.visit_node(child, ctx);
        }
    }

    fn visit_element(&self, element: ElementRef<'_>, ctx: &mut DiscoveryContext) {
        let el = element.value();
        match el.name() {
            "link" if is_stylesheet_rel(el.attr("rel")) => {
                if let Some(href) = el.attr("href") {
                    ctx.push(href, ResourceKind::Stylesheet);
                }
            }
            "script" => {
                if let Some(src) = el.attr("src") {
                    ctx.push(src, ResourceKind::Script);
                }
            }
            _ => {}
        }
    }
}

impl Default for ResourceDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

/// The first `<base href>` in the document, resolved against the page URL,
/// applies to every reference regardless of where it appears.
fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };
    document
        .select(&selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| !url.cannot_be_a_base())
        .unwrap_or_else(|| page_url.clone())
}

/// `rel` is a space-separated, case-insensitive token list.
fn is_stylesheet_rel(rel: Option<&str>) -> bool {
    rel.is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

/// Resolves a reference the way a browser does: absolute stays absolute,
/// `//host/x` takes the base scheme, anything else joins the base path.
/// Only fetchable http(s) results are kept.
fn resolve_reference(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let resolved = base.join(trimmed).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

struct DiscoveryContext {
    base: Url,
    found: Vec<DiscoveredResource>,
    max_resources: usize,
}

impl DiscoveryContext {
    fn is_full(&self) -> bool {
        self.found.len() >= self.max_resources
    }

    fn push(&mut self, reference: &str, kind: ResourceKind) {
        if self.is_full() {
            return;
        }
        match resolve_reference(reference, &self.base) {
            Some(url) => self.found.push(DiscoveredResource { url, kind }),
            None => mirror_debug!("Skipping unfetchable {} reference {:?}", kind, reference),
        }
    }
}
