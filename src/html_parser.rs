use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, parse_document, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use select::document::Document;
use select::predicate::Name;

use crate::resolver::ReferenceOrigin;

const PLACEHOLDER: &str = "#";

/// Element families the mirror rewrites, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Image,
    Script,
    Stylesheet,
}

impl ElementKind {
    pub const ORDER: [ElementKind; 3] = [
        ElementKind::Image,
        ElementKind::Script,
        ElementKind::Stylesheet,
    ];

    fn tag(self) -> &'static str {
        match self {
            ElementKind::Image => "img",
            ElementKind::Script => "script",
            ElementKind::Stylesheet => "link",
        }
    }

    fn attribute(self) -> &'static str {
        match self {
            ElementKind::Image | ElementKind::Script => "src",
            ElementKind::Stylesheet => "href",
        }
    }

    pub fn origin(self) -> ReferenceOrigin {
        match self {
            ElementKind::Image => ReferenceOrigin::ImageSource,
            ElementKind::Script => ReferenceOrigin::ScriptSource,
            ElementKind::Stylesheet => ReferenceOrigin::StylesheetLink,
        }
    }
}

/// One rewritable element reference, addressed by its position among the
/// elements with the same tag so the rewrite pass can find it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub index: usize,
    pub reference: String,
}

/// Counts used by the precount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub images: usize,
    pub scripts: usize,
    pub stylesheets: usize,
    pub stylesheet_hrefs: Vec<String>,
}

fn is_stylesheet_rel(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Scans markup for the asset elements the precount cares about.
pub fn summarize(html: &str) -> PageSummary {
    let document = Document::from(html);
    let mut summary = PageSummary::default();

    summary.images = document
        .find(Name("img"))
        .filter(|img| non_empty(img.attr("src")).is_some())
        .count();

    summary.scripts = document
        .find(Name("script"))
        .filter(|script| non_empty(script.attr("src")).is_some())
        .count();

    for link in document.find(Name("link")) {
        if !link.attr("rel").is_some_and(is_stylesheet_rel) {
            continue;
        }
        summary.stylesheets += 1;
        if let Some(href) = non_empty(link.attr("href")) {
            summary.stylesheet_hrefs.push(href.to_string());
        }
    }

    summary
}

/// Parsed page whose element references can be rewritten in place.
///
/// Holds `Rc` handles, so it must not be kept alive across an `.await`.
pub struct MarkupDocument {
    dom: RcDom,
}

impl MarkupDocument {
    pub fn parse(html: &str) -> std::io::Result<Self> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(Self { dom })
    }

    /// References to download, images first, then scripts, then stylesheets.
    pub fn references(&self) -> Vec<ElementRef> {
        let mut refs = Vec::new();
        for kind in ElementKind::ORDER {
            for (index, element) in self.elements(kind.tag()).iter().enumerate() {
                if kind == ElementKind::Stylesheet
                    && !get_attr(element, "rel").is_some_and(|rel| is_stylesheet_rel(&rel))
                {
                    continue;
                }
                if let Some(reference) = get_attr(element, kind.attribute()) {
                    if !reference.trim().is_empty() {
                        refs.push(ElementRef {
                            kind,
                            index,
                            reference,
                        });
                    }
                }
            }
        }
        refs
    }

    /// Points every `<a href>` at the placeholder.
    pub fn strip_links(&self) {
        for anchor in self.elements("a") {
            if get_attr(&anchor, "href").is_some() {
                set_attr(&anchor, "href", PLACEHOLDER);
            }
        }
    }

    /// Points every `<form>` submission at the placeholder.
    pub fn strip_forms(&self) {
        for form in self.elements("form") {
            set_attr(&form, "action", PLACEHOLDER);
        }
    }

    pub fn rewrite(&self, element: &ElementRef, local_path: &str) {
        if let Some(handle) = self.elements(element.kind.tag()).get(element.index) {
            set_attr(handle, element.kind.attribute(), local_path);
        }
    }

    pub fn serialize(&self) -> std::io::Result<String> {
        let document: SerializableHandle = self.dom.document.clone().into();
        let mut bytes = Vec::new();
        serialize(&mut bytes, &document, SerializeOpts::default())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn elements(&self, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_elements(&self.dom.document, tag, &mut found);
        found
    }
}

fn collect_elements(handle: &Handle, tag: &str, found: &mut Vec<Handle>) {
    if let NodeData::Element { ref name, .. } = handle.data {
        if &*name.local == tag {
            found.push(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        collect_elements(child, tag, found);
    }
}

fn get_attr(handle: &Handle, attribute: &str) -> Option<String> {
    match handle.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attribute)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn set_attr(handle: &Handle, attribute: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == attribute) {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attribute)),
                value: StrTendril::from_slice(value),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
            <head>
                <link rel="stylesheet" href="/style.css">
                <link rel="icon" href="/favicon.ico">
                <link rel="Alternate StyleSheet" href="/alt.css">
                <link rel="stylesheet">
                <script src="/script.js"></script>
                <script>inline()</script>
            </head>
            <body>
                <img src="/image.jpg" alt="test">
                <img alt="no source">
                <img src="https://cdn.example.com/banner.png">
                <a href="/page">Link</a>
                <form action="/submit"></form>
            </body>
        </html>
    "#;

    #[test]
    fn test_summary_counts() {
        let summary = summarize(PAGE);
        assert_eq!(summary.images, 2);
        assert_eq!(summary.scripts, 1);
        assert_eq!(summary.stylesheets, 3);
        assert_eq!(summary.stylesheet_hrefs, vec!["/style.css", "/alt.css"]);
    }

    #[test]
    fn test_references_in_processing_order() {
        let document = MarkupDocument::parse(PAGE).unwrap();
        let refs: Vec<(ElementKind, usize, String)> = document
            .references()
            .into_iter()
            .map(|r| (r.kind, r.index, r.reference))
            .collect();

        assert_eq!(
            refs,
            vec![
                (ElementKind::Image, 0, "/image.jpg".to_string()),
                (ElementKind::Image, 2, "https://cdn.example.com/banner.png".to_string()),
                (ElementKind::Script, 0, "/script.js".to_string()),
                (ElementKind::Stylesheet, 0, "/style.css".to_string()),
                (ElementKind::Stylesheet, 2, "/alt.css".to_string()),
            ]
        );
    }

    #[test]
    fn test_rewrite_and_strip() {
        let document = MarkupDocument::parse(PAGE).unwrap();
        let refs = document.references();
        document.rewrite(&refs[1], "images/banner.png");
        document.strip_links();
        document.strip_forms();

        let html = document.serialize().unwrap();
        assert!(html.contains(r#"src="images/banner.png""#));
        assert!(html.contains(r#"src="/image.jpg""#));
        assert!(html.contains(r##"<a href="#">"##));
        assert!(html.contains(r##"action="#""##));
        assert!(!html.contains("/submit"));
    }

    #[test]
    fn test_strip_forms_adds_missing_action() {
        let document = MarkupDocument::parse("<html><body><form method=\"post\"></form></body></html>").unwrap();
        document.strip_forms();

        let html = document.serialize().unwrap();
        assert!(html.contains(r##"<form method="post" action="#">"##));
    }
}
