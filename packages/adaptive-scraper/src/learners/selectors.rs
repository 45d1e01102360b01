//! Minimal selector matching over the rendered node tree.
//!
//! Covers exactly the grammar the candidate lists use: a tag name, an
//! exact class (`.product-card`), attribute presence (`[data-price]`),
//! attribute substring (`[class*='product']`, `img[src*='product']`),
//! tag+class combinations, and a single descendant hop (`h2 a`).
//! `class` behaves as an attribute whose value is the joined class list.

use crate::types::page::PageNode;

#[derive(Debug, Clone, Default)]
struct AttrMatch {
    name: String,
    /// `None` means presence, `Some(s)` means substring match
    contains: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SelStep {
    tag: Option<String>,
    class: Option<String>,
    attr: Option<AttrMatch>,
}

impl SelStep {
    fn matches(&self, node: &PageNode) -> bool {
        if let Some(tag) = &self.tag {
            if node.tag != *tag {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !node.has_class(class) {
                return false;
            }
        }
        if let Some(attr) = &self.attr {
            match node.attr(&attr.name) {
                None => return false,
                Some(value) => {
                    if let Some(needle) = &attr.contains {
                        if !value.contains(needle.as_str()) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

/// A parsed selector: one or more whitespace-separated descendant steps.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    steps: Vec<SelStep>,
}

impl Selector {
    /// Parse a selector string; `None` for anything outside the grammar.
    pub fn parse(source: &str) -> Option<Self> {
        let steps: Option<Vec<SelStep>> = source
            .split_whitespace()
            .map(Self::parse_step)
            .collect();
        let steps = steps?;
        if steps.is_empty() {
            return None;
        }
        Some(Self { steps })
    }

    fn parse_step(step: &str) -> Option<SelStep> {
        let mut out = SelStep::default();

        let tag_end = step.find(['.', '[']).unwrap_or(step.len());
        if tag_end > 0 {
            let tag = &step[..tag_end];
            if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return None;
            }
            out.tag = Some(tag.to_ascii_lowercase());
        }

        let rest = &step[tag_end..];
        if rest.is_empty() {
            return out.tag.is_some().then_some(out);
        }

        if let Some(class) = rest.strip_prefix('.') {
            if class.is_empty() || class.contains(['.', '[']) {
                return None;
            }
            out.class = Some(class.to_owned());
            return Some(out);
        }

        let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
        if inner.is_empty() {
            return None;
        }
        let attr = match inner.split_once("*=") {
            Some((name, value)) => AttrMatch {
                name: name.trim().to_owned(),
                contains: Some(value.trim().trim_matches(['\'', '"']).to_owned()),
            },
            None => AttrMatch {
                name: inner.trim().to_owned(),
                contains: None,
            },
        };
        out.attr = Some(attr);
        Some(out)
    }

    /// All descendants of `root` matched by the full step chain, in
    /// document order.
    pub fn select_all<'a>(&self, root: &'a PageNode) -> Vec<&'a PageNode> {
        let mut current: Vec<&PageNode> = vec![root];
        for step in &self.steps {
            let mut next: Vec<&PageNode> = Vec::new();
            for scope in current {
                scope.visit(&mut |node, _| {
                    if !std::ptr::eq(node, scope)
                        && step.matches(node)
                        && !next.iter().any(|seen| std::ptr::eq(*seen, node))
                    {
                        next.push(node);
                    }
                });
            }
            current = next;
        }
        current
    }

    /// First match under `root`, if any.
    pub fn select_first<'a>(&self, root: &'a PageNode) -> Option<&'a PageNode> {
        self.select_all(root).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> PageNode {
        PageNode::new("body").with_children([
            PageNode::new("div")
                .with_class("product-card")
                .with_attr("data-product-id", "p1")
                .with_children([
                    PageNode::new("h3")
                        .with_child(PageNode::new("a").with_attr("href", "/p/1").with_text("Fridge")),
                    PageNode::new("span").with_class("price-tag").with_text("$499"),
                    PageNode::new("img").with_attr("src", "/img/product-1.jpg"),
                ]),
            PageNode::new("div")
                .with_class("product-card")
                .with_attr("data-product-id", "p2")
                .with_children([
                    PageNode::new("h3")
                        .with_child(PageNode::new("a").with_attr("href", "/p/2").with_text("Washer")),
                    PageNode::new("span").with_class("price-tag").with_text("$899"),
                ]),
            PageNode::new("div").with_class("footer"),
        ])
    }

    #[test]
    fn test_class_selector() {
        let sel = Selector::parse(".product-card").unwrap();
        assert_eq!(sel.select_all(&listing()).len(), 2);
    }

    #[test]
    fn test_attr_presence_selector() {
        let sel = Selector::parse("[data-product-id]").unwrap();
        assert_eq!(sel.select_all(&listing()).len(), 2);
    }

    #[test]
    fn test_attr_substring_selector() {
        let page = listing();
        let sel = Selector::parse("div[class*='product']").unwrap();
        assert_eq!(sel.select_all(&page).len(), 2);

        let sel = Selector::parse("[class*='price']").unwrap();
        assert_eq!(sel.select_all(&page).len(), 2);

        let sel = Selector::parse("img[src*='product']").unwrap();
        assert_eq!(sel.select_all(&page).len(), 1);
    }

    #[test]
    fn test_descendant_selector() {
        let page = listing();
        let sel = Selector::parse("h2 a").unwrap();
        assert!(sel.select_all(&page).is_empty());

        let sel = Selector::parse("h3 a").unwrap();
        let hits = sel.select_all(&page);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Fridge");
    }

    #[test]
    fn test_scoped_to_container() {
        let page = listing();
        let container = Selector::parse(".product-card")
            .unwrap()
            .select_first(&page)
            .unwrap();
        let sel = Selector::parse("a[href]").unwrap();
        let hits = sel.select_all(container);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attr("href").as_deref(), Some("/p/1"));
    }

    #[test]
    fn test_rejects_unsupported_grammar() {
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("div > a").is_none());
        assert!(Selector::parse("a:hover").is_none());
    }
}
