//! Rendered pages as delivered by the page-fetcher collaborator.
//!
//! A `RenderedPage` carries the extracted text, a DOM-like node tree for
//! the structural learners, and (optionally) a screenshot for the visual
//! fallback. The engine never talks to a live browser itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A fully rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    /// Canonical URL of the page
    pub url: String,

    /// Visible text of the whole page
    pub text: String,

    /// DOM-like structure (root element, usually `body`)
    pub root: PageNode,

    /// Screenshot bytes, when the fetcher captured one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,

    /// When the page was rendered
    pub fetched_at: DateTime<Utc>,
}

impl RenderedPage {
    /// Create a page from a node tree; `text` is derived from the tree.
    pub fn new(url: impl Into<String>, root: PageNode) -> Self {
        let text = root.full_text();
        Self {
            url: url.into(),
            text,
            root,
            screenshot: None,
            fetched_at: Utc::now(),
        }
    }

    /// Attach a screenshot.
    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = Some(bytes);
        self
    }

    /// SHA-256 hash of the page text, for drift diagnostics.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// One element in the rendered DOM-like tree.
///
/// Deliberately smaller than a real DOM: tag, classes, attributes, the
/// element's direct text, an optional font-size hint, and children. That
/// is everything the learners consume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageNode {
    /// Lowercase tag name (`div`, `h2`, `a`, ...)
    pub tag: String,

    /// Class list, in document order
    #[serde(default)]
    pub classes: Vec<String>,

    /// Non-class attributes (`href`, `src`, `data-product-id`, ...)
    #[serde(default)]
    pub attrs: HashMap<String, String>,

    /// Direct text content of this element (children excluded)
    #[serde(default)]
    pub text: String,

    /// Computed font size in pixels, when the renderer exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Child elements
    #[serde(default)]
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Create an element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Add a class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set the direct text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the font-size hint.
    pub fn with_font_size(mut self, px: f32) -> Self {
        self.font_size = Some(px);
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = PageNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attribute lookup, with `class` resolving to the joined class list.
    pub fn attr(&self, key: &str) -> Option<String> {
        if key == "class" {
            if self.classes.is_empty() {
                return None;
            }
            return Some(self.classes.join(" "));
        }
        self.attrs.get(key).cloned()
    }

    /// Whether the class list contains `class` exactly.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// This element's text plus all descendant text, space-joined.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_owned());
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// Visit every element in the subtree together with its parent.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a PageNode, Option<&'a PageNode>)) {
        f(self, None);
        self.visit_children(f);
    }

    fn visit_children<'a>(&'a self, f: &mut dyn FnMut(&'a PageNode, Option<&'a PageNode>)) {
        for child in &self.children {
            f(child, Some(self));
            child.visit_children(f);
        }
    }

    /// All descendants (excluding `self`), depth-first.
    pub fn descendants(&self) -> Vec<&PageNode> {
        let mut out = Vec::new();
        self.visit_children(&mut |node, _| out.push(node));
        out
    }
}
