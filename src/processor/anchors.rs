//! Heading scan and anchor identifier generation.
//!
//! Each markdown or HTML heading gets a slugified identifier; duplicate
//! slugs are disambiguated with a numeric suffix so every identifier in
//! one document is unique. Headings are also linked into a parent/children
//! tree by nesting level, built with a monotonic stack over the flat list.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// `# Heading` markdown marker at the start of a line
static MD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$")
        .unwrap_or_else(|e| panic!("markdown heading regex: {e}"))
});

/// `<h1>..</h1>` through `<h6>..</h6>` HTML heading
static HTML_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>")
        .unwrap_or_else(|e| panic!("html heading regex: {e}"))
});

static TAG_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("tag strip regex: {e}")));

/// One heading in the document, addressable by its generated identifier.
///
/// `parent` and `children` index into the owning [`generate_anchors`]
/// result, so the tree needs no recursive ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Generated identifier, unique within the document
    pub id: String,
    /// Heading text with markup stripped
    pub title: String,
    /// Nesting level, 1 through 6
    pub level: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Scan headings and build the anchor list with its nesting tree.
///
/// Anchors appear in document order. The parent of each heading is the
/// most recent heading with a strictly shallower level.
#[must_use]
pub fn generate_anchors(content: &str) -> Vec<Anchor> {
    let mut headings: Vec<(usize, usize, String)> = Vec::new();

    for caps in MD_HEADING_RE.captures_iter(content) {
        if let (Some(whole), Some(hashes), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) {
            headings.push((whole.start(), hashes.as_str().len(), title.as_str().to_string()));
        }
    }
    for caps in HTML_HEADING_RE.captures_iter(content) {
        if let (Some(whole), Some(level), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2)) {
            let title = TAG_STRIP_RE.replace_all(inner.as_str(), "").trim().to_string();
            let level = level.as_str().parse::<usize>().unwrap_or(6);
            headings.push((whole.start(), level, title));
        }
    }
    headings.sort_by_key(|(pos, _, _)| *pos);

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut anchors: Vec<Anchor> = Vec::with_capacity(headings.len());
    // Stack of (level, index); entries are strictly increasing in level
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for (_, level, title) in headings {
        let id = unique_slug(&title, &mut seen);

        while stack.last().is_some_and(|&(l, _)| l >= level) {
            stack.pop();
        }
        let parent = stack.last().map(|&(_, idx)| idx);

        let index = anchors.len();
        anchors.push(Anchor {
            id,
            title,
            level,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            anchors[p].children.push(index);
        }
        stack.push((level, index));
    }

    anchors
}

/// Identifier set for anchor reachability checks
#[must_use]
pub fn anchor_id_set(content: &str) -> HashSet<String> {
    generate_anchors(content)
        .into_iter()
        .map(|anchor| anchor.id)
        .collect()
}

/// Slugify a heading title, suffixing `-2`, `-3`, ... on repeats
fn unique_slug(title: &str, seen: &mut HashMap<String, usize>) -> String {
    let base = slugify(title);
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{base}-{count}")
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_and_levels_markdown_headings() {
        let anchors = generate_anchors("# Getting Started\n\n## First Steps!\n");
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].id, "getting-started");
        assert_eq!(anchors[0].level, 1);
        assert_eq!(anchors[1].id, "first-steps");
        assert_eq!(anchors[1].level, 2);
    }

    #[test]
    fn duplicate_titles_get_numeric_suffixes() {
        let anchors = generate_anchors("# Setup\n## Setup\n### Setup\n");
        let ids: Vec<&str> = anchors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-2", "setup-3"]);
    }

    #[test]
    fn builds_parent_children_tree_by_level() {
        let anchors = generate_anchors("# A\n## B\n### C\n## D\n# E\n");
        assert_eq!(anchors[0].parent, None);
        assert_eq!(anchors[1].parent, Some(0));
        assert_eq!(anchors[2].parent, Some(1));
        assert_eq!(anchors[3].parent, Some(0));
        assert_eq!(anchors[4].parent, None);
        assert_eq!(anchors[0].children, vec![1, 3]);
        assert_eq!(anchors[1].children, vec![2]);
    }

    #[test]
    fn skipping_levels_attaches_to_nearest_shallower_heading() {
        let anchors = generate_anchors("# A\n### C\n## B\n");
        assert_eq!(anchors[1].parent, Some(0));
        // The h2 pops the deeper h3 and attaches to the h1
        assert_eq!(anchors[2].parent, Some(0));
    }

    #[test]
    fn html_headings_are_recognized() {
        let anchors = generate_anchors("<h2>API <code>Reference</code></h2>");
        assert_eq!(anchors[0].id, "api-reference");
        assert_eq!(anchors[0].title, "API Reference");
        assert_eq!(anchors[0].level, 2);
    }

    #[test]
    fn id_set_contains_every_generated_identifier() {
        let ids = anchor_id_set("# Intro\n# Intro\n");
        assert!(ids.contains("intro"));
        assert!(ids.contains("intro-2"));
    }
}
