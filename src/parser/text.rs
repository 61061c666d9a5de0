use scraper::ElementRef;

/// Text nodes that are direct children of `el`, trimmed, empties dropped.
/// Mirrors a `::text` selection on the element itself, so nested markup
/// (e.g. a `<strong>` label inside a value cell) does not leak in.
pub fn direct_text(el: ElementRef) -> Vec<String> {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every text fragment in the subtree of `el`, trimmed, empties dropped.
pub fn text_fragments(el: ElementRef) -> Vec<String> {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
