use regex::Regex;
use std::sync::LazyLock;

static ITEM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"item:(\d+):.*?\[([^\]]+)\]").expect("item link pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub item_id: i64,
    pub item_name: String,
}

/// `None` for empty text and other link types. The name ends at the first `]`.
pub fn parse_item_link(link: &str) -> Option<ParsedLink> {
    let caps = ITEM_LINK.captures(link)?;
    let item_id = caps[1].parse().ok()?;
    Some(ParsedLink {
        item_id,
        item_name: caps[2].to_string(),
    })
}
