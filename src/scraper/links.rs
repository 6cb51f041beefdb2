use scraper::{Html, Selector};
use std::collections::HashSet;

/// Every `<a>` target in document order. Anchors without an `href` yield `None`.
pub fn extract_links(html: &str) -> Vec<Option<String>> {
    let doc = Html::parse_document(html);
    let Ok(a_sel) = Selector::parse("a") else {
        return Vec::new();
    };

    doc.select(&a_sel)
        .map(|a| a.value().attr("href").map(|h| h.trim().to_string()))
        .collect()
}

/// Ordered set of link targets: first-seen order, duplicates skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `url` was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    /// Add every link containing all of `needles`.
    pub fn extend_matching<I>(&mut self, links: I, needles: &[&str]) -> usize
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut added = 0;
        for link in links.into_iter().flatten() {
            if needles.iter().all(|n| link.contains(n)) && self.insert(link) {
                added += 1;
            }
        }
        added
    }

    /// Remove `url`, returning the position it held.
    pub fn remove(&mut self, url: &str) -> Option<usize> {
        if !self.seen.remove(url) {
            return None;
        }
        let pos = self.order.iter().position(|u| u == url)?;
        self.order.remove(pos);
        Some(pos)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_keeps_order_and_missing_href() {
        let html = r#"
            <html><body>
                <a href="/b">B</a>
                <a name="anchor">no target</a>
                <a href=" /a ">A</a>
                <a href="/b">B again</a>
            </body></html>
        "#;
        let links = extract_links(html);
        assert_eq!(
            links,
            vec![
                Some("/b".to_string()),
                None,
                Some("/a".to_string()),
                Some("/b".to_string()),
            ]
        );
    }

    #[test]
    fn test_url_set_dedupes_first_seen() {
        let mut set = UrlSet::new();
        assert!(set.insert("/x"));
        assert!(set.insert("/y"));
        assert!(!set.insert("/x"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["/x", "/y"]);
    }

    #[test]
    fn test_extend_matching_requires_all_needles() {
        let links = vec![
            Some("/en/results.html/2021/races/1064/bahrain/race-result.html".to_string()),
            None,
            Some("/en/results.html/2020/races/1045/bahrain/race-result.html".to_string()),
            Some("/en/results.html/2021/races/1064/bahrain/race-result.html".to_string()),
            Some("/en/results.html/2021/drivers.html".to_string()),
        ];
        let mut set = UrlSet::new();
        let added = set.extend_matching(links, &["2021", "race-result"]);
        assert_eq!(added, 1);
        assert_eq!(
            set.into_vec(),
            vec!["/en/results.html/2021/races/1064/bahrain/race-result.html"]
        );
    }

    #[test]
    fn test_remove_keeps_order_and_allows_reinsert() {
        let mut set = UrlSet::new();
        set.insert("/a");
        set.insert("/index");
        set.insert("/b");
        assert_eq!(set.remove("/index"), Some(1));
        assert_eq!(set.remove("/index"), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["/a", "/b"]);
        assert!(set.insert("/index"));
        assert_eq!(set.len(), 3);
    }
}
