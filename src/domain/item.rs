/// An entry as it appears in the fetched document, before ingestion.
///
/// `pub_date` is kept verbatim; interpreting it is the ingester's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

/// Parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub items: Vec<RawItem>,
}

impl RawItem {
    pub fn new(title: &str, link: &str) -> Self {
        Self {
            title: title.to_string(),
            link: Some(link.to_string()),
            description: None,
            pub_date: None,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_with_title() {
        let item = RawItem::new("My Article", "https://example.com/a");
        assert_eq!(item.display_title(), "My Article");
    }

    #[test]
    fn test_display_title_without_title() {
        let item = RawItem::new("", "https://example.com/a");
        assert_eq!(item.display_title(), "(Untitled)");
    }
}
