//! EDGAR RSS filing feeds

use serde::Serialize;

use super::{child_text, parse_xml};
use crate::error::Result;

/// One filing announced in a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssItem {
    pub title: String,
    /// Company, form type, filing date, CIK and period, one per line
    pub tooltip: String,
    pub description: String,
    pub pub_date: String,
    /// URL of the filing's instance document
    pub instance_url: String,
}

/// Items that name an instance document; others are skipped
pub fn parse_items(container: &str, xml: &str) -> Result<Vec<RssItem>> {
    let document = parse_xml(container, xml)?;
    let items = document
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "item")
        .filter_map(|item| {
            let filing = item
                .descendants()
                .find(|n| n.is_element() && n.tag_name().name() == "xbrlFiling");
            let field = |name: &str| {
                filing
                    .and_then(|f| child_text(f, name))
                    .unwrap_or_default()
            };
            let instance_url = item
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "xbrlFile")
                .find(|n| {
                    let description = attribute(*n, "description").to_ascii_uppercase();
                    description.ends_with("INSTANCE DOCUMENT")
                        || description.ends_with("INSTANCE FILE")
                })
                .map(|n| attribute(n, "url"))
                .filter(|url| !url.is_empty())?;

            Some(RssItem {
                title: child_text(item, "title").unwrap_or_default(),
                tooltip: format!(
                    "{}\n {}\n {}\n {}\n {}",
                    field("companyName"),
                    field("formType"),
                    field("filingDate"),
                    field("cikNumber"),
                    field("period"),
                ),
                description: child_text(item, "description").unwrap_or_default(),
                pub_date: child_text(item, "pubDate").unwrap_or_default(),
                instance_url,
            })
        })
        .collect();
    Ok(items)
}

fn attribute(node: roxmltree::Node<'_, '_>, local_name: &str) -> String {
    node.attributes()
        .find(|a| a.name() == local_name)
        .map(|a| a.value().trim().to_string())
        .unwrap_or_default()
}
