//! Nested diagnostics reports

use serde::{Deserialize, Serialize};

/// A line of routing diagnostics with nested detail lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    text: String,
    more: Vec<RoutingInfo>,
}

impl RoutingInfo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            more: Vec::new(),
        }
    }

    /// Append a nested entry
    pub fn add_more_info(&mut self, info: RoutingInfo) {
        self.more.push(info);
    }

    /// Builder form of [`add_more_info`](Self::add_more_info)
    pub fn with(mut self, info: RoutingInfo) -> Self {
        self.more.push(info);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[RoutingInfo] {
        &self.more
    }

    /// Find a direct child whose text starts with `prefix`
    pub fn child_starting_with(&self, prefix: &str) -> Option<&RoutingInfo> {
        self.more.iter().find(|c| c.text.starts_with(prefix))
    }

    fn write_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.text, indent = depth * 2)?;
        for child in &self.more {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for RoutingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_display() {
        let info = RoutingInfo::new("prophet @ n0").with(
            RoutingInfo::new("2 delivery prediction(s)")
                .with(RoutingInfo::new("n1 : 0.750000"))
                .with(RoutingInfo::new("n2 : 0.140625")),
        );

        let text = info.to_string();
        assert_eq!(
            text,
            "prophet @ n0\n  2 delivery prediction(s)\n    n1 : 0.750000\n    n2 : 0.140625\n"
        );
    }

    #[test]
    fn test_child_lookup() {
        let mut info = RoutingInfo::new("root");
        info.add_more_info(RoutingInfo::new("3 message(s)"));
        assert!(info.child_starting_with("3 message").is_some());
        assert!(info.child_starting_with("missing").is_none());
        assert_eq!(info.children().len(), 1);
    }
}
