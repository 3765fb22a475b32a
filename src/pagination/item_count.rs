//! Page info text and page size selector choices

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current position, as shown next to a page size selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn new(page: u32, total_pages: u32) -> Self {
        Self { page, total_pages }
    }

    /// Render with a caller-supplied formatter instead of the default `page/total`
    pub fn format_with<F>(&self, formatter: F) -> String
    where
        F: Fn(u32, u32) -> String,
    {
        formatter(self.page, self.total_pages)
    }
}

impl fmt::Display for PageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.page, self.total_pages)
    }
}

/// Page sizes offered to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSizeOptions(Vec<u32>);

impl Default for PageSizeOptions {
    fn default() -> Self {
        Self(vec![10, 20, 50, 100])
    }
}

impl PageSizeOptions {
    pub fn new(sizes: Vec<u32>) -> Self {
        Self(sizes)
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.0.get(index).copied()
    }

    /// Index of `size` in the list, used to highlight the active choice
    pub fn position(&self, size: u32) -> Option<usize> {
        self.0.iter().position(|&s| s == size)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_formatting() {
        let info = PageInfo::new(3, 12);
        assert_eq!(info.to_string(), "3/12");
        assert_eq!(
            info.format_with(|page, total| format!("Page {} of {}", page, total)),
            "Page 3 of 12"
        );
    }

    #[test]
    fn test_page_size_options() {
        let options = PageSizeOptions::default();
        assert_eq!(options.iter().collect::<Vec<_>>(), vec![10, 20, 50, 100]);
        assert_eq!(options.position(50), Some(2));
        assert_eq!(options.position(7), None);
        assert_eq!(options.get(4), None);
    }

    #[test]
    fn test_page_size_options_serde() {
        let options: PageSizeOptions = serde_json::from_str("[5, 25]").unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(serde_json::to_string(&options).unwrap(), "[5,25]");
    }
}
