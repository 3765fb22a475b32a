//! Page range calculation for numbered and dot-style page indicators.
//!
//! Both functions are pure: they take the current position and layout
//! parameters and return what should be displayed. Nothing here owns state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single slot in a rendered page range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "page", rename_all = "snake_case")]
pub enum PageToken {
    /// A clickable page number (1-based)
    Page(u32),
    /// A run of at least two omitted pages
    Ellipsis,
}

impl PageToken {
    /// Page number carried by this token, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            PageToken::Page(page) => Some(*page),
            PageToken::Ellipsis => None,
        }
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, PageToken::Ellipsis)
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Page(page) => write!(f, "{}", page),
            PageToken::Ellipsis => write!(f, "…"),
        }
    }
}

/// Number of slots a collapsed range may occupy: both boundaries, both
/// sibling runs, the current page and two ellipses.
pub fn total_slots(sibling_count: u32, boundary_count: u32) -> u32 {
    boundary_count
        .saturating_mul(2)
        .saturating_add(sibling_count.saturating_mul(2))
        .saturating_add(3)
}

/// Compute the page numbers and ellipses to display.
///
/// `page` is expected in `1..=total_pages`; values outside are clamped first
/// so the function stays total.
pub fn compute_range(
    page: u32,
    total_pages: u32,
    sibling_count: u32,
    boundary_count: u32,
) -> Vec<PageToken> {
    let total_pages = total_pages.max(1);
    let page = page.clamp(1, total_pages);

    if total_pages <= total_slots(sibling_count, boundary_count) {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    // total_pages > 2 * boundary_count + 3 here, so these cannot underflow
    let left_sibling = page.saturating_sub(sibling_count).max(boundary_count + 1);
    let right_sibling = page.saturating_add(sibling_count).min(total_pages - boundary_count);

    // An ellipsis only replaces two or more pages; a single gap is printed
    let show_left_ellipsis = left_sibling > boundary_count + 2;
    let show_right_ellipsis = right_sibling < total_pages - boundary_count - 1;

    let mut tokens = Vec::with_capacity(total_slots(sibling_count, boundary_count) as usize);

    tokens.extend((1..=boundary_count).map(PageToken::Page));

    if show_left_ellipsis {
        tokens.push(PageToken::Ellipsis);
    } else {
        tokens.extend((boundary_count + 1..left_sibling).map(PageToken::Page));
    }

    tokens.extend((left_sibling..=right_sibling).map(PageToken::Page));

    if show_right_ellipsis {
        tokens.push(PageToken::Ellipsis);
    } else {
        tokens.extend((right_sibling + 1..=total_pages - boundary_count).map(PageToken::Page));
    }

    tokens.extend((total_pages - boundary_count + 1..=total_pages).map(PageToken::Page));

    tokens
}

/// Compute the sliding window of pages shown by a dot indicator.
///
/// The window holds `max_dots` pages centred on `page` and is shifted, not
/// shrunk, when it would run past either end.
pub fn dot_window(page: u32, total_pages: u32, max_dots: u32) -> Vec<u32> {
    let total_pages = total_pages.max(1);
    let max_dots = max_dots.max(1);

    if total_pages <= max_dots {
        return (1..=total_pages).collect();
    }

    let page = page.clamp(1, total_pages);
    let half = max_dots / 2;

    // Shift left instead of running past the last page
    let start = page
        .saturating_sub(half)
        .max(1)
        .min(total_pages - max_dots + 1);
    let end = start + max_dots - 1;

    (start..=end).collect()
}

/// Render tokens as a single line, e.g. `1 … 4 5 6 … 10`
pub fn format_range(tokens: &[PageToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
