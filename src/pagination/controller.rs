//! Pagination state controller.
//!
//! Owns the page and page-size axes. Each axis is either controlled (the
//! caller owns the value and re-supplies it after every change request) or
//! uncontrolled (the controller keeps and updates a private copy). Change
//! requests always notify registered callbacks with the value the caller
//! should observe.

use super::item_count::{PageInfo, PageSizeOptions};
use super::range::{compute_range, dot_window, PageToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Layout and default values for a pagination controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOptions {
    /// Initial page for an uncontrolled controller (1-based)
    #[serde(default = "default_page")]
    pub default_page: u32,

    /// Initial page size for an uncontrolled controller
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Pages shown on each side of the current page
    #[serde(default = "default_sibling_count")]
    pub sibling_count: u32,

    /// Pages always shown at each end
    #[serde(default = "default_boundary_count")]
    pub boundary_count: u32,

    /// Width of the dot indicator window
    #[serde(default = "default_max_dots")]
    pub max_dots: u32,

    /// Choices offered by the page size selector
    #[serde(default)]
    pub page_size_options: PageSizeOptions,

    /// Disable every navigation control
    #[serde(default)]
    pub disabled: bool,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            default_page: default_page(),
            default_page_size: default_page_size(),
            sibling_count: default_sibling_count(),
            boundary_count: default_boundary_count(),
            max_dots: default_max_dots(),
            page_size_options: PageSizeOptions::default(),
            disabled: false,
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

fn default_sibling_count() -> u32 {
    1
}

fn default_boundary_count() -> u32 {
    1
}

fn default_max_dots() -> u32 {
    7
}

/// A value that is either owned by the caller or by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controllable<T> {
    /// Caller-owned; the controller only mirrors the last supplied value
    Controlled(T),
    /// Controller-owned
    Uncontrolled(T),
}

impl<T: Copy> Controllable<T> {
    pub fn value(&self) -> T {
        match self {
            Controllable::Controlled(value) | Controllable::Uncontrolled(value) => *value,
        }
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self, Controllable::Controlled(_))
    }

    /// Apply a change request. Only an uncontrolled value is written.
    fn request(&mut self, value: T) {
        if let Controllable::Uncontrolled(current) = self {
            *current = value;
        }
    }

    /// Accept a value re-supplied by the owner of a controlled axis
    fn sync(&mut self, value: T) {
        if let Controllable::Controlled(current) = self {
            *current = value;
        }
    }
}

/// Navigation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    First,
    Prev,
    Next,
    Last,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::First, Direction::Prev, Direction::Next, Direction::Last];

    /// Unclamped page this button requests
    pub fn target(&self, page: u32, total_pages: u32) -> i64 {
        match self {
            Direction::First => 1,
            Direction::Prev => i64::from(page) - 1,
            Direction::Next => i64::from(page) + 1,
            Direction::Last => i64::from(total_pages),
        }
    }

    /// Whether the current position makes this button pointless
    pub fn at_boundary(&self, page: u32, total_pages: u32) -> bool {
        match self {
            Direction::First | Direction::Prev => page <= 1,
            Direction::Next | Direction::Last => page >= total_pages,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::First => "Go to first page",
            Direction::Prev => "Go to previous page",
            Direction::Next => "Go to next page",
            Direction::Last => "Go to last page",
        }
    }
}

/// Notifications fired by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationEvent {
    /// A page change was requested; `page` is already clamped
    PageChanged { page: u32 },

    /// A page size change was requested
    PageSizeChanged { page_size: u32 },
}

type Callback = Box<dyn Fn(PaginationEvent) + Send + Sync>;

/// Page and page-size state for one pagination widget
pub struct PaginationController {
    page: Controllable<u32>,
    page_size: Controllable<u32>,
    total_pages: u32,
    disabled: bool,
    callbacks: Vec<Callback>,
}

impl fmt::Debug for PaginationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationController")
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("total_pages", &self.total_pages)
            .field("disabled", &self.disabled)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl PaginationController {
    /// Create an uncontrolled controller starting at page 1 with 10 items per page
    pub fn new(total_pages: u32) -> Self {
        Self::with_options(total_pages, &PaginationOptions::default())
    }

    /// Create an uncontrolled controller from options
    pub fn with_options(total_pages: u32, options: &PaginationOptions) -> Self {
        let total_pages = total_pages.max(1);
        Self {
            page: Controllable::Uncontrolled(options.default_page.clamp(1, total_pages)),
            page_size: Controllable::Uncontrolled(options.default_page_size.max(1)),
            total_pages,
            disabled: options.disabled,
            callbacks: Vec::new(),
        }
    }

    /// Hand ownership of the page axis to the caller
    pub fn controlled_page(mut self, page: u32) -> Self {
        self.page = Controllable::Controlled(page.clamp(1, self.total_pages));
        self
    }

    /// Hand ownership of the page size axis to the caller
    pub fn controlled_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Controllable::Controlled(page_size.max(1));
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Register a callback and return self, for construction chains
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(PaginationEvent) + Send + Sync + 'static,
    {
        self.add_callback(callback);
        self
    }

    /// Add an event callback
    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: Fn(PaginationEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Current page (1-based)
    pub fn page(&self) -> u32 {
        self.page.value()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.value()
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_page_controlled(&self) -> bool {
        self.page.is_controlled()
    }

    pub fn is_page_size_controlled(&self) -> bool {
        self.page_size.is_controlled()
    }

    /// Request a page. The target is clamped to `[1, total_pages]` before it
    /// is stored or reported. Returns the clamped page.
    pub fn go_to(&mut self, page: i64) -> u32 {
        let clamped = page.clamp(1, i64::from(self.total_pages)) as u32;
        trace!("Page requested: {} -> {}", page, clamped);

        self.page.request(clamped);
        self.emit_event(PaginationEvent::PageChanged { page: clamped });
        clamped
    }

    pub fn go_first(&mut self) -> u32 {
        self.navigate(Direction::First)
    }

    pub fn go_prev(&mut self) -> u32 {
        self.navigate(Direction::Prev)
    }

    pub fn go_next(&mut self) -> u32 {
        self.navigate(Direction::Next)
    }

    pub fn go_last(&mut self) -> u32 {
        self.navigate(Direction::Last)
    }

    /// Follow a navigation button
    pub fn navigate(&mut self, direction: Direction) -> u32 {
        let target = direction.target(self.page(), self.total_pages);
        debug!("Navigating {:?} from page {}", direction, self.page());
        self.go_to(target)
    }

    /// Request a new page size. Zero is raised to one; there is no upper bound.
    pub fn set_page_size(&mut self, page_size: u32) -> u32 {
        let page_size = page_size.max(1);
        debug!("Page size requested: {}", page_size);

        self.page_size.request(page_size);
        self.emit_event(PaginationEvent::PageSizeChanged { page_size });
        page_size
    }

    /// Pick an entry of a page size selector by index. Out-of-range indices are ignored.
    pub fn select_page_size_option(&mut self, options: &PageSizeOptions, index: usize) -> Option<u32> {
        let size = options.get(index)?;
        Some(self.set_page_size(size))
    }

    /// Accept a page value re-supplied by the owner of a controlled page axis
    pub fn sync_page(&mut self, page: u32) {
        self.page.sync(page.clamp(1, self.total_pages));
    }

    /// Accept a page size re-supplied by the owner of a controlled page size axis
    pub fn sync_page_size(&mut self, page_size: u32) {
        self.page_size.sync(page_size.max(1));
    }

    /// Update the page count. An uncontrolled page is re-clamped silently.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages.max(1);
        if let Controllable::Uncontrolled(page) = &mut self.page {
            *page = (*page).clamp(1, self.total_pages);
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Whether a navigation button is disabled. An explicit per-button
    /// override wins; otherwise the controller flag or the boundary rule
    /// disables it.
    pub fn is_direction_disabled(&self, direction: Direction, override_disabled: Option<bool>) -> bool {
        override_disabled
            .unwrap_or_else(|| self.disabled || direction.at_boundary(self.page(), self.total_pages))
    }

    /// Numbered range for the current state
    pub fn numbers(&self, sibling_count: u32, boundary_count: u32) -> Vec<PageToken> {
        compute_range(self.page(), self.total_pages, sibling_count, boundary_count)
    }

    /// Dot indicator window for the current state
    pub fn dots(&self, max_dots: u32) -> Vec<u32> {
        dot_window(self.page(), self.total_pages, max_dots)
    }

    pub fn page_info(&self) -> PageInfo {
        PageInfo::new(self.page(), self.total_pages)
    }

    fn emit_event(&self, event: PaginationEvent) {
        for callback in &self.callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<PaginationEvent>>>, impl Fn(PaginationEvent) + Send + Sync + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event| sink.lock().unwrap().push(event))
    }

    #[test]
    fn test_controller_defaults() {
        let controller = PaginationController::new(10);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.page_size(), 10);
        assert_eq!(controller.total_pages(), 10);
        assert!(!controller.is_page_controlled());
        assert!(!controller.is_disabled());
    }

    #[test]
    fn test_go_to_clamps_out_of_range_requests() {
        let (events, sink) = recorder();
        let mut controller = PaginationController::new(10).with_callback(sink);

        assert_eq!(controller.go_to(-50), 1);
        assert_eq!(controller.page(), 1);

        assert_eq!(controller.go_to(9999), 10);
        assert_eq!(controller.page(), 10);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                PaginationEvent::PageChanged { page: 1 },
                PaginationEvent::PageChanged { page: 10 },
            ]
        );
    }

    #[test]
    fn test_navigation_sugar() {
        let mut controller = PaginationController::new(5);

        assert_eq!(controller.go_next(), 2);
        assert_eq!(controller.go_last(), 5);
        assert_eq!(controller.go_next(), 5);
        assert_eq!(controller.go_prev(), 4);
        assert_eq!(controller.go_first(), 1);
        assert_eq!(controller.go_prev(), 1);
    }

    #[test]
    fn test_controlled_page_only_relays() {
        let (events, sink) = recorder();
        let mut controller = PaginationController::new(10)
            .controlled_page(3)
            .with_callback(sink);

        assert_eq!(controller.go_next(), 4);
        // The owner has not re-supplied the value yet
        assert_eq!(controller.page(), 3);
        assert_eq!(*events.lock().unwrap(), vec![PaginationEvent::PageChanged { page: 4 }]);

        controller.sync_page(4);
        assert_eq!(controller.page(), 4);
    }

    #[test]
    fn test_sync_is_ignored_for_uncontrolled_axes() {
        let mut controller = PaginationController::new(10);
        controller.sync_page(7);
        controller.sync_page_size(50);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.page_size(), 10);
    }

    #[test]
    fn test_page_size_changes() {
        let (events, sink) = recorder();
        let mut controller = PaginationController::new(10).with_callback(sink);

        assert_eq!(controller.set_page_size(500), 500);
        assert_eq!(controller.page_size(), 500);

        let mut controlled = PaginationController::new(10).controlled_page_size(20);
        controlled.set_page_size(50);
        assert_eq!(controlled.page_size(), 20);

        assert_eq!(
            *events.lock().unwrap(),
            vec![PaginationEvent::PageSizeChanged { page_size: 500 }]
        );
    }

    #[test]
    fn test_select_page_size_option() {
        let options = PageSizeOptions::default();
        let mut controller = PaginationController::new(10);

        assert_eq!(controller.select_page_size_option(&options, 2), Some(50));
        assert_eq!(controller.page_size(), 50);
        assert_eq!(controller.select_page_size_option(&options, 9), None);
        assert_eq!(controller.page_size(), 50);
    }

    #[test]
    fn test_direction_disabled_at_boundaries() {
        let mut controller = PaginationController::new(3);
        assert!(controller.is_direction_disabled(Direction::First, None));
        assert!(controller.is_direction_disabled(Direction::Prev, None));
        assert!(!controller.is_direction_disabled(Direction::Next, None));

        controller.go_last();
        assert!(!controller.is_direction_disabled(Direction::Prev, None));
        assert!(controller.is_direction_disabled(Direction::Next, None));
        assert!(controller.is_direction_disabled(Direction::Last, None));

        // An explicit override beats the boundary rule
        assert!(!controller.is_direction_disabled(Direction::Last, Some(false)));
    }

    #[test]
    fn test_disabled_controller_disables_every_direction() {
        let mut controller = PaginationController::new(10).disabled(true);
        controller.go_to(5);
        for direction in Direction::ALL {
            assert!(controller.is_direction_disabled(direction, None));
        }
    }

    #[test]
    fn test_single_page_disables_everything() {
        let controller = PaginationController::new(1);
        for direction in Direction::ALL {
            assert!(controller.is_direction_disabled(direction, None));
        }
    }

    #[test]
    fn test_total_pages_shrink_reclamps_page() {
        let mut controller = PaginationController::new(20);
        controller.go_to(15);
        controller.set_total_pages(8);
        assert_eq!(controller.page(), 8);

        controller.set_total_pages(0);
        assert_eq!(controller.total_pages(), 1);
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn test_total_pages_shrink_leaves_controlled_page() {
        let mut controller = PaginationController::new(20).controlled_page(15);
        controller.set_total_pages(8);
        assert_eq!(controller.total_pages(), 8);
        assert_eq!(controller.page(), 15);

        // The owner re-supplies the value it wants shown
        controller.sync_page(8);
        assert_eq!(controller.page(), 8);
    }

    #[test]
    fn test_options_are_applied() {
        let options = PaginationOptions {
            default_page: 40,
            default_page_size: 0,
            ..PaginationOptions::default()
        };
        let controller = PaginationController::with_options(12, &options);
        assert_eq!(controller.page(), 12);
        assert_eq!(controller.page_size(), 1);
    }

    #[test]
    fn test_views_follow_state() {
        let mut controller = PaginationController::new(15);
        controller.go_to(8);
        assert_eq!(controller.dots(7), (5..=11).collect::<Vec<_>>());
        assert_eq!(controller.numbers(1, 1).len(), 7);
        assert_eq!(controller.page_info().to_string(), "8/15");
    }
}
