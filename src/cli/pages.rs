//! `pages` and `dots` commands

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::pagination::{format_range, Direction, PaginationController};

/// Print the page-number layout for a page
#[derive(Debug, Args)]
pub struct PagesCommand {
    /// Current page (1-based, clamped into range)
    #[arg(short, long, default_value = "1")]
    pub page: i64,

    /// Total number of pages
    #[arg(short, long)]
    pub total: u32,

    /// Pages shown on each side of the current page
    #[arg(short, long)]
    pub siblings: Option<u32>,

    /// Pages always shown at each end
    #[arg(short, long)]
    pub boundary: Option<u32>,
}

impl PagesCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        println!("{}", self.render(config));
        Ok(())
    }

    fn render(&self, config: &Config) -> String {
        let options = &config.pagination;
        let mut controller = PaginationController::with_options(self.total, options);
        controller.go_to(self.page);

        let siblings = self.siblings.unwrap_or(options.sibling_count);
        let boundary = self.boundary.unwrap_or(options.boundary_count);
        let range = format_range(&controller.numbers(siblings, boundary));

        let controls: Vec<&str> = Direction::ALL
            .iter()
            .filter(|direction| !controller.is_direction_disabled(**direction, None))
            .map(|direction| arrow(*direction))
            .collect();

        format!("{}\npage {} · {}", range, controller.page_info(), controls.join(" "))
    }
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::First => "«",
        Direction::Prev => "‹",
        Direction::Next => "›",
        Direction::Last => "»",
    }
}

/// Print the dot-indicator window for a page
#[derive(Debug, Args)]
pub struct DotsCommand {
    /// Current page (1-based, clamped into range)
    #[arg(short, long, default_value = "1")]
    pub page: i64,

    /// Total number of pages
    #[arg(short, long)]
    pub total: u32,

    /// Width of the window
    #[arg(short, long)]
    pub max_dots: Option<u32>,
}

impl DotsCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        println!("{}", self.render(config));
        Ok(())
    }

    fn render(&self, config: &Config) -> String {
        let mut controller = PaginationController::with_options(self.total, &config.pagination);
        let current = controller.go_to(self.page);
        let max_dots = self.max_dots.unwrap_or(config.pagination.max_dots);

        controller
            .dots(max_dots)
            .into_iter()
            .map(|page| {
                if page == current {
                    format!("[{}]", page)
                } else {
                    page.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
