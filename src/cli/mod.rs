mod pages;
mod root;
mod upload;

pub use pages::{DotsCommand, PagesCommand};
pub use root::{Cli, Commands};
pub use upload::UploadCommand;
