pub mod contents;
pub mod github;
pub mod host;
pub mod quax;

pub use contents::ContentsClient;
pub use github::GithubHost;
pub use host::{ImageHost, ImageUpload};
pub use quax::QuaxHost;
