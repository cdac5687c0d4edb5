pub mod image {
    pub mod schema;
    pub mod model;
    pub mod short_code;
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_github;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod upstream;
