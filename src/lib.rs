mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod import;
    pub mod pagination;
    pub mod report;
    pub mod schema;
    pub mod validation;
}
mod access {
    pub mod permissions;
    pub mod session;
}
mod config;
mod constants;
mod reply;

mod cache {
    pub mod cache;
}

pub use access::*;
pub use database::actions::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use reply::*;
