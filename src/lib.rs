//! A task manager REST backend whose authentication channel is encrypted
//! end to end: session tokens are signed and then sealed in an AES-256-CBC
//! envelope, and request/response bodies outside `/auth` travel sealed too.

pub mod config;
pub mod db;
pub mod error;
pub mod router;
pub mod state;

pub mod crypto {
    pub mod envelope;
    pub mod password;
}

pub mod models {
    pub mod session;
    pub mod task;
    pub mod user;
}

pub mod repositories {
    pub mod memory;
    pub mod task;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod tasks;
    pub mod token;
    pub mod users;
}

pub mod handlers {
    pub mod auth;
    pub mod health;
    pub mod response;
    pub mod tasks;
    pub mod users;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod encryption;
}

pub mod validation {
    pub mod json;
    pub mod path;
}
