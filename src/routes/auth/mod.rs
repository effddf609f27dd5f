mod handler;
mod model;

pub use handler::issue_token;
pub use model::{TokenRequest, TokenResponse};
