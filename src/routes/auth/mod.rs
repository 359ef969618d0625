mod handler;
mod model;

pub use handler::{
    logout,
    refresh_token,
    verify_business_token,
    verify_public_token,
};
pub use model::{UserBusiness, UserPublic};
