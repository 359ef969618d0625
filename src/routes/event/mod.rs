mod handler;
mod model;

pub use handler::{create_event, delete_event, find_by_id, find_by_venue};
pub use model::{CreateEventRequest, Event};
