mod handler;
mod model;

pub use handler::{
    create_venue,
    delete_venue,
    find_by_id,
    list_venues,
    update_location,
    update_venue,
};
pub use model::{CreateVenueRequest, UpdateVenueRequest, Venue, VenueKind};
