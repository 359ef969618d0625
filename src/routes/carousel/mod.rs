mod handler;
mod model;

pub use handler::{create_poster, delete_poster, find_nearby_posters, update_poster};
pub use model::{CarouselPoster, CreatePosterRequest, PosterOwner};
