pub mod center_card;
pub mod ui;

pub use center_card::{CenterCard, FavoriteButton};
