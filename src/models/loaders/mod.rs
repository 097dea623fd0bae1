pub mod booking_loader;
pub mod profile_loader;

pub use booking_loader::{load_booking_config, resolve_photo_path, save_booking_config};
pub use profile_loader::load_locator_profile;
