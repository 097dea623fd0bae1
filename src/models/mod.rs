pub mod booking;
pub mod entrant;
pub mod loaders;
pub mod locator;
pub mod profile;

pub use booking::{BookingConfig, GeneralSettings};
pub use entrant::Entrant;
pub use loaders::{load_booking_config, load_locator_profile, resolve_photo_path, save_booking_config};
pub use locator::{FormLocatorMap, Locator, Selector};
pub use profile::{LocatorProfile, MatchingProfile, UiTimings};
