/// Database models
///
/// One module per table. Each record type implements
/// [`crate::entity::Entity`] and comes with its create and update payloads.
///
/// # Relations
///
/// - Device → Category, Location
/// - Reading → User, Device
///
/// Relations are plain integer references without foreign keys; see
/// [`crate::services::relations`] for how they are resolved for responses.

pub mod category;
pub mod device;
pub mod location;
pub mod reading;
pub mod timestamp;
pub mod user;

pub use category::{Category, CreateCategory, UpdateCategory};
pub use device::{CreateDevice, Device, UpdateDevice};
pub use location::{CreateLocation, Location, UpdateLocation};
pub use reading::{CreateReading, Reading, UpdateReading};
pub use user::{CreateUser, UpdateUser, User};
