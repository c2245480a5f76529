pub mod android;
pub mod network;
pub mod traits;

pub use android::{disconnect, list_devices};
