pub mod order;
pub mod settings;

pub use order::{InvalidOrder, Order, UpsertOrderRequest};
pub use settings::{
    sanitize_text, EventName, Settings, SettingsUpdate, SettingsView, UnknownEventName,
};
