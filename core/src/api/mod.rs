//! Hooks for each area of the admin panel.
//!
//! Every area wraps a [`Gateway`](crate::gateway::Gateway) and hands out
//! [`Collection`](crate::resource::Collection) and
//! [`Singleton`](crate::resource::Singleton) hooks for its resources, plus
//! the handful of endpoints that do not fit the generic shape.

mod content;
mod games;
mod payments;
mod referral;
mod settings;
mod users;

pub use content::{ContentApi, PROMO_TOGGLE_FALLBACK};
pub use games::GamesApi;
pub use payments::PaymentsApi;
pub use referral::ReferralApi;
pub use settings::SettingsApi;
pub use users::UsersApi;
