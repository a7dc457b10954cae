//! Domain DTOs for the admin API.
//!
//! # Design
//! Wire names are camelCase and records may carry their id as `_id`; both
//! are handled by serde attributes so the rest of the crate only sees
//! snake_case Rust fields. Unknown members are ignored and most fields
//! default, because the server adds fields freely. Write payloads skip
//! `None` members so partial updates only send what changed.

mod content;
mod games;
mod payments;
mod referral;
mod settings;
mod user;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use content::*;
pub use games::*;
pub use payments::*;
pub use referral::*;
pub use settings::*;
pub use user::*;

/// A record with its own id, stored in a collection.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    fn id(&self) -> &str;
}

macro_rules! entities {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

entities!(
    User,
    Slider,
    TopWinner,
    UpcomingMatch,
    SecurityLog,
    ReferralTransaction,
    PaymentMethod,
    WithdrawMethod,
    Promotion,
    Transaction,
    GameCategory,
    Provider,
    PopularGame,
    ApkFile,
);

impl Entity for ReferralUserSettings {
    fn id(&self) -> &str {
        &self.user_id
    }
}

/// Body of the `/:id/status` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_id_is_accepted() {
        let slider: Slider =
            serde_json::from_str(r#"{"_id":"s1","title":"Welcome","image":"/a.png","order":2}"#).unwrap();
        assert_eq!(slider.id(), "s1");
        assert_eq!(slider.order, Some(2));
    }

    #[test]
    fn status_update_is_camel_case() {
        let json = serde_json::to_value(StatusUpdate { is_active: true }).unwrap();
        assert_eq!(json, serde_json::json!({"isActive": true}));
    }
}
