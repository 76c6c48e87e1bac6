pub mod accessory;
pub mod booking;
pub mod booking_item;
pub mod category;
pub mod costume;
pub mod status;

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Ordered list of short labels stored as a JSON array (sizes, themes, characters).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Labels(pub Vec<String>);

impl From<Vec<String>> for Labels {
    fn from(labels: Vec<String>) -> Self {
        Labels(labels)
    }
}
