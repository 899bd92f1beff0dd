use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The `business` columns every listing carries. Other columns of a
/// `business.*` row are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Business {
    pub business_id: String,
    pub business_name: String,
    pub business_address: Option<String>,
    pub business_state: Option<String>,
    pub city: Option<String>,
    pub zip: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub user_id: String,
    pub business_id: String,
    pub date_posted: NaiveDateTime,
    pub body: String,
}
