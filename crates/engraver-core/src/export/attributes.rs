//! Values handed to the commerce cart and the persistence endpoint.

use serde::{Deserialize, Serialize};

/// The product the design is engraved on, as chosen in the customizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductSpec {
    pub shape: Option<String>,
    pub material: Option<String>,
    pub size: Option<String>,
}

/// Line-item metadata attached to the cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAttributes {
    pub filename: String,
    /// Size label such as `12.3MB`.
    pub file_size: String,
    /// Pixel dimensions as `WxH`.
    pub dimensions: String,
    pub dpi: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// Everything the persistence endpoint needs to store one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub order_identifier: String,
}
