use serde::Deserialize;

/// Minimal ownership record served by the orders upstream.
///
/// Summary producers disagree on the name of the owner field, so all known
/// spellings are decoded and resolved through a fixed precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, rename = "ownerVendorId")]
    pub owner_vendor_id: Option<String>,
    #[serde(default, rename = "vendorId")]
    pub vendor_id_camel: Option<String>,
    #[serde(default, rename = "vendor_id")]
    pub vendor_id_snake: Option<String>,
    #[serde(default, rename = "customer_name")]
    pub customer_name: Option<String>,
}

impl OrderSummary {
    /// The single authoritative owner of this order.
    ///
    /// Accessors run strictly in precedence order and the first non-null
    /// value wins. The order is `ownerVendorId`, `vendorId`, `vendor_id`,
    /// then `customer_name` as last resort; it must not be reordered.
    pub fn resolved_owner(&self) -> Option<&str> {
        let by_precedence = [
            &self.owner_vendor_id,
            &self.vendor_id_camel,
            &self.vendor_id_snake,
            &self.customer_name,
        ];

        by_precedence.into_iter().find_map(|field| field.as_deref())
    }
}
