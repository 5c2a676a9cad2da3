use serde::Serialize;

use crate::decode::{FieldMapping, FieldRule};
use crate::schema::assign;

/// One row of a sales export.
///
/// Free-text columns are sanitized, numeric and date columns are validated but kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sale {
    pub region: String,
    pub country: String,
    pub item_type: String,
    pub sales_channel: String,
    pub order_priority: String,
    pub order_date: String,
    #[serde(rename = "OrderID")]
    pub order_id: String,
    pub ship_date: String,
    pub units_sold: String,
    pub unit_price: String,
    pub unit_cost: String,
    pub total_revenue: String,
    pub total_cost: String,
    pub total_profit: String,
}

impl Sale {
    /// Field delimiter of sales exports.
    pub const DELIMITER: char = ',';

    /// Returns the positional mapping of a sales export onto [`Sale`].
    pub fn mapping() -> FieldMapping<Sale> {
        use FieldRule::{Amount, Date, Integer, Required, Sanitize};

        FieldMapping::<Sale>::builder()
            .field("Region", &[Sanitize], |s, v| assign(&mut s.region, v))
            .field("Country", &[Sanitize, Required], |s, v| {
                assign(&mut s.country, v)
            })
            .field("ItemType", &[Sanitize, Required], |s, v| {
                assign(&mut s.item_type, v)
            })
            .field("SalesChannel", &[Sanitize], |s, v| {
                assign(&mut s.sales_channel, v)
            })
            .field("OrderPriority", &[Sanitize], |s, v| {
                assign(&mut s.order_priority, v)
            })
            .field("OrderDate", &[Required, Date], |s, v| {
                assign(&mut s.order_date, v)
            })
            .field("OrderID", &[Required, Integer], |s, v| {
                assign(&mut s.order_id, v)
            })
            .field("ShipDate", &[Required, Date], |s, v| {
                assign(&mut s.ship_date, v)
            })
            .field("UnitsSold", &[Required, Integer], |s, v| {
                assign(&mut s.units_sold, v)
            })
            .field("UnitPrice", &[Required, Amount], |s, v| {
                assign(&mut s.unit_price, v)
            })
            .field("UnitCost", &[Required, Amount], |s, v| {
                assign(&mut s.unit_cost, v)
            })
            .field("TotalRevenue", &[Amount], |s, v| {
                assign(&mut s.total_revenue, v)
            })
            .field("TotalCost", &[Required, Amount], |s, v| {
                assign(&mut s.total_cost, v)
            })
            .field("TotalProfit", &[Required, Amount], |s, v| {
                assign(&mut s.total_profit, v)
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoder;
    use crate::error::ErrorKind;
    use crate::types::Record;

    fn row(fields: &[&str]) -> Record {
        Record::new(3, fields.iter().map(|f| f.to_string()).collect())
    }

    const VALID: [&str; 14] = [
        "Europe",
        " \"Russia\" ",
        "Office Supplies",
        "Offline",
        "L",
        "4/5/2017",
        "443368995",
        "5/12/2017",
        "1593",
        "651.21",
        "524.96",
        "1037377.53",
        "836261.28",
        "201116.25",
    ];

    #[test]
    fn decodes_and_sanitizes() {
        let mut sale = Sale::default();
        Sale::mapping().decode(&row(&VALID), &mut sale).unwrap();

        assert_eq!(sale.country, "Russia");
        assert_eq!(sale.order_id, "443368995");
        assert_eq!(sale.total_profit, "201116.25");
    }

    #[test]
    fn rejects_invalid_dates_and_amounts() {
        let mapping = Sale::mapping();

        let mut bad_date = VALID;
        bad_date[5] = "2017-04-05";
        let err = mapping.decode(&row(&bad_date), &mut Sale::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFieldValue);

        let mut blank_cost = VALID;
        blank_cost[10] = "  ";
        let err = mapping.decode(&row(&blank_cost), &mut Sale::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequiredFieldMissing);

        let mut no_revenue = VALID;
        no_revenue[11] = "";
        assert!(mapping.decode(&row(&no_revenue), &mut Sale::default()).is_ok());
    }
}
