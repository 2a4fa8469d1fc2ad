// XML availability feed (AvailRS) used by hotel suppliers that still speak XML
// Amounts arrive as attribute strings; the normalizer parses and validates them.

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
#[serde(rename = "AvailRS")]
pub struct XmlAvailResponse {
    #[serde(rename = "@currency")]
    pub currency: String,
    #[serde(rename = "@checkIn")]
    pub check_in: String,
    #[serde(rename = "@checkOut")]
    pub check_out: String,
    pub hotels: XmlHotels,
}

impl XmlAvailResponse {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn to_xml(&self) -> Result<String, quick_xml::se::SeError> {
        quick_xml::se::to_string(self)
    }
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlHotels {
    #[serde(rename = "Hotel")]
    pub hotels: Vec<XmlHotel>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlHotel {
    #[serde(rename = "@code")]
    pub hotel_id: String,
    #[serde(rename = "@name")]
    pub hotel_name: String,
    #[serde(rename = "@rating")]
    pub rating: String,
    pub amenities: XmlAmenities,
    pub meal_plans: XmlMealPlans,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlAmenities {
    #[serde(rename = "Amenity")]
    pub amenities: Vec<String>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlMealPlans {
    #[serde(rename = "MealPlan")]
    pub meal_plans: Vec<XmlMealPlan>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlMealPlan {
    #[serde(rename = "@code")]
    pub code: String,
    pub options: XmlOptions,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlOptions {
    #[serde(rename = "Option")]
    pub options: Vec<XmlOption>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlOption {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@promo", skip_serializing_if = "Option::is_none")]
    pub promo: Option<String>,
    pub price: XmlPrice,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlPrice {
    #[serde(rename = "@currency")]
    pub currency: String,
    #[serde(rename = "@amount")]
    pub amount: String,
    #[serde(rename = "@listAmount")]
    pub list_amount: String,
}

// A small sample for inline testing
#[cfg(test)]
pub const SMALL_SAMPLE_XML: &str = r#"
<AvailRS currency="EUR" checkIn="2025-07-15" checkOut="2025-07-22">
  <Hotels>
    <Hotel code="HC-77" name="Boutique Hotel Paris" rating="4.4">
      <Amenities>
        <Amenity>WiFi</Amenity>
        <Amenity>Breakfast</Amenity>
        <Amenity>Gym</Amenity>
      </Amenities>
      <MealPlans>
        <MealPlan code="BB">
          <Options>
            <Option id="HC-77-BB-1" promo="last-minute">
              <Price currency="EUR" amount="145.00" listAmount="220.00"/>
            </Option>
            <Option id="HC-77-BB-2">
              <Price currency="EUR" amount="160.00" listAmount="220.00"/>
            </Option>
          </Options>
        </MealPlan>
      </MealPlans>
    </Hotel>
  </Hotels>
</AvailRS>
"#;
