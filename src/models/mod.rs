use crate::api::ApiError;
use crate::util::parse_amenities;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

pub(crate) const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1571902943202-507ec2618e8f";

const WEEKDAY_HOURS: &str = "9:00 AM - 9:00 PM";
const WEEKEND_HOURS: &str = "10:00 AM - 6:00 PM";

/// Text columns are nullable in `rec_centers`; a null reads as empty text.
fn text_or_null<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Seven named slots, each a free-text time range ("6:00 AM - 10:00 PM").
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeeklyHours {
    pub monday: String,
    pub tuesday: String,
    pub wednesday: String,
    pub thursday: String,
    pub friday: String,
    pub saturday: String,
    pub sunday: String,
}

impl WeeklyHours {
    pub fn get(&self, day: Weekday) -> &str {
        match day {
            Weekday::Monday => &self.monday,
            Weekday::Tuesday => &self.tuesday,
            Weekday::Wednesday => &self.wednesday,
            Weekday::Thursday => &self.thursday,
            Weekday::Friday => &self.friday,
            Weekday::Saturday => &self.saturday,
            Weekday::Sunday => &self.sunday,
        }
    }

    pub fn set(&mut self, day: Weekday, value: String) {
        let slot = match day {
            Weekday::Monday => &mut self.monday,
            Weekday::Tuesday => &mut self.tuesday,
            Weekday::Wednesday => &mut self.wednesday,
            Weekday::Thursday => &mut self.thursday,
            Weekday::Friday => &mut self.friday,
            Weekday::Saturday => &mut self.saturday,
            Weekday::Sunday => &mut self.sunday,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &str)> + '_ {
        Weekday::iter().map(move |d| (d, self.get(d)))
    }
}

impl Default for WeeklyHours {
    fn default() -> Self {
        Self {
            monday: WEEKDAY_HOURS.to_string(),
            tuesday: WEEKDAY_HOURS.to_string(),
            wednesday: WEEKDAY_HOURS.to_string(),
            thursday: WEEKDAY_HOURS.to_string(),
            friday: WEEKDAY_HOURS.to_string(),
            saturday: WEEKEND_HOURS.to_string(),
            sunday: WEEKEND_HOURS.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A row of `rec_centers`.
///
/// `id` is immutable once assigned. Rows are only constructed from backend
/// JSON through [`Center::from_row`], which rejects malformed shapes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Center {
    #[serde(default, deserialize_with = "text_or_null")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub address: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub city: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub state: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub phone: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub website: String,
    pub hours: WeeklyHours,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub image_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: u32,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("row is not a valid {table} record: {reason}")]
    Shape { table: &'static str, reason: String },

    #[error("{table} row is missing its id")]
    MissingId { table: &'static str },

    #[error("{table} row '{id}' has out-of-range {field}")]
    OutOfRange {
        table: &'static str,
        id: String,
        field: &'static str,
    },
}

impl From<RowError> for ApiError {
    fn from(e: RowError) -> Self {
        ApiError::parse(e)
    }
}

impl Center {
    pub fn from_row(row: serde_json::Value) -> Result<Self, RowError> {
        let center: Center = serde_json::from_value(row).map_err(|e| RowError::Shape {
            table: "rec_centers",
            reason: e.to_string(),
        })?;

        if center.id.trim().is_empty() {
            return Err(RowError::MissingId {
                table: "rec_centers",
            });
        }
        if !center.coordinates.is_valid() {
            return Err(RowError::OutOfRange {
                table: "rec_centers",
                id: center.id,
                field: "coordinates",
            });
        }
        if !center.rating.is_finite() {
            return Err(RowError::OutOfRange {
                table: "rec_centers",
                id: center.id,
                field: "rating",
            });
        }

        Ok(center)
    }

    pub fn location_line(&self) -> String {
        [self.city.as_str(), self.state.as_str()]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A row of `programs`; owned by exactly one center.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Program {
    pub id: String,
    pub rec_center_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub schedule: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub age_group: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub price: String,
}

impl Program {
    pub fn from_row(row: serde_json::Value) -> Result<Self, RowError> {
        let program: Program = serde_json::from_value(row).map_err(|e| RowError::Shape {
            table: "programs",
            reason: e.to_string(),
        })?;
        if program.id.trim().is_empty() {
            return Err(RowError::MissingId { table: "programs" });
        }
        Ok(program)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Favorite {
    pub user_id: String,
    pub rec_center_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Editable form state for the admin center editor.
///
/// Amenities are edited as one comma separated string and only split when
/// the draft is turned back into a [`Center`].
#[derive(Clone, Debug, PartialEq)]
pub struct CenterDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub hours: WeeklyHours,
    pub amenities_input: String,
    pub image_url: String,
    pub rating: f64,
    pub reviews: u32,
    pub coordinates: Coordinates,
}

impl Default for CenterDraft {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            phone: String::new(),
            email: String::new(),
            website: String::new(),
            hours: WeeklyHours::default(),
            amenities_input: String::new(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            rating: 0.0,
            reviews: 0,
            coordinates: Coordinates::default(),
        }
    }
}

impl CenterDraft {
    pub fn from_center(c: &Center) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            address: c.address.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            postal_code: c.postal_code.clone(),
            phone: c.phone.clone(),
            email: c.email.clone(),
            website: c.website.clone(),
            hours: c.hours.clone(),
            amenities_input: c.amenities.join(", "),
            image_url: c.image_url.clone(),
            rating: c.rating,
            reviews: c.reviews,
            coordinates: c.coordinates,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.trim().is_empty()
    }

    /// Validate the form and produce the center payload sent to the gateway.
    /// The id may still be empty here; `create` assigns one.
    pub fn into_center(self) -> Result<Center, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("name", "Name is required"));
        }
        if self.city.trim().is_empty() {
            return Err(ApiError::validation("city", "City is required"));
        }
        if !self.rating.is_finite() || !(0.0..=5.0).contains(&self.rating) {
            return Err(ApiError::validation(
                "rating",
                "Rating must be between 0 and 5",
            ));
        }
        if !self.coordinates.is_valid() {
            return Err(ApiError::validation(
                "coordinates",
                "Latitude must be within ±90 and longitude within ±180",
            ));
        }

        Ok(Center {
            id: self.id.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            address: self.address,
            city: self.city.trim().to_string(),
            state: self.state,
            postal_code: self.postal_code,
            phone: self.phone,
            email: self.email,
            website: self.website,
            hours: self.hours,
            amenities: parse_amenities(&self.amenities_input),
            image_url: self.image_url,
            rating: self.rating,
            reviews: self.reviews,
            coordinates: self.coordinates,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiErrorKind;

    fn oakridge_row() -> serde_json::Value {
        serde_json::json!({
            "id": "rc-001",
            "name": "Oakridge Recreation Center",
            "description": null,
            "address": "1234 Oakridge Blvd",
            "city": "Portland",
            "state": "Oregon",
            "postal_code": "97205",
            "phone": "(503) 555-1234",
            "email": "info@oakridgerec.com",
            "website": "https://www.oakridgerec.com",
            "hours": {
                "monday": "6:00 AM - 10:00 PM",
                "tuesday": "6:00 AM - 10:00 PM",
                "wednesday": "6:00 AM - 10:00 PM",
                "thursday": "6:00 AM - 10:00 PM",
                "friday": "6:00 AM - 10:00 PM",
                "saturday": "8:00 AM - 8:00 PM",
                "sunday": "8:00 AM - 6:00 PM"
            },
            "amenities": ["Swimming Pool", "Fitness Center"],
            "image_url": "https://example.com/a.jpg",
            "rating": 4,
            "reviews": 128,
            "coordinates": { "lat": 45.5152, "lng": -122.6784 }
        })
    }

    #[test]
    fn test_center_row_parses_with_null_text() {
        let c = Center::from_row(oakridge_row()).expect("row should parse");
        assert_eq!(c.id, "rc-001");
        assert_eq!(c.description, "");
        assert_eq!(c.rating, 4.0);
        assert_eq!(c.hours.get(Weekday::Saturday), "8:00 AM - 8:00 PM");
        assert_eq!(c.location_line(), "Portland, Oregon");
    }

    #[test]
    fn test_center_row_rejects_loose_hours() {
        let mut row = oakridge_row();
        row["hours"] = serde_json::json!("9-5");
        assert!(matches!(
            Center::from_row(row),
            Err(RowError::Shape { table: "rec_centers", .. })
        ));
    }

    #[test]
    fn test_center_row_rejects_missing_coordinates() {
        let mut row = oakridge_row();
        if let Some(o) = row.as_object_mut() {
            o.remove("coordinates");
        }
        assert!(Center::from_row(row).is_err());
    }

    #[test]
    fn test_center_row_rejects_out_of_range_coordinates() {
        let mut row = oakridge_row();
        row["coordinates"] = serde_json::json!({ "lat": 123.0, "lng": 0.0 });
        assert_eq!(
            Center::from_row(row),
            Err(RowError::OutOfRange {
                table: "rec_centers",
                id: "rc-001".to_string(),
                field: "coordinates",
            })
        );
    }

    #[test]
    fn test_center_row_requires_id() {
        let mut row = oakridge_row();
        row["id"] = serde_json::json!("  ");
        assert_eq!(
            Center::from_row(row),
            Err(RowError::MissingId {
                table: "rec_centers"
            })
        );
    }

    #[test]
    fn test_weekly_hours_iterates_in_week_order() {
        let days: Vec<String> = WeeklyHours::default()
            .iter()
            .map(|(d, _)| d.to_string())
            .collect();
        assert_eq!(days.first().map(String::as_str), Some("Monday"));
        assert_eq!(days.last().map(String::as_str), Some("Sunday"));
        assert_eq!(days.len(), 7);
    }

    #[test]
    fn test_draft_defaults_match_admin_form() {
        let d = CenterDraft::default();
        assert!(d.is_new());
        assert_eq!(d.hours.monday, "9:00 AM - 9:00 PM");
        assert_eq!(d.hours.sunday, "10:00 AM - 6:00 PM");
        assert_eq!(d.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn test_draft_into_center_splits_amenities() {
        let d = CenterDraft {
            name: " Riverside ".to_string(),
            city: "Salem".to_string(),
            amenities_input: "Trails, , Pool ,".to_string(),
            ..CenterDraft::default()
        };
        let c = d.into_center().expect("valid draft");
        assert_eq!(c.name, "Riverside");
        assert_eq!(c.amenities, vec!["Trails".to_string(), "Pool".to_string()]);
        assert!(c.id.is_empty());
    }

    #[test]
    fn test_draft_validation_names_field() {
        let err = CenterDraft::default().into_center().unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("name"));

        let err = CenterDraft {
            name: "A".to_string(),
            city: "B".to_string(),
            rating: 7.5,
            ..CenterDraft::default()
        }
        .into_center()
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("rating"));
    }

    #[test]
    fn test_draft_round_trips_center() {
        let c = fixtures::center("a", "Oakridge", "Portland", &["Pool", "Gym"]);
        let d = CenterDraft::from_center(&c);
        assert_eq!(d.amenities_input, "Pool, Gym");
        assert_eq!(d.into_center().expect("valid"), c);
    }
}
