//! # Batch Records
//!
//! [`BatchRecord`] is the stored document: a JSON object that survives
//! storage and hashing exactly as written, whatever subset of fields it
//! carries. The fingerprint covers everything except the provenance fields.
//!
//! [`NewBatch`] and its parts are the typed creation input. They accept the
//! loose shapes a web form posts (blank strings, `null` lists, numbers as
//! strings). Unknown fields on any part are kept (flattened), so they end up
//! in the record and in the fingerprint like any other field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::{profiles_diverge, CanonicalBytes};
use crate::digest::{sha256_fingerprint, Fingerprint};
use crate::error::{CanonicalizationError, ValidationError};
use crate::identity::{BatchId, LedgerAddress};
use crate::temporal::Timestamp;

/// A stored batch document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRecord(Map<String, Value>);

impl BatchRecord {
    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Wrap a JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Borrow the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable access to the underlying object.
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Unwrap into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Top-level field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn village_str(&self, key: &str) -> Option<&str> {
        self.0
            .get("village")
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
    }

    /// The `batch_id` field, if present and a string.
    pub fn batch_id(&self) -> Option<&str> {
        self.str_field("batch_id")
    }

    /// The `product` field.
    pub fn product(&self) -> Option<&str> {
        self.str_field("product")
    }

    /// `village.name`.
    pub fn village_name(&self) -> Option<&str> {
        self.village_str("name")
    }

    /// `village.district`.
    pub fn district(&self) -> Option<&str> {
        self.village_str("district")
    }

    /// `village.state`.
    pub fn state(&self) -> Option<&str> {
        self.village_str("state")
    }

    /// Number of entries in `farmers`, zero when absent.
    pub fn farmer_count(&self) -> usize {
        self.0
            .get("farmers")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// The locally stored fingerprint, if present and well formed.
    pub fn batch_hash(&self) -> Option<Fingerprint> {
        self.str_field("batch_hash")
            .and_then(|s| Fingerprint::parse(s).ok())
    }

    /// The anchoring transaction reference, if the record was anchored.
    pub fn blockchain_tx_hash(&self) -> Option<&str> {
        self.str_field("blockchain_tx_hash").filter(|s| !s.is_empty())
    }

    /// The anchoring time written at registration. Records written by the
    /// field app carry epoch milliseconds (as a string or a number) instead
    /// of an ISO 8601 string.
    pub fn blockchain_timestamp(&self) -> Option<Timestamp> {
        match self.0.get("blockchain_timestamp")? {
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse::<i64>()
                .ok()
                .and_then(|ms| Timestamp::from_epoch_millis(ms).ok())
            }
            Value::String(s) => Timestamp::parse_lenient(s).ok(),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Timestamp::from_epoch_millis(ms).ok()),
            _ => None,
        }
    }

    /// The anchoring account written at registration.
    pub fn blockchain_registrar(&self) -> Option<&str> {
        self.str_field("blockchain_registrar")
    }

    /// `created_at`, read leniently.
    pub fn created_at(&self) -> Option<Timestamp> {
        self.str_field("created_at")
            .and_then(|s| Timestamp::parse_lenient(s).ok())
    }

    /// `updated_at`, read leniently.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.str_field("updated_at")
            .and_then(|s| Timestamp::parse_lenient(s).ok())
    }

    /// Canonical bytes of this record.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&self.0)
    }

    /// Fingerprint of this record. Provenance fields do not contribute.
    pub fn fingerprint(&self) -> Result<Fingerprint, CanonicalizationError> {
        Ok(sha256_fingerprint(&self.canonical_bytes()?))
    }

    /// Whether the legacy key-order-only encoding disagrees with the strict one.
    pub fn profiles_diverge(&self) -> Result<bool, CanonicalizationError> {
        profiles_diverge(&self.0)
    }

    /// Write `batch_hash` and bump `updated_at`.
    pub fn set_batch_hash(&mut self, fingerprint: &Fingerprint, now: Timestamp) {
        self.0.insert(
            "batch_hash".to_string(),
            Value::String(fingerprint.to_prefixed_hex()),
        );
        self.touch(now);
    }

    /// Write the anchoring receipt fields and bump `updated_at`.
    pub fn set_anchor(
        &mut self,
        transaction_ref: &str,
        anchored_at: Timestamp,
        registrar: Option<&LedgerAddress>,
        now: Timestamp,
    ) {
        self.0.insert(
            "blockchain_tx_hash".to_string(),
            Value::String(transaction_ref.to_string()),
        );
        self.0.insert(
            "blockchain_timestamp".to_string(),
            Value::String(anchored_at.to_iso8601()),
        );
        if let Some(registrar) = registrar {
            self.0.insert(
                "blockchain_registrar".to_string(),
                Value::String(registrar.to_string()),
            );
        }
        self.touch(now);
    }

    /// Set both `created_at` and `updated_at`.
    pub fn stamp_created(&mut self, now: Timestamp) {
        self.0
            .insert("created_at".to_string(), Value::String(now.to_iso8601()));
        self.touch(now);
    }

    /// Set `updated_at`.
    pub fn touch(&mut self, now: Timestamp) {
        self.0
            .insert("updated_at".to_string(), Value::String(now.to_iso8601()));
    }
}

impl From<BatchRecord> for Value {
    fn from(record: BatchRecord) -> Self {
        record.into_value()
    }
}

impl TryFrom<Value> for BatchRecord {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Input for registering a new batch.
///
/// Leaves are kept as the caller sent them: a form that posts `"41"` for an
/// age stores the string, and `null` or `""` anywhere means "not given".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewBatch {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub batch_id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub product: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub village: VillageInput,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub farmers: Vec<FarmerInput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewBatch {
    /// Check the mandatory identity fields and return the validated id.
    ///
    /// # Errors
    ///
    /// `batch_id` must pass [`BatchId::new`]; `product` and `village.name`
    /// must be non-blank; `farmers` must have at least one entry.
    pub fn validate(&self) -> Result<BatchId, ValidationError> {
        if self.batch_id.trim().is_empty() {
            return Err(ValidationError::MissingField("batch_id"));
        }
        let id = BatchId::new(self.batch_id.clone())?;
        if self.product.trim().is_empty() {
            return Err(ValidationError::MissingField("product"));
        }
        if self.village.name.trim().is_empty() {
            return Err(ValidationError::MissingField("village.name"));
        }
        if self.farmers.is_empty() {
            return Err(ValidationError::EmptyCollection("farmers"));
        }
        Ok(id)
    }

    /// Validate and build the document to be fingerprinted, without
    /// timestamps.
    ///
    /// Scalar farmer and village details are cleared when falsy (`0`,
    /// `false`, `""`) and a missing `gender` becomes `"male"`, the defaults
    /// the field app's backend applies when it builds a record.
    pub fn into_document(mut self) -> Result<(BatchId, BatchRecord), ValidationError> {
        let id = self.validate()?;
        self.village.apply_defaults();
        for farmer in &mut self.farmers {
            farmer.apply_defaults();
        }
        let record = match serde_json::to_value(&self) {
            Ok(value) => BatchRecord::from_value(value)?,
            Err(_) => return Err(ValidationError::NotAnObject),
        };
        Ok((id, record))
    }

    /// [`NewBatch::into_document`] stamped with `created_at` and
    /// `updated_at`.
    pub fn into_record(self, now: Timestamp) -> Result<(BatchId, BatchRecord), ValidationError> {
        let (id, mut record) = self.into_document()?;
        record.stamp_created(now);
        Ok((id, record))
    }
}

/// Village the batch was grown in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VillageInput {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_m: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village_info: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VillageInput {
    fn apply_defaults(&mut self) {
        lenient::clear_falsy(&mut self.elevation_m);
        lenient::clear_falsy(&mut self.village_info);
    }
}

/// A farmer contributing to the batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FarmerInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_land_nali: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultivated_land_nali: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultivated_land_acre: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging_status: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub crop_rotation: Option<CropRotation>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub yield_profile: Option<YieldProfile>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub season_calendar: Option<SeasonCalendar>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_harvest_info: Option<PostHarvestInfo>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub media: Option<Media>,
    #[serde(
        default,
        deserialize_with = "lenient::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub locations: Vec<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub soil_organic_carbon: Option<SoilOrganicCarbon>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Gender recorded when the form leaves it blank.
pub const DEFAULT_GENDER: &str = "male";

impl FarmerInput {
    fn apply_defaults(&mut self) {
        lenient::clear_falsy(&mut self.age);
        lenient::clear_falsy(&mut self.farmer_info);
        lenient::clear_falsy(&mut self.total_land_nali);
        lenient::clear_falsy(&mut self.cultivated_land_nali);
        lenient::clear_falsy(&mut self.cultivated_land_acre);
        lenient::clear_falsy(&mut self.packaging_status);
        lenient::clear_falsy(&mut self.gender);
        if self.gender.is_none() {
            self.gender = Some(Value::String(DEFAULT_GENDER.to_string()));
        }
    }
}

/// Land split between the two rotated crops, in nali.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_rajma_nali: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_rajma_share_pct: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amaranth_nali: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amaranth_share_pct: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inclusive numeric range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YieldProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_yield_kg_per_nali: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_yield_range_kg_per_nali: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_rajma_ideal_yield_kg: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_rajma_avg_yield_range_kg: Option<Range>,
    #[serde(
        default,
        deserialize_with = "lenient::falsy_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub seed_required_kg_per_nali: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_seed_required_kg: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeasonCalendar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_sowing_window: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking_window: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_window: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostHarvestInfo {
    #[serde(
        default,
        deserialize_with = "lenient::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub primary_practices: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_involvement: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Links are plain URLs or `{url, description}` objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Media {
    #[serde(
        default,
        deserialize_with = "lenient::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub image_links: Vec<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub video_links: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Soil test results for the farmer's plot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilOrganicCarbon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_year: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_depth_cm: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topsoil_oc_pct: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsoil_oc_pct: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_matter_pct_est: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_density_g_cc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_n_kg_per_ha: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_p_kg_per_ha: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_k_kg_per_ha: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserializers for form-shaped input.
mod lenient {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// `null` reads as the type's default.
    pub(super) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// `null`, `""`, `0` and `false` read as `None`; anything else must
    /// match `T`.
    pub(super) fn falsy_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if is_falsy(&value) {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(D::Error::custom)
    }

    pub(super) fn is_falsy(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(_) | Value::Object(_) => false,
        }
    }

    pub(super) fn clear_falsy(field: &mut Option<Value>) {
        if field.as_ref().is_some_and(is_falsy) {
            *field = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> NewBatch {
        serde_json::from_value(json!({
            "batch_id": "B1",
            "product": "White Rajma",
            "village": {"name": "Sarmoli", "district": "Pithoragarh", "state": "Uttarakhand"},
            "farmers": [{
                "farmer_name": "Asha",
                "age": 41,
                "yield_profile": {"avg_yield_range_kg_per_nali": {"min": 2, "max": 3.5}},
                "cooperative": "Maati"
            }],
            "season": "kharif-2026"
        }))
        .unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T08:00:00Z").unwrap()
    }

    #[test]
    fn from_value_requires_object() {
        assert!(BatchRecord::from_value(json!({"a": 1})).is_ok());
        assert_eq!(
            BatchRecord::from_value(json!([1, 2])),
            Err(ValidationError::NotAnObject)
        );
        assert!(serde_json::from_value::<BatchRecord>(json!("x")).is_err());
    }

    #[test]
    fn accessors_read_nested_fields() {
        let record = BatchRecord::from_value(json!({
            "batch_id": "B1",
            "product": "rajma",
            "village": {"name": "Sarmoli", "district": "Pithoragarh", "state": "Uttarakhand"},
            "farmers": [{"farmer_name": "a"}, {"farmer_name": "b"}],
            "created_at": "2026-01-15T12:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(record.batch_id(), Some("B1"));
        assert_eq!(record.village_name(), Some("Sarmoli"));
        assert_eq!(record.district(), Some("Pithoragarh"));
        assert_eq!(record.state(), Some("Uttarakhand"));
        assert_eq!(record.farmer_count(), 2);
        assert_eq!(
            record.created_at(),
            Some(Timestamp::parse("2026-01-15T12:00:00Z").unwrap())
        );
        assert_eq!(record.batch_hash(), None);
    }

    #[test]
    fn provenance_setters_do_not_change_fingerprint() {
        let (_, mut record) = sample_input().into_record(now()).unwrap();
        let before = record.fingerprint().unwrap();
        record.set_batch_hash(&before, now());
        record.set_anchor("0xabc", now(), Some(&LedgerAddress::zero()), now());
        assert_eq!(record.fingerprint().unwrap(), before);
        assert_eq!(record.batch_hash(), Some(before));
        assert_eq!(record.blockchain_tx_hash(), Some("0xabc"));
        assert_eq!(record.blockchain_timestamp(), Some(now()));
    }

    #[test]
    fn into_record_keeps_extra_fields_and_stamps_times() {
        let (id, record) = sample_input().into_record(now()).unwrap();
        assert_eq!(id.as_str(), "B1");
        assert_eq!(record.get("season"), Some(&json!("kharif-2026")));
        assert_eq!(record.get("farmers").unwrap()[0]["cooperative"], json!("Maati"));
        assert_eq!(record.created_at(), Some(now()));
        assert_eq!(record.updated_at(), Some(now()));
    }

    #[test]
    fn into_record_omits_absent_optionals_and_defaults_gender() {
        let (_, record) = sample_input().into_record(now()).unwrap();
        let farmer = &record.get("farmers").unwrap()[0];
        assert_eq!(farmer["gender"], json!("male"));
        assert!(farmer.get("locations").is_none());
        assert!(farmer.get("media").is_none());
        assert_eq!(
            farmer["yield_profile"]["avg_yield_range_kg_per_nali"],
            json!({"min": 2, "max": 3.5})
        );
    }

    #[test]
    fn falsy_farmer_details_are_cleared() {
        let input: NewBatch = serde_json::from_value(json!({
            "batch_id": "B1",
            "product": "rajma",
            "village": {"name": "X", "elevation_m": 0, "village_info": ""},
            "farmers": [{
                "farmer_name": "A",
                "age": 0,
                "gender": "",
                "total_land_nali": "",
                "packaging_status": false,
                "cultivated_land_acre": "1.5"
            }]
        }))
        .unwrap();
        let (_, record) = input.into_document().unwrap();
        let farmer = &record.get("farmers").unwrap()[0];
        assert!(farmer.get("age").is_none());
        assert!(farmer.get("total_land_nali").is_none());
        assert!(farmer.get("packaging_status").is_none());
        assert_eq!(farmer["gender"], json!("male"));
        assert_eq!(farmer["cultivated_land_acre"], json!("1.5"));
        assert_eq!(record.get("village").unwrap(), &json!({"name": "X"}));
        assert!(record.created_at().is_none());
    }

    #[test]
    fn form_shaped_input_is_accepted() {
        let input: NewBatch = serde_json::from_value(json!({
            "batch_id": "B1",
            "product": "White Rajma",
            "village": {"name": "Sarmoli", "district": "", "state": "", "elevation_m": "",
                        "village_info": ""},
            "farmers": [{
                "farmer_name": "Asha",
                "age": "41",
                "gender": "female",
                "farmer_info": "",
                "total_land_nali": "",
                "cultivated_land_nali": "",
                "cultivated_land_acre": "",
                "packaging_status": "",
                "crop_rotation": {"white_rajma_nali": "", "white_rajma_share_pct": "",
                                  "amaranth_nali": "", "amaranth_share_pct": ""},
                "yield_profile": {
                    "ideal_yield_kg_per_nali": "",
                    "avg_yield_range_kg_per_nali": {"min": "", "max": ""},
                    "estimated_rajma_ideal_yield_kg": "",
                    "estimated_rajma_avg_yield_range_kg": {"min": "", "max": ""},
                    "seed_required_kg_per_nali": {"min": "", "max": ""},
                    "estimated_seed_required_kg": ""
                },
                "season_calendar": {"seed_sowing_window": "", "staking_window": "",
                                    "harvest_window": ""},
                "post_harvest_info": {"primary_practices": [], "family_involvement": ""},
                "media": {"image_links": [{"url": "", "description": ""}],
                          "video_links": [{"url": "", "description": ""}]},
                "locations": [{"farm_1": ""}],
                "soil_organic_carbon": {"sampling_year": 2026, "sampling_depth_cm": "0-15",
                                        "topsoil_oc_pct": "", "ph": ""}
            }]
        }))
        .unwrap();
        let (_, record) = input.into_record(now()).unwrap();
        let farmer = &record.get("farmers").unwrap()[0];
        assert_eq!(farmer["age"], json!("41"));
        assert_eq!(farmer["gender"], json!("female"));

        let expected = json!({
            "batch_id": "B1",
            "product": "White Rajma",
            "village": {"name": "Sarmoli"},
            "farmers": [{
                "farmer_name": "Asha",
                "age": "41",
                "gender": "female",
                "soil_organic_carbon": {"sampling_year": 2026, "sampling_depth_cm": "0-15"}
            }]
        });
        assert_eq!(
            record.fingerprint().unwrap(),
            crate::digest::fingerprint(&expected).unwrap()
        );
    }

    #[test]
    fn null_lists_and_falsy_profiles_read_as_absent() {
        let input: NewBatch = serde_json::from_value(json!({
            "batch_id": "B1",
            "product": "rajma",
            "village": {"name": "X"},
            "farmers": [{
                "farmer_name": "A",
                "locations": null,
                "media": null,
                "crop_rotation": "",
                "post_harvest_info": {"primary_practices": null}
            }]
        }))
        .unwrap();
        let farmer = &input.farmers[0];
        assert!(farmer.locations.is_empty());
        assert!(farmer.media.is_none());
        assert!(farmer.crop_rotation.is_none());
        assert!(farmer.post_harvest_info.as_ref().unwrap().primary_practices.is_empty());
    }

    #[test]
    fn fingerprint_matches_untyped_equivalent() {
        let (_, record) = sample_input().into_record(now()).unwrap();
        let untyped = json!({
            "batch_id": "B1",
            "product": "White Rajma",
            "season": "kharif-2026",
            "village": {"state": "Uttarakhand", "name": "Sarmoli", "district": "Pithoragarh",
                        "elevation_m": null},
            "farmers": [{
                "farmer_name": "Asha", "age": 41, "gender": "male",
                "yield_profile": {"avg_yield_range_kg_per_nali": {"max": 3.5, "min": 2}},
                "cooperative": "Maati", "media": {"image_links": []}
            }]
        });
        assert_eq!(
            record.fingerprint().unwrap(),
            crate::digest::fingerprint(&untyped).unwrap()
        );
    }

    #[test]
    fn blockchain_timestamp_reads_epoch_millis() {
        let expected = Timestamp::parse("2023-11-14T22:13:20Z").unwrap();
        for stored in [json!("1700000000000"), json!(1_700_000_000_000_i64)] {
            let record = BatchRecord::from_value(json!({"blockchain_timestamp": stored})).unwrap();
            assert_eq!(record.blockchain_timestamp(), Some(expected));
        }
        let record =
            BatchRecord::from_value(json!({"blockchain_timestamp": "2023-11-14T22:13:20Z"})).unwrap();
        assert_eq!(record.blockchain_timestamp(), Some(expected));
        let record = BatchRecord::from_value(json!({"blockchain_timestamp": ""})).unwrap();
        assert_eq!(record.blockchain_timestamp(), None);
    }

    #[test]
    fn validate_rejects_missing_identity_fields() {
        let mut input = sample_input();
        input.batch_id = " ".into();
        assert_eq!(input.validate(), Err(ValidationError::MissingField("batch_id")));

        let mut input = sample_input();
        input.batch_id = "a/b".into();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidBatchId { .. })
        ));

        let mut input = sample_input();
        input.product = String::new();
        assert_eq!(input.validate(), Err(ValidationError::MissingField("product")));

        let mut input = sample_input();
        input.village.name = String::new();
        assert_eq!(input.validate(), Err(ValidationError::MissingField("village.name")));

        let mut input = sample_input();
        input.farmers.clear();
        assert_eq!(input.validate(), Err(ValidationError::EmptyCollection("farmers")));
    }

    #[test]
    fn missing_identity_fields_are_validation_errors() {
        let input: NewBatch = serde_json::from_value(json!({
            "batch_id": "B1", "product": "rajma", "village": null, "farmers": [{}]
        }))
        .unwrap();
        assert_eq!(input.validate(), Err(ValidationError::MissingField("village.name")));

        let input: NewBatch = serde_json::from_value(json!({"product": "rajma"})).unwrap();
        assert_eq!(input.validate(), Err(ValidationError::MissingField("batch_id")));
    }

    #[test]
    fn mistyped_profile_is_rejected() {
        let parsed = serde_json::from_value::<NewBatch>(json!({
            "batch_id": "B1", "product": "rajma", "village": {"name": "X"},
            "farmers": [{"media": {"image_links": "not-a-list"}}]
        }));
        assert!(parsed.is_err());
    }
}
