use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which half of the month a period covers. Derived from `period_ending`
/// alone: the 15th always closes S1, anything else closes S2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubPeriod {
    FirstHalf,
    SecondHalf,
}

impl SubPeriod {
    pub fn of(period_ending: NaiveDate) -> Self {
        if period_ending.day() == 15 {
            Self::FirstHalf
        } else {
            Self::SecondHalf
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FirstHalf => "S1",
            Self::SecondHalf => "S2",
        }
    }
}

/// One bi-monthly timesheet document's metadata.
///
/// `dates` holds the weekday dates the document covers, strictly increasing
/// and wholly inside the sub-period. `period_ending` is the true calendar end
/// of the sub-period and is never weekend-adjusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: Uuid,

    pub period_ending: NaiveDate,

    pub dates: Vec<NaiveDate>,

    #[serde(default)]
    pub manager_name: String,

    #[serde(default)]
    pub employee_id: String,

    #[serde(default)]
    pub downloaded: bool,

    #[serde(default)]
    pub uploaded: bool,

    #[serde(default, with = "upload_stamp_serde")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Period {
    pub fn new(period_ending: NaiveDate, dates: Vec<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            period_ending,
            dates,
            manager_name: String::new(),
            employee_id: String::new(),
            downloaded: false,
            uploaded: false,
            uploaded_at: None,
        }
    }

    pub fn sub_period(&self) -> SubPeriod {
        SubPeriod::of(self.period_ending)
    }

    /// A signed copy came back; `downloaded` is expected to already be set
    /// but that is the caller's concern, not enforced here.
    pub fn mark_uploaded(&mut self, now: DateTime<Utc>) {
        self.uploaded = true;
        self.uploaded_at = Some(now);
    }
}

/// A person on the roster, owning their periods in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    pub company: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub contact_number: String,

    #[serde(default)]
    pub manager: String,

    #[serde(default)]
    pub employee_id: String,

    #[serde(default)]
    pub timesheets: Vec<Period>,
}

impl Candidate {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            company: String::new(),
            email: String::new(),
            contact_number: String::new(),
            manager: String::new(),
            employee_id: String::new(),
            timesheets: vec![],
        }
    }
}

mod upload_stamp_serde {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y%m%dT%H%M%SZ";

    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(value) => serializer.serialize_str(&value.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            Some(raw) => NaiveDateTime::parse_from_str(&raw, FORMAT)
                .map(|ndt| Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::{Period, SubPeriod};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn sub_period_follows_period_ending() {
        assert_eq!(SubPeriod::of(date(2025, 1, 15)), SubPeriod::FirstHalf);
        assert_eq!(SubPeriod::of(date(2025, 1, 31)), SubPeriod::SecondHalf);
        assert_eq!(SubPeriod::of(date(2024, 2, 29)), SubPeriod::SecondHalf);
    }

    #[test]
    fn upload_stamp_roundtrips_through_json() {
        let mut period = Period::new(date(2025, 1, 15), vec![date(2025, 1, 1)]);
        period.mark_uploaded(
            chrono::Utc
                .with_ymd_and_hms(2025, 1, 16, 9, 30, 0)
                .single()
                .expect("valid stamp"),
        );

        let raw = serde_json::to_string(&period).expect("serialize period");
        assert!(raw.contains("20250116T093000Z"));

        let back: Period = serde_json::from_str(&raw).expect("deserialize period");
        assert!(back.uploaded);
        assert_eq!(back.uploaded_at, period.uploaded_at);
    }
}
