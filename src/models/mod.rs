//! Data models for Labbook

pub mod availability;
pub mod booking;
pub mod closure;
pub mod credit;
pub mod equipment;
pub mod slot;
pub mod user;

// Re-export commonly used types
pub use availability::{ClosedReason, SlotAvailability, SlotState, WeekAvailability};
pub use booking::{Booking, BookingStatus, SlotKey};
pub use closure::Closure;
pub use credit::{CreditAccount, CreditTransaction, StudentCreditUsage};
pub use equipment::{Equipment, EquipmentStatus, LabHours};
pub use slot::{SlotLabel, SlotTemplate};
pub use user::{Actor, Role, User, UserClaims};

/// Serde helpers for `HH:MM` times of day
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(value: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Same format for optional fields
    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
