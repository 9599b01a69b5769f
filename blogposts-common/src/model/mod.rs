pub mod post;

use crate::snowflake::{Epoch, Snowflake, SnowflakeGenerator};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected, Visitor},
};
use std::{
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BlogpostsEpoch;
impl Epoch for BlogpostsEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type BlogpostsSnowflake = Snowflake<BlogpostsEpoch>;
pub type BlogpostsSnowflakeGenerator = SnowflakeGenerator<BlogpostsEpoch>;

/// A snowflake tagged with the kind of entity it identifies.
///
/// Serialized as a decimal string since snowflakes do not fit into the 53 bit
/// integers of JSON clients that parse numbers as doubles. Deserializing also
/// accepts plain integers.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Id<Marker>(BlogpostsSnowflake, PhantomData<Marker>);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ParseIdError {
    #[error("Id must be written as plain decimal digits without leading zeros")]
    NotCanonical,
    #[error(transparent)]
    OutOfRange(#[from] ParseIntError),
}

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: BlogpostsSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> BlogpostsSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Only the form [`Display`] produces is accepted, so `"+5"` or `"05"` do not
/// name the id `5`.
impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = !s.is_empty()
            && s.bytes().all(|byte| byte.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if !canonical {
            return Err(ParseIdError::NotCanonical);
        }

        Ok(u64::from_str(s)?.into())
    }
}

impl<Marker> Serialize for Id<Marker> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct IdVisitor<Marker>(PhantomData<Marker>);

impl<Marker> Visitor<'_> for IdVisitor<Marker> {
    type Value = Id<Marker>;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("an id as decimal string or unsigned integer")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(value.into())
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        value
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor(PhantomData))
    }
}

impl<Marker> From<BlogpostsSnowflake> for Id<Marker> {
    fn from(value: BlogpostsSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for BlogpostsSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(BlogpostsSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, ParseIdError, post::PostMarker};
    use serde_json::json;

    #[test]
    fn id_serializes_as_string() {
        let id = Id::<PostMarker>::from(237_891_468_256_083_968_u64);

        assert_eq!(serde_json::to_value(id).unwrap(), json!("237891468256083968"));
        assert_eq!(
            serde_json::from_value::<Id<PostMarker>>(json!("237891468256083968")).unwrap(),
            id
        );
        assert_eq!(
            serde_json::from_value::<Id<PostMarker>>(json!(237_891_468_256_083_968_u64)).unwrap(),
            id
        );
    }

    #[test]
    fn id_parses_canonical_digits_only() {
        assert_eq!("5".parse::<Id<PostMarker>>(), Ok(Id::from(5_u64)));
        assert_eq!("0".parse::<Id<PostMarker>>(), Ok(Id::from(0_u64)));

        for input in ["", "+5", "05", "0005", " 5", "5 ", "-5", "5.0"] {
            assert_eq!(
                input.parse::<Id<PostMarker>>(),
                Err(ParseIdError::NotCanonical),
                "{input:?}"
            );
        }
        assert!(matches!(
            "18446744073709551616".parse::<Id<PostMarker>>(),
            Err(ParseIdError::OutOfRange(_))
        ));
        assert!(serde_json::from_value::<Id<PostMarker>>(json!("+5")).is_err());
    }
}
