use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_aux::field_attributes::deserialize_number_from_string;

// the frontend takes category ids from the keys of the categories object, so
// they arrive as strings; question ids arrive as numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LenientId(#[serde(deserialize_with = "deserialize_number_from_string")] pub i64);

impl From<LenientId> for i64 {
    fn from(id: LenientId) -> Self {
        id.0
    }
}

/// An integer given as a JSON integer, a whole JSON float (`2.0`) or a
/// numeric string with surrounding whitespace (`" 3 "`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLike(pub i64);

impl<'de> Deserialize<'de> for IntLike {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Ok(IntLike(value)),
            Raw::Float(value) => whole_number(value)
                .map(IntLike)
                .ok_or_else(|| D::Error::custom(format!("{value} is not a whole number"))),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(IntLike)
                .map_err(|_| D::Error::custom(format!("{text:?} is not an integer"))),
        }
    }
}

fn whole_number(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

impl From<IntLike> for i64 {
    fn from(value: IntLike) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_like_accepts_whole_values() {
        let values: Vec<IntLike> =
            serde_json::from_str(r#"[4, 2.0, " 3 ", "5", "+6", -1.0]"#).unwrap();
        assert_eq!(
            values,
            [
                IntLike(4),
                IntLike(2),
                IntLike(3),
                IntLike(5),
                IntLike(6),
                IntLike(-1)
            ]
        );
    }

    #[test]
    fn int_like_rejects_fractions_and_text() {
        for raw in [r#"2.5"#, r#""hard""#, r#""2.0""#, "null", "true", "1e300"] {
            assert!(serde_json::from_str::<IntLike>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let ids: Vec<LenientId> = serde_json::from_str(r#"[1, "2", 30]"#).unwrap();
        assert_eq!(ids, [LenientId(1), LenientId(2), LenientId(30)]);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(serde_json::from_str::<LenientId>(r#""two""#).is_err());
        assert!(serde_json::from_str::<LenientId>("null").is_err());
    }
}
