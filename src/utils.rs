use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serializer;

/// Stored timestamps are naive UTC; they go out as RFC 3339 with
/// millisecond precision.
pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = Utc
        .from_utc_datetime(date)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

/// First `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Stamp {
        #[serde(serialize_with = "serialize_date")]
        at: NaiveDateTime,
    }

    #[test]
    fn dates_are_rfc3339_millis() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 5, 250)
            .unwrap();
        let json = serde_json::to_string(&Stamp { at }).unwrap();
        assert_eq!(json, r#"{"at":"2024-03-01T12:30:05.250Z"}"#);
    }

    #[test]
    fn truncation_respects_characters() {
        assert_eq!(truncate_chars("Тестовый текст поста", 15), "Тестовый текст ");
        assert_eq!(truncate_chars("short", 15), "short");
    }
}
