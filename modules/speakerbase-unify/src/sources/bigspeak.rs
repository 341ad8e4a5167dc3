// BigSpeak: keyed by `speaker_id`. The location arrives pre-structured under
// `location.travels_from`; `description` doubles as the biography.

use serde_json::{json, Value};

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakingInfo};

use super::{field_strings, raw, record_id, require_id, source_info, text, SourceKind};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::BigSpeak;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "speaker_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "profile_url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.description = text(doc, "description");
    record.biography = record.description.clone();
    record.location = parse_location(doc.pointer("/location/travels_from"));
    record.speaking_info = SpeakingInfo {
        fee_ranges: raw(doc, "fee_range").map(|fee| json!({ "live_event": fee })),
        languages: None,
    }
    .non_empty();
    record.set_topics(vocab.normalize(field_strings(doc, "topics", "name")));
    record.media = Media {
        profile_image: text(doc, "image_url"),
        videos: None,
    }
    .non_empty();

    Ok(record)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sources::test_vocabulary;

    fn doc() -> Value {
        json!({
            "speaker_id": "bs-77",
            "name": "Ada Lovelace",
            "description": "Pioneer of computing.",
            "location": {
                "travels_from": { "city": "London", "country": "United Kingdom" }
            },
            "fee_range": "$30,001 - $50,000",
            "topics": [{ "name": "AI" }, { "name": "History of Computing" }],
            "image_url": "https://bigspeak.com/ada.jpg",
            "profile_url": "https://www.bigspeak.com/speakers/ada-lovelace/",
            "scraped_at": "2025-01-12 14:02:11"
        })
    }

    #[test]
    fn description_doubles_as_biography() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(record.biography, record.description);
        assert_eq!(record.job_title, None);
    }

    #[test]
    fn structured_location_passes_through() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(record.location.city.as_deref(), Some("London"));
        assert_eq!(record.location.state, None);
        assert_eq!(record.location.full_location.as_deref(), Some("London, United Kingdom"));
    }

    #[test]
    fn text_location_is_parsed() {
        let mut d = doc();
        d["location"]["travels_from"] = json!("Seattle, WA, USA");
        let record = transform(&d, &test_vocabulary()).unwrap();
        assert_eq!(record.location.state.as_deref(), Some("WA"));
    }

    #[test]
    fn topics_come_from_named_objects() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert!(record.topics.contains("Artificial Intelligence"));
        assert!(record.topics_unmapped.contains("History of Computing"));
    }

    #[test]
    fn naive_scrape_time_is_parsed() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert!(record.source_info.scraped_at.is_some());
        assert_eq!(
            record.source_info.source_url.as_deref(),
            Some("https://www.bigspeak.com/speakers/ada-lovelace/")
        );
    }
}
