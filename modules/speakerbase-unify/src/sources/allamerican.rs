// AllAmericanSpeakers: keyed by `speaker_id`. Topics come from both the flat
// `categories` list and the titles of `speaking_topics`; the latter also feed
// `keynotes`. Images are a typed list; only the profile image is kept.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakingInfo};

use super::{field_strings, raw, record_id, require_id, source_info, strings, text, SourceKind};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::AllAmerican;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "speaker_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.job_title = text(doc, "job_title");
    record.biography = text(doc, "biography");
    record.location = parse_location(doc.get("location"));
    record.speaking_info = SpeakingInfo {
        fee_ranges: raw(doc, "fee_range"),
        languages: None,
    }
    .non_empty();

    let mut raw_topics = strings(doc, "categories");
    raw_topics.extend(field_strings(doc, "speaking_topics", "title"));
    record.set_topics(vocab.normalize(raw_topics));

    record.keynotes = raw(doc, "speaking_topics");
    record.media = Media {
        profile_image: profile_image(doc),
        videos: raw(doc, "videos"),
    }
    .non_empty();
    record.ratings = raw(doc, "rating");
    record.reviews = raw(doc, "reviews");

    Ok(record)
}

fn profile_image(doc: &Value) -> Option<String> {
    doc.get("images")?
        .as_array()?
        .iter()
        .find(|img| img.get("type").and_then(Value::as_str) == Some("profile"))
        .and_then(|img| img.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use speakerbase_common::SpeakerbaseError;

    use super::*;
    use crate::sources::test_vocabulary;

    fn doc() -> Value {
        json!({
            "_id": { "$oid": "65a6b7c8d9e0f1a2b3c4d5e7" },
            "speaker_id": "aas-1042",
            "name": "John Smith",
            "job_title": "Former CEO",
            "biography": "Ran things.",
            "location": "Chicago, IL, USA",
            "fee_range": { "min": 20000, "max": 30000 },
            "categories": ["Executive Leadership"],
            "speaking_topics": [
                { "title": "Machine Learning", "description": "..." },
                { "title": "Turnarounds" }
            ],
            "images": [
                { "type": "banner", "url": "https://aas.com/banner.jpg" },
                { "type": "profile", "url": "https://aas.com/profile.jpg" }
            ],
            "rating": { "average": 4.5, "count": 8 },
            "url": "https://www.allamericanspeakers.com/speakers/1042"
        })
    }

    #[test]
    fn keyed_by_speaker_id() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("allamerican", "aas-1042"));
        assert_eq!(record.source_info.source_id.as_deref(), Some("aas-1042"));
        assert_eq!(record.source_info.original_source, "allamericanspeakers");
    }

    #[test]
    fn topics_merge_categories_and_keynote_titles() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(
            record.topics.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Artificial Intelligence", "Leadership", "Turnarounds"]
        );
        assert_eq!(record.keynotes.as_ref().and_then(Value::as_array).map(Vec::len), Some(2));
    }

    #[test]
    fn picks_profile_image_from_typed_list() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(
            record.media.unwrap().profile_image.as_deref(),
            Some("https://aas.com/profile.jpg")
        );
    }

    #[test]
    fn passes_fee_and_rating_structures_through() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(
            record.speaking_info.unwrap().fee_ranges,
            Some(json!({ "min": 20000, "max": 30000 }))
        );
        assert_eq!(record.ratings, Some(json!({ "average": 4.5, "count": 8 })));
        assert_eq!(record.reviews, None);
    }

    #[test]
    fn missing_speaker_id_is_rejected() {
        let mut d = doc();
        d.as_object_mut().unwrap().remove("speaker_id");
        let err = transform(&d, &test_vocabulary()).unwrap_err();
        assert!(matches!(err, SpeakerbaseError::MissingIdentifier { field: "speaker_id", .. }));
    }
}
