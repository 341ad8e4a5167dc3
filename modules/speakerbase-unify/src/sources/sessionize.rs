// Sessionize: profile fields are nested under `basic_info`, topics under
// `professional_info`, the scrape time under `metadata`. Keyed by username,
// falling back to the store key.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakerbaseError};

use super::{first_text, primary_key, record_id, source_info, strings, text, SourceKind};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::Sessionize;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let username = first_text(doc, &["/basic_info/username", "username"])
        .or_else(|| primary_key(doc))
        .ok_or(SpeakerbaseError::MissingIdentifier {
            source_name: KIND.database(),
            field: "username",
        })?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &username),
        source_info(
            KIND,
            text(doc, "/basic_info/url"),
            doc.pointer("/metadata/scraped_at"),
            Some(username),
        ),
    );

    record.name = first_text(doc, &["/basic_info/name", "name"]);
    record.display_name = record.name.clone();
    record.tagline = text(doc, "/basic_info/tagline");
    record.biography = text(doc, "/basic_info/bio");
    record.location = parse_location(doc.pointer("/basic_info/location"));
    record.set_topics(vocab.normalize(strings(doc, "/professional_info/topics")));
    record.media = Media {
        profile_image: text(doc, "/basic_info/profile_picture"),
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
            "_id": { "$oid": "65a6b7c8d9e0f1a2b3c4d5ea" },
            "basic_info": {
                "username": "jdoe",
                "name": "Jane Doe",
                "tagline": "Distributed systems nerd",
                "bio": "Builds databases.",
                "location": "Austin, TX, USA",
                "profile_picture": "https://sessionize.com/image/jdoe.jpg",
                "url": "https://sessionize.com/jdoe"
            },
            "professional_info": { "topics": ["AI", "Databases"] },
            "metadata": { "scraped_at": "2025-01-16T10:30:00Z" }
        })
    }

    #[test]
    fn reads_nested_profile() {
        let record = transform(&doc(), &test_vocabulary()).unwrap();
        assert_eq!(record.id, "c75d7c2f491c30666d18fdcecd0f6ea31ec8a2f9");
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.tagline.as_deref(), Some("Distributed systems nerd"));
        assert_eq!(record.city(), Some("Austin"));
        assert!(record.topics.contains("Artificial Intelligence"));
        assert!(record.topics_unmapped.contains("Databases"));
        assert_eq!(record.source_info.source_id.as_deref(), Some("jdoe"));
        assert_eq!(record.source_info.source_url.as_deref(), Some("https://sessionize.com/jdoe"));
    }

    #[test]
    fn scrape_time_comes_from_metadata() {
        let mut d = doc();
        d["scraped_at"] = json!("1999-01-01T00:00:00Z");
        let record = transform(&d, &test_vocabulary()).unwrap();
        let scraped = record.source_info.scraped_at.unwrap();
        assert_eq!(scraped.to_rfc3339(), "2025-01-16T10:30:00+00:00");
    }

    #[test]
    fn falls_back_to_top_level_then_store_key() {
        let flat = json!({ "_id": "x1", "username": "flat", "name": "Flat Name" });
        let record = transform(&flat, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("sessionize", "flat"));
        assert_eq!(record.name.as_deref(), Some("Flat Name"));

        let bare = json!({ "_id": "x2", "basic_info": { "username": "" } });
        let record = transform(&bare, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("sessionize", "x2"));
        assert_eq!(record.name, None);
    }

    #[test]
    fn no_identifier_at_all_is_rejected() {
        let err = transform(&json!({ "basic_info": {} }), &test_vocabulary()).unwrap_err();
        assert!(matches!(err, SpeakerbaseError::MissingIdentifier { field: "username", .. }));
    }
}
