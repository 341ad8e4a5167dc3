// The Speaker Handbook: keyed by `speaker_id`, falling back to the store key.
// Only a display name is published.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakerbaseError};

use super::{
    first_text, native_id, primary_key, raw, record_id, source_info, strings, text, SourceKind,
};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::SpeakerHandbook;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = native_id(doc.get("speaker_id"))
        .or_else(|| primary_key(doc))
        .ok_or(SpeakerbaseError::MissingIdentifier {
            source_name: KIND.database(),
            field: "speaker_id",
        })?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "profile_url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "display_name");
    record.display_name = record.name.clone();
    record.job_title = text(doc, "job_title");
    record.biography = text(doc, "biography");

    let location = ["travels_from", "home_country"]
        .into_iter()
        .filter_map(|key| raw(doc, key))
        .find(|value| !matches!(value, Value::String(s) if s.trim().is_empty()));
    record.location = parse_location(location.as_ref());

    record.set_topics(vocab.normalize(strings(doc, "topics")));
    record.media = Media {
        profile_image: first_text(doc, &["image_url_hd", "image_url"]),
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

    #[test]
    fn maps_display_name_and_hd_image() {
        let doc = json!({
            "_id": { "$oid": "65a6b7c8d9e0f1a2b3c4d5eb" },
            "speaker_id": "tsh-300",
            "display_name": "Dr. Jane Doe",
            "job_title": "Futurist",
            "travels_from": "Austin, TX, USA",
            "home_country": "USA",
            "topics": ["Leading Teams"],
            "image_url": "https://tsh.com/low.jpg",
            "image_url_hd": "https://tsh.com/hd.jpg",
            "profile_url": "https://thespeakerhandbook.com/speaker/tsh-300"
        });
        let record = transform(&doc, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("tsh", "tsh-300"));
        assert_eq!(record.name.as_deref(), Some("Dr. Jane Doe"));
        assert_eq!(record.display_name, record.name);
        assert_eq!(record.city(), Some("Austin"));
        assert_eq!(record.media.unwrap().profile_image.as_deref(), Some("https://tsh.com/hd.jpg"));
        assert!(record.topics.contains("Leadership"));
        assert_eq!(record.source_info.original_source, "thespeakerhandbook");
    }

    #[test]
    fn falls_back_to_store_key_and_home_country() {
        let doc = json!({
            "_id": { "$oid": "65a6b7c8d9e0f1a2b3c4d5ec" },
            "display_name": "No Id",
            "travels_from": "",
            "home_country": "Canada"
        });
        let record = transform(&doc, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("tsh", "65a6b7c8d9e0f1a2b3c4d5ec"));
        assert_eq!(record.city(), None);
        assert_eq!(record.location.country.as_deref(), Some("Canada"));
    }

    #[test]
    fn no_identifier_is_rejected() {
        let err = transform(&json!({ "display_name": "Ghost" }), &test_vocabulary()).unwrap_err();
        assert!(matches!(err, SpeakerbaseError::MissingIdentifier { field: "speaker_id", .. }));
    }
}
