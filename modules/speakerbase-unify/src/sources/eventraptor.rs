// EventRaptor: keyed by `speaker_id`. No location data at all; the only
// source that exposes an email address.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Contact, Media, Result};

use super::{record_id, require_id, source_info, strings, text, SourceKind};
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::EventRaptor;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "speaker_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.tagline = text(doc, "tagline");
    record.biography = text(doc, "biography");
    record.contact = Contact {
        email: text(doc, "email"),
        ..Contact::default()
    }
    .non_empty();
    record.set_topics(vocab.normalize(strings(doc, "business_areas")));
    record.media = Media {
        profile_image: text(doc, "profile_image"),
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
    fn maps_contact_and_business_areas() {
        let doc = json!({
            "speaker_id": "er-5",
            "name": "Grace Hopper",
            "tagline": "It's easier to ask forgiveness",
            "biography": "Rear admiral.",
            "email": "grace@example.com",
            "business_areas": ["Machine Learning", "Compilers"],
            "profile_image": "https://eventraptor.com/g.png",
            "url": "https://app.eventraptor.com/speakers/er-5"
        });

        let record = transform(&doc, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("eventraptor", "er-5"));
        assert_eq!(record.tagline.as_deref(), Some("It's easier to ask forgiveness"));
        assert_eq!(
            record.contact.unwrap().email.as_deref(),
            Some("grace@example.com")
        );
        assert!(record.location.is_empty());
        assert_eq!(record.speaking_info, None);
        assert!(record.topics.contains("Compilers"));
        assert!(record.topics.contains("Artificial Intelligence"));
    }

    #[test]
    fn absent_email_leaves_contact_unset() {
        let doc = json!({ "speaker_id": "er-6", "name": "Anon" });
        let record = transform(&doc, &test_vocabulary()).unwrap();
        assert_eq!(record.contact, None);
        assert_eq!(record.media, None);
        assert!(record.topics.is_empty());
    }

    #[test]
    fn numeric_speaker_id_is_accepted() {
        let doc = json!({ "speaker_id": 991, "name": "Numbered" });
        let record = transform(&doc, &test_vocabulary()).unwrap();
        assert_eq!(record.id, record_id("eventraptor", "991"));
    }
}
