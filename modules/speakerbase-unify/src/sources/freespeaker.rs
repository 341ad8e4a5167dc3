// FreeSpeakerBureau: no business identifier (keyed by `_id`). Expertise areas
// and speaking topics both count as topics. No fee data.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Contact, Media, Result};

use super::{record_id, require_id, source_info, strings, text, SourceKind};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::FreeSpeaker;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "profile_url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.job_title = text(doc, "role");
    record.biography = text(doc, "biography");
    record.location = parse_location(doc.get("location"));

    let mut raw_topics = strings(doc, "areas_of_expertise");
    raw_topics.extend(strings(doc, "speaking_topics"));
    record.set_topics(vocab.normalize(raw_topics));

    record.media = Media {
        profile_image: text(doc, "image_url"),
        videos: None,
    }
    .non_empty();
    record.contact = Contact {
        email: None,
        phone: text(doc, "/contact_info/phone"),
        website: text(doc, "website"),
    }
    .non_empty();

    Ok(record)
}
