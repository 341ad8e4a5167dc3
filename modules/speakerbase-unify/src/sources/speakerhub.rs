// SpeakerHub: keyed by `_id`. Location parts are flat top-level fields and
// several attributes have an alternate field name.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakingInfo};

use super::{first_text, raw, record_id, require_id, source_info, strings, text, SourceKind};
use crate::location::structured_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::SpeakerHub;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "profile_url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.job_title = first_text(doc, &["job_title", "professional_title"]);
    record.biography = first_text(doc, &["full_bio", "bio_summary"]);

    let state = first_text(doc, &["state_province", "state"]);
    record.location = structured_location(
        text(doc, "city").as_deref(),
        state.as_deref(),
        text(doc, "country").as_deref(),
    );

    record.speaking_info = SpeakingInfo {
        fee_ranges: fees(doc),
        languages: None,
    }
    .non_empty();

    let mut raw_topics = strings(doc, "topic_categories");
    raw_topics.extend(strings(doc, "topics"));
    record.set_topics(vocab.normalize(raw_topics));

    record.media = Media {
        profile_image: first_text(doc, &["profile_picture_url", "profile_picture"]),
        videos: None,
    }
    .non_empty();

    Ok(record)
}

fn fees(doc: &Value) -> Option<Value> {
    ["speaker_fees", "fee_range"]
        .into_iter()
        .filter_map(|key| raw(doc, key))
        .find(|fee| !matches!(fee, Value::String(s) if s.trim().is_empty()))
}
