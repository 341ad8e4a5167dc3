// A-Speakers: flat documents, no business identifier (keyed by `_id`).
// Ratings are split across `average_rating` / `total_reviews`.

use serde_json::{json, Map, Value};

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakingInfo};

use super::{raw, record_id, require_id, source_info, strings, text, SourceKind};
use crate::location::parse_location;
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::ASpeakers;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let native = require_id(doc, "_id", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &native),
        source_info(KIND, text(doc, "url"), doc.get("scraped_at"), Some(native)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.job_title = text(doc, "job_title");
    record.description = text(doc, "description");
    record.biography = text(doc, "full_bio");
    record.location = parse_location(doc.get("location"));

    let languages = strings(doc, "languages");
    record.speaking_info = SpeakingInfo {
        fee_ranges: raw(doc, "fee_range").map(|fee| json!({ "live_event": fee })),
        languages: (!languages.is_empty()).then_some(languages),
    }
    .non_empty();

    record.set_topics(vocab.normalize(strings(doc, "topics")));
    record.keynotes = raw(doc, "keynotes");
    record.reviews = raw(doc, "reviews");
    record.ratings = ratings(doc);
    record.media = Media {
        profile_image: text(doc, "image_url"),
        videos: raw(doc, "videos"),
    }
    .non_empty();

    Ok(record)
}

fn ratings(doc: &Value) -> Option<Value> {
    let mut out = Map::new();
    for key in ["average_rating", "total_reviews"] {
        if let Some(v) = raw(doc, key) {
            out.insert(key.to_string(), v);
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}
