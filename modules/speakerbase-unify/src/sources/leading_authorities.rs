// Leading Authorities: keyed by the profile page URL. No location data;
// publications map to `books`.

use serde_json::Value;

use speakerbase_common::{CanonicalSpeaker, Media, Result, SpeakingInfo};

use super::{
    field_strings, primary_key, raw, record_id, require_id, source_info, text, SourceKind,
};
use crate::vocabulary::TopicVocabulary;

const KIND: SourceKind = SourceKind::LeadingAuthorities;

pub(crate) fn transform(doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
    let page_url = require_id(doc, "speaker_page_url", KIND)?;

    let mut record = CanonicalSpeaker::new(
        record_id(KIND.id_tag(), &page_url),
        source_info(KIND, Some(page_url), doc.get("scraped_at"), primary_key(doc)),
    );

    record.name = text(doc, "name");
    record.display_name = record.name.clone();
    record.job_title = text(doc, "job_title");
    record.description = text(doc, "description");
    record.biography = record.description.clone();
    record.speaking_info = SpeakingInfo {
        fee_ranges: raw(doc, "speaker_fees"),
        languages: None,
    }
    .non_empty();
    record.set_topics(vocab.normalize(field_strings(doc, "topics_and_types", "name")));
    record.books = raw(doc, "books_and_publications");
    record.media = Media {
        profile_image: text(doc, "speaker_image_url"),
        videos: raw(doc, "videos"),
    }
    .non_empty();

    Ok(record)
}
