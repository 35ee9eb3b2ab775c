use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

/// Characters left verbatim when a photo filename is embedded in a URL path.
pub(crate) const SAFE_PATH_SEGMENT: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Route prefix under which stored photo bytes are served.
pub const PHOTO_ROUTE: &str = "/images";

/// Server-to-client messages on the kiosk realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KioskEvent {
    /// Switch the displayed photo to `url`.
    UpdateImage { url: String },
}

impl KioskEvent {
    /// Build an `update_image` event for a stored photo filename.
    pub fn update_image(filename: &str) -> Self {
        Self::UpdateImage {
            url: photo_url(filename),
        }
    }
}

/// URL under which a stored photo is served.
pub fn photo_url(filename: &str) -> String {
    format!(
        "{PHOTO_ROUTE}/{}",
        utf8_percent_encode(filename, SAFE_PATH_SEGMENT)
    )
}

#[cfg(test)]
mod tests {
    use super::{KioskEvent, photo_url};

    #[test]
    fn update_image_serializes_to_tagged_json() {
        let event = KioskEvent::update_image("a.jpg");
        let json = serde_json::to_string(&event).expect("serialize event");
        assert_eq!(json, r#"{"event":"update_image","url":"/images/a.jpg"}"#);
    }

    #[test]
    fn photo_url_escapes_unsafe_characters() {
        assert_eq!(photo_url("summer trip.jpg"), "/images/summer%20trip.jpg");
        assert_eq!(photo_url("cat.png"), "/images/cat.png");
    }
}
