//! Notification content: the image composition sent to the renderer and the
//! caption posted with the rendered image.

use ath_core::config::MediaTemplate;
use ath_core::format::{format_long_date, format_usd};
use ath_core::types::{MediaSpec, TextOverlay};
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Render `template` for a high of `high` dollars. Every overlay shows the
/// price rounded to whole dollars, e.g. `$61,000`.
pub fn compose_media(template: &MediaTemplate, high: f64) -> MediaSpec {
    let text = format_usd(high, 0);
    MediaSpec {
        image: template.image.clone(),
        width: template.width,
        height: template.height,
        font: template.font.clone(),
        texts: template
            .texts
            .iter()
            .map(|s| TextOverlay {
                text: text.clone(),
                size: s.size,
                color: s.color.clone(),
                x: s.x,
                y: s.y,
            })
            .collect(),
    }
}

/// Caption settings that do not change per post.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub asset_name: String,
    pub offset: FixedOffset,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self { asset_name: "Bitcoin".to_string(), offset: Utc.fix() }
    }
}

/// Caption for the social post announcing `high` on `exchange`.
pub fn compose_caption(
    style: &CaptionStyle,
    exchange: &str,
    high: f64,
    time: DateTime<Utc>,
) -> String {
    format!(
        "🎉🎉 NEW ALL TIME HIGH 🎉🎉\n\n 1 {} = {} USD\n\n {} on {}",
        style.asset_name,
        format_usd(high, 2),
        format_long_date(&time.with_timezone(&style.offset)),
        exchange.to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use ath_core::config::TextStyle;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn default_template_renders_eight_price_overlays() {
        let media = compose_media(&MediaTemplate::default(), 61000.0);
        assert_eq!(media.image, "./images/bitcoin-clouds-1012x506.png");
        assert_eq!((media.width, media.height), (1012, 506));
        assert_eq!(media.font, "images/Roboto-Bold.ttf");
        assert_eq!(media.texts.len(), 8);
        assert!(media.texts.iter().all(|t| t.text == "$61,000"));

        let big = media.texts.last().unwrap();
        assert_eq!((big.size, big.color.as_str(), big.x, big.y), (120, "#ffffff", 400, 190));
        assert_eq!(media.texts.iter().filter(|t| t.size == 40).count(), 7);
    }

    #[test]
    fn custom_template_is_followed() {
        let template = MediaTemplate {
            image: "bg.png".into(),
            width: 10,
            height: 20,
            font: "f.ttf".into(),
            texts: vec![TextStyle { size: 9, color: "#000".into(), x: 1, y: 2 }],
        };
        let media = compose_media(&template, 1234.56);
        assert_eq!(
            media.texts,
            vec![TextOverlay { text: "$1,235".into(), size: 9, color: "#000".into(), x: 1, y: 2 }]
        );
    }

    #[test]
    fn caption_matches_announcement_format() {
        let t = Utc.with_ymd_and_hms(2017, 12, 17, 12, 0, 0).unwrap();
        let caption = compose_caption(&CaptionStyle::default(), "gdax", 19650.01, t);
        assert_eq!(
            caption,
            "🎉🎉 NEW ALL TIME HIGH 🎉🎉\n\n 1 Bitcoin = $19,650.01 USD\n\n \
             Sunday, December 17th 2017, 12:00:00 pm on GDAX"
        );
    }

    #[test]
    fn caption_uses_configured_asset_and_offset() {
        let style = CaptionStyle {
            asset_name: "Ether".into(),
            offset: FixedOffset::west_opt(5 * 3600).unwrap(),
        };
        let t = Utc.with_ymd_and_hms(2021, 3, 1, 3, 30, 0).unwrap();
        let caption = compose_caption(&style, "bitstamp", 1500.0, t);
        assert!(caption.contains("1 Ether = $1,500.00 USD"));
        assert!(caption.ends_with("Sunday, February 28th 2021, 10:30:00 pm on BITSTAMP"));
    }
}
