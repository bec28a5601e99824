//! Integration tests for the public codec surface
//!
//! These exercise the translation functions the console and command line
//! share, through the crate's public API only.
//!
//! Run with: cargo test --test codec

use chrono::Utc;
use serde_json::json;

use livedesk_core::codec::{
    build_ladder_config, decode_live_config, encode_live_config, slugify, LiveConfigFields,
};
use livedesk_core::models::{
    AudioRendition, AudioTrackConfig, AudioTracks, LadderProfile, PeriodAvailability,
    ProfileDocument, ProfileLadder, RecordingPeriod, Retention, VideoRendition,
};
use livedesk_core::validation::validate_copy_selection;

fn profiles() -> ProfileDocument {
    serde_json::from_value(json!({
        "default": {
            "name": "Default",
            "ladder_specs": {
                "video": [
                    { "bit_rate": 9_500_000, "codecs": "avc1.640028", "height": 1080, "width": 1920 },
                    { "bit_rate": 4_500_000, "codecs": "avc1.640028", "height": 720, "width": 1280 },
                ],
                "audio": [
                    { "bit_rate": 192_000, "channels": 2, "codecs": "mp4a.40.2" },
                ],
            },
        },
        "custom": [],
    }))
    .unwrap()
}

#[test]
fn test_slugs_are_stable_identifiers() {
    for name in ["Test Stream", "  Main   Feed #2 ", "Über Café", "---", ""] {
        let slug = slugify(name);
        assert_eq!(slugify(&slug), slug);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }
    assert_eq!(slugify("Test Stream"), "test-stream");
}

#[test]
fn test_form_to_document_to_ladder() {
    let mut audio = AudioTracks::new();
    audio.insert(
        1,
        AudioTrackConfig {
            record: true,
            playout: true,
            lang: Some("en".into()),
            recording_channels: Some(2),
            ..AudioTrackConfig::default()
        },
    );
    audio.insert(2, AudioTrackConfig::default());

    let fields = LiveConfigFields {
        encryption: "drm-all".into(),
        retention: Retention::parse("86400").unwrap(),
        audio,
        url: Some("srt://origin.example:9000".into()),
        ..LiveConfigFields::default()
    };

    let document = serde_json::to_value(encode_live_config(&fields)).unwrap();
    assert_eq!(document["drm"], "drm");
    assert_eq!(document["drm_type"], "drm-all");
    assert!(document["audio"].get("2").is_none());

    let decoded = decode_live_config(Some(&document)).unwrap();
    assert_eq!(decoded.audio.len(), 1);

    let doc = profiles();
    let profile = doc.resolve(decoded.playout_profile.as_deref()).unwrap();
    let ladder = build_ladder_config(profile, &decoded.audio, true).unwrap();
    assert_eq!(ladder.n_audio, 1);
    assert_eq!(ladder.video_bitrate, 9_500_000);
    assert_eq!(ladder.audio_index[0], 1);
    assert!(ladder.ladder_specs.iter().any(|spec| spec.default));
}

#[test]
fn test_unknown_custom_profile_does_not_resolve() {
    let mut doc = profiles();
    doc.custom.push(LadderProfile {
        name: "hd".into(),
        ladder_specs: ProfileLadder {
            video: vec![VideoRendition { bit_rate: 4_500_000, codecs: String::new(), height: 720, width: 1280 }],
            audio: vec![AudioRendition { bit_rate: 128_000, channels: 2, codecs: String::new() }],
        },
    });
    assert!(doc.resolve(Some("hd")).is_some());
    assert!(doc.resolve(Some("uhd")).is_none());
}

#[test]
fn test_period_selection_from_metadata() {
    let now = Utc::now().timestamp();
    let recordings = json!({
        "live_offering": [
            {
                "start_time_epoch_sec": now - 7200,
                "end_time_epoch_sec": now - 3600,
                "sources": { "video": { "parts": [{}, {}, {}] }, "audio": { "parts": [{}] } },
            },
            {
                "start_time_epoch_sec": now - 600,
                "end_time_epoch_sec": now - 590,
                "sources": { "video": { "parts": [{}] } },
            },
        ]
    });

    let views: Vec<_> = RecordingPeriod::list_from_metadata(&recordings)
        .into_iter()
        .map(|period| livedesk_core::models::PeriodView {
            availability: period.availability(Retention::Seconds(86_400), Utc::now()),
            period,
        })
        .collect();

    assert_eq!(views[0].availability, PeriodAvailability::Available);
    assert_eq!(views[1].availability, PeriodAvailability::TooShort);
    assert!(validate_copy_selection(&views, &[0]).is_none());
    assert!(validate_copy_selection(&views, &[0, 1]).is_some());
    assert!(validate_copy_selection(&views, &[]).is_some());
}
