//! Expansion of a named ladder profile into the per-stream ladder section

use crate::models::{
    AudioTracks, LadderConfig, LadderProfile, LadderSpec, MediaType, AUDIO_INDEX_SLOTS,
};

/// Build the ladder section for a stream from a profile and its audio tracks.
///
/// Video renditions are copied as-is. Each recorded audio track gets one
/// rendition matched by channel count, falling back to the profile's first
/// audio rendition. Exactly one track is tagged default: the only recorded
/// track on an initial application, otherwise the first track the caller
/// flagged, otherwise the first recorded track. More recorded tracks than
/// [`AUDIO_INDEX_SLOTS`] is an error.
pub fn build_ladder_config(
    profile: &LadderProfile,
    audio: &AudioTracks,
    initial: bool,
) -> Result<LadderConfig, String> {
    let mut ladder_specs = Vec::new();

    for rendition in &profile.ladder_specs.video {
        ladder_specs.push(LadderSpec {
            media_type: MediaType::Video,
            representation: format!(
                "videovideo_{}x{}_h264@{}",
                rendition.width, rendition.height, rendition.bit_rate
            ),
            bit_rate: rendition.bit_rate,
            codecs: rendition.codecs.clone(),
            stream_index: 0,
            stream_name: "video".to_string(),
            width: Some(rendition.width),
            height: Some(rendition.height),
            channels: None,
            stream_label: None,
            lang: None,
            default: false,
        });
    }

    let active: Vec<_> = audio.iter().filter(|(_, track)| track.record).collect();
    if !active.is_empty() && profile.ladder_specs.audio.is_empty() {
        return Err(format!("profile \"{}\" has no audio renditions", profile.name));
    }
    if active.len() > AUDIO_INDEX_SLOTS {
        return Err(format!(
            "{} recorded audio tracks, at most {AUDIO_INDEX_SLOTS} are supported",
            active.len()
        ));
    }

    let default_index = if initial && active.len() == 1 {
        active.first().map(|(index, _)| **index)
    } else {
        active
            .iter()
            .find(|(_, track)| track.default)
            .or_else(|| active.first())
            .map(|(index, _)| **index)
    };

    let mut audio_index = [0u32; AUDIO_INDEX_SLOTS];
    for (slot, (stream_index, track)) in active.iter().enumerate() {
        let rendition = profile
            .ladder_specs
            .audio
            .iter()
            .find(|r| Some(r.channels) == track.recording_channels)
            .or_else(|| profile.ladder_specs.audio.first())
            .ok_or_else(|| format!("profile \"{}\" has no audio renditions", profile.name))?;

        audio_index[slot] = **stream_index;

        ladder_specs.push(LadderSpec {
            media_type: MediaType::Audio,
            representation: format!("audio_{}@{}", stream_index, rendition.bit_rate),
            bit_rate: rendition.bit_rate,
            codecs: rendition.codecs.clone(),
            stream_index: **stream_index,
            stream_name: format!("audio_{stream_index}"),
            width: None,
            height: None,
            channels: Some(track.recording_channels.unwrap_or(rendition.channels)),
            stream_label: track.playout_label.clone(),
            lang: track.lang.clone(),
            default: default_index == Some(**stream_index),
        });
    }

    let max_bitrate = |media_type: MediaType| {
        ladder_specs
            .iter()
            .filter(|spec| spec.media_type == media_type)
            .map(|spec| spec.bit_rate)
            .max()
            .unwrap_or(0)
    };
    let audio_bitrate = max_bitrate(MediaType::Audio);
    let video_bitrate = max_bitrate(MediaType::Video);

    Ok(LadderConfig {
        n_audio: u32::try_from(active.len()).map_err(|e| e.to_string())?,
        audio_bitrate,
        video_bitrate,
        audio_index,
        ladder_specs,
    })
}
