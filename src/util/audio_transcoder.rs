/// Audio transcode collaborator for the export executor: decodes a source
/// clip with `symphonia` and re-encodes it to WAV or MP3.
use crate::error::{AppError, AppResult};
use crate::model::AudioFormat;
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

struct DecodedAudio {
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
}

fn decode(source_bytes: Vec<u8>) -> AppResult<DecodedAudio> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(source_bytes)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::transcode(format!("unrecognized audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::transcode("no decodable audio track found"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::transcode(format!("no decoder for this codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u16;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(e) => return Err(AppError::transcode(format!("demux error: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_rate == 0 {
                    sample_rate = decoded.spec().rate;
                    channels = decoded.spec().channels.count() as u16;
                }
                append_samples(&decoded, &mut samples);
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(AppError::transcode(format!("decode error: {}", e))),
        }
    }

    if sample_rate == 0 {
        return Err(AppError::transcode("source audio decoded to zero samples"));
    }

    Ok(DecodedAudio {
        sample_rate,
        channels,
        samples,
    })
}

fn append_samples(decoded: &AudioBufferRef, out: &mut Vec<i16>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(buf, out, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        AudioBufferRef::S32(buf) => interleave(buf, out, |s| (s >> 16) as i16),
        AudioBufferRef::S16(buf) => interleave(buf, out, |s| s),
        AudioBufferRef::U8(buf) => interleave(buf, out, |s| ((s as i16) - 128) * 256),
        _ => {}
    }
}

fn interleave<S: Copy>(buf: &symphonia::core::audio::AudioBuffer<S>, out: &mut Vec<i16>, convert: impl Fn(S) -> i16) {
    let channels = buf.spec().channels.count();
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            out.push(convert(buf.chan(ch)[frame]));
        }
    }
}

fn encode_wav(audio: &DecodedAudio) -> AppResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: audio.channels.max(1),
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)
            .map_err(|e| AppError::transcode(format!("wav encoder init failed: {}", e)))?;
        for sample in &audio.samples {
            writer
                .write_sample(*sample)
                .map_err(|e| AppError::transcode(format!("wav write failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AppError::transcode(format!("wav finalize failed: {}", e)))?;
    }
    Ok(buffer.into_inner())
}

fn encode_mp3(audio: &DecodedAudio) -> AppResult<Vec<u8>> {
    use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, MonoPcm, Quality};

    let mut builder = Builder::new().ok_or_else(|| AppError::transcode("failed to init mp3 encoder"))?;
    builder
        .set_num_channels(audio.channels.max(1) as u8)
        .map_err(|e| AppError::transcode(format!("mp3 channel config failed: {:?}", e)))?;
    builder
        .set_sample_rate(audio.sample_rate)
        .map_err(|e| AppError::transcode(format!("mp3 sample rate config failed: {:?}", e)))?;
    builder
        .set_brate(Bitrate::Kbps192)
        .map_err(|e| AppError::transcode(format!("mp3 bitrate config failed: {:?}", e)))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| AppError::transcode(format!("mp3 quality config failed: {:?}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| AppError::transcode(format!("mp3 encoder build failed: {:?}", e)))?;

    let frame_count = if audio.channels >= 2 {
        audio.samples.len() / 2
    } else {
        audio.samples.len()
    };
    let mut mp3_buffer = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(frame_count));

    let encoded_len = if audio.channels >= 2 {
        let (left, right): (Vec<i16>, Vec<i16>) = audio
            .samples
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .unzip();
        let input = DualPcm {
            left: &left,
            right: &right,
        };
        encoder
            .encode(input, mp3_buffer.spare_capacity_mut())
            .map_err(|e| AppError::transcode(format!("mp3 encode failed: {:?}", e)))?
    } else {
        let input = MonoPcm(&audio.samples);
        encoder
            .encode(input, mp3_buffer.spare_capacity_mut())
            .map_err(|e| AppError::transcode(format!("mp3 encode failed: {:?}", e)))?
    };
    unsafe {
        mp3_buffer.set_len(mp3_buffer.len() + encoded_len);
    }

    let flushed_len = encoder
        .flush::<FlushNoGap>(mp3_buffer.spare_capacity_mut())
        .map_err(|e| AppError::transcode(format!("mp3 flush failed: {:?}", e)))?;
    unsafe {
        mp3_buffer.set_len(mp3_buffer.len() + flushed_len);
    }

    Ok(mp3_buffer)
}

/// Transcodes `source_bytes` to the requested format, returning the encoded
/// bytes. Called only when `audioFormat != original` and the source asset's
/// `isAudio` flag is set.
pub fn transcode(source_bytes: Vec<u8>, target: AudioFormat) -> AppResult<Vec<u8>> {
    let audio = decode(source_bytes)?;
    match target {
        AudioFormat::Original => unreachable!("caller must not transcode for Original"),
        AudioFormat::Wav => encode_wav(&audio),
        AudioFormat::Mp3 => encode_mp3(&audio),
    }
}

/// File extension the destination path should carry after transcoding.
pub fn extension_for(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Original => unreachable!("caller must not rewrite extension for Original"),
        AudioFormat::Wav => "wav",
        AudioFormat::Mp3 => "mp3",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        let result = decode(vec![0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_wav_round_trip_header() {
        let audio = DecodedAudio {
            sample_rate: 44100,
            channels: 1,
            samples: vec![0, 100, -100, 200, -200],
        };
        let encoded = encode_wav(&audio).unwrap();
        assert_eq!(&encoded[0..4], b"RIFF");
        assert_eq!(&encoded[8..12], b"WAVE");
    }

    #[test]
    fn test_extension_for_formats() {
        assert_eq!(extension_for(AudioFormat::Mp3), "mp3");
        assert_eq!(extension_for(AudioFormat::Wav), "wav");
    }
}
