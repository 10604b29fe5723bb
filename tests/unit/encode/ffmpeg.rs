use super::*;

fn input(width: u32, height: u32) -> VideoFormat {
    VideoFormat {
        codec: Codec::Jpeg,
        width,
        height,
        fps: 25,
    }
}

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

#[test]
fn container_is_inferred_from_extension() {
    assert_eq!(Container::from_path(Path::new("out.mov")), Container::QuickTime);
    assert_eq!(Container::from_path(Path::new("out.MP4")), Container::Mp4);
    assert_eq!(Container::from_path(Path::new("a/b.mkv")), Container::Matroska);
    assert_eq!(Container::from_path(Path::new("no_extension")), Container::QuickTime);
}

#[test]
fn quicktime_prefers_passthrough_then_h264() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mov"));
    let formats = sink.supported_formats(0, &input(640, 480));
    assert_eq!(formats, vec![input(640, 480), input(640, 480).with_codec(Codec::H264)]);
}

#[test]
fn odd_dimensions_cannot_be_reencoded() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mov"));
    assert_eq!(sink.supported_formats(0, &input(641, 480)), vec![input(641, 480)]);

    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
    assert!(sink.supported_formats(0, &input(641, 480)).is_empty());
}

#[test]
fn only_track_zero_is_supported() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mkv"));
    assert!(sink.supported_formats(1, &input(640, 480)).is_empty());
    assert!(
        sink.supported_formats(0, &input(640, 480).with_codec(Codec::H264))
            .is_empty()
    );
}

#[test]
fn passthrough_args_copy_the_stream() {
    let opts = FfmpegSinkOpts::new("renders/out.mov");
    let args = strings(&ffmpeg_args(&opts, &input(640, 480), &input(640, 480)));
    let joined = args.join(" ");
    assert!(joined.starts_with(
        "-y -loglevel error -f image2pipe -framerate 25 -c:v mjpeg -i pipe:0 -an"
    ));
    assert!(joined.contains("-c:v copy -f mov -movflags +faststart"));
    assert_eq!(args.last().map(String::as_str), Some("renders/out.mov"));
}

#[test]
fn h264_args_reencode_to_yuv420p() {
    let mut opts = FfmpegSinkOpts::new("out.mkv");
    opts.overwrite = false;
    let png = input(320, 240).with_codec(Codec::Png);
    let args = strings(&ffmpeg_args(&opts, &png, &png.with_codec(Codec::H264)));
    let joined = args.join(" ");
    assert!(joined.starts_with("-n "));
    assert!(joined.contains("-c:v png -i pipe:0"));
    assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p -f matroska out.mkv"));
    assert!(!joined.contains("movflags"));
}

#[test]
fn configure_refuses_to_overwrite_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exists.mov");
    std::fs::write(&out, b"old").unwrap();

    let mut opts = FfmpegSinkOpts::new(&out);
    opts.overwrite = false;
    let mut sink = FfmpegSink::new(opts);
    let err = sink.configure(&input(64, 48)).unwrap_err();
    assert!(matches!(err, FlythroughError::Validation(_)));
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn configure_creates_missing_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("deeper").join("out.mov");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    sink.configure(&input(64, 48)).unwrap();
    assert!(out.parent().unwrap().is_dir());
    sink.close();
}

#[test]
fn configure_rejects_invalid_input() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mov"));
    let mut zero_fps = input(64, 48);
    zero_fps.fps = 0;
    assert!(matches!(
        sink.configure(&zero_fps),
        Err(FlythroughError::Validation(_))
    ));
    assert!(matches!(
        sink.configure(&input(64, 48).with_codec(Codec::H264)),
        Err(FlythroughError::FormatNegotiation(_))
    ));
}

#[test]
fn realize_rejects_unsupported_track() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(dir.path().join("out.mp4")));
    sink.configure(&input(64, 48)).unwrap();
    let err = sink.realize(&input(64, 48)).unwrap_err();
    assert!(matches!(err, FlythroughError::FormatNegotiation(_)));
}

#[test]
fn rejected_frames_do_not_advance_the_order_guard() {
    let fmt = input(64, 48);
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mov"));
    sink.input = Some(fmt);
    sink.track = Some(fmt);

    let wrong_size = EncodedFrame {
        index: FrameIndex(5),
        codec: Codec::Jpeg,
        width: 32,
        height: 48,
        data: vec![0xFF, 0xD8],
    };
    assert!(matches!(
        sink.push_frame(&wrong_size),
        Err(FlythroughError::Validation(_))
    ));
    let wrong_codec = EncodedFrame {
        codec: Codec::Png,
        width: 64,
        ..wrong_size.clone()
    };
    assert!(matches!(
        sink.push_frame(&wrong_codec),
        Err(FlythroughError::FormatNegotiation(_))
    ));
    assert_eq!(sink.last_idx, None);

    // No ffmpeg process is attached, so a valid frame reaches the write step.
    let valid = EncodedFrame {
        index: FrameIndex(3),
        width: 64,
        ..wrong_size
    };
    let err = sink.push_frame(&valid).unwrap_err();
    assert!(err.to_string().contains("already finalized"), "{err}");
    assert_eq!(sink.last_idx, None);
}

#[test]
fn close_without_realize_is_harmless() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mov"));
    sink.close();
    sink.close();
    assert!(sink.finish().is_err());
}

#[cfg(feature = "media-ffmpeg")]
#[test]
fn streams_jpeg_frames_into_a_quicktime_file() {
    use crate::source::frame_source::encode_raster;

    if !is_ffmpeg_on_path() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.mov");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    let fmt = input(32, 24);
    sink.configure(&fmt).unwrap();
    sink.realize(&fmt).unwrap();
    for i in 0..5u64 {
        let raster = image::RgbImage::from_pixel(32, 24, image::Rgb([i as u8 * 40, 10, 10]));
        let data = encode_raster(&raster, Codec::Jpeg, 80).unwrap();
        sink.push_frame(&EncodedFrame {
            index: FrameIndex(i),
            codec: Codec::Jpeg,
            width: 32,
            height: 24,
            data,
        })
        .unwrap();
    }
    sink.finish().unwrap();
    sink.close();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}
