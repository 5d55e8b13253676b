use std::{cell::RefCell, rc::Rc, time::Duration};

use super::*;
use crate::encode::writer::{InMemoryWriter, WriterStatus};

fn dest(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_encoder");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{name}.mov"))
}

fn encoder(name: &str, writer: InMemoryWriter) -> ImageSequenceEncoder<InMemoryWriter> {
    ImageSequenceEncoder::with_writer(
        EncodingSettings::new(32, 16).unwrap(),
        SessionConfig::new(dest(name)),
        writer,
    )
    .unwrap()
}

fn gray(v: u8) -> image::RgbaImage {
    image::RgbaImage::from_pixel(32, 16, image::Rgba([v, v, v, 255]))
}

fn fifths(v: &[u64]) -> Vec<MediaTime> {
    v.iter().map(|&n| MediaTime::new(n, 5).unwrap()).collect()
}

#[test]
fn converts_images_and_calls_back_on_waiting_thread() {
    let writer = InMemoryWriter::new();
    let probe = writer.clone();
    let seen: Rc<RefCell<Option<(PathBuf, std::thread::ThreadId)>>> = Rc::default();
    let seen_cb = Rc::clone(&seen);

    let conversion = encoder("images", writer)
        .convert_images([gray(0), gray(100), gray(200)], move |path| {
            *seen_cb.borrow_mut() = Some((path, std::thread::current().id()));
        })
        .unwrap();
    let report = conversion.wait().unwrap();

    let (path, thread) = seen.borrow_mut().take().unwrap();
    assert_eq!(path, dest("images"));
    assert_eq!(thread, std::thread::current().id());

    assert_eq!(report.frames_total, 3);
    assert_eq!(report.frames_written, 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.duration, MediaTime::new(3, 5).unwrap());
    assert_eq!(probe.timestamps(), fifths(&[0, 1, 2]));
    probe.with_recording(|r| {
        assert_eq!(r.frames[1].1.pixel(0, 15), Some([0xff, 100, 100, 100]));
    });
    assert_eq!(probe.status(), WriterStatus::Completed);
}

#[test]
fn unresolvable_frame_is_skipped_and_leaves_a_gap() {
    let writer = InMemoryWriter::new();
    let probe = writer.clone();
    let called = Rc::new(RefCell::new(false));
    let called_cb = Rc::clone(&called);

    let frames = vec![
        FrameSource::image(gray(1)),
        FrameSource::file("target/unit_encoder/missing.png"),
        FrameSource::image(gray(3)),
    ];
    let report = encoder("skip", writer)
        .convert(frames, move |_| *called_cb.borrow_mut() = true)
        .unwrap()
        .wait()
        .unwrap();

    assert!(*called.borrow());
    assert_eq!(report.frames_written, 2);
    assert_eq!(report.skipped, vec![FrameIndex(1)]);
    assert_eq!(probe.timestamps(), fifths(&[0, 2]));
}

#[test]
fn trailing_skip_ends_the_timeline_at_the_last_written_frame() {
    let writer = InMemoryWriter::new();
    let probe = writer.clone();
    let frames = vec![
        FrameSource::image(gray(1)),
        FrameSource::image(gray(2)),
        FrameSource::file("target/unit_encoder/missing.png"),
    ];
    let report = encoder("trailing", writer).convert_blocking(frames).unwrap();

    assert_eq!(report.frames_total, 3);
    assert_eq!(report.frames_written, 2);
    assert_eq!(report.skipped, vec![FrameIndex(2)]);
    assert_eq!(report.duration, MediaTime::new(2, 5).unwrap());
    assert_eq!(probe.timestamps(), fifths(&[0, 1]));
}

#[test]
fn zero_frames_still_finalizes_and_calls_back() {
    let writer = InMemoryWriter::new();
    let probe = writer.clone();
    let called = Rc::new(RefCell::new(false));
    let called_cb = Rc::clone(&called);

    let report = encoder("empty", writer)
        .convert(Vec::new(), move |_| *called_cb.borrow_mut() = true)
        .unwrap()
        .wait()
        .unwrap();

    assert!(*called.borrow());
    assert_eq!(report.frames_written, 0);
    assert_eq!(report.duration, MediaTime::ZERO);
    probe.with_recording(|r| {
        assert!(r.finished);
        assert!(r.frames.is_empty());
    });
}

#[test]
fn busy_writer_is_waited_on() {
    let writer = InMemoryWriter::new().with_busy_polls(5);
    let probe = writer.clone();
    let report = encoder("busy", writer)
        .convert_blocking([gray(1), gray(2)].map(FrameSource::image))
        .unwrap();
    assert_eq!(report.frames_written, 2);
    probe.with_recording(|r| assert_eq!(r.busy_polls, 10));
}

#[test]
fn fatal_writer_failure_skips_callback_and_cancels() {
    let writer = InMemoryWriter::new().stalled();
    let probe = writer.clone();
    let called = Rc::new(RefCell::new(false));
    let called_cb = Rc::clone(&called);

    let enc = ImageSequenceEncoder::with_writer(
        EncodingSettings::new(32, 16).unwrap(),
        SessionConfig::new(dest("stalled")).with_ready_timeout(Duration::from_millis(20)),
        writer,
    )
    .unwrap();
    let err = enc
        .convert_images([gray(9)], move |_| *called_cb.borrow_mut() = true)
        .unwrap()
        .wait()
        .unwrap_err();

    assert!(matches!(err, StillcutError::Writer(_)));
    assert!(!*called.borrow());
    assert_eq!(probe.status(), WriterStatus::Cancelled);
}

#[test]
fn is_finished_turns_true_when_worker_stops() {
    let conversion = encoder("poll", InMemoryWriter::new())
        .convert_images([gray(5)], |_| {})
        .unwrap();
    while !conversion.is_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(conversion.wait().unwrap().frames_written, 1);
}
