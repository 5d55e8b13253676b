use super::*;

fn attached() -> InMemoryWriter {
    let mut w = InMemoryWriter::new();
    let settings = EncodingSettings::new(16, 16).unwrap();
    w.attach(
        Path::new("target/unit_writer/out.mov"),
        &settings,
        MediaTime::new(1, 5).unwrap(),
    )
    .unwrap();
    w
}

fn ts(v: u64) -> MediaTime {
    MediaTime::new(v, 5).unwrap()
}

#[test]
fn records_frames_in_order() {
    let mut w = attached();
    let probe = w.clone();
    let buf = PixelBuffer::allocate(16, 16).unwrap();

    assert_eq!(w.status(), WriterStatus::Unknown);
    w.start_writing().unwrap();
    assert!(w.is_ready_for_more_media_data());
    w.append(&buf, ts(0)).unwrap();
    w.append(&buf, ts(2)).unwrap();
    w.mark_as_finished();
    w.finish_writing().unwrap();

    assert_eq!(probe.status(), WriterStatus::Completed);
    assert_eq!(probe.timestamps(), vec![ts(0), ts(2)]);
    probe.with_recording(|r| {
        assert!(r.finished);
        assert_eq!(r.destination.as_deref(), Some(Path::new("target/unit_writer/out.mov")));
        assert_eq!(r.frame_duration, Some(ts(1)));
    });
}

#[test]
fn rejects_non_increasing_timestamps() {
    let mut w = attached();
    let buf = PixelBuffer::allocate(16, 16).unwrap();
    w.start_writing().unwrap();
    w.append(&buf, ts(1)).unwrap();
    assert!(w.append(&buf, ts(1)).is_err());
    assert!(w.append(&buf, ts(0)).is_err());
    assert_eq!(w.frame_count(), 1);
}

#[test]
fn rejects_append_after_finish_and_before_start() {
    let mut w = attached();
    let buf = PixelBuffer::allocate(16, 16).unwrap();
    assert!(w.append(&buf, ts(0)).is_err());
    w.start_writing().unwrap();
    w.mark_as_finished();
    assert!(!w.is_ready_for_more_media_data());
    assert!(w.append(&buf, ts(0)).is_err());
}

#[test]
fn busy_polls_reset_after_each_append() {
    let mut w = attached().with_busy_polls(2);
    let buf = PixelBuffer::allocate(16, 16).unwrap();
    w.start_writing().unwrap();

    assert!(!w.is_ready_for_more_media_data());
    assert!(!w.is_ready_for_more_media_data());
    assert!(w.is_ready_for_more_media_data());
    w.append(&buf, ts(0)).unwrap();
    assert!(!w.is_ready_for_more_media_data());
    w.with_recording(|r| assert_eq!(r.busy_polls, 3));
}

#[test]
fn cancel_marks_status() {
    let mut w = attached();
    w.start_writing().unwrap();
    w.cancel_writing();
    assert_eq!(w.status(), WriterStatus::Cancelled);
    assert!(w.finish_writing().is_err());
}
