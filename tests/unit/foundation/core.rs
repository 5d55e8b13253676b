use super::*;

#[test]
fn default_clock_is_five_fps() {
    let clock = PresentationClock::default();
    assert_eq!(clock.frame_duration(), MediaTime::new(1, 5).unwrap());
}

#[test]
fn frame_zero_is_presented_at_zero() {
    let clock = PresentationClock::default();
    assert_eq!(clock.timestamp(FrameIndex(0)).unwrap(), MediaTime::ZERO);
}

#[test]
fn timestamps_are_index_times_duration() {
    let clock = PresentationClock::new(MediaTime::new(1001, 30000).unwrap()).unwrap();
    for i in 0..10u64 {
        let ts = clock.timestamp(FrameIndex(i)).unwrap();
        assert_eq!(ts.value, i * 1001);
        assert_eq!(ts.timescale, 30000);
    }
    let a = clock.timestamp(FrameIndex(3)).unwrap();
    let b = clock.timestamp(FrameIndex(4)).unwrap();
    assert!(a < b);
}

#[test]
fn clock_rejects_zero_duration() {
    assert!(PresentationClock::new(MediaTime { value: 0, timescale: 5 }).is_err());
    assert!(PresentationClock::new(MediaTime { value: 1, timescale: 0 }).is_err());
}

#[test]
fn timestamp_overflow_is_an_error() {
    let clock = PresentationClock::new(MediaTime::new(u64::MAX / 2, 1).unwrap()).unwrap();
    assert!(clock.timestamp(FrameIndex(3)).is_err());
}

#[test]
fn media_time_compares_across_timescales() {
    let a = MediaTime::new(1, 5).unwrap();
    let b = MediaTime::new(2, 10).unwrap();
    let c = MediaTime::new(3, 10).unwrap();
    assert_eq!(a, b);
    assert!(a < c);
    assert_eq!(a.checked_add(c).unwrap(), MediaTime::new(1, 2).unwrap());
}

#[test]
fn media_time_parses_rationals_and_seconds() {
    assert_eq!("1/5".parse::<MediaTime>().unwrap(), MediaTime::new(1, 5).unwrap());
    assert_eq!(" 2 ".parse::<MediaTime>().unwrap(), MediaTime::new(2, 1).unwrap());
    assert!("1/0".parse::<MediaTime>().is_err());
    assert!("x/5".parse::<MediaTime>().is_err());
    assert_eq!(MediaTime::new(1, 5).unwrap().to_string(), "1/5");
}
