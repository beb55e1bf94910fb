use std::error::Error;
use std::time::{Duration, Instant};

use crate::input::timer::{TimerQueue, TimerTarget};

#[tokio::test]
async fn test_timers_fire_in_deadline_order() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let mut timers = TimerQueue::new();
    let late = timers.schedule(start + Duration::from_millis(300), TimerTarget::Macro(1));
    let early = timers.schedule(start + Duration::from_millis(100), TimerTarget::Macro(2));
    let tie = timers.schedule(start + Duration::from_millis(100), TimerTarget::Macro(3));

    assert_eq!(timers.next_deadline(), Some(start + Duration::from_millis(100)));
    assert!(timers.pop_due(start).is_none());

    let now = start + Duration::from_millis(150);
    assert_eq!(timers.pop_due(now).map(|t| t.id), Some(early));
    assert_eq!(timers.pop_due(now).map(|t| t.id), Some(tie));
    assert!(timers.pop_due(now).is_none());

    let due = timers.pop_due(start + Duration::from_millis(300)).unwrap();
    assert_eq!(due.id, late);
    assert_eq!(due.target, TimerTarget::Macro(1));
    assert!(timers.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cancelled_timer_never_fires() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let mut timers = TimerQueue::new();
    let id = timers.schedule(
        start + Duration::from_millis(50),
        TimerTarget::Functor { root: 0, node: 4 },
    );
    assert!(timers.is_pending(id));
    assert!(timers.cancel(id));
    assert!(!timers.cancel(id));
    assert!(!timers.is_pending(id));
    assert!(timers.pop_due(start + Duration::from_secs(10)).is_none());
    assert_eq!(timers.next_deadline(), None);
    Ok(())
}
