use std::time::{Duration, Instant};

/// カウントダウンの識別子。新しいカウントダウンを開始すると古いハンドルは無効になる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// 1ティック経過。remaining は残りティック数（1以上）
    Tick { handle: CountdownHandle, remaining: u32 },
    /// 残り0に到達。カウントダウン1回につき一度だけ
    Expired { handle: CountdownHandle },
}

#[derive(Debug)]
struct Active {
    handle: CountdownHandle,
    remaining: u32,
    next_tick: Instant,
}

/// ポーリング駆動の周期カウントダウン
///
/// 同時に動くのは1本だけ。`start` は動作中のものを置き換える。
#[derive(Debug)]
pub struct Countdown {
    interval: Duration,
    generation: u64,
    active: Option<Active>,
}

impl Countdown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            active: None,
        }
    }

    pub fn start(&mut self, ticks: u32, now: Instant) -> CountdownHandle {
        self.generation += 1;
        let handle = CountdownHandle(self.generation);
        if let Some(prev) = self.active.take() {
            log::debug!("countdown {:?} replaced with {} ticks left", prev.handle, prev.remaining);
        }
        self.active = Some(Active {
            handle,
            remaining: ticks,
            next_tick: now + self.interval,
        });
        handle
    }

    /// `now` までに経過したティックを処理する
    pub fn poll(&mut self, now: Instant) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        let Some(active) = self.active.as_mut() else {
            return events;
        };

        while active.remaining > 0 && now >= active.next_tick {
            active.remaining -= 1;
            active.next_tick += self.interval;
            if active.remaining > 0 {
                events.push(CountdownEvent::Tick {
                    handle: active.handle,
                    remaining: active.remaining,
                });
            }
        }

        if active.remaining == 0 {
            events.push(CountdownEvent::Expired {
                handle: active.handle,
            });
            self.active = None;
        }
        events
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// 残りティック数。動作中でなければ `None`
    pub fn remaining(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.remaining)
    }

    pub fn is_current(&self, handle: CountdownHandle) -> bool {
        self.active.as_ref().is_some_and(|a| a.handle == handle)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(t0: Instant, s: u64) -> Instant {
        t0 + Duration::from_secs(s)
    }

    #[test]
    fn test_idle_poll_is_empty() {
        let mut c = Countdown::default();
        assert!(c.poll(Instant::now()).is_empty());
        assert!(!c.is_active());
        assert_eq!(c.remaining(), None);
    }

    #[test]
    fn test_ticks_then_expires_once() {
        let mut c = Countdown::default();
        let t0 = Instant::now();
        let h = c.start(3, t0);

        assert!(c.poll(t0).is_empty());
        assert!(c.poll(t0 + Duration::from_millis(999)).is_empty());
        assert_eq!(
            c.poll(secs(t0, 1)),
            vec![CountdownEvent::Tick { handle: h, remaining: 2 }]
        );
        assert_eq!(
            c.poll(secs(t0, 2)),
            vec![CountdownEvent::Tick { handle: h, remaining: 1 }]
        );
        assert_eq!(c.remaining(), Some(1));
        assert_eq!(c.poll(secs(t0, 3)), vec![CountdownEvent::Expired { handle: h }]);

        assert!(!c.is_active());
        assert!(c.poll(secs(t0, 10)).is_empty());
    }

    #[test]
    fn test_late_poll_catches_up() {
        let mut c = Countdown::default();
        let t0 = Instant::now();
        let h = c.start(5, t0);
        let events = c.poll(secs(t0, 7));
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], CountdownEvent::Tick { handle: h, remaining: 4 });
        assert_eq!(events[4], CountdownEvent::Expired { handle: h });
    }

    #[test]
    fn test_zero_ticks_expires_on_first_poll() {
        let mut c = Countdown::default();
        let t0 = Instant::now();
        let h = c.start(0, t0);
        assert_eq!(c.poll(t0), vec![CountdownEvent::Expired { handle: h }]);
    }

    #[test]
    fn test_restart_invalidates_previous() {
        let mut c = Countdown::default();
        let t0 = Instant::now();
        let first = c.start(2, t0);
        let second = c.start(2, secs(t0, 1));
        assert_ne!(first, second);
        assert!(!c.is_current(first));
        assert!(c.is_current(second));

        // 最初のカウントダウンの期限では発火しない
        assert!(c.poll(secs(t0, 2)).iter().all(|e| !matches!(e, CountdownEvent::Expired { .. })));
        assert_eq!(
            c.poll(secs(t0, 3)),
            vec![CountdownEvent::Expired { handle: second }]
        );
    }

    #[test]
    fn test_cancel() {
        let mut c = Countdown::default();
        let t0 = Instant::now();
        let h = c.start(1, t0);
        c.cancel();
        assert!(!c.is_current(h));
        assert!(c.poll(secs(t0, 5)).is_empty());
    }

    #[test]
    fn test_custom_interval() {
        let mut c = Countdown::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let h = c.start(2, t0);
        let events = c.poll(t0 + Duration::from_millis(200));
        assert_eq!(
            events,
            vec![
                CountdownEvent::Tick { handle: h, remaining: 1 },
                CountdownEvent::Expired { handle: h },
            ]
        );
    }
}
