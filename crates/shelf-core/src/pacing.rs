//! Fixed courtesy delay between destination calls

use std::time::Duration;

/// Sleeps `delay` before every unit of work except the first.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Call before each unit of work.
    pub async fn pause(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_unit_is_not_delayed() {
        let mut pacer = Pacer::new(Duration::from_secs(5));
        let start = tokio::time::Instant::now();

        pacer.pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.pause().await;
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
