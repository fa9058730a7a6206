// Fixed-window request limiter keyed by client address

use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, Instant},
};

use dashmap::DashMap;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: DashMap<IpAddr, Window>,
}

// Callers without a known peer address share this bucket
pub const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn check(&self, client: IpAddr) -> Result<(), ApiError> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), ApiError> {
        let mut entry = self.clients.entry(client).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_requests {
            let remaining = entry.reset_at.saturating_duration_since(now);
            // Round up so clients never retry early
            let retry_after_secs = (remaining.as_millis() as u64).div_ceil(1000).max(1);
            return Err(ApiError::RateLimited { retry_after_secs });
        }

        entry.count += 1;
        Ok(())
    }

    // Drops windows that have already expired
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, window| window.reset_at > now);
        before - self.clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_limit_is_per_client() {
        let limiter = RateLimiter::per_minute(2);
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now).is_ok());
        assert!(limiter.check_at(ip(1), now).is_ok());
        assert!(matches!(
            limiter.check_at(ip(1), now),
            Err(ApiError::RateLimited { retry_after_secs: 60 })
        ));
        assert!(limiter.check_at(ip(2), now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start).is_ok());
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(3)).is_err());
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        limiter.check_at(ip(1), start).unwrap();
        let err = limiter
            .check_at(ip(1), start + Duration::from_millis(8_500))
            .unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { retry_after_secs: 2 }));
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();
        limiter.check_at(ip(1), start).unwrap();
        limiter.check_at(ip(2), start + Duration::from_millis(900)).unwrap();
        assert_eq!(limiter.purge_expired(start + Duration::from_millis(1_500)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
