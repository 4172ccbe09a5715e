//! Field generators: one randomized value per call, no state between calls.

use crate::telemetry::LogLevel;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::net::Ipv4Addr;

/// An IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub network: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub const fn new(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> Self {
        Self {
            network: Ipv4Addr::new(a, b, c, d),
            prefix,
        }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
        (u32::from(ip) & mask) == (u32::from(self.network) & mask)
    }
}

impl std::fmt::Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

pub const PRIVATE_RANGES: [Cidr; 3] = [
    Cidr::new(10, 0, 0, 0, 8),
    Cidr::new(172, 16, 0, 0, 12),
    Cidr::new(192, 168, 0, 0, 16),
];

pub const RESERVED_RANGES: [Cidr; 8] = [
    Cidr::new(10, 0, 0, 0, 8),
    Cidr::new(172, 16, 0, 0, 12),
    Cidr::new(192, 168, 0, 0, 16),
    Cidr::new(127, 0, 0, 0, 8),
    Cidr::new(169, 254, 0, 0, 16),
    Cidr::new(224, 0, 0, 0, 4),
    Cidr::new(0, 0, 0, 0, 8),
    Cidr::new(255, 0, 0, 0, 8),
];

/// Rejection sampling gives up after this many draws and falls back to a
/// construction that cannot land in a reserved block.
const MAX_EXTERNAL_ATTEMPTS: usize = 64;

pub fn is_internal(ip: Ipv4Addr) -> bool {
    PRIVATE_RANGES.iter().any(|range| range.contains(ip))
}

pub fn is_reserved(ip: Ipv4Addr) -> bool {
    RESERVED_RANGES.iter().any(|range| range.contains(ip))
}

/// Uniform pick from a non-empty literal table.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Any IPv4 address, reserved or not.
pub fn any_ip<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    Ipv4Addr::from(rng.random::<u32>())
}

/// An address from one of the three private ranges, range chosen uniformly.
pub fn internal_ip<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    match rng.random_range(0..3) {
        0 => Ipv4Addr::new(10, rng.random(), rng.random(), rng.random()),
        1 => Ipv4Addr::new(172, rng.random_range(16..=31), rng.random(), rng.random()),
        _ => Ipv4Addr::new(192, 168, rng.random(), rng.random()),
    }
}

/// A publicly routable-looking address outside every reserved range.
pub fn external_ip<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    for _ in 0..MAX_EXTERNAL_ATTEMPTS {
        let candidate = any_ip(rng);
        if !is_reserved(candidate) {
            return candidate;
        }
    }

    // First octets whose whole /8 is free of reserved blocks.
    let first = loop {
        let octet = rng.random_range(1..=223u8);
        if !matches!(octet, 10 | 127 | 169 | 172 | 192) {
            break octet;
        }
    };
    Ipv4Addr::new(first, rng.random(), rng.random(), rng.random())
}

/// Textual timestamp layouts seen across the simulated services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2024-06-18 12:00:00,123`
    CommaMillis,
    /// `18/Jun/2024:12:00:00 +0000`
    CommonLog,
    /// `2024-06-18T12:00:00Z`
    Iso8601,
    /// `Jun 18, 2024 12:00:00 PM`
    Verbose,
}

impl TimestampFormat {
    pub const ALL: [TimestampFormat; 4] = [
        TimestampFormat::CommaMillis,
        TimestampFormat::CommonLog,
        TimestampFormat::Iso8601,
        TimestampFormat::Verbose,
    ];

    fn pattern(&self) -> &'static str {
        match self {
            TimestampFormat::CommaMillis => "%Y-%m-%d %H:%M:%S,%3f",
            TimestampFormat::CommonLog => "%d/%b/%Y:%H:%M:%S +0000",
            TimestampFormat::Iso8601 => "%Y-%m-%dT%H:%M:%SZ",
            // Hour stays 24h next to the meridiem, as the services print it.
            TimestampFormat::Verbose => "%b %d, %Y %H:%M:%S %p",
        }
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        now.format(self.pattern()).to_string()
    }
}

pub fn timestamp<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    pick(rng, &TimestampFormat::ALL).render(now)
}

pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    TimestampFormat::Iso8601.render(now)
}

pub fn common_log_timestamp(now: DateTime<Utc>) -> String {
    TimestampFormat::CommonLog.render(now)
}

pub const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 10; SM-G975F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.152 Mobile Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 14_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1",
];

pub const PRODUCTS: [&str; 25] = [
    "t-shirt",
    "jeans",
    "dress",
    "skirt",
    "blouse",
    "sweater",
    "jacket",
    "coat",
    "shorts",
    "leggings",
    "suit",
    "blazer",
    "hoodie",
    "cardigan",
    "tank top",
    "jumpsuit",
    "scarf",
    "hat",
    "gloves",
    "socks",
    "swimwear",
    "sports bra",
    "yoga pants",
    "running shoes",
    "boots",
];

pub const RANDOM_TEXTS: [&str; 6] = [
    "Sample log message",
    "Another test log entry",
    "This is a random log text",
    "Testing mapping exceptions",
    "Log entry with different format",
    "Example log message for testing",
];

pub const STATUS_CODES: [u16; 5] = [200, 301, 400, 404, 500];

pub const HTTP_METHODS: [&str; 2] = ["GET", "POST"];

pub const LOG_LEVELS: [LogLevel; 5] = [
    LogLevel::Debug,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Error,
    LogLevel::Fatal,
];

pub fn user_agent<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    *pick(rng, &USER_AGENTS)
}

pub fn product<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    *pick(rng, &PRODUCTS)
}

pub fn random_text<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    *pick(rng, &RANDOM_TEXTS)
}

pub fn status_code<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    *pick(rng, &STATUS_CODES)
}

pub fn http_method<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    *pick(rng, &HTTP_METHODS)
}

pub fn log_level<R: Rng + ?Sized>(rng: &mut R) -> LogLevel {
    *pick(rng, &LOG_LEVELS)
}

fn resource_id<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.random_range(11111..=99999)
}

pub fn request_uri<R: Rng + ?Sized>(rng: &mut R) -> String {
    match rng.random_range(0..9) {
        0 => "/users/list".to_string(),
        1 => format!("/products/details/{}", resource_id(rng)),
        2 => format!("/search/query?term={}", product(rng)),
        3 => format!("/api/v1/users/{}/profile", resource_id(rng)),
        4 => format!("/checkout/cart/{}", resource_id(rng)),
        5 => "/login".to_string(),
        6 => "/register/new".to_string(),
        7 => format!("/settings/user/{}/preferences", resource_id(rng)),
        _ => format!("/images/gallery/album/{}", resource_id(rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 18, 14, 5, 9).unwrap()
            + chrono::Duration::microseconds(123_456)
    }

    #[test]
    fn test_cidr_contains() {
        let block = Cidr::new(172, 16, 0, 0, 12);
        assert!(block.contains(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(block.contains(Ipv4Addr::new(172, 31, 255, 255)));
        assert!(!block.contains(Ipv4Addr::new(172, 32, 0, 0)));
        assert!(!block.contains(Ipv4Addr::new(172, 15, 255, 255)));
        assert_eq!(block.to_string(), "172.16.0.0/12");
    }

    #[test]
    fn test_reserved_edges() {
        assert!(is_reserved(Ipv4Addr::new(0, 1, 2, 3)));
        assert!(is_reserved(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_reserved(Ipv4Addr::new(169, 254, 10, 10)));
        assert!(is_reserved(Ipv4Addr::new(224, 0, 0, 1)));
        assert!(is_reserved(Ipv4Addr::new(239, 255, 255, 255)));
        assert!(is_reserved(Ipv4Addr::new(255, 255, 255, 255)));
        assert!(!is_reserved(Ipv4Addr::new(240, 0, 0, 1)));
        assert!(!is_reserved(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_reserved(Ipv4Addr::new(169, 253, 1, 1)));
    }

    #[test]
    fn test_external_ips_never_reserved() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let ip = external_ip(&mut rng);
            assert!(!is_reserved(ip), "{} is reserved", ip);
        }
    }

    #[test]
    fn test_internal_ips_in_exactly_one_private_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 3];
        for _ in 0..10_000 {
            let ip = internal_ip(&mut rng);
            let hits: Vec<usize> = PRIVATE_RANGES
                .iter()
                .enumerate()
                .filter(|(_, range)| range.contains(ip))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(hits.len(), 1, "{} matched {:?}", ip, hits);
            seen[hits[0]] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    proptest! {
        #[test]
        fn prop_external_ip_outside_reserved(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..100 {
                let ip = external_ip(&mut rng);
                prop_assert!(!is_reserved(ip));
            }
        }

        #[test]
        fn prop_internal_ip_is_private(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let ip = internal_ip(&mut rng);
            prop_assert!(is_internal(ip));
            prop_assert!(is_reserved(ip));
        }
    }

    #[test]
    fn test_timestamp_formats() {
        let now = fixed_now();
        assert_eq!(TimestampFormat::CommaMillis.render(now), "2024-06-18 14:05:09,123");
        assert_eq!(TimestampFormat::CommonLog.render(now), "18/Jun/2024:14:05:09 +0000");
        assert_eq!(TimestampFormat::Iso8601.render(now), "2024-06-18T14:05:09Z");
        assert_eq!(TimestampFormat::Verbose.render(now), "Jun 18, 2024 14:05:09 PM");
    }

    #[test]
    fn test_random_timestamp_uses_known_format() {
        let now = fixed_now();
        let rendered: Vec<String> = TimestampFormat::ALL.iter().map(|f| f.render(now)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let ts = timestamp(&mut rng, now);
            assert!(rendered.contains(&ts), "unexpected timestamp {}", ts);
        }
    }

    #[test]
    fn test_comma_millis_parses_back() {
        let ts = TimestampFormat::CommaMillis.render(fixed_now());
        let parsed = NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S,%3f").unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_request_uri_shapes() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let uri = request_uri(&mut rng);
            assert!(uri.starts_with('/'));
            if let Some(term) = uri.strip_prefix("/search/query?term=") {
                assert!(PRODUCTS.contains(&term));
            }
            let numeric = |s: &&str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
            for segment in uri.split('/').filter(numeric) {
                let id: u32 = segment.parse().unwrap();
                assert!((11111..=99999).contains(&id));
            }
        }
    }

    #[test]
    fn test_literal_pickers_stay_in_tables() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            assert!(USER_AGENTS.contains(&user_agent(&mut rng)));
            assert!(STATUS_CODES.contains(&status_code(&mut rng)));
            assert!(HTTP_METHODS.contains(&http_method(&mut rng)));
            assert!(LOG_LEVELS.contains(&log_level(&mut rng)));
            assert!(RANDOM_TEXTS.contains(&random_text(&mut rng)));
        }
    }
}
