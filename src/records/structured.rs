//! Key/value access and flow logs, one typed shape per service.

use crate::errors::{GeneratorError, Result};
use crate::fields::{
    any_ip, common_log_timestamp, external_ip, http_method, internal_ip, iso_timestamp, pick,
    request_uri, status_code, user_agent,
};
use crate::records::SimulatedService;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::Ipv4Addr;

pub const TARGET_PROTOCOL: &str = "HTTP/1.1";
pub const SSL_CIPHER: &str = "ECDHE-RSA-AES128-GCM-SHA256";
pub const SSL_PROTOCOL: &str = "TLSv1.2";
pub const DOMAIN_NAME: &str = "example.com";
pub const CHOSEN_CERT_ARN: &str = "arn:aws:acm:region:account-id:certificate/certificate-id";
pub const NGINX_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
pub const FLOW_LOG_VERSION: u8 = 2;
pub const FLOW_LOG_ACCOUNT_ID: u64 = 145_556_732_243;

const REGIONS: [&str; 2] = ["us-east-1", "us-west-2"];
const TARGET_GROUPS: [&str; 2] = ["my-target-group", "your-target-group"];
const FLOW_PROTOCOLS: [u8; 2] = [6, 17];
const FLOW_ACTIONS: [&str; 2] = ["ACCEPT", "REJECT"];
const FLOW_LOG_STATUSES: [&str; 3] = ["OK", "NODATA", "SKIPDATA"];

/// Application load balancer access log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbLog {
    pub time: String,
    pub elb: String,
    pub client: String,
    pub target: String,
    pub request_processing_time: f64,
    pub target_processing_time: f64,
    pub response_processing_time: f64,
    pub elb_status_code: u16,
    pub target_status_code: u16,
    pub received_bytes: u32,
    pub sent_bytes: u32,
    pub request_method: String,
    pub request_uri: String,
    pub target_protocol: String,
    pub user_agent: String,
    pub ssl_cipher: String,
    pub ssl_protocol: String,
    pub target_group_arn: String,
    pub trace_id: String,
    pub domain_name: String,
    pub chosen_cert_arn: String,
    pub matched_rule_priority: String,
    pub request_creation_time: String,
    pub actions_executed: String,
    pub redirect_url: String,
    pub error_reason: String,
    pub target_port_list: String,
    pub target_status_code_list: String,
    pub classification: String,
    pub classification_reason: String,
}

/// Classic load balancer access log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElbLog {
    pub time: String,
    pub elb: String,
    pub client: String,
    pub backend: String,
    pub request_processing_time: f64,
    pub backend_processing_time: f64,
    pub response_processing_time: f64,
    pub elb_status_code: u16,
    pub backend_status_code: u16,
    pub received_bytes: u32,
    pub sent_bytes: u32,
    pub request_method: String,
    pub request_uri: String,
    pub target_protocol: String,
    pub user_agent: String,
    pub ssl_cipher: String,
    pub ssl_protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NginxLog {
    pub remote_addr: String,
    pub remote_user: String,
    pub time_local: String,
    pub request: String,
    pub status: u16,
    pub body_bytes_sent: u32,
    pub http_referer: String,
    pub http_user_agent: String,
    pub request_time: f64,
    pub upstream_connect_time: f64,
    pub upstream_header_time: f64,
    pub upstream_response_time: f64,
    pub upstream_ip: String,
}

/// Which side of a VPC flow is inside the VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// internal source, external destination
    Outbound,
    /// external source, internal destination
    Inbound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcFlowLog {
    #[serde(skip)]
    pub direction: Direction,
    pub version: u8,
    pub account_id: u64,
    pub interface_id: String,
    pub srcaddr: String,
    pub dstaddr: String,
    pub srcport: u16,
    pub dstport: u16,
    pub protocol: u8,
    pub packets: u32,
    pub bytes: u32,
    pub start: String,
    pub end: String,
    pub action: String,
    pub log_status: String,
}

fn elb_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("elb_{}", rng.random_range(1..=100))
}

fn with_port(ip: Ipv4Addr, port: u16) -> String {
    format!("{}:{}", ip, port)
}

fn target_group_arn<R: Rng + ?Sized>(rng: &mut R) -> String {
    let region = pick(rng, &REGIONS);
    let account: u64 = rng.random_range(100_000_000_000..=999_999_999_999);
    let group = pick(rng, &TARGET_GROUPS);
    let suffix = rng.random_range(1000..=9999);
    format!(
        "arn:aws:elasticloadbalancing:{}:{}:targetgroup/{}/{}",
        region, account, group, suffix
    )
}

impl AlbLog {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        Self {
            time: iso_timestamp(now),
            elb: elb_name(rng),
            client: with_port(external_ip(rng), 443),
            target: with_port(internal_ip(rng), 443),
            request_processing_time: rng.random(),
            target_processing_time: rng.random(),
            response_processing_time: rng.random(),
            elb_status_code: status_code(rng),
            target_status_code: status_code(rng),
            received_bytes: rng.random_range(100..=10_000),
            sent_bytes: rng.random_range(100..=10_000),
            request_method: http_method(rng).to_string(),
            request_uri: request_uri(rng),
            target_protocol: TARGET_PROTOCOL.to_string(),
            user_agent: user_agent(rng).to_string(),
            ssl_cipher: SSL_CIPHER.to_string(),
            ssl_protocol: SSL_PROTOCOL.to_string(),
            target_group_arn: target_group_arn(rng),
            trace_id: format!("Root={}", rng.random_range(1..=999_999)),
            domain_name: DOMAIN_NAME.to_string(),
            chosen_cert_arn: CHOSEN_CERT_ARN.to_string(),
            matched_rule_priority: rng.random_range(1..=100).to_string(),
            request_creation_time: iso_timestamp(now),
            actions_executed: "forward".to_string(),
            redirect_url: "-".to_string(),
            error_reason: "-".to_string(),
            target_port_list: with_port(any_ip(rng), 80),
            target_status_code_list: status_code(rng).to_string(),
            classification: "-".to_string(),
            classification_reason: "-".to_string(),
        }
    }
}

impl ElbLog {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        Self {
            time: iso_timestamp(now),
            elb: elb_name(rng),
            client: with_port(external_ip(rng), 80),
            backend: with_port(internal_ip(rng), 80),
            request_processing_time: rng.random(),
            backend_processing_time: rng.random(),
            response_processing_time: rng.random(),
            elb_status_code: status_code(rng),
            backend_status_code: status_code(rng),
            received_bytes: rng.random_range(100..=10_000),
            sent_bytes: rng.random_range(100..=10_000),
            request_method: http_method(rng).to_string(),
            request_uri: request_uri(rng),
            target_protocol: TARGET_PROTOCOL.to_string(),
            user_agent: user_agent(rng).to_string(),
            ssl_cipher: SSL_CIPHER.to_string(),
            ssl_protocol: SSL_PROTOCOL.to_string(),
        }
    }
}

impl NginxLog {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        Self {
            remote_addr: external_ip(rng).to_string(),
            remote_user: "-".to_string(),
            time_local: common_log_timestamp(now),
            request: format!("{} /path/to/resource HTTP/1.1", http_method(rng)),
            status: status_code(rng),
            body_bytes_sent: rng.random_range(100..=10_000),
            http_referer: "-".to_string(),
            http_user_agent: NGINX_USER_AGENT.to_string(),
            request_time: rng.random(),
            upstream_connect_time: rng.random(),
            upstream_header_time: rng.random(),
            upstream_response_time: rng.random(),
            upstream_ip: any_ip(rng).to_string(),
        }
    }
}

impl VpcFlowLog {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let direction = if rng.random_bool(0.5) {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        let (srcaddr, dstaddr) = match direction {
            Direction::Outbound => (internal_ip(rng), external_ip(rng)),
            Direction::Inbound => (external_ip(rng), internal_ip(rng)),
        };

        Self {
            direction,
            version: FLOW_LOG_VERSION,
            account_id: FLOW_LOG_ACCOUNT_ID,
            interface_id: format!("eni-{}", rng.random_range(10_000_000..=99_999_999)),
            srcaddr: srcaddr.to_string(),
            dstaddr: dstaddr.to_string(),
            srcport: rng.random_range(1..=65_535),
            dstport: rng.random_range(1..=65_535),
            protocol: *pick(rng, &FLOW_PROTOCOLS),
            packets: rng.random_range(1..=1_000),
            bytes: rng.random_range(40..=10_000),
            start: iso_timestamp(now),
            end: iso_timestamp(now),
            action: pick(rng, &FLOW_ACTIONS).to_string(),
            log_status: pick(rng, &FLOW_LOG_STATUSES).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredRecord {
    Alb(AlbLog),
    Elb(ElbLog),
    Nginx(NginxLog),
    VpcFlow(VpcFlowLog),
}

impl StructuredRecord {
    pub fn generate<R: Rng + ?Sized>(
        service: SimulatedService,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        match service {
            SimulatedService::Alb => Ok(StructuredRecord::Alb(AlbLog::generate(rng, now))),
            SimulatedService::Elb => Ok(StructuredRecord::Elb(ElbLog::generate(rng, now))),
            SimulatedService::Nginx => Ok(StructuredRecord::Nginx(NginxLog::generate(rng, now))),
            SimulatedService::VpcFlow => {
                Ok(StructuredRecord::VpcFlow(VpcFlowLog::generate(rng, now)))
            }
            other => Err(GeneratorError::Generation(format!(
                "{} has no access log layout",
                other
            ))),
        }
    }

    pub fn service(&self) -> SimulatedService {
        match self {
            StructuredRecord::Alb(_) => SimulatedService::Alb,
            StructuredRecord::Elb(_) => SimulatedService::Elb,
            StructuredRecord::Nginx(_) => SimulatedService::Nginx,
            StructuredRecord::VpcFlow(_) => SimulatedService::VpcFlow,
        }
    }

    /// Flat field mapping in declaration order.
    pub fn to_document(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(GeneratorError::Generation(format!(
                "{} record serialized to a non-object: {}",
                self.service(),
                other
            ))),
        }
    }

    /// `(method, status code, url)` for the emission span, with the same
    /// fallbacks for services that have no HTTP fields.
    pub fn http_attributes(&self) -> (String, u16, String) {
        match self {
            StructuredRecord::Alb(log) => (
                log.request_method.clone(),
                log.elb_status_code,
                log.request_uri.clone(),
            ),
            StructuredRecord::Elb(log) => (
                log.request_method.clone(),
                log.elb_status_code,
                log.request_uri.clone(),
            ),
            StructuredRecord::Nginx(log) => ("GET".to_string(), log.status, "/".to_string()),
            StructuredRecord::VpcFlow(_) => ("GET".to_string(), 200, "/".to_string()),
        }
    }
}
