//! Positional text renderings of the access and flow logs.
//!
//! Lines carry the same fields as the structured shapes, space-delimited and
//! unlabeled. A few values differ from the structured form the way the
//! services print them: the ALB line reports its own domain, the ELB line
//! records the client from inside the VPC, and the NGINX line uses a real
//! browser agent.

use crate::errors::{GeneratorError, Result};
use crate::fields::{internal_ip, user_agent};
use crate::records::SimulatedService;
use crate::records::structured::{AlbLog, ElbLog, NginxLog, VpcFlowLog};
use chrono::{DateTime, Utc};
use rand::Rng;

pub const ALB_LINE_DOMAIN: &str = "loggoblin.com";

pub fn generate<R: Rng + ?Sized>(
    service: SimulatedService,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<String> {
    match service {
        SimulatedService::Alb => {
            let mut log = AlbLog::generate(rng, now);
            log.domain_name = ALB_LINE_DOMAIN.to_string();
            Ok(alb_line(&log))
        }
        SimulatedService::Elb => {
            let mut log = ElbLog::generate(rng, now);
            log.client = format!("{}:80", internal_ip(rng));
            Ok(elb_line(&log))
        }
        SimulatedService::Nginx => {
            let mut log = NginxLog::generate(rng, now);
            log.http_user_agent = user_agent(rng).to_string();
            Ok(nginx_line(&log))
        }
        SimulatedService::VpcFlow => Ok(vpc_flow_line(&VpcFlowLog::generate(rng, now))),
        other => Err(GeneratorError::Generation(format!(
            "{} has no access log layout",
            other
        ))),
    }
}

pub fn alb_line(log: &AlbLog) -> String {
    [
        log.time.clone(),
        log.elb.clone(),
        log.client.clone(),
        log.target.clone(),
        log.request_processing_time.to_string(),
        log.target_processing_time.to_string(),
        log.response_processing_time.to_string(),
        log.elb_status_code.to_string(),
        log.target_status_code.to_string(),
        log.received_bytes.to_string(),
        log.sent_bytes.to_string(),
        log.request_method.clone(),
        log.request_uri.clone(),
        log.target_protocol.clone(),
        log.user_agent.clone(),
        log.ssl_cipher.clone(),
        log.ssl_protocol.clone(),
        log.target_group_arn.clone(),
        log.trace_id.clone(),
        log.domain_name.clone(),
        log.chosen_cert_arn.clone(),
        log.matched_rule_priority.clone(),
        log.request_creation_time.clone(),
        log.actions_executed.clone(),
        log.redirect_url.clone(),
        log.error_reason.clone(),
        log.target_port_list.clone(),
        log.target_status_code_list.clone(),
        log.classification.clone(),
        log.classification_reason.clone(),
    ]
    .join(" ")
}

pub fn elb_line(log: &ElbLog) -> String {
    [
        log.time.clone(),
        log.elb.clone(),
        log.client.clone(),
        log.backend.clone(),
        log.request_processing_time.to_string(),
        log.backend_processing_time.to_string(),
        log.response_processing_time.to_string(),
        log.elb_status_code.to_string(),
        log.backend_status_code.to_string(),
        log.received_bytes.to_string(),
        log.sent_bytes.to_string(),
        log.request_method.clone(),
        log.request_uri.clone(),
        log.target_protocol.clone(),
        log.user_agent.clone(),
        log.ssl_cipher.clone(),
        log.ssl_protocol.clone(),
    ]
    .join(" ")
}

/// Combined access log layout with upstream timings appended.
pub fn nginx_line(log: &NginxLog) -> String {
    format!(
        "{} {} [{}] \"{}\" {} {} \"{}\" {} {} {} {} {} {}",
        log.remote_addr,
        log.remote_user,
        log.time_local,
        log.request,
        log.status,
        log.body_bytes_sent,
        log.http_referer,
        log.http_user_agent,
        log.request_time,
        log.upstream_connect_time,
        log.upstream_header_time,
        log.upstream_response_time,
        log.upstream_ip,
    )
}

pub fn vpc_flow_line(log: &VpcFlowLog) -> String {
    format!(
        "{} {} {} {} {} {} {} {} {} {} {} {} {} {}",
        log.version,
        log.account_id,
        log.interface_id,
        log.srcaddr,
        log.dstaddr,
        log.srcport,
        log.dstport,
        log.protocol,
        log.packets,
        log.bytes,
        log.start,
        log.end,
        log.action,
        log.log_status,
    )
}
