use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::*;
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The first address in the `X-Forwarded-For` header, iif `use_x_forwarded_for` is set.
/// 2. The `for=` field of the `Forwarded` header, iif `use_forwarded` is set.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using peer address for remote address: {peer_addr:?}");
        peer_addr
    })
}

fn forwarded_for(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"(?i)for="?\[?(?P<ip>[0-9a-f.:]+)"#).ok()?;
    re.captures(header).and_then(|caps| caps.name("ip")).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}

/// Checks the caller against an optional whitelist. No whitelist means everyone is allowed, while an unknown caller is
/// never allowed past a whitelist.
pub fn is_whitelisted(ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(list)) => list.contains(&ip),
        (None, Some(_)) => {
            warn!("No IP address found for the remote peer, denying access.");
            false
        },
    }
}
