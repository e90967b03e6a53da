//! Listener construction

use crate::definition::Protocol;
use crate::traits::Listener;

/// External port used when a service declares no source ports
pub const DEFAULT_LISTENER_PORT: u16 = 443;

/// Build one listener per source port, or a single 443 listener
///
/// Order follows `source_ports`. Repeated ports yield repeated listeners;
/// the control plane rejects them.
pub fn build_listeners(
    source_ports: &[u16],
    instance_port: u16,
    protocol: Protocol,
    certificate_id: &str,
) -> Vec<Listener> {
    listener_ports(source_ports)
        .into_iter()
        .map(|port| Listener {
            load_balancer_port: port,
            instance_port,
            protocol,
            instance_protocol: protocol,
            ssl_certificate_id: certificate_id.to_string(),
        })
        .collect()
}

/// External ports the listeners occupy
///
/// Also the set of listeners removed before listeners are recreated on an
/// existing load balancer.
pub fn listener_ports(source_ports: &[u16]) -> Vec<u16> {
    if source_ports.is_empty() {
        vec![DEFAULT_LISTENER_PORT]
    } else {
        source_ports.to_vec()
    }
}
