use std::net::IpAddr;

use ipnet::IpNet;

/// Resolves the client address, honouring `X-Forwarded-For` only when the peer is a trusted proxy.
///
/// Hops are read right to left; the first address outside the trusted networks is the client.
pub(super) fn resolve_client_ip(
    peer: IpAddr,
    forwarded_for: Option<&str>,
    trusted_proxies: &[IpNet],
) -> IpAddr {
    let is_trusted = |address: &IpAddr| trusted_proxies.iter().any(|net| net.contains(address));
    if !is_trusted(&peer) {
        return peer;
    }

    let Some(forwarded_for) = forwarded_for else {
        return peer;
    };

    let mut client = peer;
    for hop in forwarded_for.split(',').rev().map(str::trim) {
        let Ok(address) = hop.parse::<IpAddr>() else {
            break;
        };
        client = address;
        if !is_trusted(&address) {
            break;
        }
    }

    client
}
